//! Group trees for a freshly resolved definition.

use std::collections::HashMap;
use tokensync_model::{ProcessedNode, TokenGroup, TokenType};
use uuid::Uuid;

/// Builds every group the definition implies.
///
/// One root per token type present, one group per distinct path prefix under
/// it, children in first-appearance order. Each token's `parent_id` is set
/// to its leaf group. Roots come first in the result, then groups in
/// creation order.
pub fn build_group_trees(nodes: &mut [ProcessedNode], brand_id: &str) -> Vec<TokenGroup> {
    let mut groups: Vec<TokenGroup> = Vec::new();
    let mut roots: HashMap<TokenType, usize> = HashMap::new();
    let mut by_path: HashMap<(TokenType, Vec<String>), usize> = HashMap::new();

    for node in nodes.iter_mut() {
        let token_type = node.token.token_type;
        let mut parent = *roots.entry(token_type).or_insert_with(|| {
            groups.push(TokenGroup::root(new_id(), token_type, brand_id));
            groups.len() - 1
        });

        for depth in 1..=node.path.len() {
            let key = (token_type, node.path[..depth].to_vec());
            let index = match by_path.get(&key) {
                Some(&index) => index,
                None => {
                    let name = node.path[depth - 1].clone();
                    let mut group = TokenGroup::new(new_id(), name, token_type, brand_id);
                    group.parent_id = Some(groups[parent].id.clone());
                    let id = group.id.clone();
                    groups.push(group);
                    groups[parent].add_child(&id);
                    by_path.insert(key, groups.len() - 1);
                    groups.len() - 1
                }
            };
            parent = index;
        }

        groups[parent].add_child(&node.token.id);
        node.token.parent_id = Some(groups[parent].id.clone());
    }

    // Roots first, in type order; the remaining groups keep creation order.
    groups.sort_by_key(|g| (!g.is_root, g.is_root.then_some(g.token_type)));
    groups
}

fn new_id() -> String {
    Uuid::new_v4().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resolver::ReferenceResolver;
    use serde_json::json;
    use tokensync_model::{Brand, ParsedNode};

    fn node(path: &[&str], name: &str, type_name: &str, value: serde_json::Value) -> ParsedNode {
        ParsedNode {
            name: name.into(),
            path: path.iter().map(|s| s.to_string()).collect(),
            type_name: type_name.into(),
            value,
            description: String::new(),
            persistent_id: None,
        }
    }

    #[test]
    fn groups_follow_paths() {
        let brand = Brand::new("b1", "Default");
        let mut nodes = ReferenceResolver::new(&brand)
            .resolve(vec![
                node(&["Colors", "Brand"], "red", "color", json!("#FF0000")),
                node(&["Colors", "Brand"], "blue", "color", json!("#0000FF")),
                node(&["Colors"], "black", "color", json!("#000000")),
                node(&["Radius"], "small", "borderRadius", json!("2px")),
                node(&[], "top", "color", json!("#FFFFFF")),
            ])
            .unwrap()
            .nodes;

        let groups = build_group_trees(&mut nodes, "b1");
        let named = |name: &str| groups.iter().find(|g| g.name == name && !g.is_root).unwrap();

        assert!(groups[0].is_root && groups[0].token_type == TokenType::Color);
        assert!(groups[1].is_root && groups[1].token_type == TokenType::Radius);
        assert_eq!(groups.len(), 5);

        let color_root = &groups[0];
        let colors = named("Colors");
        let brand_group = named("Brand");
        assert_eq!(color_root.child_ids, vec![colors.id.clone(), nodes[4].token.id.clone()]);
        assert_eq!(
            colors.child_ids,
            vec![brand_group.id.clone(), nodes[2].token.id.clone()]
        );
        assert_eq!(
            brand_group.child_ids,
            vec![nodes[0].token.id.clone(), nodes[1].token.id.clone()]
        );
        assert_eq!(nodes[0].token.parent_id.as_deref(), Some(brand_group.id.as_str()));
        assert_eq!(brand_group.parent_id.as_deref(), Some(colors.id.as_str()));
        assert!(groups.iter().all(|g| g.brand_id == "b1"));
    }
}
