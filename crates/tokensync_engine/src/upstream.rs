//! Conversion of fetched wire models into domain collections.
//!
//! These functions run inside a cache populate, while the category lock is
//! held. They are pure: every input is already fetched.

use crate::error::{BrokenReason, BrokenReference, EngineError, EngineResult};
use std::collections::{HashMap, HashSet};
use tokensync_model::{
    Asset, AssetGroup, Component, ComponentGroup, ComponentGroupRemoteModel, ComponentRemoteModel,
    CustomBlock, DocumentationBlock, DocumentationConfiguration, DocumentationGroupModel,
    DocumentationItem, DocumentationItemKind, DocumentationPageModel, Token, TokenGroup,
    TokenGroupRemoteModel, TokenRemoteModel,
};

/// Components of a version together with the exportable subset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentsAndAssets {
    /// All components.
    pub components: Vec<Component>,
    /// Components flagged as assets.
    pub assets: Vec<Asset>,
}

/// Component groups and the asset groups mirrored from them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComponentAndAssetGroups {
    /// Groups of components.
    pub component_groups: Vec<ComponentGroup>,
    /// Groups of assets.
    pub asset_groups: Vec<AssetGroup>,
}

/// Decodes tokens and checks that every alias points at a fetched token.
pub fn resolve_tokens(models: Vec<TokenRemoteModel>) -> EngineResult<Vec<Token>> {
    let tokens = models
        .into_iter()
        .map(TokenRemoteModel::into_token)
        .collect::<Result<Vec<_>, _>>()?;

    let ids: HashSet<&str> = tokens.iter().map(|t| t.id.as_str()).collect();
    let broken: Vec<BrokenReference> = tokens
        .iter()
        .filter_map(|token| {
            let target = token.alias_id.as_deref()?;
            (!ids.contains(target)).then(|| BrokenReference {
                path: token.name.clone(),
                target: target.to_string(),
                reason: BrokenReason::MissingTarget,
            })
        })
        .collect();

    if broken.is_empty() {
        Ok(tokens)
    } else {
        Err(EngineError::BrokenReference(broken))
    }
}

/// Builds groups and fills in each group's parent from the child lists.
pub fn resolve_token_groups(models: Vec<TokenGroupRemoteModel>) -> Vec<TokenGroup> {
    let mut groups: Vec<TokenGroup> = models.into_iter().map(TokenGroup::from).collect();

    let mut parents: HashMap<String, String> = HashMap::new();
    for group in &groups {
        for child in &group.child_ids {
            parents.insert(child.clone(), group.id.clone());
        }
    }
    for group in &mut groups {
        if !group.is_root {
            group.parent_id = parents.get(&group.id).cloned();
        }
    }
    groups
}

/// Splits components into the full set and the asset subset.
///
/// Assets sharing a case-insensitive name within a brand are numbered in
/// fetch order.
pub fn resolve_components_and_assets(models: &[ComponentRemoteModel]) -> ComponentsAndAssets {
    let components = models.iter().map(Component::from).collect();

    let mut seen: HashMap<(String, String), usize> = HashMap::new();
    let assets = models
        .iter()
        .filter(|model| model.export_properties.is_asset)
        .map(|model| {
            let key = (model.brand_id.clone(), model.meta.name.to_lowercase());
            let count = seen.entry(key).or_insert(0);
            let asset = Asset::from_model(model, *count);
            *count += 1;
            asset
        })
        .collect();

    ComponentsAndAssets { components, assets }
}

/// Builds component groups, and asset groups from the same models.
///
/// Child ids that are neither a group nor a known member are dropped.
pub fn resolve_component_groups(
    models: &[ComponentGroupRemoteModel],
    members: &ComponentsAndAssets,
) -> ComponentAndAssetGroups {
    let group_ids: HashSet<&str> = models.iter().map(|g| g.id.as_str()).collect();
    let component_ids: HashSet<&str> = members.components.iter().map(|c| c.id.as_str()).collect();
    let asset_ids: HashSet<&str> = members.assets.iter().map(|a| a.id.as_str()).collect();

    let children_in = |model: &ComponentGroupRemoteModel, set: &HashSet<&str>| -> Vec<String> {
        model
            .children_ids
            .iter()
            .filter(|id| set.contains(id.as_str()))
            .cloned()
            .collect()
    };

    let mut result = ComponentAndAssetGroups::default();
    for model in models {
        let subgroup_ids = children_in(model, &group_ids);
        result.component_groups.push(ComponentGroup {
            id: model.id.clone(),
            persistent_id: model.persistent_id.clone(),
            brand_id: model.brand_id.clone(),
            name: model.meta.name.clone(),
            description: model.meta.description.clone(),
            is_root: model.is_root,
            subgroup_ids: subgroup_ids.clone(),
            component_ids: children_in(model, &component_ids),
        });
        result.asset_groups.push(AssetGroup {
            id: model.id.clone(),
            persistent_id: model.persistent_id.clone(),
            brand_id: model.brand_id.clone(),
            name: model.meta.name.clone(),
            description: model.meta.description.clone(),
            is_root: model.is_root,
            subgroup_ids,
            asset_ids: children_in(model, &asset_ids),
        });
    }
    result
}

/// Builds documentation items: groups first, then pages, each in fetch order.
///
/// Page blocks naming a known custom block key are linked to its definition.
pub fn resolve_documentation_items(
    pages: Vec<DocumentationPageModel>,
    groups: Vec<DocumentationGroupModel>,
    custom_blocks: &[CustomBlock],
    configuration: &DocumentationConfiguration,
) -> Vec<DocumentationItem> {
    let blocks_by_key: HashMap<&str, &CustomBlock> =
        custom_blocks.iter().map(|b| (b.key.as_str(), b)).collect();

    let mut items = Vec::with_capacity(pages.len() + groups.len());
    for group in groups {
        items.push(DocumentationItem {
            id: group.id,
            persistent_id: group.persistent_id,
            kind: DocumentationItemKind::Group,
            title: group.title,
            parent_persistent_id: group.parent_persistent_id,
            child_persistent_ids: group.child_persistent_ids,
            blocks: Vec::new(),
            tabbed: false,
        });
    }
    for page in pages {
        let blocks = page
            .blocks
            .into_iter()
            .map(|block| DocumentationBlock {
                custom_block: block
                    .key
                    .as_deref()
                    .and_then(|key| blocks_by_key.get(key))
                    .map(|b| (*b).clone()),
                id: block.id,
                block_type: block.block_type,
            })
            .collect();
        items.push(DocumentationItem {
            id: page.id,
            persistent_id: page.persistent_id,
            kind: DocumentationItemKind::Page,
            title: page.title,
            parent_persistent_id: page.parent_persistent_id,
            child_persistent_ids: Vec::new(),
            blocks,
            tabbed: configuration.is_tabbed_layout_enabled,
        });
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokensync_model::DocumentationBlockModel;

    fn component(id: &str, name: &str, is_asset: bool) -> ComponentRemoteModel {
        serde_json::from_value(json!({
            "id": id,
            "persistentId": format!("p-{id}"),
            "brandId": "b1",
            "meta": {"name": name},
            "exportProperties": {"isAsset": is_asset}
        }))
        .unwrap()
    }

    #[test]
    fn dangling_upstream_alias_is_reported() {
        let models: Vec<TokenRemoteModel> = serde_json::from_value(json!([
            {"id": "t1", "persistentId": "p1", "brandId": "b1", "tokenType": "color",
             "name": "red", "value": "#FF0000"},
            {"id": "t2", "persistentId": "p2", "brandId": "b1", "tokenType": "color",
             "name": "primary", "value": "#FF0000", "aliasTo": "t9"}
        ]))
        .unwrap();

        let err = resolve_tokens(models).unwrap_err();
        match err {
            EngineError::BrokenReference(broken) => {
                assert_eq!(broken.len(), 1);
                assert_eq!(broken[0].path, "primary");
                assert_eq!(broken[0].target, "t9");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn group_parents_follow_child_lists() {
        let models: Vec<TokenGroupRemoteModel> = serde_json::from_value(json!([
            {"id": "root", "persistentId": "root", "brandId": "b1", "tokenType": "color",
             "name": "Color", "isRoot": true, "childrenIds": ["g1"]},
            {"id": "g1", "persistentId": "g1", "brandId": "b1", "tokenType": "color",
             "name": "Brand", "childrenIds": ["t1"]}
        ]))
        .unwrap();

        let groups = resolve_token_groups(models);
        assert_eq!(groups[0].parent_id, None);
        assert_eq!(groups[1].parent_id.as_deref(), Some("root"));
    }

    #[test]
    fn assets_count_duplicate_names() {
        let models = vec![
            component("c1", "Icon", true),
            component("c2", "Card", false),
            component("c3", "icon", true),
        ];
        let resolved = resolve_components_and_assets(&models);
        assert_eq!(resolved.components.len(), 3);
        assert_eq!(resolved.assets.len(), 2);
        assert_eq!(resolved.assets[0].previous_duplicates, 0);
        assert_eq!(resolved.assets[1].previous_duplicates, 1);
    }

    #[test]
    fn asset_groups_keep_only_assets() {
        let members = resolve_components_and_assets(&[
            component("c1", "Icon", true),
            component("c2", "Card", false),
        ]);
        let groups: Vec<ComponentGroupRemoteModel> = serde_json::from_value(json!([
            {"id": "g1", "persistentId": "g1", "brandId": "b1", "isRoot": true,
             "meta": {"name": "Root"}, "childrenIds": ["g2", "c1", "c2", "gone"]},
            {"id": "g2", "persistentId": "g2", "brandId": "b1",
             "meta": {"name": "Nested"}}
        ]))
        .unwrap();

        let resolved = resolve_component_groups(&groups, &members);
        assert_eq!(resolved.component_groups[0].subgroup_ids, vec!["g2"]);
        assert_eq!(resolved.component_groups[0].component_ids, vec!["c1", "c2"]);
        assert_eq!(resolved.asset_groups[0].asset_ids, vec!["c1"]);
    }

    #[test]
    fn page_blocks_link_custom_blocks() {
        let page = DocumentationPageModel {
            id: "p1".into(),
            persistent_id: "pp1".into(),
            title: "Intro".into(),
            parent_persistent_id: Some("grp".into()),
            blocks: vec![
                DocumentationBlockModel {
                    id: "b1".into(),
                    block_type: "custom".into(),
                    key: Some("io.example.chart".into()),
                },
                DocumentationBlockModel {
                    id: "b2".into(),
                    block_type: "text".into(),
                    key: None,
                },
            ],
        };
        let custom = vec![CustomBlock {
            key: "io.example.chart".into(),
            title: "Chart".into(),
            description: String::new(),
        }];
        let configuration = DocumentationConfiguration {
            is_tabbed_layout_enabled: true,
            ..Default::default()
        };

        let items = resolve_documentation_items(vec![page], Vec::new(), &custom, &configuration);
        assert_eq!(items.len(), 1);
        assert!(items[0].tabbed);
        assert_eq!(
            items[0].blocks[0].custom_block.as_ref().map(|b| b.title.as_str()),
            Some("Chart")
        );
        assert!(items[0].blocks[1].custom_block.is_none());
    }
}
