//! Token groups.

use crate::token_type::TokenType;
use serde::{Deserialize, Serialize};

/// Hierarchical container of tokens and subgroups of one type.
#[derive(Debug, Clone, PartialEq)]
pub struct TokenGroup {
    /// Identifier within this design system version.
    pub id: String,
    /// Identifier stable across versions.
    pub persistent_id: String,
    /// Display name.
    pub name: String,
    /// Free-form description.
    pub description: String,
    /// Type of every contained token.
    pub token_type: TokenType,
    /// Ordered child ids; tokens and subgroups interleave.
    pub child_ids: Vec<String>,
    /// Parent group id; `None` for roots.
    pub parent_id: Option<String>,
    /// Whether this is the type root of its brand.
    pub is_root: bool,
    /// Persistent id of the owning brand.
    pub brand_id: String,
    /// Position along the pre-order walk of the type tree.
    pub sort_order: i64,
}

impl TokenGroup {
    /// Creates an empty non-root group.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        token_type: TokenType,
        brand_id: impl Into<String>,
    ) -> Self {
        let id = id.into();
        Self {
            persistent_id: id.clone(),
            id,
            name: name.into(),
            description: String::new(),
            token_type,
            child_ids: Vec::new(),
            parent_id: None,
            is_root: false,
            brand_id: brand_id.into(),
            sort_order: 0,
        }
    }

    /// Creates an empty root group for `token_type`.
    pub fn root(id: impl Into<String>, token_type: TokenType, brand_id: impl Into<String>) -> Self {
        let mut group = Self::new(id, token_type.root_name(), token_type, brand_id);
        group.is_root = true;
        group
    }

    /// Appends `id` unless it is already a child.
    pub fn add_child(&mut self, id: &str) -> bool {
        if self.contains_child(id) {
            return false;
        }
        self.child_ids.push(id.to_string());
        true
    }

    /// Removes `id` from the children.
    pub fn remove_child(&mut self, id: &str) -> bool {
        let before = self.child_ids.len();
        self.child_ids.retain(|c| c != id);
        before != self.child_ids.len()
    }

    /// Returns true if `id` is a direct child.
    pub fn contains_child(&self, id: &str) -> bool {
        self.child_ids.iter().any(|c| c == id)
    }
}

/// Group as transferred by the data bridge.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenGroupRemoteModel {
    /// Version-scoped id.
    pub id: String,
    /// Stable id.
    pub persistent_id: String,
    /// Owning brand.
    pub brand_id: String,
    /// Contained type.
    pub token_type: TokenType,
    /// Display name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
    /// Ordered child ids.
    #[serde(default)]
    pub children_ids: Vec<String>,
    /// Root flag.
    #[serde(default)]
    pub is_root: bool,
    /// Sort order.
    #[serde(default)]
    pub sort_order: i64,
}

impl From<TokenGroupRemoteModel> for TokenGroup {
    fn from(model: TokenGroupRemoteModel) -> Self {
        Self {
            id: model.id,
            persistent_id: model.persistent_id,
            name: model.name,
            description: model.description,
            token_type: model.token_type,
            child_ids: model.children_ids,
            parent_id: None,
            is_root: model.is_root,
            brand_id: model.brand_id,
            sort_order: model.sort_order,
        }
    }
}

impl From<&TokenGroup> for TokenGroupRemoteModel {
    fn from(group: &TokenGroup) -> Self {
        Self {
            id: group.id.clone(),
            persistent_id: group.persistent_id.clone(),
            brand_id: group.brand_id.clone(),
            token_type: group.token_type,
            name: group.name.clone(),
            description: group.description.clone(),
            children_ids: group.child_ids.clone(),
            is_root: group.is_root,
            sort_order: group.sort_order,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn children_are_never_duplicated() {
        let mut group = TokenGroup::new("g1", "Brand", TokenType::Color, "b1");
        assert!(group.add_child("t1"));
        assert!(!group.add_child("t1"));
        assert!(group.add_child("g2"));
        assert_eq!(group.child_ids, vec!["t1", "g2"]);

        assert!(group.remove_child("t1"));
        assert!(!group.remove_child("t1"));
        assert_eq!(group.child_ids, vec!["g2"]);
    }

    #[test]
    fn root_is_named_after_type() {
        let root = TokenGroup::root("r", TokenType::Radius, "b1");
        assert!(root.is_root);
        assert_eq!(root.name, "Radius");
        assert!(root.parent_id.is_none());
    }
}
