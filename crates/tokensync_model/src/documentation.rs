//! Documentation settings, custom blocks and items.

use serde::{Deserialize, Serialize};

/// Documentation settings of a design system version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentationConfiguration {
    /// Whether pages render tabs.
    #[serde(default)]
    pub is_tabbed_layout_enabled: bool,
    /// Whether page titles are stored in the page header.
    #[serde(default)]
    pub store_header_in_page: bool,
    /// Settings this model does not interpret.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Wire form of the `documentation` endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentationModel {
    /// Settings block.
    #[serde(default)]
    pub settings: DocumentationConfiguration,
}

/// Custom block definition contributed by an exporter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomBlock {
    /// Key referenced by page blocks.
    pub key: String,
    /// Title shown in the editor.
    pub title: String,
    /// Description.
    #[serde(default)]
    pub description: String,
}

/// Kind of a documentation item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DocumentationItemKind {
    /// Content page.
    Page,
    /// Group of pages.
    Group,
}

/// A block on a documentation page as transferred by the data bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentationBlockModel {
    /// Block id.
    pub id: String,
    /// Block type tag.
    #[serde(rename = "type")]
    pub block_type: String,
    /// Custom block key for `custom` blocks.
    #[serde(default)]
    pub key: Option<String>,
}

/// Page as transferred by the data bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentationPageModel {
    /// Version-scoped id.
    pub id: String,
    /// Stable id.
    pub persistent_id: String,
    /// Page title.
    pub title: String,
    /// Owning group's persistent id.
    #[serde(default)]
    pub parent_persistent_id: Option<String>,
    /// Page blocks in order.
    #[serde(default)]
    pub blocks: Vec<DocumentationBlockModel>,
}

/// Group as transferred by the data bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentationGroupModel {
    /// Version-scoped id.
    pub id: String,
    /// Stable id.
    pub persistent_id: String,
    /// Group title.
    pub title: String,
    /// Root flag.
    #[serde(default)]
    pub is_root: bool,
    /// Parent group's persistent id.
    #[serde(default)]
    pub parent_persistent_id: Option<String>,
    /// Ordered child persistent ids.
    #[serde(default)]
    pub child_persistent_ids: Vec<String>,
}

/// A resolved page block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DocumentationBlock {
    /// Block id.
    pub id: String,
    /// Block type tag.
    pub block_type: String,
    /// Definition of the custom block, for `custom` blocks whose key is known.
    pub custom_block: Option<CustomBlock>,
}

/// A resolved documentation page or group.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentationItem {
    /// Version-scoped id.
    pub id: String,
    /// Stable id.
    pub persistent_id: String,
    /// Page or group.
    pub kind: DocumentationItemKind,
    /// Title.
    pub title: String,
    /// Parent persistent id.
    pub parent_persistent_id: Option<String>,
    /// Child persistent ids (groups only).
    pub child_persistent_ids: Vec<String>,
    /// Blocks (pages only).
    pub blocks: Vec<DocumentationBlock>,
    /// Whether the page renders as tabs, from the documentation settings.
    pub tabbed: bool,
}
