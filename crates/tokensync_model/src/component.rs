//! Components, assets and their groups.

use serde::{Deserialize, Serialize};

/// Name and description block shared by remote models.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteMeta {
    /// Display name.
    pub name: String,
    /// Description.
    #[serde(default)]
    pub description: String,
}

/// Export flags of a remote component.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExportProperties {
    /// Whether the component is exportable as an asset.
    #[serde(default)]
    pub is_asset: bool,
}

/// Component as transferred by the data bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentRemoteModel {
    /// Version-scoped id.
    pub id: String,
    /// Stable id.
    pub persistent_id: String,
    /// Owning brand.
    pub brand_id: String,
    /// Name and description.
    pub meta: RemoteMeta,
    /// Export flags.
    #[serde(default)]
    pub export_properties: ExportProperties,
}

/// A design component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    /// Version-scoped id.
    pub id: String,
    /// Stable id.
    pub persistent_id: String,
    /// Owning brand.
    pub brand_id: String,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: String,
}

impl From<&ComponentRemoteModel> for Component {
    fn from(model: &ComponentRemoteModel) -> Self {
        Self {
            id: model.id.clone(),
            persistent_id: model.persistent_id.clone(),
            brand_id: model.brand_id.clone(),
            name: model.meta.name.clone(),
            description: model.meta.description.clone(),
        }
    }
}

/// An exportable component.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Asset {
    /// Version-scoped id.
    pub id: String,
    /// Stable id.
    pub persistent_id: String,
    /// Owning brand.
    pub brand_id: String,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Number of earlier assets with the same case-insensitive name.
    pub previous_duplicates: usize,
}

impl Asset {
    /// Builds an asset from its component model.
    pub fn from_model(model: &ComponentRemoteModel, previous_duplicates: usize) -> Self {
        Self {
            id: model.id.clone(),
            persistent_id: model.persistent_id.clone(),
            brand_id: model.brand_id.clone(),
            name: model.meta.name.clone(),
            description: model.meta.description.clone(),
            previous_duplicates,
        }
    }
}

/// Component group as transferred by the data bridge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentGroupRemoteModel {
    /// Version-scoped id.
    pub id: String,
    /// Stable id.
    pub persistent_id: String,
    /// Owning brand.
    pub brand_id: String,
    /// Root flag.
    #[serde(default)]
    pub is_root: bool,
    /// Name and description.
    pub meta: RemoteMeta,
    /// Ordered child ids: components and subgroups.
    #[serde(default)]
    pub children_ids: Vec<String>,
}

/// Group of components.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentGroup {
    /// Version-scoped id.
    pub id: String,
    /// Stable id.
    pub persistent_id: String,
    /// Owning brand.
    pub brand_id: String,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Root flag.
    pub is_root: bool,
    /// Direct subgroups.
    pub subgroup_ids: Vec<String>,
    /// Directly contained components.
    pub component_ids: Vec<String>,
}

/// Group of assets; mirrors the component group it was derived from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetGroup {
    /// Version-scoped id.
    pub id: String,
    /// Stable id.
    pub persistent_id: String,
    /// Owning brand.
    pub brand_id: String,
    /// Display name.
    pub name: String,
    /// Description.
    pub description: String,
    /// Root flag.
    pub is_root: bool,
    /// Direct subgroups.
    pub subgroup_ids: Vec<String>,
    /// Directly contained assets.
    pub asset_ids: Vec<String>,
}

/// Output format of rendered assets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetFormat {
    /// Raster.
    Png,
    /// Vector, PDF.
    Pdf,
    /// Vector, SVG.
    Svg,
}

/// Scale of rendered raster assets. Ignored for vector formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetScale {
    /// 1x
    X1,
    /// 2x
    X2,
    /// 3x
    X3,
    /// 4x
    X4,
}

/// One item of a render response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedAssetModel {
    /// Name of the source component.
    pub original_name: String,
    /// Short-lived download URL.
    pub url: String,
}

/// A rendered asset with its owning group.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedAsset {
    /// Asset that was rendered.
    pub asset: Asset,
    /// Group the asset belongs to.
    pub group_id: String,
    /// Download URL; expires quickly.
    pub url: String,
    /// Number of earlier rendered items with the same case-insensitive name.
    pub previous_duplicates: usize,
}
