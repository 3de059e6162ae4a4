//! # TokenSync Model
//!
//! Data model for design-token synchronization.
//!
//! This crate provides:
//! - `Token`, `TokenGroup` and the closed `TokenType` / `TokenValue` pair
//! - `ParsedNode` / `ProcessedNode` for resolution-time state
//! - `TreeDiff` change sets
//! - Component, asset, documentation and exporter models
//! - Remote (wire) models for everything fetched through the data bridge
//!
//! This is a pure model crate with no I/O operations.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod component;
mod diff;
mod documentation;
mod error;
mod exporter;
mod group;
mod node;
mod scope;
mod token;
mod token_type;
mod value;

pub use component::{
    Asset, AssetFormat, AssetGroup, AssetScale, Component, ComponentGroup,
    ComponentGroupRemoteModel, ComponentRemoteModel, ExportProperties, RemoteMeta, RenderedAsset,
    RenderedAssetModel,
};
pub use diff::{ChangeSet, DiffEntry, TreeDiff, TreeElement};
pub use documentation::{
    CustomBlock, DocumentationBlock, DocumentationBlockModel, DocumentationConfiguration,
    DocumentationGroupModel, DocumentationItem, DocumentationItemKind, DocumentationModel,
    DocumentationPageModel,
};
pub use error::{ModelError, ModelResult};
pub use exporter::{Exporter, ExporterConfigurationProperty, ExporterContributions};
pub use group::{TokenGroup, TokenGroupRemoteModel};
pub use node::{reference_target, ParsedNode, ProcessedNode};
pub use scope::{Brand, DesignSystemVersion};
pub use token::{Token, TokenRemoteModel};
pub use token_type::TokenType;
pub use value::{BorderValue, FontValue, Measure, ShadowValue, TokenValue, TypographyValue, Unit};
