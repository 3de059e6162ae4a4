//! # TokenSync Engine
//!
//! Design token resolution and tree synchronization.
//!
//! This crate provides:
//! - A read-through, single-flight cache over a design system version
//! - Brand-scoped views of the cached categories
//! - A loader and reference resolver for external token definitions
//! - A tree merge producing create/update/delete sets against upstream
//! - Sort order correction over every type root
//! - A sync orchestrator with observable phases and write-back
//!
//! ## Architecture
//!
//! Synchronization is **local-definition-authoritative**:
//! 1. Load and resolve the definition into tokens and groups
//! 2. Read the upstream tree through the cache
//! 3. Merge, keeping upstream ids for everything that matches
//! 4. Renumber sort orders and optionally write the diff back
//!
//! ## Key Invariants
//!
//! - At most one fetch per category is in flight at a time
//! - A failed fetch is never cached
//! - Matched upstream entities keep their ids
//! - Create, update and delete sets are disjoint

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod brand;
mod builder;
mod cache;
mod config;
mod error;
mod http;
mod loader;
mod merge;
mod resolver;
mod snapshot;
mod sort;
mod sync;
mod transport;
mod upstream;
mod writer;

pub use brand::BrandView;
pub use builder::build_group_trees;
pub use cache::{Category, DataCore};
pub use config::SyncConfig;
pub use error::{
    BrokenReason, BrokenReference, EngineError, EngineResult, SyncPhase, SyncRunError,
};
pub use http::{HttpBridge, HttpClient};
pub use loader::DefinitionLoader;
pub use merge::TreeMerger;
pub use resolver::{parse_literal, token_type_for, ReferenceResolver, Resolution};
pub use snapshot::{Snapshot, SnapshotBridge};
pub use sort::{SortOrderCorrector, SORT_ORDER_SPACING};
pub use sync::{LoadedDefinition, MergeOutcome, SyncStats, TokenSyncTool};
pub use transport::{endpoints, DataBridge, MockBridge};
pub use upstream::{
    resolve_component_groups, resolve_components_and_assets, resolve_documentation_items,
    resolve_token_groups, resolve_tokens, ComponentAndAssetGroups, ComponentsAndAssets,
};
pub use writer::{
    BridgeWriter, MemoryWriter, TokenWritePayload, TokenWriteRequest, TokenWriter, WriteAck,
};
