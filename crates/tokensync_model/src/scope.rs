//! Design system version and brand identifiers.

use serde::{Deserialize, Serialize};

/// A versioned snapshot of a design system.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DesignSystemVersion {
    /// Owning design system.
    pub design_system_id: String,
    /// Version id.
    pub version_id: String,
}

impl DesignSystemVersion {
    /// Creates a version reference.
    pub fn new(design_system_id: impl Into<String>, version_id: impl Into<String>) -> Self {
        Self {
            design_system_id: design_system_id.into(),
            version_id: version_id.into(),
        }
    }
}

/// A named partition of a version's content.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Brand {
    /// Version-scoped id.
    pub id: String,
    /// Stable id; content refers to brands by this id.
    pub persistent_id: String,
    /// Display name.
    pub name: String,
}

impl Brand {
    /// Creates a brand whose version id equals its persistent id.
    pub fn new(persistent_id: impl Into<String>, name: impl Into<String>) -> Self {
        let persistent_id = persistent_id.into();
        Self {
            id: persistent_id.clone(),
            persistent_id,
            name: name.into(),
        }
    }
}
