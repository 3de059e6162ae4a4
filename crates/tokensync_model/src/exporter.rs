//! Exporter definitions and configuration properties.

use serde::{Deserialize, Serialize};

/// A configuration property declared by an exporter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExporterConfigurationProperty {
    /// Property key.
    pub key: String,
    /// Label shown to users.
    #[serde(default)]
    pub label: String,
    /// Declared default value.
    #[serde(default)]
    pub default: serde_json::Value,
    /// Current value: the user's value if set, the default otherwise.
    #[serde(default)]
    pub value: serde_json::Value,
}

impl ExporterConfigurationProperty {
    /// Replaces the current value with a user-provided one.
    pub fn update_value(&mut self, value: serde_json::Value) {
        self.value = value;
    }
}

/// What an exporter contributes to a design system.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExporterContributions {
    /// Declared configuration properties.
    #[serde(default)]
    pub configuration: Vec<ExporterConfigurationProperty>,
}

/// An exporter package.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Exporter {
    /// Exporter id.
    pub id: String,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// Contributions.
    #[serde(default)]
    pub contributes: ExporterContributions,
}
