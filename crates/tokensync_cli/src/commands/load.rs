//! Load command implementation.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tokensync_engine::{DataCore, MemoryWriter, Snapshot, SnapshotBridge, SyncConfig, TokenSyncTool};
use tokensync_model::{Brand, DesignSystemVersion};
use tracing::info;

/// Summary of a resolved definition.
#[derive(Debug, Serialize)]
pub struct LoadSummary {
    /// Definition path.
    pub path: String,
    /// Number of tokens.
    pub token_count: usize,
    /// Number of groups, roots included.
    pub group_count: usize,
    /// Resolution passes needed.
    pub passes: usize,
    /// Token count per type.
    pub tokens_by_type: BTreeMap<String, usize>,
}

/// Parses and resolves the definition at `path`.
pub fn summarize(path: &Path, brand: &Brand) -> Result<LoadSummary, Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read {}: {e}", path.display()))?;

    // Loading never reads upstream, so an empty snapshot backs the tool.
    let version = DesignSystemVersion::new("local", "local");
    let bridge = Arc::new(SnapshotBridge::new(Snapshot::default()));
    let core = Arc::new(DataCore::new(bridge, version.clone()));
    let config = SyncConfig::new(version, brand.clone());
    let tool = TokenSyncTool::new(config, core, Arc::new(MemoryWriter::new()));
    let loaded = tool.load_definition(&source)?;

    let mut tokens_by_type = BTreeMap::new();
    for token in &loaded.tokens {
        *tokens_by_type
            .entry(token.token_type.to_string())
            .or_insert(0) += 1;
    }

    Ok(LoadSummary {
        path: path.display().to_string(),
        token_count: loaded.tokens.len(),
        group_count: loaded.groups.len(),
        passes: loaded.passes,
        tokens_by_type,
    })
}

/// Runs the load command.
pub fn run(path: &Path, brand: &Brand, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let summary = summarize(path, brand)?;
    info!(tokens = summary.token_count, "definition loaded");

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&summary)?),
        _ => {
            println!("Definition: {}", summary.path);
            println!("Tokens:     {}", summary.token_count);
            println!("Groups:     {}", summary.group_count);
            println!("Passes:     {}", summary.passes);
            for (token_type, count) in &summary.tokens_by_type {
                println!("  {token_type:<12} {count}");
            }
            println!();
            println!("✓ Definition resolved");
        }
    }
    Ok(())
}
