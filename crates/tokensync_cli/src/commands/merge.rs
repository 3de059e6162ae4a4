//! Merge command implementation.

use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tokensync_engine::{
    BridgeWriter, DataCore, MergeOutcome, SnapshotBridge, SyncConfig, TokenSyncTool,
};
use tokensync_model::{Brand, DesignSystemVersion};
use tracing::info;

/// Counts of one change set.
#[derive(Debug, Default, Serialize, PartialEq, Eq)]
pub struct ChangeCounts {
    /// Entities to create.
    pub create: usize,
    /// Entities to update.
    pub update: usize,
    /// Entities to delete.
    pub delete: usize,
}

/// Merge result.
#[derive(Debug, Serialize)]
pub struct MergeReport {
    /// Token changes.
    pub tokens: ChangeCounts,
    /// Group changes.
    pub groups: ChangeCounts,
    /// Whether the snapshot was updated.
    pub written: bool,
}

impl From<&MergeOutcome> for MergeReport {
    fn from(outcome: &MergeOutcome) -> Self {
        let diff = &outcome.diff;
        Self {
            tokens: ChangeCounts {
                create: diff.tokens.to_create.len(),
                update: diff.tokens.to_update.len(),
                delete: diff.tokens.to_delete.len(),
            },
            groups: ChangeCounts {
                create: diff.groups.to_create.len(),
                update: diff.groups.to_update.len(),
                delete: diff.groups.to_delete.len(),
            },
            written: outcome.ack.is_some(),
        }
    }
}

/// Merges the definition at `definition` into the snapshot at `snapshot`.
///
/// With `write` the snapshot file is replaced by the merged state.
pub fn execute(
    definition: &Path,
    snapshot: &Path,
    brand: &Brand,
    write: bool,
) -> Result<MergeReport, Box<dyn std::error::Error>> {
    let source = std::fs::read_to_string(definition)
        .map_err(|e| format!("Failed to read {}: {e}", definition.display()))?;
    let stored = std::fs::read_to_string(snapshot)
        .map_err(|e| format!("Failed to read {}: {e}", snapshot.display()))?;

    let version = DesignSystemVersion::new("local", "local");
    let bridge = Arc::new(SnapshotBridge::from_json(&stored)?);
    let core = Arc::new(DataCore::new(Arc::clone(&bridge), version.clone()));
    let writer = Arc::new(BridgeWriter::new(Arc::clone(&bridge), version.clone()));
    let config = SyncConfig::new(version, brand.clone()).with_write_back(write);
    let tool = TokenSyncTool::new(config, core, writer);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let outcome = runtime.block_on(tool.sync(&source))?;

    if write {
        std::fs::write(snapshot, bridge.to_json_pretty()?)?;
        info!(path = %snapshot.display(), "snapshot updated");
    }
    Ok(MergeReport::from(&outcome))
}

/// Runs the merge command.
pub fn run(
    definition: &Path,
    snapshot: &Path,
    brand: &Brand,
    write: bool,
    format: &str,
) -> Result<(), Box<dyn std::error::Error>> {
    let report = execute(definition, snapshot, brand, write)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => {
            println!("           create  update  delete");
            print_counts("Tokens", &report.tokens);
            print_counts("Groups", &report.groups);
            println!();
            if report.written {
                println!("✓ Snapshot updated");
            } else {
                println!("✓ Merge computed (dry run)");
            }
        }
    }
    Ok(())
}

fn print_counts(label: &str, counts: &ChangeCounts) {
    println!(
        "{label:<10} {:>6}  {:>6}  {:>6}",
        counts.create, counts.update, counts.delete
    );
}
