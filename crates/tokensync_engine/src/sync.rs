//! Synchronization orchestrator.
//!
//! A run goes load, resolve, fetch, merge, sort and optionally write. The
//! current phase and cumulative statistics are observable while it runs;
//! any failure moves the tool to [`SyncPhase::Error`] and is returned as a
//! [`SyncRunError`] labeled with the phase that failed.

use crate::builder::build_group_trees;
use crate::cache::{Category, DataCore};
use crate::config::SyncConfig;
use crate::error::{EngineError, SyncPhase, SyncRunError};
use crate::loader::DefinitionLoader;
use crate::merge::TreeMerger;
use crate::resolver::ReferenceResolver;
use crate::sort::SortOrderCorrector;
use crate::transport::DataBridge;
use crate::writer::{TokenWriteRequest, TokenWriter, WriteAck};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Instant;
use tokensync_model::{ProcessedNode, Token, TokenGroup, TreeDiff};
use tracing::{debug, info, warn};

/// Statistics about synchronization runs.
#[derive(Debug, Clone, Default)]
pub struct SyncStats {
    /// Runs that reached [`SyncPhase::Synced`].
    pub runs_completed: u64,
    /// Runs that failed.
    pub runs_failed: u64,
    /// Tokens created over all runs.
    pub tokens_created: u64,
    /// Tokens updated over all runs.
    pub tokens_updated: u64,
    /// Tokens deleted over all runs.
    pub tokens_deleted: u64,
    /// Groups created over all runs.
    pub groups_created: u64,
    /// Groups updated over all runs.
    pub groups_updated: u64,
    /// Groups deleted over all runs.
    pub groups_deleted: u64,
    /// Completion time of the last successful run.
    pub last_sync_time: Option<Instant>,
    /// Message of the last failure.
    pub last_error: Option<String>,
}

/// A definition turned into tokens and groups, not yet merged.
#[derive(Debug, Clone)]
pub struct LoadedDefinition {
    /// Resolved nodes in definition order.
    pub processed_nodes: Vec<ProcessedNode>,
    /// The tokens of `processed_nodes`.
    pub tokens: Vec<Token>,
    /// Groups implied by the definition's paths.
    pub groups: Vec<TokenGroup>,
    /// Resolution passes needed.
    pub passes: usize,
}

/// Result of merging a definition with the upstream tree.
#[derive(Debug, Clone)]
pub struct MergeOutcome {
    /// Final tokens: created and updated, sort-corrected.
    pub tokens: Vec<Token>,
    /// Final groups: created and updated, sort-corrected.
    pub groups: Vec<TokenGroup>,
    /// The full diff, deletions included.
    pub diff: TreeDiff,
    /// Acknowledgement of the write, if one was made.
    pub ack: Option<WriteAck>,
}

/// Drives synchronization runs for one brand of one version.
pub struct TokenSyncTool<B: DataBridge, W: TokenWriter> {
    config: SyncConfig,
    core: Arc<DataCore<B>>,
    writer: Arc<W>,
    phase: RwLock<SyncPhase>,
    stats: RwLock<SyncStats>,
}

impl<B: DataBridge, W: TokenWriter> TokenSyncTool<B, W> {
    /// Creates a tool reading through `core` and writing with `writer`.
    pub fn new(config: SyncConfig, core: Arc<DataCore<B>>, writer: Arc<W>) -> Self {
        Self {
            config,
            core,
            writer,
            phase: RwLock::new(SyncPhase::Idle),
            stats: RwLock::new(SyncStats::default()),
        }
    }

    /// Returns the current phase.
    pub fn phase(&self) -> SyncPhase {
        *self.phase.read()
    }

    /// Returns a copy of the statistics.
    pub fn stats(&self) -> SyncStats {
        self.stats.read().clone()
    }

    /// Returns the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Returns the data core the tool reads through.
    pub fn core(&self) -> &Arc<DataCore<B>> {
        &self.core
    }

    fn set_phase(&self, phase: SyncPhase) {
        debug!(%phase, "sync phase");
        *self.phase.write() = phase;
    }

    fn fail(&self, phase: SyncPhase, error: EngineError) -> SyncRunError {
        let error = SyncRunError::new(phase, error);
        warn!(%phase, error = %error.source, "sync run failed");
        *self.phase.write() = SyncPhase::Error;
        let mut stats = self.stats.write();
        stats.runs_failed += 1;
        stats.last_error = Some(error.to_string());
        error
    }

    /// Parses and resolves `source`, building its group trees.
    pub fn load_definition(&self, source: &str) -> Result<LoadedDefinition, SyncRunError> {
        self.set_phase(SyncPhase::Loading);
        let nodes = DefinitionLoader::new()
            .load(source)
            .map_err(|e| self.fail(SyncPhase::Loading, e))?;

        self.set_phase(SyncPhase::Resolving);
        let resolution = ReferenceResolver::new(&self.config.brand)
            .resolve(nodes)
            .map_err(|e| self.fail(SyncPhase::Resolving, e))?;
        let mut processed_nodes = resolution.nodes;
        let groups = build_group_trees(&mut processed_nodes, &self.config.brand.persistent_id);
        let tokens = processed_nodes.iter().map(|n| n.token.clone()).collect();

        info!(
            tokens = processed_nodes.len(),
            groups = groups.len(),
            passes = resolution.passes,
            "definition resolved"
        );
        Ok(LoadedDefinition {
            processed_nodes,
            tokens,
            groups,
            passes: resolution.passes,
        })
    }

    /// Merges a resolved definition with the upstream tree.
    ///
    /// With `write` the diff is sent to the writer and the token categories
    /// are invalidated so the next read sees the written state.
    pub async fn merge_with_remote(
        &self,
        processed_nodes: &[ProcessedNode],
        local_groups: &[TokenGroup],
        write: bool,
    ) -> Result<MergeOutcome, SyncRunError> {
        self.set_phase(SyncPhase::Fetching);
        let view = self.core.brand(&self.config.brand);
        let upstream_tokens = view
            .tokens()
            .await
            .map_err(|e| self.fail(SyncPhase::Fetching, e))?;
        let upstream_groups = view
            .token_groups()
            .await
            .map_err(|e| self.fail(SyncPhase::Fetching, e))?;

        self.set_phase(SyncPhase::Merging);
        let mut diff = TreeMerger::new(&self.config.brand.persistent_id)
            .merge(&upstream_tokens, &upstream_groups, processed_nodes, local_groups)
            .map_err(|e| self.fail(SyncPhase::Merging, e))?;

        self.set_phase(SyncPhase::Sorting);
        SortOrderCorrector::new(self.config.sort_spacing)
            .correct_diff(&mut diff)
            .map_err(|e| self.fail(SyncPhase::Sorting, e))?;

        let ack = if write {
            self.set_phase(SyncPhase::Writing);
            let request = TokenWriteRequest::from_diff(&diff);
            let ack = if request.is_empty() {
                debug!("nothing to write");
                request.expected_ack()
            } else {
                self.writer
                    .write_tokens(&request)
                    .await
                    .map_err(|e| self.fail(SyncPhase::Writing, e))?
            };
            self.core.invalidate(Category::Tokens).await;
            self.core.invalidate(Category::TokenGroups).await;
            Some(ack)
        } else {
            None
        };

        {
            let mut stats = self.stats.write();
            stats.runs_completed += 1;
            stats.tokens_created += diff.tokens.to_create.len() as u64;
            stats.tokens_updated += diff.tokens.to_update.len() as u64;
            stats.tokens_deleted += diff.tokens.to_delete.len() as u64;
            stats.groups_created += diff.groups.to_create.len() as u64;
            stats.groups_updated += diff.groups.to_update.len() as u64;
            stats.groups_deleted += diff.groups.to_delete.len() as u64;
            stats.last_sync_time = Some(Instant::now());
            stats.last_error = None;
        }
        self.set_phase(SyncPhase::Synced);

        info!(
            created = diff.tokens.to_create.len(),
            updated = diff.tokens.to_update.len(),
            deleted = diff.tokens.to_delete.len(),
            written = ack.is_some(),
            "merge completed"
        );
        Ok(MergeOutcome {
            tokens: diff.tokens.upserts().cloned().collect(),
            groups: diff.groups.upserts().cloned().collect(),
            diff,
            ack,
        })
    }

    /// Runs a full synchronization of `source`, writing back if the
    /// configuration says so.
    pub async fn sync(&self, source: &str) -> Result<MergeOutcome, SyncRunError> {
        let loaded = self.load_definition(source)?;
        self.merge_with_remote(&loaded.processed_nodes, &loaded.groups, self.config.write_back)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{BrokenReason, BrokenReference};
    use crate::transport::{endpoints, MockBridge};
    use crate::writer::MemoryWriter;
    use serde_json::json;
    use tokensync_model::{Brand, DesignSystemVersion};

    const DEFINITION: &str = r##"{
        "Colors": {
            "red": {"value": "#FF0000", "type": "color"},
            "accent": {"value": "{Colors.red}", "type": "color"}
        }
    }"##;

    type Fixture = (
        Arc<MockBridge>,
        Arc<MemoryWriter>,
        TokenSyncTool<MockBridge, MemoryWriter>,
    );

    fn tool(write_back: bool) -> Fixture {
        let bridge = Arc::new(MockBridge::new());
        bridge.set_response(endpoints::TOKENS, json!({"tokens": []}));
        bridge.set_response(endpoints::TOKEN_GROUPS, json!({"groups": []}));
        let version = DesignSystemVersion::new("ds", "v");
        let core = Arc::new(DataCore::new(Arc::clone(&bridge), version.clone()));
        let writer = Arc::new(MemoryWriter::new());
        let config =
            SyncConfig::new(version, Brand::new("b1", "Default")).with_write_back(write_back);
        let tool = TokenSyncTool::new(config, core, Arc::clone(&writer));
        (bridge, writer, tool)
    }

    #[test]
    fn tool_initial_state() {
        let (_, _, tool) = tool(false);
        assert_eq!(tool.phase(), SyncPhase::Idle);
        let stats = tool.stats();
        assert_eq!(stats.runs_completed, 0);
        assert!(stats.last_error.is_none());
    }

    #[test]
    fn load_definition_resolves_aliases() {
        let (_, _, tool) = tool(false);
        let loaded = tool.load_definition(DEFINITION).unwrap();
        assert_eq!(loaded.tokens.len(), 2);
        assert_eq!(loaded.passes, 2);
        assert_eq!(loaded.tokens[1].alias_id.as_deref(), Some(loaded.tokens[0].id.as_str()));
        // color root plus "Colors"
        assert_eq!(loaded.groups.len(), 2);
    }

    #[tokio::test]
    async fn sync_without_write_back() {
        let (bridge, writer, tool) = tool(false);
        let outcome = tool.sync(DEFINITION).await.unwrap();

        assert_eq!(tool.phase(), SyncPhase::Synced);
        assert!(outcome.ack.is_none());
        assert_eq!(outcome.diff.tokens.to_create.len(), 2);
        assert_eq!(outcome.groups.len(), 2);
        assert!(writer.requests().is_empty());
        assert!(bridge.posts().is_empty());
        assert_eq!(tool.stats().tokens_created, 2);
    }

    #[tokio::test]
    async fn sync_with_write_back_invalidates_tokens() {
        let (bridge, writer, tool) = tool(true);
        let outcome = tool.sync(DEFINITION).await.unwrap();

        assert_eq!(outcome.ack.map(|a| a.tokens_written), Some(2));
        assert_eq!(writer.requests().len(), 1);
        assert!(!tool.core().is_synced(Category::Tokens).await);

        tool.sync(DEFINITION).await.unwrap();
        assert_eq!(bridge.fetch_count(endpoints::TOKENS), 2);
        assert_eq!(tool.stats().runs_completed, 2);
    }

    #[tokio::test]
    async fn failure_is_labeled_with_phase() {
        let (_, _, tool) = tool(false);
        let err = tool
            .sync(r#"{"a": {"value": "{missing}", "type": "color"}}"#)
            .await
            .unwrap_err();

        assert_eq!(err.phase, SyncPhase::Resolving);
        assert_eq!(
            err.source,
            EngineError::BrokenReference(vec![BrokenReference {
                path: "a".into(),
                target: "missing".into(),
                reason: BrokenReason::MissingTarget,
            }])
        );
        assert_eq!(tool.phase(), SyncPhase::Error);
        let stats = tool.stats();
        assert_eq!(stats.runs_failed, 1);
        assert!(stats.last_error.unwrap().contains("resolving"));
    }

    #[tokio::test]
    async fn fetch_failure_stops_before_merge() {
        let (bridge, writer, tool) = tool(true);
        bridge.fail_times(endpoints::TOKENS, "offline", 1);

        let err = tool.sync(DEFINITION).await.unwrap_err();
        assert_eq!(err.phase, SyncPhase::Fetching);
        assert!(writer.requests().is_empty());

        // Failures are not cached; the next run fetches again.
        tool.sync(DEFINITION).await.unwrap();
        assert_eq!(tool.phase(), SyncPhase::Synced);
        assert!(tool.stats().last_error.is_none());
    }
}
