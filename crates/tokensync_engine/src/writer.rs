//! Write-back of computed diffs.

use crate::error::{EngineError, EngineResult};
use crate::transport::{endpoints, DataBridge};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokensync_model::{
    DesignSystemVersion, Token, TokenGroup, TokenGroupRemoteModel, TokenRemoteModel, TreeDiff,
};
use tracing::debug;

/// Everything a write applies.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TokenWriteRequest {
    /// Tokens to create or update.
    pub tokens: Vec<Token>,
    /// Groups to create or update, with their final child lists.
    pub groups: Vec<TokenGroup>,
    /// Ids of tokens to delete.
    pub deleted_token_ids: Vec<String>,
    /// Ids of groups to delete.
    pub deleted_group_ids: Vec<String>,
}

impl TokenWriteRequest {
    /// Builds the request applying `diff`.
    pub fn from_diff(diff: &TreeDiff) -> Self {
        Self {
            tokens: diff.tokens.upserts().cloned().collect(),
            groups: diff.groups.upserts().cloned().collect(),
            deleted_token_ids: diff.tokens.to_delete.iter().map(|t| t.id.clone()).collect(),
            deleted_group_ids: diff.groups.to_delete.iter().map(|g| g.id.clone()).collect(),
        }
    }

    /// Returns true if the request changes nothing.
    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
            && self.groups.is_empty()
            && self.deleted_token_ids.is_empty()
            && self.deleted_group_ids.is_empty()
    }

    /// The acknowledgement a complete write produces.
    pub fn expected_ack(&self) -> WriteAck {
        WriteAck {
            tokens_written: self.tokens.len(),
            groups_written: self.groups.len(),
            tokens_deleted: self.deleted_token_ids.len(),
            groups_deleted: self.deleted_group_ids.len(),
        }
    }
}

/// Counts acknowledged by the writer.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct WriteAck {
    /// Tokens created or updated.
    pub tokens_written: usize,
    /// Groups created or updated.
    pub groups_written: usize,
    /// Tokens deleted.
    pub tokens_deleted: usize,
    /// Groups deleted.
    pub groups_deleted: usize,
}

impl WriteAck {
    /// Returns the first `(expected, received)` count pair that differs.
    pub fn first_difference(&self, received: &WriteAck) -> Option<(usize, usize)> {
        [
            (self.tokens_written, received.tokens_written),
            (self.groups_written, received.groups_written),
            (self.tokens_deleted, received.tokens_deleted),
            (self.groups_deleted, received.groups_deleted),
        ]
        .into_iter()
        .find(|(expected, received)| expected != received)
    }
}

/// Wire body of a token write.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenWritePayload {
    /// Upserted tokens.
    pub tokens: Vec<TokenRemoteModel>,
    /// Upserted groups.
    pub groups: Vec<TokenGroupRemoteModel>,
    /// Deleted token ids.
    #[serde(default)]
    pub deleted_token_ids: Vec<String>,
    /// Deleted group ids.
    #[serde(default)]
    pub deleted_group_ids: Vec<String>,
}

impl From<&TokenWriteRequest> for TokenWritePayload {
    fn from(request: &TokenWriteRequest) -> Self {
        Self {
            tokens: request.tokens.iter().map(TokenRemoteModel::from).collect(),
            groups: request.groups.iter().map(TokenGroupRemoteModel::from).collect(),
            deleted_token_ids: request.deleted_token_ids.clone(),
            deleted_group_ids: request.deleted_group_ids.clone(),
        }
    }
}

/// Applies write requests to the source of truth.
#[async_trait]
pub trait TokenWriter: Send + Sync {
    /// Writes `request` and returns what was applied.
    async fn write_tokens(&self, request: &TokenWriteRequest) -> EngineResult<WriteAck>;
}

/// Writer posting to the bridge's token write endpoint.
pub struct BridgeWriter<B: DataBridge> {
    bridge: Arc<B>,
    version: DesignSystemVersion,
}

impl<B: DataBridge> BridgeWriter<B> {
    /// Creates a writer for `version`.
    pub fn new(bridge: Arc<B>, version: DesignSystemVersion) -> Self {
        Self { bridge, version }
    }
}

#[async_trait]
impl<B: DataBridge> TokenWriter for BridgeWriter<B> {
    async fn write_tokens(&self, request: &TokenWriteRequest) -> EngineResult<WriteAck> {
        let body = serde_json::to_value(TokenWritePayload::from(request))
            .map_err(|e| EngineError::decode(endpoints::WRITE_TOKENS, e))?;
        debug!(
            tokens = request.tokens.len(),
            groups = request.groups.len(),
            "writing tokens"
        );
        let response = self
            .bridge
            .post_category(
                &self.version.design_system_id,
                &self.version.version_id,
                endpoints::WRITE_TOKENS,
                body,
            )
            .await?;
        let ack: WriteAck = serde_json::from_value(response)
            .map_err(|e| EngineError::decode(endpoints::WRITE_TOKENS, e))?;

        if let Some((requested, received)) = request.expected_ack().first_difference(&ack) {
            return Err(EngineError::CountMismatch {
                requested,
                received,
            });
        }
        Ok(ack)
    }
}

/// Writer that records requests in memory.
#[derive(Debug, Default)]
pub struct MemoryWriter {
    requests: Mutex<Vec<TokenWriteRequest>>,
}

impl MemoryWriter {
    /// Creates an empty writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// All requests written so far.
    pub fn requests(&self) -> Vec<TokenWriteRequest> {
        self.requests.lock().clone()
    }
}

#[async_trait]
impl TokenWriter for MemoryWriter {
    async fn write_tokens(&self, request: &TokenWriteRequest) -> EngineResult<WriteAck> {
        self.requests.lock().push(request.clone());
        Ok(request.expected_ack())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::MockBridge;
    use serde_json::json;
    use tokensync_model::TokenType;

    fn request() -> TokenWriteRequest {
        let mut diff = TreeDiff::default();
        diff.groups
            .to_create
            .push(TokenGroup::root("root", TokenType::Color, "b1"));
        diff.groups
            .to_delete
            .push(TokenGroup::new("old", "Old", TokenType::Color, "b1"));
        TokenWriteRequest::from_diff(&diff)
    }

    #[test]
    fn request_from_diff() {
        let request = request();
        assert_eq!(request.groups.len(), 1);
        assert_eq!(request.deleted_group_ids, vec!["old"]);
        assert!(!request.is_empty());
        assert!(TokenWriteRequest::default().is_empty());
    }

    #[tokio::test]
    async fn bridge_writer_posts_payload() {
        let bridge = Arc::new(MockBridge::new());
        bridge.set_post_response(
            endpoints::WRITE_TOKENS,
            json!({"tokensWritten": 0, "groupsWritten": 1, "tokensDeleted": 0, "groupsDeleted": 1}),
        );
        let writer = BridgeWriter::new(Arc::clone(&bridge), DesignSystemVersion::new("ds", "v"));

        let ack = writer.write_tokens(&request()).await.unwrap();
        assert_eq!(ack.groups_written, 1);

        let posts = bridge.posts();
        assert_eq!(posts[0].0, endpoints::WRITE_TOKENS);
        assert_eq!(posts[0].1["deletedGroupIds"], json!(["old"]));
        assert_eq!(posts[0].1["groups"][0]["isRoot"], json!(true));
    }

    #[tokio::test]
    async fn short_acknowledgement_is_count_mismatch() {
        let bridge = Arc::new(MockBridge::new());
        bridge.set_post_response(endpoints::WRITE_TOKENS, json!({"groupsWritten": 0}));
        let writer = BridgeWriter::new(bridge, DesignSystemVersion::new("ds", "v"));

        let err = writer.write_tokens(&request()).await.unwrap_err();
        assert_eq!(
            err,
            EngineError::CountMismatch {
                requested: 1,
                received: 0
            }
        );
    }

    #[tokio::test]
    async fn swapped_or_missing_deletion_counts_are_mismatches() {
        let bridge = Arc::new(MockBridge::new());
        let writer = BridgeWriter::new(Arc::clone(&bridge), DesignSystemVersion::new("ds", "v"));

        // Totals agree but tokens and groups are swapped.
        bridge.set_post_response(
            endpoints::WRITE_TOKENS,
            json!({"tokensWritten": 1, "groupsWritten": 0, "groupsDeleted": 1}),
        );
        assert_eq!(
            writer.write_tokens(&request()).await.unwrap_err(),
            EngineError::CountMismatch {
                requested: 0,
                received: 1
            }
        );

        // Upserts acknowledged, deletion skipped.
        bridge.set_post_response(endpoints::WRITE_TOKENS, json!({"groupsWritten": 1}));
        assert_eq!(
            writer.write_tokens(&request()).await.unwrap_err(),
            EngineError::CountMismatch {
                requested: 1,
                received: 0
            }
        );
    }

    #[test]
    fn matching_ack_has_no_difference() {
        let expected = request().expected_ack();
        assert_eq!(expected.first_difference(&expected), None);
    }

    #[tokio::test]
    async fn memory_writer_records() {
        let writer = MemoryWriter::new();
        writer.write_tokens(&request()).await.unwrap();
        assert_eq!(writer.requests().len(), 1);
    }
}
