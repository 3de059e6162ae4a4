//! In-memory upstream backed by a token snapshot.
//!
//! Serves the token and token group endpoints from a [`Snapshot`] and
//! applies token writes to it. The CLI loads and stores snapshots as JSON
//! files; tests use it as a source of truth that actually changes.

use crate::error::{EngineError, EngineResult};
use crate::transport::{endpoints, DataBridge};
use crate::writer::{TokenWritePayload, WriteAck};
use async_trait::async_trait;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::collections::HashSet;
use tokensync_model::{TokenGroupRemoteModel, TokenRemoteModel};
use tracing::debug;

/// Upstream token state of one version.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// All tokens.
    #[serde(default)]
    pub tokens: Vec<TokenRemoteModel>,
    /// All token groups.
    #[serde(default)]
    pub groups: Vec<TokenGroupRemoteModel>,
}

/// Data bridge over a mutable [`Snapshot`].
pub struct SnapshotBridge {
    snapshot: RwLock<Snapshot>,
    cache: bool,
}

impl SnapshotBridge {
    /// Creates a bridge serving `snapshot`.
    pub fn new(snapshot: Snapshot) -> Self {
        Self {
            snapshot: RwLock::new(snapshot),
            cache: true,
        }
    }

    /// Parses a snapshot document.
    pub fn from_json(source: &str) -> EngineResult<Self> {
        let snapshot =
            serde_json::from_str(source).map_err(|e| EngineError::decode("snapshot", e))?;
        Ok(Self::new(snapshot))
    }

    /// Sets whether the session may cache fetched categories.
    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    /// Current state.
    pub fn snapshot(&self) -> Snapshot {
        self.snapshot.read().clone()
    }

    /// Current state as pretty-printed JSON.
    pub fn to_json_pretty(&self) -> EngineResult<String> {
        serde_json::to_string_pretty(&*self.snapshot.read())
            .map_err(|e| EngineError::decode("snapshot", e))
    }

    fn apply(&self, payload: TokenWritePayload) -> WriteAck {
        let mut snapshot = self.snapshot.write();
        let ack = WriteAck {
            tokens_written: payload.tokens.len(),
            groups_written: payload.groups.len(),
            tokens_deleted: payload.deleted_token_ids.len(),
            groups_deleted: payload.deleted_group_ids.len(),
        };

        for token in payload.tokens {
            match snapshot.tokens.iter_mut().find(|t| t.id == token.id) {
                Some(existing) => *existing = token,
                None => snapshot.tokens.push(token),
            }
        }
        for group in payload.groups {
            match snapshot.groups.iter_mut().find(|g| g.id == group.id) {
                Some(existing) => *existing = group,
                None => snapshot.groups.push(group),
            }
        }

        let deleted_tokens: HashSet<String> = payload.deleted_token_ids.into_iter().collect();
        let deleted_groups: HashSet<String> = payload.deleted_group_ids.into_iter().collect();
        snapshot.tokens.retain(|t| !deleted_tokens.contains(&t.id));
        snapshot.groups.retain(|g| !deleted_groups.contains(&g.id));

        debug!(
            tokens = snapshot.tokens.len(),
            groups = snapshot.groups.len(),
            "applied write to snapshot"
        );
        ack
    }
}

#[async_trait]
impl DataBridge for SnapshotBridge {
    async fn fetch_category(
        &self,
        _design_system_id: &str,
        _version_id: &str,
        endpoint: &str,
    ) -> EngineResult<Value> {
        let snapshot = self.snapshot.read();
        match endpoint {
            endpoints::TOKENS => Ok(json!({ "tokens": snapshot.tokens })),
            endpoints::TOKEN_GROUPS => Ok(json!({ "groups": snapshot.groups })),
            other => Err(EngineError::transport(format!(
                "snapshot does not serve {other}"
            ))),
        }
    }

    async fn post_category(
        &self,
        _design_system_id: &str,
        _version_id: &str,
        endpoint: &str,
        body: Value,
    ) -> EngineResult<Value> {
        if endpoint != endpoints::WRITE_TOKENS {
            return Err(EngineError::transport(format!(
                "snapshot does not accept {endpoint}"
            )));
        }
        let payload: TokenWritePayload =
            serde_json::from_value(body).map_err(|e| EngineError::decode(endpoint, e))?;
        let ack = self.apply(payload);
        serde_json::to_value(ack).map_err(|e| EngineError::decode(endpoint, e))
    }

    fn cache_enabled(&self) -> bool {
        self.cache
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn writes_upsert_and_delete() {
        let bridge = SnapshotBridge::from_json(
            r##"{
                "tokens": [
                    {"id": "t1", "persistentId": "p1", "brandId": "b1", "tokenType": "color",
                     "name": "red", "value": "#FE0000"},
                    {"id": "t2", "persistentId": "p2", "brandId": "b1", "tokenType": "color",
                     "name": "old", "value": "#000000"}
                ]
            }"##,
        )
        .unwrap();

        let body = json!({
            "tokens": [
                {"id": "t1", "persistentId": "p1", "brandId": "b1", "tokenType": "color",
                 "name": "red", "value": "#FF0000"},
                {"id": "t3", "persistentId": "p3", "brandId": "b1", "tokenType": "color",
                 "name": "blue", "value": "#0000FF"}
            ],
            "groups": [],
            "deletedTokenIds": ["t2"]
        });
        let ack = bridge
            .post_category("ds", "v", endpoints::WRITE_TOKENS, body)
            .await
            .unwrap();
        assert_eq!(ack["tokensWritten"], json!(2));
        assert_eq!(ack["tokensDeleted"], json!(1));

        let snapshot = bridge.snapshot();
        let ids: Vec<&str> = snapshot.tokens.iter().map(|t| t.id.as_str()).collect();
        assert_eq!(ids, vec!["t1", "t3"]);
        assert_eq!(snapshot.tokens[0].value, json!("#FF0000"));
    }

    #[tokio::test]
    async fn only_token_endpoints_are_served() {
        let bridge = SnapshotBridge::new(Snapshot::default());
        let payload = bridge
            .fetch_category("ds", "v", endpoints::TOKEN_GROUPS)
            .await
            .unwrap();
        assert_eq!(payload, json!({"groups": []}));
        assert!(bridge
            .fetch_category("ds", "v", endpoints::COMPONENTS)
            .await
            .is_err());
    }
}
