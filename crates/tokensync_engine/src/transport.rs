//! Data bridge abstraction for fetching and posting category payloads.

use crate::error::{EngineError, EngineResult};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Endpoint paths, relative to a design system version.
pub mod endpoints {
    /// All tokens of the version.
    pub const TOKENS: &str = "tokens";
    /// All token groups of the version.
    pub const TOKEN_GROUPS: &str = "token-groups";
    /// All components; assets are derived from them.
    pub const COMPONENTS: &str = "components";
    /// All component groups; asset groups are derived from them.
    pub const COMPONENT_GROUPS: &str = "component-groups";
    /// Documentation settings.
    pub const DOCUMENTATION: &str = "documentation";
    /// Exporter-provided custom blocks.
    pub const CUSTOM_BLOCKS: &str = "documentation/custom-blocks";
    /// Documentation pages and groups.
    pub const DOCUMENTATION_ITEMS: &str = "documentation/all";
    /// Asset rendering.
    pub const RENDER_ASSETS: &str = "components/assets/download-list";
    /// Token write-back.
    pub const WRITE_TOKENS: &str = "tokens/write";

    /// Exporter definition.
    pub fn exporter(exporter_id: &str) -> String {
        format!("exporters/{exporter_id}")
    }

    /// User values of an exporter's configuration properties.
    pub fn exporter_properties(exporter_id: &str) -> String {
        format!("exporter-properties/{exporter_id}")
    }
}

/// A data bridge performs raw fetch and post calls for category payloads.
///
/// This trait abstracts the network layer so the cache never sees HTTP,
/// retries or authentication.
#[async_trait]
pub trait DataBridge: Send + Sync {
    /// Fetches the payload of `endpoint` for a design system version.
    async fn fetch_category(
        &self,
        design_system_id: &str,
        version_id: &str,
        endpoint: &str,
    ) -> EngineResult<serde_json::Value>;

    /// Posts `body` to `endpoint` and returns the response payload.
    async fn post_category(
        &self,
        design_system_id: &str,
        version_id: &str,
        endpoint: &str,
        body: serde_json::Value,
    ) -> EngineResult<serde_json::Value>;

    /// Whether fetched categories may be kept for the rest of the session.
    fn cache_enabled(&self) -> bool;
}

struct Failure {
    message: String,
    remaining: usize,
}

/// A mock bridge for testing.
///
/// Serves canned payloads per endpoint, counts fetches, records posts and
/// can fail a given number of times per endpoint.
pub struct MockBridge {
    cache: AtomicBool,
    latency_yields: AtomicUsize,
    responses: Mutex<HashMap<String, serde_json::Value>>,
    post_responses: Mutex<HashMap<String, serde_json::Value>>,
    failures: Mutex<HashMap<String, Failure>>,
    fetch_counts: Mutex<HashMap<String, usize>>,
    posts: Mutex<Vec<(String, serde_json::Value)>>,
}

impl MockBridge {
    /// Creates a mock bridge with caching enabled.
    pub fn new() -> Self {
        Self {
            cache: AtomicBool::new(true),
            latency_yields: AtomicUsize::new(0),
            responses: Mutex::new(HashMap::new()),
            post_responses: Mutex::new(HashMap::new()),
            failures: Mutex::new(HashMap::new()),
            fetch_counts: Mutex::new(HashMap::new()),
            posts: Mutex::new(Vec::new()),
        }
    }

    /// Sets the payload returned for `endpoint`.
    pub fn set_response(&self, endpoint: &str, payload: serde_json::Value) {
        self.responses.lock().insert(endpoint.to_string(), payload);
    }

    /// Sets the payload returned when posting to `endpoint`.
    pub fn set_post_response(&self, endpoint: &str, payload: serde_json::Value) {
        self.post_responses
            .lock()
            .insert(endpoint.to_string(), payload);
    }

    /// Makes the next `times` calls to `endpoint` fail.
    pub fn fail_times(&self, endpoint: &str, message: &str, times: usize) {
        self.failures.lock().insert(
            endpoint.to_string(),
            Failure {
                message: message.to_string(),
                remaining: times,
            },
        );
    }

    /// Sets the session cache flag.
    pub fn set_cache_enabled(&self, enabled: bool) {
        self.cache.store(enabled, Ordering::SeqCst);
    }

    /// Number of times each call yields to the scheduler before answering.
    pub fn set_latency_yields(&self, yields: usize) {
        self.latency_yields.store(yields, Ordering::SeqCst);
    }

    /// Number of fetches made for `endpoint`, failed ones included.
    pub fn fetch_count(&self, endpoint: &str) -> usize {
        self.fetch_counts.lock().get(endpoint).copied().unwrap_or(0)
    }

    /// All posts made so far.
    pub fn posts(&self) -> Vec<(String, serde_json::Value)> {
        self.posts.lock().clone()
    }

    async fn simulate_latency(&self) {
        for _ in 0..self.latency_yields.load(Ordering::SeqCst) {
            tokio::task::yield_now().await;
        }
    }

    fn take_failure(&self, endpoint: &str) -> Option<EngineError> {
        let mut failures = self.failures.lock();
        let failure = failures.get_mut(endpoint)?;
        if failure.remaining == 0 {
            return None;
        }
        failure.remaining -= 1;
        Some(EngineError::transport(failure.message.clone()))
    }
}

impl Default for MockBridge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DataBridge for MockBridge {
    async fn fetch_category(
        &self,
        _design_system_id: &str,
        _version_id: &str,
        endpoint: &str,
    ) -> EngineResult<serde_json::Value> {
        *self
            .fetch_counts
            .lock()
            .entry(endpoint.to_string())
            .or_insert(0) += 1;
        self.simulate_latency().await;

        if let Some(err) = self.take_failure(endpoint) {
            return Err(err);
        }
        self.responses
            .lock()
            .get(endpoint)
            .cloned()
            .ok_or_else(|| EngineError::transport(format!("no mock response for {endpoint}")))
    }

    async fn post_category(
        &self,
        _design_system_id: &str,
        _version_id: &str,
        endpoint: &str,
        body: serde_json::Value,
    ) -> EngineResult<serde_json::Value> {
        self.posts.lock().push((endpoint.to_string(), body));
        self.simulate_latency().await;

        if let Some(err) = self.take_failure(endpoint) {
            return Err(err);
        }
        self.post_responses
            .lock()
            .get(endpoint)
            .cloned()
            .ok_or_else(|| EngineError::transport(format!("no mock post response for {endpoint}")))
    }

    fn cache_enabled(&self) -> bool {
        self.cache.load(Ordering::SeqCst)
    }
}
