//! HTTP data bridge.
//!
//! The actual HTTP client is abstracted via a trait so any library (reqwest,
//! hyper, a test double) can carry the bytes. The bridge only builds URLs
//! and decodes JSON.

use crate::error::{EngineError, EngineResult};
use crate::transport::DataBridge;
use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

/// HTTP client abstraction.
#[async_trait]
pub trait HttpClient: Send + Sync {
    /// Sends a GET request and returns the response body.
    async fn get(&self, url: &str) -> Result<Vec<u8>, String>;

    /// Sends a POST request with a JSON body and returns the response body.
    async fn post(&self, url: &str, body: Vec<u8>) -> Result<Vec<u8>, String>;
}

/// HTTP-based data bridge.
///
/// Requests go to `{base}/design-systems/{ds}/versions/{version}/{endpoint}`.
/// Responses wrapped in a `{"result": …}` envelope are unwrapped.
pub struct HttpBridge<C: HttpClient> {
    base_url: String,
    client: C,
    cache: bool,
    last_error: RwLock<Option<String>>,
}

impl<C: HttpClient> HttpBridge<C> {
    /// Creates a new HTTP bridge with caching enabled.
    pub fn new(base_url: impl Into<String>, client: C) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
            cache: true,
            last_error: RwLock::new(None),
        }
    }

    /// Sets whether the session may cache fetched categories.
    pub fn with_cache(mut self, cache: bool) -> Self {
        self.cache = cache;
        self
    }

    /// Returns the base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Returns the last error message.
    pub fn last_error(&self) -> Option<String> {
        self.last_error.read().clone()
    }

    /// Builds the URL of `endpoint` for a version.
    pub fn endpoint_url(&self, design_system_id: &str, version_id: &str, endpoint: &str) -> String {
        format!(
            "{}/design-systems/{}/versions/{}/{}",
            self.base_url,
            design_system_id,
            version_id,
            endpoint.trim_start_matches('/')
        )
    }

    fn decode(&self, endpoint: &str, bytes: &[u8]) -> EngineResult<serde_json::Value> {
        let mut value: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| EngineError::decode(endpoint, e))?;
        if let Some(result) = value.get_mut("result") {
            return Ok(result.take());
        }
        Ok(value)
    }

    fn record<T>(&self, result: Result<T, String>) -> EngineResult<T> {
        match result {
            Ok(value) => {
                *self.last_error.write() = None;
                Ok(value)
            }
            Err(message) => {
                *self.last_error.write() = Some(message.clone());
                Err(EngineError::transport(message))
            }
        }
    }
}

#[async_trait]
impl<C: HttpClient> DataBridge for HttpBridge<C> {
    async fn fetch_category(
        &self,
        design_system_id: &str,
        version_id: &str,
        endpoint: &str,
    ) -> EngineResult<serde_json::Value> {
        let url = self.endpoint_url(design_system_id, version_id, endpoint);
        debug!(%url, "GET");
        let bytes = self.record(self.client.get(&url).await)?;
        self.decode(endpoint, &bytes)
    }

    async fn post_category(
        &self,
        design_system_id: &str,
        version_id: &str,
        endpoint: &str,
        body: serde_json::Value,
    ) -> EngineResult<serde_json::Value> {
        let url = self.endpoint_url(design_system_id, version_id, endpoint);
        debug!(%url, "POST");
        let body = serde_json::to_vec(&body).map_err(|e| EngineError::decode(endpoint, e))?;
        let bytes = self.record(self.client.post(&url, body).await)?;
        self.decode(endpoint, &bytes)
    }

    fn cache_enabled(&self) -> bool {
        self.cache
    }
}
