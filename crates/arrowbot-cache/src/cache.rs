//! Response cache with expiry.
//!
//! Values are serialized to JSON before being handed to the backend. Any
//! backend error, timeout, or undecodable payload is logged and reported as
//! a miss; writes that fail return `false`.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info, warn};

use arrowbot_core::config::CacheConfig;
use arrowbot_core::error::with_timeout;
use arrowbot_core::Capability;

use crate::backend::KvBackend;

/// Key/value cache used to skip regenerating answers.
pub struct ResponseCache {
    backend: Option<Arc<dyn KvBackend>>,
    capability: Capability,
    timeout: Duration,
    session_ttl: Duration,
}

impl ResponseCache {
    /// Build the cache, probing the backend once to compute its capability.
    pub async fn connect(backend: Option<Arc<dyn KvBackend>>, config: &CacheConfig) -> Self {
        let timeout = Duration::from_millis(config.timeout_ms);
        let backend = backend.filter(|_| config.enabled);

        let capability = match &backend {
            None => Capability::Unconfigured,
            Some(b) => match with_timeout(timeout, "cache ping", b.ping()).await {
                Ok(()) => Capability::Ready,
                Err(e) => {
                    warn!(error = %e, "Cache backend unreachable; caching degraded");
                    Capability::Degraded
                }
            },
        };
        info!(capability = %capability, "Response cache initialized");

        Self {
            backend,
            capability,
            timeout,
            session_ttl: Duration::from_secs(config.session_ttl_secs),
        }
    }

    /// A cache with no backend: every read misses, every write is a no-op.
    pub fn disabled() -> Self {
        Self {
            backend: None,
            capability: Capability::Unconfigured,
            timeout: Duration::from_millis(CacheConfig::default().timeout_ms),
            session_ttl: Duration::from_secs(CacheConfig::default().session_ttl_secs),
        }
    }

    pub fn capability(&self) -> Capability {
        self.capability
    }

    /// Fetch and decode a cached value. Expired entries read as `None`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let backend = self.backend.as_ref()?;

        let raw = match with_timeout(self.timeout, "cache get", backend.get(key)).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!(key, "Cache miss");
                return None;
            }
            Err(e) => {
                warn!(key, error = %e, "Cache get failed");
                return None;
            }
        };

        match serde_json::from_str(&raw) {
            Ok(value) => {
                debug!(key, "Cache hit");
                Some(value)
            }
            Err(e) => {
                warn!(key, error = %e, "Discarding undecodable cache entry");
                None
            }
        }
    }

    /// Store a value for `ttl`. Returns whether the write happened.
    pub async fn set<T: Serialize + ?Sized>(&self, key: &str, value: &T, ttl: Duration) -> bool {
        let Some(backend) = self.backend.as_ref() else {
            return false;
        };

        let raw = match serde_json::to_string(value) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(key, error = %e, "Cache value not serializable");
                return false;
            }
        };

        match with_timeout(self.timeout, "cache set", backend.set_ex(key, raw, ttl)).await {
            Ok(()) => true,
            Err(e) => {
                warn!(key, error = %e, "Cache set failed");
                false
            }
        }
    }

    /// Per-session scratch data stored under `session:{id}`.
    pub async fn get_session_data(&self, session_id: &str) -> Option<serde_json::Value> {
        self.get(&session_key(session_id)).await
    }

    /// Store per-session data; `ttl` defaults to the configured session TTL.
    pub async fn set_session_data(
        &self,
        session_id: &str,
        data: &serde_json::Value,
        ttl: Option<Duration>,
    ) -> bool {
        let ttl = ttl.unwrap_or(self.session_ttl);
        self.set(&session_key(session_id), data, ttl).await
    }
}

fn session_key(session_id: &str) -> String {
    format!("session:{}", session_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MemoryBackend;
    use arrowbot_core::error::{ArrowError, Result};
    use async_trait::async_trait;
    use serde::Deserialize;

    /// Backend whose every call fails, as if the server were down.
    struct DownBackend;

    #[async_trait]
    impl KvBackend for DownBackend {
        async fn ping(&self) -> Result<()> {
            Err(ArrowError::Cache("connection refused".into()))
        }
        async fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(ArrowError::Cache("connection refused".into()))
        }
        async fn set_ex(&self, _key: &str, _value: String, _ttl: Duration) -> Result<()> {
            Err(ArrowError::Cache("connection refused".into()))
        }
        async fn incr(&self, _key: &str) -> Result<u64> {
            Err(ArrowError::Cache("connection refused".into()))
        }
        async fn expire(&self, _key: &str, _ttl: Duration) -> Result<bool> {
            Err(ArrowError::Cache("connection refused".into()))
        }
    }

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Reply {
        response: String,
    }

    async fn memory_cache() -> ResponseCache {
        ResponseCache::connect(Some(Arc::new(MemoryBackend::new())), &CacheConfig::default()).await
    }

    #[tokio::test]
    async fn test_ready_capability() {
        let cache = memory_cache().await;
        assert_eq!(cache.capability(), Capability::Ready);
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let cache = memory_cache().await;
        let reply = Reply {
            response: "hello".into(),
        };
        assert!(cache.set("response:x", &reply, Duration::from_secs(60)).await);
        let got: Option<Reply> = cache.get("response:x").await;
        assert_eq!(got, Some(reply));
    }

    #[tokio::test]
    async fn test_get_after_ttl_is_absent() {
        let cache = memory_cache().await;
        assert!(cache.set("k", "v", Duration::from_millis(20)).await);
        tokio::time::sleep(Duration::from_millis(60)).await;
        let got: Option<String> = cache.get("k").await;
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn test_wrong_shape_reads_as_miss() {
        let cache = memory_cache().await;
        assert!(cache.set("k", &42u32, Duration::from_secs(60)).await);
        let got: Option<Reply> = cache.get("k").await;
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn test_unreachable_backend_degrades() {
        let cache =
            ResponseCache::connect(Some(Arc::new(DownBackend)), &CacheConfig::default()).await;
        assert_eq!(cache.capability(), Capability::Degraded);
        assert!(!cache.set("k", "v", Duration::from_secs(60)).await);
        let got: Option<String> = cache.get("k").await;
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn test_disabled_cache_is_noop() {
        let cache = ResponseCache::disabled();
        assert_eq!(cache.capability(), Capability::Unconfigured);
        assert!(!cache.set("k", "v", Duration::from_secs(60)).await);
        let got: Option<String> = cache.get("k").await;
        assert!(got.is_none());
    }

    #[tokio::test]
    async fn test_config_disabled_ignores_backend() {
        let config = CacheConfig {
            enabled: false,
            ..CacheConfig::default()
        };
        let cache = ResponseCache::connect(Some(Arc::new(MemoryBackend::new())), &config).await;
        assert_eq!(cache.capability(), Capability::Unconfigured);
    }

    #[tokio::test]
    async fn test_session_data_roundtrip() {
        let cache = memory_cache().await;
        let data = serde_json::json!({"name": "Sam", "turns": 3});
        assert!(cache.set_session_data("abc", &data, None).await);
        assert_eq!(cache.get_session_data("abc").await, Some(data));
        assert!(cache.get_session_data("other").await.is_none());
    }
}
