//! Per-client request counter with a fixed window.
//!
//! The first increment in a window arms an expiry on the counter, so the
//! count restarts at 1 once the window elapses. A counter whose arming
//! failed is re-armed on its next increment. If the backend cannot be
//! reached the limiter reports 1 and lets the request through.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, warn};

use arrowbot_core::error::with_timeout;
use arrowbot_core::Capability;

use crate::backend::KvBackend;

/// Outcome of a rate-limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RateDecision {
    pub allowed: bool,
    pub count: u64,
    pub limit: u64,
}

/// Shared counter service keyed by client identifier.
#[derive(Clone)]
pub struct RateLimiter {
    backend: Option<Arc<dyn KvBackend>>,
    window: Duration,
    timeout: Duration,
    /// Counter keys with no expiry armed yet.
    unarmed: Arc<Mutex<HashSet<String>>>,
}

impl RateLimiter {
    pub fn new(backend: Option<Arc<dyn KvBackend>>, window: Duration, timeout: Duration) -> Self {
        Self {
            backend,
            window,
            timeout,
            unarmed: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn capability(&self) -> Capability {
        if self.backend.is_some() {
            Capability::Ready
        } else {
            Capability::Unconfigured
        }
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Count one request for `client_id` and return the running total for
    /// the current window.
    pub async fn increment(&self, client_id: &str) -> u64 {
        let Some(backend) = self.backend.as_ref() else {
            return 1;
        };
        let key = format!("rate_limit:{}", client_id);

        let count = match with_timeout(self.timeout, "rate limit incr", backend.incr(&key)).await {
            Ok(n) => n,
            Err(e) => {
                warn!(client_id, error = %e, "Rate limit increment failed");
                return 1;
            }
        };

        if count == 1 || self.is_unarmed(&key) {
            match with_timeout(self.timeout, "rate limit expire", backend.expire(&key, self.window))
                .await
            {
                Ok(_) => self.mark_unarmed(&key, false),
                Err(e) => {
                    warn!(client_id, error = %e, "Failed to arm rate limit window");
                    self.mark_unarmed(&key, true);
                }
            }
        }

        debug!(client_id, count, "Rate limit counter");
        count
    }

    fn is_unarmed(&self, key: &str) -> bool {
        match self.unarmed.lock() {
            Ok(set) => set.contains(key),
            Err(poisoned) => poisoned.into_inner().contains(key),
        }
    }

    fn mark_unarmed(&self, key: &str, unarmed: bool) {
        let mut set = match self.unarmed.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        if unarmed {
            set.insert(key.to_string());
        } else {
            set.remove(key);
        }
    }

    /// Count one request and decide whether it is within `limit`.
    pub async fn check(&self, client_id: &str, limit: u64) -> RateDecision {
        let count = self.increment(client_id).await;
        RateDecision {
            allowed: count <= limit,
            count,
            limit,
        }
    }
}
