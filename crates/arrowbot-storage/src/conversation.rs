//! Best-effort conversation persistence.
//!
//! Every failure is logged and reported as `false` or an empty list. The
//! chat path never waits longer than the configured timeout on storage.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use arrowbot_core::error::with_timeout;
use arrowbot_core::{Capability, Exchange, FeedbackRecord};

use crate::exchange_log::ExchangeLog;

pub struct ConversationStore {
    log: Option<Arc<dyn ExchangeLog>>,
    timeout: Duration,
}

impl ConversationStore {
    pub fn new(log: Option<Arc<dyn ExchangeLog>>, timeout: Duration) -> Self {
        if log.is_some() {
            info!("Conversation store connected");
        } else {
            warn!("No conversation database configured; exchanges will not be persisted");
        }
        Self { log, timeout }
    }

    /// A store with no backing log.
    pub fn unconfigured() -> Self {
        Self::new(None, Duration::from_secs(2))
    }

    pub fn capability(&self) -> Capability {
        if self.log.is_some() {
            Capability::Ready
        } else {
            Capability::Unconfigured
        }
    }

    pub async fn append_exchange(&self, exchange: &Exchange) -> bool {
        let Some(log) = self.log.as_ref() else {
            return false;
        };
        match with_timeout(self.timeout, "save exchange", log.append_exchange(exchange)).await {
            Ok(()) => {
                debug!(id = %exchange.id, session_id = %exchange.session_id, "Exchange saved");
                true
            }
            Err(e) => {
                warn!(error = %e, "Failed to save conversation");
                false
            }
        }
    }

    /// Most recent first. Without a session id the most recent exchanges
    /// across all sessions are returned.
    pub async fn list_exchanges(&self, session_id: Option<&str>, limit: usize) -> Vec<Exchange> {
        let Some(log) = self.log.as_ref() else {
            return Vec::new();
        };
        match with_timeout(
            self.timeout,
            "list exchanges",
            log.list_exchanges(session_id, limit),
        )
        .await
        {
            Ok(exchanges) => exchanges,
            Err(e) => {
                warn!(error = %e, "Failed to get history");
                Vec::new()
            }
        }
    }

    pub async fn append_feedback(&self, record: &FeedbackRecord) -> bool {
        let Some(log) = self.log.as_ref() else {
            return false;
        };
        match with_timeout(self.timeout, "save feedback", log.append_feedback(record)).await {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Failed to save feedback");
                false
            }
        }
    }
}
