//! Two-tier answer generation.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use arrowbot_core::error::with_timeout;
use arrowbot_core::Capability;

use crate::completion::CompletionBackend;
use crate::fallback::FallbackTable;

/// Produces an answer from a message and retrieved context.
///
/// The primary tier asks the completion backend; every failure, timeout, or
/// blank completion is answered from the [`FallbackTable`] instead.
pub struct ResponseGenerator {
    backend: Option<Arc<dyn CompletionBackend>>,
    fallback: FallbackTable,
    timeout: Duration,
}

impl ResponseGenerator {
    pub fn new(backend: Option<Arc<dyn CompletionBackend>>, timeout: Duration) -> Self {
        match &backend {
            Some(b) => info!(model = b.model(), "Response generator using generative backend"),
            None => warn!("No generative backend; using fallback responses"),
        }
        Self {
            backend,
            fallback: FallbackTable::default(),
            timeout,
        }
    }

    /// Generator with no backend: always answers from the fallback table.
    pub fn fallback_only() -> Self {
        Self::new(None, Duration::from_secs(20))
    }

    pub fn with_fallback(mut self, fallback: FallbackTable) -> Self {
        self.fallback = fallback;
        self
    }

    pub fn capability(&self) -> Capability {
        if self.backend.is_some() {
            Capability::Ready
        } else {
            Capability::Unconfigured
        }
    }

    /// Always returns a non-empty answer.
    pub async fn generate(&self, message: &str, context: &str) -> String {
        let Some(backend) = self.backend.as_ref() else {
            return self.fallback.answer(message).to_string();
        };

        let system = system_prompt(context);
        match with_timeout(self.timeout, "completion", backend.complete(&system, message)).await {
            Ok(text) if !text.trim().is_empty() => {
                debug!(chars = text.len(), "Generated answer");
                text
            }
            Ok(_) => {
                warn!("Generative backend returned an empty answer; using fallback");
                self.fallback.answer(message).to_string()
            }
            Err(e) => {
                warn!(error = %e, "Generative backend failed; using fallback");
                self.fallback.answer(message).to_string()
            }
        }
    }
}

fn system_prompt(context: &str) -> String {
    format!(
        "You are a helpful assistant for Arrow Conveyancing. Context: {}",
        context
    )
}
