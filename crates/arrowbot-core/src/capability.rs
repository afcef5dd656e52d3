//! Capability flags for optional backends.

use serde::{Deserialize, Serialize};

/// Whether an optional backend can be used.
///
/// Computed once when a component is constructed and never re-derived from
/// scattered `Option` checks at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// The backend was never configured. Not an error.
    Unconfigured,
    /// Configured and passed its startup probe.
    Ready,
    /// Configured, but running on a fallback or failed its startup probe.
    Degraded,
}

impl Capability {
    /// True when the component has something to call.
    pub fn is_available(self) -> bool {
        matches!(self, Capability::Ready | Capability::Degraded)
    }

    /// Lowercase name used in logs and status payloads.
    pub fn as_str(self) -> &'static str {
        match self {
            Capability::Unconfigured => "unconfigured",
            Capability::Ready => "ready",
            Capability::Degraded => "degraded",
        }
    }
}

impl std::fmt::Display for Capability {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
