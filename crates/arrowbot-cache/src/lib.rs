//! Arrowbot cache crate - key/value backend, response cache, rate limiter.
//!
//! Both the response cache and the per-client request counter sit on top of
//! the [`KvBackend`] trait. Every backend failure degrades to "miss" for the
//! cache and to "first request" for the limiter; neither ever fails the
//! caller.

pub mod backend;
pub mod cache;
pub mod rate_limit;

pub use backend::{KvBackend, MemoryBackend};
pub use cache::ResponseCache;
pub use rate_limit::{RateDecision, RateLimiter};
