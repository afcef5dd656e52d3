pub mod capability;
pub mod config;
pub mod digest;
pub mod error;
pub mod types;

pub use capability::Capability;
pub use config::ArrowConfig;
pub use digest::{content_digest, knowledge_id, response_cache_key};
pub use error::{with_timeout, ArrowError, Result};
pub use types::*;
