//! Arrowbot Storage crate - durable conversation log.
//!
//! Provides a WAL-mode SQLite database with migrations, an async
//! [`ExchangeLog`] contract over it, and the best-effort
//! [`ConversationStore`] the chat pipeline talks to.

pub mod conversation;
pub mod db;
pub mod exchange_log;
pub mod migrations;

pub use conversation::ConversationStore;
pub use db::Database;
pub use exchange_log::{ExchangeLog, SqliteExchangeLog};
