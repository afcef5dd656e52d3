//! Append-only exchange and feedback log.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use rusqlite::Connection;
use uuid::Uuid;

use arrowbot_core::error::{ArrowError, Result};
use arrowbot_core::{Exchange, FeedbackRecord};

use crate::db::Database;

/// Durable log of exchanges and feedback, queryable by session.
#[async_trait]
pub trait ExchangeLog: Send + Sync {
    async fn append_exchange(&self, exchange: &Exchange) -> Result<()>;

    /// Most recent first. `None` lists across all sessions.
    async fn list_exchanges(&self, session_id: Option<&str>, limit: usize) -> Result<Vec<Exchange>>;

    async fn append_feedback(&self, record: &FeedbackRecord) -> Result<()>;
}

/// [`ExchangeLog`] over SQLite. Queries run on the blocking pool.
#[derive(Debug, Clone)]
pub struct SqliteExchangeLog {
    db: Arc<Database>,
}

impl SqliteExchangeLog {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    async fn run<F, T>(&self, f: F) -> Result<T>
    where
        F: FnOnce(&Connection) -> Result<T> + Send + 'static,
        T: Send + 'static,
    {
        let db = Arc::clone(&self.db);
        tokio::task::spawn_blocking(move || db.with_conn(f))
            .await
            .map_err(|e| ArrowError::Storage(format!("Storage task failed: {}", e)))?
    }
}

#[async_trait]
impl ExchangeLog for SqliteExchangeLog {
    async fn append_exchange(&self, exchange: &Exchange) -> Result<()> {
        let exchange = exchange.clone();
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO exchanges (id, user_message, bot_response, session_id, timestamp_ms)
                 VALUES (?1, ?2, ?3, ?4, ?5)",
                rusqlite::params![
                    exchange.id.to_string(),
                    exchange.user_message,
                    exchange.bot_response,
                    exchange.session_id,
                    exchange.timestamp.timestamp_millis(),
                ],
            )
            .map_err(|e| ArrowError::Storage(format!("Failed to save exchange: {}", e)))?;
            Ok(())
        })
        .await
    }

    async fn list_exchanges(&self, session_id: Option<&str>, limit: usize) -> Result<Vec<Exchange>> {
        let session_id = session_id.map(str::to_string);
        let limit = limit as i64;
        self.run(move |conn| {
            let mut stmt = conn
                .prepare(
                    "SELECT id, user_message, bot_response, session_id, timestamp_ms
                     FROM exchanges
                     WHERE ?1 IS NULL OR session_id = ?1
                     ORDER BY timestamp_ms DESC, seq DESC
                     LIMIT ?2",
                )
                .map_err(|e| ArrowError::Storage(e.to_string()))?;

            let rows = stmt
                .query_map(rusqlite::params![session_id, limit], |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, String>(1)?,
                        row.get::<_, String>(2)?,
                        row.get::<_, String>(3)?,
                        row.get::<_, i64>(4)?,
                    ))
                })
                .map_err(|e| ArrowError::Storage(e.to_string()))?;

            let mut exchanges = Vec::new();
            for row in rows {
                let (id, user_message, bot_response, session_id, ts) =
                    row.map_err(|e| ArrowError::Storage(e.to_string()))?;
                exchanges.push(Exchange {
                    id: Uuid::parse_str(&id)
                        .map_err(|e| ArrowError::Storage(format!("Bad exchange id {}: {}", id, e)))?,
                    user_message,
                    bot_response,
                    session_id,
                    timestamp: millis_to_datetime(ts),
                });
            }
            Ok(exchanges)
        })
        .await
    }

    async fn append_feedback(&self, record: &FeedbackRecord) -> Result<()> {
        let record = record.clone();
        self.run(move |conn| {
            conn.execute(
                "INSERT INTO feedback (message_id, rating, feedback_text, timestamp_ms)
                 VALUES (?1, ?2, ?3, ?4)",
                rusqlite::params![
                    record.message_id,
                    record.rating,
                    record.feedback_text,
                    record.timestamp.timestamp_millis(),
                ],
            )
            .map_err(|e| ArrowError::Storage(format!("Failed to save feedback: {}", e)))?;
            Ok(())
        })
        .await
    }
}

fn millis_to_datetime(ms: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(ms).single().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn log() -> SqliteExchangeLog {
        SqliteExchangeLog::new(Arc::new(Database::in_memory().unwrap()))
    }

    #[tokio::test]
    async fn test_append_and_list_by_session() {
        let log = log();
        log.append_exchange(&Exchange::new("q1", "a1", "s1")).await.unwrap();
        log.append_exchange(&Exchange::new("q2", "a2", "s2")).await.unwrap();
        log.append_exchange(&Exchange::new("q3", "a3", "s1")).await.unwrap();

        let s1 = log.list_exchanges(Some("s1"), 10).await.unwrap();
        let msgs: Vec<&str> = s1.iter().map(|e| e.user_message.as_str()).collect();
        assert_eq!(msgs, vec!["q3", "q1"]);
    }

    #[tokio::test]
    async fn test_list_respects_limit_and_global() {
        let log = log();
        for i in 0..5 {
            log.append_exchange(&Exchange::new(format!("q{}", i), "a", format!("s{}", i % 2)))
                .await
                .unwrap();
        }
        let global = log.list_exchanges(None, 3).await.unwrap();
        let msgs: Vec<&str> = global.iter().map(|e| e.user_message.as_str()).collect();
        assert_eq!(msgs, vec!["q4", "q3", "q2"]);
    }

    #[tokio::test]
    async fn test_roundtrip_preserves_fields() {
        let log = log();
        let ex = Exchange::new("What are your fees?", "Fixed.", "sess");
        log.append_exchange(&ex).await.unwrap();
        let got = log.list_exchanges(Some("sess"), 1).await.unwrap();
        assert_eq!(got[0].id, ex.id);
        assert_eq!(got[0].bot_response, "Fixed.");
        assert_eq!(
            got[0].timestamp.timestamp_millis(),
            ex.timestamp.timestamp_millis()
        );
    }

    #[tokio::test]
    async fn test_duplicate_exchange_id_is_error() {
        let log = log();
        let ex = Exchange::new("q", "a", "s");
        log.append_exchange(&ex).await.unwrap();
        assert!(log.append_exchange(&ex).await.is_err());
    }

    #[tokio::test]
    async fn test_feedback_accepts_dangling_and_missing_ids() {
        let log = log();
        log.append_feedback(&FeedbackRecord::new(
            Some("no-such-message".to_string()),
            4.5,
            Some("Helpful".to_string()),
        ))
        .await
        .unwrap();
        log.append_feedback(&FeedbackRecord::new(None, 1.0, None))
            .await
            .unwrap();
    }
}
