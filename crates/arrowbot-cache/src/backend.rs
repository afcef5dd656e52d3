//! Key/value backend trait and the in-process implementation.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use async_trait::async_trait;

use arrowbot_core::error::{ArrowError, Result};

/// Capability contract of a key/value store with expiry and atomic counters.
///
/// Values are opaque strings. `incr` must be atomic per key: concurrent
/// increments never lose updates.
#[async_trait]
pub trait KvBackend: Send + Sync {
    /// Check that the store is reachable.
    async fn ping(&self) -> Result<()>;

    /// Read a value. Expired keys read as `None`.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value that expires after `ttl`.
    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<()>;

    /// Increment the integer at `key` (missing keys start at 0) and return
    /// the new value. An existing expiry is preserved.
    async fn incr(&self, key: &str) -> Result<u64>;

    /// Arm an expiry on an existing key. Returns false if the key is absent.
    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool>;
}

#[derive(Debug, Clone)]
struct Slot {
    value: String,
    expires_at: Option<Instant>,
}

impl Slot {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map(|at| now >= at).unwrap_or(false)
    }
}

/// In-memory [`KvBackend`] guarded by a single mutex.
///
/// Expired entries are removed lazily when touched and in bulk by
/// [`MemoryBackend::purge_expired`].
#[derive(Debug, Default)]
pub struct MemoryBackend {
    slots: Mutex<HashMap<String, Slot>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        match self.slots.lock() {
            Ok(mut slots) => {
                let before = slots.len();
                slots.retain(|_, slot| !slot.is_expired(now));
                before - slots.len()
            }
            Err(_) => 0,
        }
    }

    /// Number of stored entries, including expired ones not yet purged.
    pub fn len(&self) -> usize {
        self.slots.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Slot>>> {
        self.slots
            .lock()
            .map_err(|e| ArrowError::Cache(format!("Cache lock poisoned: {}", e)))
    }
}

#[async_trait]
impl KvBackend for MemoryBackend {
    async fn ping(&self) -> Result<()> {
        self.lock().map(|_| ())
    }

    async fn get(&self, key: &str) -> Result<Option<String>> {
        let now = Instant::now();
        let mut slots = self.lock()?;
        match slots.get(key) {
            Some(slot) if slot.is_expired(now) => {
                slots.remove(key);
                Ok(None)
            }
            Some(slot) => Ok(Some(slot.value.clone())),
            None => Ok(None),
        }
    }

    async fn set_ex(&self, key: &str, value: String, ttl: Duration) -> Result<()> {
        let mut slots = self.lock()?;
        slots.insert(
            key.to_string(),
            Slot {
                value,
                expires_at: Some(Instant::now() + ttl),
            },
        );
        Ok(())
    }

    async fn incr(&self, key: &str) -> Result<u64> {
        let now = Instant::now();
        let mut slots = self.lock()?;

        let (current, expires_at) = match slots.get(key) {
            Some(slot) if !slot.is_expired(now) => {
                let n = slot.value.parse::<u64>().map_err(|_| {
                    ArrowError::Cache(format!("value at '{}' is not an integer", key))
                })?;
                (n, slot.expires_at)
            }
            _ => (0, None),
        };

        let next = current + 1;
        slots.insert(
            key.to_string(),
            Slot {
                value: next.to_string(),
                expires_at,
            },
        );
        Ok(next)
    }

    async fn expire(&self, key: &str, ttl: Duration) -> Result<bool> {
        let now = Instant::now();
        let mut slots = self.lock()?;
        match slots.get_mut(key) {
            Some(slot) if !slot.is_expired(now) => {
                slot.expires_at = Some(now + ttl);
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}
