//! Persistent storage for window counters.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Persisted state for one client/endpoint pair's current window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct WindowRecord {
    /// Requests observed in the current window
    pub count: u64,
    /// When the current window began, in epoch seconds
    pub window_start: u64,
}

impl WindowRecord {
    /// A fresh window opened at `now` with one request already recorded.
    pub fn opened_at(now: u64) -> Self {
        Self {
            count: 1,
            window_start: now,
        }
    }

    /// Whether the window has rolled over by `now`.
    pub fn expired(&self, period_secs: u64, now: u64) -> bool {
        now >= self.window_start.saturating_add(period_secs)
    }
}

/// Key-value storage for window records.
///
/// Implementations must be safe for concurrent use, but do not serialize
/// read-modify-write sequences themselves; `WindowCounter` holds a per-key
/// lock across its read and write so concurrent checks cannot lose updates.
#[async_trait]
pub trait Store: Send + Sync {
    /// Fetch the record for a key, if one exists.
    async fn get(&self, key: &str) -> Result<Option<WindowRecord>>;

    /// Create or replace the record for a key.
    async fn put(&self, key: &str, record: WindowRecord) -> Result<()>;

    /// Remove the record for a key. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<()>;
}
