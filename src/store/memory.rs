//! In-memory store.

use async_trait::async_trait;
use dashmap::DashMap;

use super::{Store, WindowRecord};
use crate::error::Result;

/// Process-local store with no persistence.
///
/// Counters reset on restart and are never shared between processes, so
/// limits enforced through this store are per-process. That is a deployment
/// constraint to be aware of, not a bug; use [`super::FileStore`] when
/// counters must survive a restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: DashMap<String, WindowRecord>,
}

impl MemoryStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<WindowRecord>> {
        Ok(self.records.get(key).map(|r| *r))
    }

    async fn put(&self, key: &str, record: WindowRecord) -> Result<()> {
        self.records.insert(key.to_string(), record);
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        self.records.remove(key);
        Ok(())
    }
}
