//! File-backed store.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use dashmap::DashMap;
use parking_lot::Mutex;
use tracing::debug;

use super::{Store, WindowRecord};
use crate::error::{Result, WardenError};

/// Store backed by a single JSON file.
///
/// The full record map is loaded when the store is opened and rewritten on
/// every mutation. Rewrites go through a temporary file renamed into place,
/// so a crash mid-write never leaves a torn file behind. Concurrent use from
/// one process is safe; pointing two processes at the same backing file is
/// last-writer-wins and unsupported.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    records: DashMap<String, WindowRecord>,
    /// Serializes snapshot-and-rewrite of the backing file.
    dump_lock: Mutex<()>,
}

impl FileStore {
    /// Open the store, loading any existing records.
    ///
    /// A missing file is an empty store. An unreadable or unparsable file is
    /// a storage error rather than silent data loss.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let records = DashMap::new();

        if path.exists() {
            let contents = std::fs::read_to_string(&path)?;
            let loaded: HashMap<String, WindowRecord> = serde_json::from_str(&contents)
                .map_err(|e| WardenError::Storage(format!("{}: {}", path.display(), e)))?;
            for (key, record) in loaded {
                records.insert(key, record);
            }
        }

        debug!(
            path = %path.display(),
            records = records.len(),
            "Opened counter store"
        );

        Ok(Self {
            path,
            records,
            dump_lock: Mutex::new(()),
        })
    }

    /// Number of tracked keys.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Write the current map to disk.
    fn dump(&self) -> Result<()> {
        let _guard = self.dump_lock.lock();

        let snapshot: HashMap<String, WindowRecord> = self
            .records
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        let contents =
            serde_json::to_string(&snapshot).map_err(|e| WardenError::Storage(e.to_string()))?;

        let tmp = self.path.with_extension("tmp");
        std::fs::write(&tmp, contents)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

#[async_trait]
impl Store for FileStore {
    async fn get(&self, key: &str) -> Result<Option<WindowRecord>> {
        Ok(self.records.get(key).map(|r| *r))
    }

    async fn put(&self, key: &str, record: WindowRecord) -> Result<()> {
        self.records.insert(key.to_string(), record);
        self.dump()
    }

    async fn delete(&self, key: &str) -> Result<()> {
        if self.records.remove(key).is_some() {
            self.dump()?;
        }
        Ok(())
    }
}
