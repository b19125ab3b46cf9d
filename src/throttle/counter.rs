//! Fixed-window counter.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, trace};

use super::key::ClientKey;
use crate::config::RouteRule;
use crate::error::Result;
use crate::store::{Store, WindowRecord};

/// Outcome of a rate limit check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Decision {
    /// Whether the request may proceed
    pub allowed: bool,
    /// Requests observed in the current window, including this one when
    /// allowed
    pub count: u64,
    /// Seconds until the current window rolls over. Suitable for a
    /// `Retry-After` header on rejection.
    pub retry_after_secs: u64,
}

impl Decision {
    pub fn is_denied(&self) -> bool {
        !self.allowed
    }
}

/// Fixed-window counter over a persistent store.
///
/// A window opens when the first request for a key arrives and lasts the
/// rule's period. Expiry is detected lazily on the next check, so a client
/// that stops requesting leaves its last record behind in the store; storage
/// cost stays bounded by distinct client/endpoint pairs. A client can send a
/// full limit at the end of one window and another full limit right after
/// rollover. That burst admission is inherent to fixed windows and accepted
/// in exchange for O(1) state and check cost per key.
pub struct WindowCounter {
    store: Arc<dyn Store>,
    /// Per-key guards serializing the read-modify-write against the store,
    /// so unrelated clients never contend on one lock.
    locks: DashMap<String, Arc<Mutex<()>>>,
}

impl WindowCounter {
    /// Create a counter over the given store.
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            locks: DashMap::new(),
        }
    }

    /// Check and record one request for `key` at time `now` (epoch seconds).
    ///
    /// Allowed requests are counted in the store before this returns; denied
    /// requests never advance the counter.
    pub async fn check(&self, key: &ClientKey, rule: &RouteRule, now: u64) -> Result<Decision> {
        let store_key = key.to_store_key();
        let lock = self
            .locks
            .entry(store_key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        trace!(
            key = %key,
            limit = rule.limit,
            period = rule.period_secs,
            "Checking rate limit"
        );

        let decision = match self.store.get(&store_key).await? {
            Some(record) if !record.expired(rule.period_secs, now) => {
                if record.count < rule.limit {
                    let updated = WindowRecord {
                        count: record.count + 1,
                        ..record
                    };
                    self.store.put(&store_key, updated).await?;
                    Decision {
                        allowed: true,
                        count: updated.count,
                        retry_after_secs: secs_until_reset(&updated, rule, now),
                    }
                } else {
                    debug!(
                        key = %key,
                        count = record.count,
                        limit = rule.limit,
                        "Rate limit exceeded"
                    );
                    Decision {
                        allowed: false,
                        count: record.count,
                        retry_after_secs: secs_until_reset(&record, rule, now),
                    }
                }
            }
            // Absent, or the window rolled over: open a fresh one.
            _ => {
                self.store
                    .put(&store_key, WindowRecord::opened_at(now))
                    .await?;
                Decision {
                    allowed: true,
                    count: 1,
                    retry_after_secs: rule.period_secs,
                }
            }
        };

        Ok(decision)
    }

    /// Forget the record for a key, putting it back at a clean slate.
    ///
    /// Also drops the key's lock entry so the lock table stays aligned
    /// with the store.
    pub async fn reset(&self, key: &ClientKey) -> Result<()> {
        let store_key = key.to_store_key();
        let lock = self
            .locks
            .entry(store_key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        {
            let _guard = lock.lock().await;
            self.store.delete(&store_key).await?;
        }
        self.locks.remove(&store_key);
        Ok(())
    }

    /// Number of keys holding a lock entry. Primarily useful for testing.
    pub fn tracked_keys(&self) -> usize {
        self.locks.len()
    }
}

fn secs_until_reset(record: &WindowRecord, rule: &RouteRule, now: u64) -> u64 {
    (record.window_start + rule.period_secs).saturating_sub(now)
}
