//! Breaker counter storage.
//!
//! # Responsibilities
//! - Persist per-route failure counters and last-failure timestamps
//! - Apply increments and resets atomically per key
//! - Treat unknown keys as an all-zero record
//!
//! # Design Decisions
//! - The store never computes breaker state; it only holds counters
//! - Increment-and-timestamp is one store operation, never read-then-write
//! - The last-failure timestamp only moves forward

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use thiserror::Error;

/// Errors raised by a breaker store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Counters kept for one breaker key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BreakerRecord {
    /// Failures since the last reset.
    pub failures: u64,
    /// Most recent recorded failure, if any.
    pub last_failure: Option<DateTime<Utc>>,
}

/// Storage contract used by the breaker gate.
#[async_trait]
pub trait BreakerStore: Send + Sync {
    /// Read the record for `key`; missing keys yield the zero record.
    async fn load(&self, key: &str) -> Result<BreakerRecord, StoreError>;

    /// Atomically increment the failure count and advance the last-failure
    /// timestamp to `at` (never backwards). Returns the new failure count.
    async fn record_failure(&self, key: &str, at: DateTime<Utc>) -> Result<u64, StoreError>;

    /// Reset the failure count to zero, leaving the timestamp untouched.
    async fn reset(&self, key: &str) -> Result<(), StoreError>;
}

/// Process-local store backed by a concurrent map.
#[derive(Debug, Default)]
pub struct MemoryBreakerStore {
    records: DashMap<String, BreakerRecord>,
}

impl MemoryBreakerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys that have been written at least once.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

#[async_trait]
impl BreakerStore for MemoryBreakerStore {
    async fn load(&self, key: &str) -> Result<BreakerRecord, StoreError> {
        Ok(self
            .records
            .get(key)
            .map(|r| *r.value())
            .unwrap_or_default())
    }

    async fn record_failure(&self, key: &str, at: DateTime<Utc>) -> Result<u64, StoreError> {
        // The entry guard holds the shard lock for the whole update.
        let mut record = self.records.entry(key.to_string()).or_default();
        record.failures += 1;
        record.last_failure = record.last_failure.max(Some(at));
        Ok(record.failures)
    }

    async fn reset(&self, key: &str) -> Result<(), StoreError> {
        self.records.entry(key.to_string()).or_default().failures = 0;
        Ok(())
    }
}
