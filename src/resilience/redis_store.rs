//! Redis-backed breaker store.
//!
//! Each route id maps to a hash:
//! ```text
//! <key_prefix><route_id>
//!     failures        → integer, failures since last reset
//!     last_failure_ms → integer, unix epoch milliseconds of newest failure
//! ```
//!
//! Failure recording runs as one Lua script so the increment and the
//! timestamp update land together and concurrent gateways never lose
//! increments. Success is a single `HSET`.
//!
//! Tests that talk to a live server run only when `REDIS_URL` is set, e.g.
//! `REDIS_URL=redis://127.0.0.1:6379 cargo test redis_store`.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};

use crate::resilience::store::{BreakerRecord, BreakerStore, StoreError};

const FAILURES_FIELD: &str = "failures";
const LAST_FAILURE_FIELD: &str = "last_failure_ms";

// KEYS[1] = breaker hash, ARGV[1] = failure time in epoch millis.
const RECORD_FAILURE_SCRIPT: &str = r#"
local failures = redis.call('HINCRBY', KEYS[1], 'failures', 1)
local previous = tonumber(redis.call('HGET', KEYS[1], 'last_failure_ms'))
local at = tonumber(ARGV[1])
if previous == nil or at > previous then
    redis.call('HSET', KEYS[1], 'last_failure_ms', ARGV[1])
end
return failures
"#;

/// Breaker store shared by every gateway instance pointing at the same Redis.
#[derive(Clone)]
pub struct RedisBreakerStore {
    conn: ConnectionManager,
    key_prefix: String,
    record_failure: Script,
}

impl RedisBreakerStore {
    /// Connect to Redis. The connection manager reconnects on its own.
    pub async fn connect(url: &str, key_prefix: impl Into<String>) -> Result<Self, StoreError> {
        let client = redis::Client::open(url)?;
        let conn = ConnectionManager::new(client).await?;
        Ok(Self {
            conn,
            key_prefix: key_prefix.into(),
            record_failure: Script::new(RECORD_FAILURE_SCRIPT),
        })
    }

    fn key(&self, route_id: &str) -> String {
        format!("{}{}", self.key_prefix, route_id)
    }
}

/// Decode a breaker hash as returned by `HGETALL`.
fn record_from_fields(fields: &HashMap<String, i64>) -> BreakerRecord {
    BreakerRecord {
        failures: fields.get(FAILURES_FIELD).copied().unwrap_or(0).max(0) as u64,
        last_failure: fields
            .get(LAST_FAILURE_FIELD)
            .and_then(|ms| DateTime::<Utc>::from_timestamp_millis(*ms)),
    }
}

impl std::fmt::Debug for RedisBreakerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisBreakerStore")
            .field("key_prefix", &self.key_prefix)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl BreakerStore for RedisBreakerStore {
    async fn load(&self, key: &str) -> Result<BreakerRecord, StoreError> {
        let mut conn = self.conn.clone();
        let fields: HashMap<String, i64> = conn.hgetall(self.key(key)).await?;
        Ok(record_from_fields(&fields))
    }

    async fn record_failure(&self, key: &str, at: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut conn = self.conn.clone();
        let failures: i64 = self
            .record_failure
            .key(self.key(key))
            .arg(at.timestamp_millis())
            .invoke_async(&mut conn)
            .await?;
        Ok(failures.max(0) as u64)
    }

    async fn reset(&self, key: &str) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        conn.hset::<_, _, _, ()>(self.key(key), FAILURES_FIELD, 0)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::circuit_breaker::{BreakerGate, BreakerPolicy, BreakerState, CircuitBreaker};
    use std::sync::Arc;
    use std::time::Duration;

    /// Connect to the Redis named by `REDIS_URL`, or skip the test.
    async fn test_store(prefix: &str) -> Option<RedisBreakerStore> {
        let url = std::env::var("REDIS_URL").ok()?;
        let prefix = format!("{}:{}:", prefix, uuid::Uuid::new_v4());
        Some(RedisBreakerStore::connect(&url, prefix).await.unwrap())
    }

    #[test]
    fn test_script_writes_the_fields_load_reads() {
        for field in [FAILURES_FIELD, LAST_FAILURE_FIELD] {
            assert!(RECORD_FAILURE_SCRIPT.contains(&format!("'{field}'")), "{field}");
        }
        // Increment first, then only a newer timestamp may replace the old one.
        let incr = RECORD_FAILURE_SCRIPT.find("HINCRBY").unwrap();
        let guard = RECORD_FAILURE_SCRIPT.find("at > previous").unwrap();
        assert!(incr < guard);
    }

    #[test]
    fn test_record_from_fields() {
        assert_eq!(record_from_fields(&HashMap::new()), BreakerRecord::default());

        let at = Utc::now();
        let fields = HashMap::from([
            (FAILURES_FIELD.to_string(), 4),
            (LAST_FAILURE_FIELD.to_string(), at.timestamp_millis()),
        ]);
        let record = record_from_fields(&fields);
        assert_eq!(record.failures, 4);
        assert_eq!(
            record.last_failure.map(|t| t.timestamp_millis()),
            Some(at.timestamp_millis())
        );

        // A corrupt negative count reads as zero.
        let fields = HashMap::from([(FAILURES_FIELD.to_string(), -3)]);
        assert_eq!(record_from_fields(&fields).failures, 0);
    }

    #[tokio::test]
    async fn test_missing_key_is_zero_record() {
        let Some(store) = test_store("zero").await else {
            eprintln!("REDIS_URL not set, skipping");
            return;
        };
        assert_eq!(store.load("absent").await.unwrap(), BreakerRecord::default());
    }

    #[tokio::test]
    async fn test_timestamp_is_monotonic() {
        let Some(store) = test_store("monotonic").await else {
            eprintln!("REDIS_URL not set, skipping");
            return;
        };
        let later = Utc::now();
        let earlier = later - chrono::TimeDelta::seconds(10);

        store.record_failure("r1", later).await.unwrap();
        store.record_failure("r1", earlier).await.unwrap();

        let record = store.load("r1").await.unwrap();
        assert_eq!(record.failures, 2);
        assert_eq!(
            record.last_failure.map(|t| t.timestamp_millis()),
            Some(later.timestamp_millis())
        );

        store.reset("r1").await.unwrap();
        let record = store.load("r1").await.unwrap();
        assert_eq!(record.failures, 0);
        assert!(record.last_failure.is_some());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_breaker_lifecycle_with_concurrent_failures() {
        let Some(store) = test_store("lifecycle").await else {
            eprintln!("REDIS_URL not set, skipping");
            return;
        };
        let store = Arc::new(store);
        let gate = Arc::new(BreakerGate::new(
            store.clone(),
            BreakerPolicy {
                max_failures: 10,
                reset_timeout: Duration::from_secs(1),
            },
        ));

        assert_eq!(gate.state("test").await, BreakerState::Closed);

        let mut handles = Vec::new();
        for _ in 0..10 {
            let gate = gate.clone();
            handles.push(tokio::spawn(async move { gate.report_failure("test").await }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.load("test").await.unwrap().failures, 10);
        assert_eq!(gate.state("test").await, BreakerState::Open);

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(gate.state("test").await, BreakerState::HalfOpen);

        gate.report_failure("test").await;
        assert_eq!(gate.state("test").await, BreakerState::Open);

        tokio::time::sleep(Duration::from_millis(1100)).await;
        assert_eq!(gate.state("test").await, BreakerState::HalfOpen);

        gate.report_success("test").await;
        assert_eq!(gate.state("test").await, BreakerState::Closed);
    }
}
