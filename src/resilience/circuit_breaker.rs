//! Circuit breaker gate for route protection.
//!
//! # States
//! - Closed: normal operation, route is attempted
//! - Open: route assumed down, skipped without a call
//! - Half-Open: reset window elapsed, route is attempted to probe recovery
//!
//! # State Transitions
//! ```text
//! Closed → Open: failures >= max_failures
//! Open → Half-Open: now - last_failure > reset_timeout (no write needed)
//! Half-Open → Closed: probe succeeds (counter reset to zero)
//! Half-Open → Open: probe fails (last_failure moves to now)
//! ```
//!
//! # Design Decisions
//! - Per-route breaker keyed by route id (not global)
//! - State is derived from stored counters on every read, never stored
//! - Store read errors fail open: the route is treated as closed
//! - Store write errors are logged and swallowed

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;

use crate::observability::metrics;
use crate::resilience::store::{BreakerRecord, BreakerStore};

/// Breaker state for a single route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

impl BreakerState {
    /// Closed and half-open both permit an attempt.
    pub fn should_attempt(self) -> bool {
        matches!(self, BreakerState::Closed | BreakerState::HalfOpen)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            BreakerState::Closed => "closed",
            BreakerState::Open => "open",
            BreakerState::HalfOpen => "half_open",
        }
    }
}

impl std::fmt::Display for BreakerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Threshold and window applied to stored counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerPolicy {
    /// Failures at which the breaker opens.
    pub max_failures: u64,
    /// Time after the last failure before a probe is allowed.
    pub reset_timeout: Duration,
}

impl Default for BreakerPolicy {
    fn default() -> Self {
        Self {
            max_failures: 5,
            reset_timeout: Duration::from_secs(30),
        }
    }
}

impl From<&crate::config::BreakerConfig> for BreakerPolicy {
    fn from(config: &crate::config::BreakerConfig) -> Self {
        Self {
            max_failures: config.max_failures,
            reset_timeout: Duration::from_secs(config.reset_timeout_secs),
        }
    }
}

impl BreakerRecord {
    /// Derive the breaker state at `now`.
    pub fn state(&self, policy: &BreakerPolicy, now: DateTime<Utc>) -> BreakerState {
        if self.failures < policy.max_failures {
            return BreakerState::Closed;
        }
        let window = TimeDelta::from_std(policy.reset_timeout).unwrap_or(TimeDelta::MAX);
        match self.last_failure {
            Some(last) if now.signed_duration_since(last) <= window => BreakerState::Open,
            _ => BreakerState::HalfOpen,
        }
    }
}

/// Gate consulted by the fallback router before and after each attempt.
#[async_trait]
pub trait CircuitBreaker: Send + Sync {
    /// Current state for `key`. Never fails; store problems read as closed.
    async fn state(&self, key: &str) -> BreakerState;

    /// Record a failed attempt for `key`.
    async fn report_failure(&self, key: &str);

    /// Record a successful attempt for `key`, resetting its failure count.
    async fn report_success(&self, key: &str);
}

/// Breaker that never opens. Used when no store is configured and in tests.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpBreaker;

#[async_trait]
impl CircuitBreaker for NoOpBreaker {
    async fn state(&self, _key: &str) -> BreakerState {
        BreakerState::Closed
    }

    async fn report_failure(&self, _key: &str) {}

    async fn report_success(&self, _key: &str) {}
}

/// Stateless gate computing breaker state from a shared [`BreakerStore`].
#[derive(Clone)]
pub struct BreakerGate {
    store: Arc<dyn BreakerStore>,
    policy: BreakerPolicy,
}

impl BreakerGate {
    pub fn new(store: Arc<dyn BreakerStore>, policy: BreakerPolicy) -> Self {
        Self { store, policy }
    }

    pub fn policy(&self) -> &BreakerPolicy {
        &self.policy
    }
}

impl std::fmt::Debug for BreakerGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BreakerGate")
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl CircuitBreaker for BreakerGate {
    async fn state(&self, key: &str) -> BreakerState {
        match self.store.load(key).await {
            Ok(record) => record.state(&self.policy, Utc::now()),
            Err(e) => {
                tracing::warn!(route = %key, error = %e, "Breaker store read failed, assuming closed");
                metrics::record_breaker_store_error("load");
                BreakerState::Closed
            }
        }
    }

    async fn report_failure(&self, key: &str) {
        match self.store.record_failure(key, Utc::now()).await {
            Ok(failures) => {
                if failures == self.policy.max_failures {
                    tracing::warn!(route = %key, failures, "Circuit breaker opened");
                }
            }
            Err(e) => {
                tracing::warn!(route = %key, error = %e, "Failed to record route failure");
                metrics::record_breaker_store_error("record_failure");
            }
        }
    }

    async fn report_success(&self, key: &str) {
        if let Err(e) = self.store.reset(key).await {
            tracing::warn!(route = %key, error = %e, "Failed to reset route failures");
            metrics::record_breaker_store_error("reset");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resilience::store::{MemoryBreakerStore, StoreError};

    fn policy(max_failures: u64, reset_timeout: Duration) -> BreakerPolicy {
        BreakerPolicy {
            max_failures,
            reset_timeout,
        }
    }

    /// A store whose every operation fails.
    struct BrokenStore;

    #[async_trait]
    impl BreakerStore for BrokenStore {
        async fn load(&self, _key: &str) -> Result<BreakerRecord, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }

        async fn record_failure(&self, _key: &str, _at: DateTime<Utc>) -> Result<u64, StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }

        async fn reset(&self, _key: &str) -> Result<(), StoreError> {
            Err(StoreError::Unavailable("connection refused".into()))
        }
    }

    #[test]
    fn test_record_state_derivation() {
        let p = policy(10, Duration::from_secs(1));
        let now = Utc::now();

        let closed = BreakerRecord {
            failures: 9,
            last_failure: Some(now),
        };
        assert_eq!(closed.state(&p, now), BreakerState::Closed);

        let open = BreakerRecord {
            failures: 10,
            last_failure: Some(now),
        };
        assert_eq!(open.state(&p, now), BreakerState::Open);
        // Exactly at the window edge the breaker is still open.
        assert_eq!(open.state(&p, now + TimeDelta::seconds(1)), BreakerState::Open);
        assert_eq!(
            open.state(&p, now + TimeDelta::milliseconds(1001)),
            BreakerState::HalfOpen
        );
    }

    #[test]
    fn test_threshold_without_timestamp_is_half_open() {
        let p = policy(1, Duration::from_secs(60));
        let record = BreakerRecord {
            failures: 3,
            last_failure: None,
        };
        assert_eq!(record.state(&p, Utc::now()), BreakerState::HalfOpen);
    }

    #[test]
    fn test_should_attempt() {
        assert!(BreakerState::Closed.should_attempt());
        assert!(BreakerState::HalfOpen.should_attempt());
        assert!(!BreakerState::Open.should_attempt());
    }

    #[tokio::test]
    async fn test_gate_opens_then_half_opens() {
        let gate = BreakerGate::new(
            Arc::new(MemoryBreakerStore::new()),
            policy(10, Duration::from_millis(100)),
        );

        assert_eq!(gate.state("r1").await, BreakerState::Closed);
        for _ in 0..10 {
            gate.report_failure("r1").await;
        }
        assert_eq!(gate.state("r1").await, BreakerState::Open);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(gate.state("r1").await, BreakerState::HalfOpen);

        // A failed probe reopens the breaker.
        gate.report_failure("r1").await;
        assert_eq!(gate.state("r1").await, BreakerState::Open);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(gate.state("r1").await, BreakerState::HalfOpen);

        // A successful probe closes it.
        gate.report_success("r1").await;
        assert_eq!(gate.state("r1").await, BreakerState::Closed);
    }

    #[tokio::test]
    async fn test_success_resets_regardless_of_count() {
        let store = Arc::new(MemoryBreakerStore::new());
        let gate = BreakerGate::new(store.clone(), policy(3, Duration::from_secs(60)));

        for _ in 0..7 {
            gate.report_failure("r1").await;
        }
        assert_eq!(gate.state("r1").await, BreakerState::Open);

        gate.report_success("r1").await;
        assert_eq!(store.load("r1").await.unwrap().failures, 0);
        assert_eq!(gate.state("r1").await, BreakerState::Closed);
    }

    #[tokio::test]
    async fn test_keys_are_independent() {
        let gate = BreakerGate::new(
            Arc::new(MemoryBreakerStore::new()),
            policy(1, Duration::from_secs(60)),
        );
        gate.report_failure("a").await;
        assert_eq!(gate.state("a").await, BreakerState::Open);
        assert_eq!(gate.state("b").await, BreakerState::Closed);
    }

    #[tokio::test]
    async fn test_store_errors_fail_open() {
        let gate = BreakerGate::new(Arc::new(BrokenStore), policy(1, Duration::from_secs(60)));
        // Reports are swallowed and reads degrade to closed.
        gate.report_failure("r1").await;
        gate.report_success("r1").await;
        assert_eq!(gate.state("r1").await, BreakerState::Closed);
    }

    #[tokio::test]
    async fn test_noop_breaker_always_closed() {
        let breaker = NoOpBreaker;
        for _ in 0..100 {
            breaker.report_failure("r1").await;
        }
        assert_eq!(breaker.state("r1").await, BreakerState::Closed);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_reports_open_exactly_at_threshold() {
        let store = Arc::new(MemoryBreakerStore::new());
        let gate = Arc::new(BreakerGate::new(store.clone(), policy(10, Duration::from_secs(60))));

        let mut handles = Vec::new();
        for _ in 0..10 {
            let gate = gate.clone();
            handles.push(tokio::spawn(async move { gate.report_failure("r1").await }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.load("r1").await.unwrap().failures, 10);
        assert_eq!(gate.state("r1").await, BreakerState::Open);
    }
}
