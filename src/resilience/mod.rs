//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Fallback router, per route:
//!     → circuit_breaker.rs (derive closed/open/half-open from counters)
//!     → store.rs / redis_store.rs (load counters for the route id)
//!     → after the attempt: record failure or reset counters
//! ```
//!
//! # Design Decisions
//! - Breaker state is shared through the store, not held in-process
//! - The breaker never blocks a request because its store is down
//! - No per-route retries: resilience comes from falling back to the next route

pub mod circuit_breaker;
pub mod redis_store;
pub mod store;

use std::sync::Arc;

use crate::config::{BreakerBackend, BreakerConfig};

pub use circuit_breaker::{BreakerGate, BreakerPolicy, BreakerState, CircuitBreaker, NoOpBreaker};
pub use redis_store::RedisBreakerStore;
pub use store::{BreakerRecord, BreakerStore, MemoryBreakerStore, StoreError};

/// Build the breaker gate selected by configuration.
pub async fn build_breaker(config: &BreakerConfig) -> Result<Arc<dyn CircuitBreaker>, StoreError> {
    let policy = BreakerPolicy::from(config);
    let breaker: Arc<dyn CircuitBreaker> = match config.backend {
        BreakerBackend::Disabled => Arc::new(NoOpBreaker),
        BreakerBackend::Memory => {
            Arc::new(BreakerGate::new(Arc::new(MemoryBreakerStore::new()), policy))
        }
        BreakerBackend::Redis => {
            let url = config
                .redis_url
                .as_deref()
                .ok_or_else(|| StoreError::Unavailable("breaker.redis_url is not set".into()))?;
            let store = RedisBreakerStore::connect(url, config.key_prefix.clone()).await?;
            Arc::new(BreakerGate::new(Arc::new(store), policy))
        }
    };

    tracing::info!(
        backend = %config.backend,
        max_failures = config.max_failures,
        reset_timeout_secs = config.reset_timeout_secs,
        "Circuit breaker initialized"
    );
    Ok(breaker)
}
