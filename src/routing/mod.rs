//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Route Compilation (at startup / reload):
//!     RouteConfig[]
//!     → route.rs (resolve credentials, stable sort by priority)
//!     → fallback.rs (resolve provider adapters)
//!     → Freeze as immutable FallbackRouter
//!
//! Per request:
//!     FallbackRouter
//!     → breaker gate (skip open routes)
//!     → provider adapter
//!     → first success, or error.rs (AggregateError in attempt order)
//! ```
//!
//! # Design Decisions
//! - Routes compiled once, immutable at runtime
//! - Deterministic: same breaker view always yields same attempt order
//! - First success wins

pub mod error;
pub mod fallback;
pub mod route;

pub use error::{AggregateError, RouterError};
pub use fallback::FallbackRouter;
pub use route::{sort_by_priority, Route};
