//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → http::GatewayState (token map + per-project fallback routers)
//!
//! On file change:
//!     watcher.rs detects change
//!     → loader.rs loads new config
//!     → validation.rs validates
//!     → atomic swap of Arc<GatewayState>
//!     → in-flight requests finish on the old routers
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks
//! - Breaker counters are not part of the config and survive reloads

pub mod loader;
pub mod schema;
pub mod validation;
pub mod watcher;

pub use loader::{load_config, parse_config, ConfigError};
pub use schema::{
    AdminConfig, BreakerBackend, BreakerConfig, GatewayConfig, ListenerConfig,
    ObservabilityConfig, ProjectConfig, ProviderConfig, ProvidersConfig, RouteConfig,
    TimeoutConfig, TokenConfig,
};
pub use validation::ValidationError;
