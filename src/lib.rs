//! Chat-completion fallback gateway library.

pub mod admin;
pub mod config;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod projects;
pub mod providers;
pub mod resilience;
pub mod routing;

pub use config::schema::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
pub use routing::FallbackRouter;
