//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, body limit)
//!     → request.rs (request ID, bearer token, deadline)
//!     → project's FallbackRouter
//!     → provider response streamed back, or response.rs (JSON error)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestId, X_REQUEST_ID};
pub use server::{AppState, GatewayState, HttpServer};
