//! Request handling.
//!
//! # Responsibilities
//! - Assign a request ID (client-supplied or UUID v4) and echo it back
//! - Extract the bearer token used for project lookup
//! - Create the per-request cancellation deadline
//!
//! # Design Decisions
//! - Request ID added as early as possible for tracing
//! - Deadline is a `CancellationToken`: fired by a timer, or by the drop
//!   guard when the handler future is dropped (client went away)

use std::time::Duration;

use axum::extract::Request;
use axum::http::header::AUTHORIZATION;
use axum::http::{HeaderMap, HeaderValue};
use axum::middleware::Next;
use axum::response::Response;
use tokio_util::sync::{CancellationToken, DropGuard};
use uuid::Uuid;

pub const X_REQUEST_ID: &str = "x-request-id";

/// Request ID stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestId(pub String);

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let id = request
        .headers()
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
        .unwrap_or_else(|| Uuid::new_v4().to_string());

    let header = HeaderValue::from_str(&id).ok();
    if let Some(value) = &header {
        request.headers_mut().insert(X_REQUEST_ID, value.clone());
    }
    request.extensions_mut().insert(RequestId(id));

    let mut response = next.run(request).await;
    if let Some(value) = header {
        response.headers_mut().insert(X_REQUEST_ID, value);
    }
    response
}

/// Token from `Authorization: Bearer <token>`.
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    let token = token.trim();
    (!token.is_empty()).then_some(token)
}

/// Cancellation token that fires after `timeout`, or when the guard drops.
pub fn deadline(timeout: Duration) -> (CancellationToken, DropGuard) {
    let token = CancellationToken::new();
    let timer = token.clone();
    tokio::spawn(async move {
        tokio::select! {
            _ = tokio::time::sleep(timeout) => timer.cancel(),
            _ = timer.cancelled() => {}
        }
    });
    (token.clone(), token.drop_guard())
}
