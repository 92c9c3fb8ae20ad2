//! Error responses.
//!
//! Every gateway-generated error is JSON:
//! ```text
//! {"message": "...", "routes": [{"route": "r1", "error": "..."}], "skipped": ["r2"]}
//! ```
//! `routes` lists attempted routes in attempt order; `skipped` lists routes
//! whose breaker was open. Both are omitted when empty.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use crate::routing::RouterError;

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub routes: Vec<RouteError>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub skipped: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct RouteError {
    pub route: String,
    pub error: String,
}

pub fn error_response(status: StatusCode, message: impl Into<String>) -> Response {
    let body = ErrorBody {
        message: message.into(),
        routes: Vec::new(),
        skipped: Vec::new(),
    };
    (status, Json(body)).into_response()
}

/// Status for a router failure.
pub fn router_error_status(err: &RouterError) -> StatusCode {
    match err {
        RouterError::AllRoutesFailed(_) => StatusCode::BAD_GATEWAY,
        RouterError::UnknownProvider { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        RouterError::Cancelled => StatusCode::GATEWAY_TIMEOUT,
    }
}

impl IntoResponse for RouterError {
    fn into_response(self) -> Response {
        let status = router_error_status(&self);
        let body = match &self {
            RouterError::AllRoutesFailed(aggregate) => ErrorBody {
                message: "all routes failed".to_string(),
                routes: aggregate
                    .iter()
                    .map(|(route, error)| RouteError {
                        route: route.to_string(),
                        error: error.to_string(),
                    })
                    .collect(),
                skipped: aggregate.skipped().to_vec(),
            },
            RouterError::UnknownProvider { .. } => ErrorBody {
                message: self.to_string(),
                routes: Vec::new(),
                skipped: Vec::new(),
            },
            RouterError::Cancelled => ErrorBody {
                message: "request deadline exceeded".to_string(),
                routes: Vec::new(),
                skipped: Vec::new(),
            },
        };
        (status, Json(body)).into_response()
    }
}
