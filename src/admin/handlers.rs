use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;

use crate::http::server::AppState;
use crate::resilience::{BreakerState, CircuitBreaker};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub projects: usize,
    pub tokens: usize,
    pub providers: Vec<String>,
    pub breaker_backend: String,
}

#[derive(Serialize)]
pub struct RouteStatus {
    pub project: String,
    pub route: String,
    pub priority: i32,
    pub provider: String,
    pub model: String,
    pub state: BreakerState,
}

#[derive(Serialize)]
pub struct ResetResult {
    pub route: String,
    pub state: BreakerState,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let inner = state.inner.load_full();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        projects: inner.projects.len(),
        tokens: inner.tokens.len(),
        providers: inner.providers.names().into_iter().map(String::from).collect(),
        breaker_backend: inner.config.breaker.backend.to_string(),
    })
}

/// Every project's routes in attempt order, with live breaker state.
pub async fn get_routes(State(state): State<AppState>) -> Json<Vec<RouteStatus>> {
    let inner = state.inner.load_full();
    let mut statuses = Vec::new();

    for project in inner.projects.iter() {
        let Some(router) = inner.routers.get(&project.id) else {
            continue;
        };
        for route in router.routes() {
            statuses.push(RouteStatus {
                project: project.id.clone(),
                route: route.id.clone(),
                priority: route.priority,
                provider: route.provider.clone(),
                model: route.model.clone(),
                state: state.breaker().state(&route.id).await,
            });
        }
    }

    Json(statuses)
}

/// Clear a route's failure counter, closing its breaker.
pub async fn reset_breaker(
    State(state): State<AppState>,
    Path(route_id): Path<String>,
) -> Result<Json<ResetResult>, StatusCode> {
    let inner = state.inner.load_full();
    if inner.project_of(&route_id).is_none() {
        return Err(StatusCode::NOT_FOUND);
    }

    state.breaker().report_success(&route_id).await;
    tracing::info!(route = %route_id, "Circuit breaker reset by admin");

    Ok(Json(ResetResult {
        state: state.breaker().state(&route_id).await,
        route: route_id,
    }))
}
