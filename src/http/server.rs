//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, body limit, request ID)
//! - Authenticate the bearer token and pick the project's fallback router
//! - Dispatch chat completions with a per-request deadline
//! - Swap in reloaded configuration without dropping in-flight requests
//!
//! Listener, admin and breaker settings are read once at startup; a reload
//! replaces tokens, projects and providers only.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;

use arc_swap::ArcSwap;
use axum::body::Bytes;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{middleware, Extension, Json, Router};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::trace::TraceLayer;
use tracing::Instrument;

use crate::config::GatewayConfig;
use crate::http::request::{bearer_token, deadline, request_id_middleware, RequestId};
use crate::http::response::error_response;
use crate::observability::metrics;
use crate::projects::{ProjectStore, TokenResolver};
use crate::providers::{ChatRequest, ProviderError, ProviderRegistry};
use crate::resilience::CircuitBreaker;
use crate::routing::FallbackRouter;

/// Everything derived from one configuration snapshot.
pub struct GatewayState {
    pub config: GatewayConfig,
    pub tokens: TokenResolver,
    pub projects: ProjectStore,
    pub providers: ProviderRegistry,
    pub routers: HashMap<String, Arc<FallbackRouter>>,
}

impl GatewayState {
    pub fn build(
        config: GatewayConfig,
        breaker: Arc<dyn CircuitBreaker>,
    ) -> Result<Self, ProviderError> {
        let providers = ProviderRegistry::from_config(&config.providers, &config.timeouts)?;
        let projects = ProjectStore::from_config(&config.projects);
        let tokens = TokenResolver::from_config(&config.tokens);

        let routers = projects
            .iter()
            .map(|project| {
                let router = FallbackRouter::new(project.routes.clone(), &providers, breaker.clone());
                (project.id.clone(), Arc::new(router))
            })
            .collect();

        Ok(Self {
            config,
            tokens,
            projects,
            providers,
            routers,
        })
    }

    /// Project owning the route id. Route ids are unique across projects.
    pub fn project_of(&self, route_id: &str) -> Option<&str> {
        self.projects
            .iter()
            .find(|p| p.routes.iter().any(|r| r.id == route_id))
            .map(|p| p.id.as_str())
    }
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub inner: Arc<ArcSwap<GatewayState>>,
    breaker: Arc<dyn CircuitBreaker>,
}

impl AppState {
    pub fn new(config: GatewayConfig, breaker: Arc<dyn CircuitBreaker>) -> Result<Self, ProviderError> {
        let state = GatewayState::build(config, breaker.clone())?;
        Ok(Self {
            inner: Arc::new(ArcSwap::from_pointee(state)),
            breaker,
        })
    }

    /// Breaker shared by every router, across reloads.
    pub fn breaker(&self) -> &Arc<dyn CircuitBreaker> {
        &self.breaker
    }

    /// Rebuild routers from `config` and swap them in.
    pub fn reload(&self, config: GatewayConfig) {
        match GatewayState::build(config, self.breaker.clone()) {
            Ok(next) => {
                let projects = next.projects.len();
                let tokens = next.tokens.len();
                self.inner.store(Arc::new(next));
                tracing::info!(projects, tokens, "Configuration reloaded");
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to apply reloaded config, keeping current configuration");
            }
        }
    }
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    state: AppState,
}

impl HttpServer {
    pub fn new(config: GatewayConfig, breaker: Arc<dyn CircuitBreaker>) -> Result<Self, ProviderError> {
        let max_body_bytes = config.listener.max_body_bytes;
        let state = AppState::new(config, breaker)?;
        let router = Self::build_router(state.clone(), max_body_bytes);
        Ok(Self { router, state })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState, max_body_bytes: usize) -> Router {
        Router::new()
            .route("/v1/chat/completions", post(chat_completions))
            .route("/healthz", get(healthz))
            .with_state(state)
            .layer(DefaultBodyLimit::max(max_body_bytes))
            .layer(middleware::from_fn(request_id_middleware))
            .layer(TraceLayer::new_for_http())
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    /// Run the server until `shutdown` fires, applying config updates as they arrive.
    pub async fn run(
        self,
        listener: TcpListener,
        mut config_updates: mpsc::UnboundedReceiver<GatewayConfig>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let state = self.state.clone();
        tokio::spawn(async move {
            while let Some(config) = config_updates.recv().await {
                state.reload(config);
            }
        });

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("HTTP server shutting down");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn healthz() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

async fn chat_completions(
    State(state): State<AppState>,
    Extension(request_id): Extension<RequestId>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let start = Instant::now();
    let gateway = state.inner.load_full();
    let response = dispatch(&gateway, &request_id, &headers, &body).await;
    metrics::record_request(response.status().as_u16(), start);
    response
}

async fn dispatch(
    gateway: &GatewayState,
    request_id: &RequestId,
    headers: &HeaderMap,
    body: &[u8],
) -> Response {
    let Some(token) = bearer_token(headers) else {
        return error_response(StatusCode::UNAUTHORIZED, "missing bearer token");
    };
    let Some(project) = gateway.tokens.resolve(token) else {
        tracing::warn!(request_id = %request_id, "Unknown API token");
        return error_response(StatusCode::UNAUTHORIZED, "invalid API token");
    };
    let Some(router) = gateway.routers.get(project) else {
        tracing::error!(request_id = %request_id, project = %project, "Token maps to a project with no router");
        return error_response(StatusCode::INTERNAL_SERVER_ERROR, "project is not configured");
    };
    let request = match ChatRequest::from_slice(body) {
        Ok(request) => request,
        Err(e) => return error_response(StatusCode::BAD_REQUEST, e.to_string()),
    };

    let (cancel, _guard) = deadline(gateway.config.timeouts.request());
    let span = tracing::info_span!(
        "chat_completion",
        request_id = %request_id,
        project = %project,
        requested_model = request.requested_model().unwrap_or_default(),
        stream = request.is_stream()
    );

    match router.chat_completion(&request, &cancel).instrument(span).await {
        Ok(response) => {
            tracing::info!(
                request_id = %request_id,
                project = %project,
                status = response.status().as_u16(),
                "Chat completion served"
            );
            response
        }
        Err(e) => {
            tracing::warn!(request_id = %request_id, project = %project, error = %e, "Chat completion failed");
            e.into_response()
        }
    }
}
