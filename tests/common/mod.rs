//! Shared utilities for integration and load testing.

#![allow(dead_code)]

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use axum::http::header::CONTENT_TYPE;
use axum::http::StatusCode;
use axum::routing::post;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::mpsc;

use chat_gateway::admin::setup_admin_router;
use chat_gateway::config::{GatewayConfig, ProjectConfig, ProviderConfig, RouteConfig, TokenConfig};
use chat_gateway::http::HttpServer;
use chat_gateway::lifecycle::Shutdown;
use chat_gateway::resilience::{build_breaker, CircuitBreaker};

pub const TOKEN: &str = "gw-test-token";
pub const ADMIN_KEY: &str = "test-admin-key";
pub const PROJECT: &str = "default";

/// A mock OpenAI-compatible provider on a loopback port.
pub struct MockProvider {
    pub addr: SocketAddr,
    hits: Arc<AtomicUsize>,
}

impl MockProvider {
    pub fn hits(&self) -> usize {
        self.hits.load(Ordering::SeqCst)
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }
}

/// Start a programmable provider. `f` returns (status, content type, body).
pub async fn start_programmable_provider<F, Fut>(f: F) -> MockProvider
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = (u16, &'static str, String)> + Send + 'static,
{
    let hits = Arc::new(AtomicUsize::new(0));
    let f = Arc::new(f);
    let counter = hits.clone();

    let app = Router::new().route(
        "/v1/chat/completions",
        post(move || {
            let f = f.clone();
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                let (status, content_type, body) = f().await;
                let status = StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
                (status, [(CONTENT_TYPE, content_type)], body)
            }
        }),
    );

    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });

    MockProvider { addr, hits }
}

/// Start a provider that always answers the same way.
pub async fn start_mock_provider(status: u16, body: &'static str) -> MockProvider {
    start_programmable_provider(move || async move { (status, "application/json", body.to_string()) })
        .await
}

/// Config with one project whose routes point at the given providers.
/// Each route gets its own provider entry named after the route.
pub fn gateway_config(routes: &[(&str, i32, &MockProvider)]) -> GatewayConfig {
    let mut config = GatewayConfig::default();
    config.listener.bind_address = "127.0.0.1:0".into();
    config.admin.enabled = true;
    config.admin.api_key = ADMIN_KEY.into();
    config.breaker.max_failures = 3;
    config.breaker.reset_timeout_secs = 60;
    config.observability.metrics_enabled = false;

    let mut project = ProjectConfig {
        id: PROJECT.into(),
        routes: Vec::new(),
    };
    for (id, priority, provider) in routes {
        let provider_name = format!("provider-{id}");
        config.providers.insert(
            provider_name.clone(),
            ProviderConfig {
                base_url: provider.base_url(),
            },
        );
        project.routes.push(RouteConfig {
            id: id.to_string(),
            priority: *priority,
            provider: provider_name,
            model: format!("model-{id}"),
            credential: Some(format!("sk-{id}")),
            credential_env: None,
        });
    }
    config.projects.push(project);
    config.tokens.push(TokenConfig {
        token: TOKEN.into(),
        project: PROJECT.into(),
    });
    config
}

/// A running gateway with its admin API.
pub struct TestGateway {
    pub addr: SocketAddr,
    pub admin_addr: SocketAddr,
    pub shutdown: Shutdown,
    pub breaker: Arc<dyn CircuitBreaker>,
    pub config_updates: mpsc::UnboundedSender<GatewayConfig>,
}

impl TestGateway {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn admin_url(&self, path: &str) -> String {
        format!("http://{}{}", self.admin_addr, path)
    }
}

pub async fn start_gateway(config: GatewayConfig) -> TestGateway {
    let breaker = build_breaker(&config.breaker).await.unwrap();
    let shutdown = Shutdown::new();
    let (config_tx, config_updates) = mpsc::unbounded_channel();

    let server = HttpServer::new(config, breaker.clone()).unwrap();
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let admin_listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let admin_addr = admin_listener.local_addr().unwrap();
    let admin = setup_admin_router(server.state().clone());
    let mut admin_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = axum::serve(admin_listener, admin)
            .with_graceful_shutdown(async move {
                let _ = admin_shutdown.recv().await;
            })
            .await;
    });

    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        let _ = server.run(listener, config_updates, server_shutdown).await;
    });

    tokio::time::sleep(Duration::from_millis(50)).await;

    TestGateway {
        addr,
        admin_addr,
        shutdown,
        breaker,
        config_updates: config_tx,
    }
}

pub fn chat_body(stream: bool) -> serde_json::Value {
    serde_json::json!({
        "model": "client-model",
        "messages": [{"role": "user", "content": "hello"}],
        "stream": stream
    })
}

pub fn client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}
