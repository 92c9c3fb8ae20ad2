//! Chat-completion fallback gateway.
//!
//! # Architecture Overview
//!
//! ```text
//!                       ┌────────────────────────────────────────────────────┐
//!                       │                      GATEWAY                       │
//!                       │                                                    │
//!   POST /v1/chat/      │  ┌─────────┐   ┌──────────┐   ┌────────────────┐   │
//!   completions  ───────┼─▶│  http   │──▶│ projects │──▶│ FallbackRouter │   │
//!                       │  │ server  │   │ (token)  │   │  (per project) │   │
//!                       │  └─────────┘   └──────────┘   └───────┬────────┘   │
//!                       │                                       │            │
//!                       │                  ┌────────────────────┤            │
//!                       │                  ▼                    ▼            │
//!                       │          ┌──────────────┐     ┌──────────────┐     │
//!                       │          │ breaker gate │     │  providers   │─────┼──▶ OpenAI-compatible
//!                       │          └──────┬───────┘     └──────────────┘     │    endpoints
//!                       │                 ▼                                  │
//!                       │          ┌──────────────┐                          │
//!                       │          │breaker store │──────────────────────────┼──▶ Redis (shared)
//!                       │          │ memory/redis │                          │
//!                       │          └──────────────┘                          │
//!                       │                                                    │
//!                       │  config (watch + reload) · observability · admin   │
//!                       └────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use chat_gateway::admin::setup_admin_router;
use chat_gateway::config::{load_config, watcher::ConfigWatcher};
use chat_gateway::http::HttpServer;
use chat_gateway::lifecycle::{spawn_signal_handler, Shutdown};
use chat_gateway::observability::{logging, metrics};
use chat_gateway::resilience::build_breaker;

#[derive(Parser)]
#[command(name = "chat-gateway")]
#[command(about = "Chat-completion gateway with priority fallback and circuit breaking", long_about = None)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "gateway.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    let config = load_config(&args.config)?;

    logging::init_logging(&config.observability);
    tracing::info!("chat-gateway v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        path = ?args.config,
        bind_address = %config.listener.bind_address,
        projects = config.projects.len(),
        providers = config.providers.len(),
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(e) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                error = %e,
                "Failed to parse metrics address"
            ),
        }
    }

    let breaker = build_breaker(&config.breaker).await?;

    let shutdown = Shutdown::new();
    spawn_signal_handler(shutdown.clone());

    let (watcher, config_updates) = ConfigWatcher::new(&args.config);
    let _watcher = match watcher.run() {
        Ok(watcher) => Some(watcher),
        Err(e) => {
            tracing::warn!(error = %e, "Config hot reload disabled");
            None
        }
    };

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(config.clone(), breaker)?;

    if config.admin.enabled {
        let admin_listener = TcpListener::bind(&config.admin.bind_address).await?;
        tracing::info!(address = %admin_listener.local_addr()?, "Admin API listening");
        let admin = setup_admin_router(server.state().clone());
        let mut admin_shutdown = shutdown.subscribe();
        tokio::spawn(async move {
            let result = axum::serve(admin_listener, admin)
                .with_graceful_shutdown(async move {
                    let _ = admin_shutdown.recv().await;
                })
                .await;
            if let Err(e) = result {
                tracing::error!(error = %e, "Admin server failed");
            }
        });
    }

    server
        .run(listener, config_updates, shutdown.subscribe())
        .await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
