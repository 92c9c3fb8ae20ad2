//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use std::collections::BTreeMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration for the chat gateway.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Circuit breaker settings shared by every route.
    pub breaker: BreakerConfig,

    /// Provider endpoints, keyed by the name routes refer to.
    #[serde(default = "default_providers")]
    pub providers: ProvidersConfig,

    /// Projects and their fallback routes.
    pub projects: Vec<ProjectConfig>,

    /// API tokens accepted by the gateway.
    pub tokens: Vec<TokenConfig>,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listener: ListenerConfig::default(),
            timeouts: TimeoutConfig::default(),
            breaker: BreakerConfig::default(),
            providers: default_providers(),
            projects: Vec::new(),
            tokens: Vec::new(),
            observability: ObservabilityConfig::default(),
            admin: AdminConfig::default(),
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:9200").
    pub bind_address: String,

    /// Maximum accepted request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:9200".to_string(),
            max_body_bytes: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Deadline for a whole inbound request, across every fallback attempt.
    pub request_secs: u64,

    /// Connection establishment timeout towards providers.
    pub provider_connect_secs: u64,

    /// Time allowed for a provider to return response headers.
    pub provider_request_secs: u64,
}

impl TimeoutConfig {
    pub fn request(&self) -> Duration {
        Duration::from_secs(self.request_secs)
    }

    pub fn provider_connect(&self) -> Duration {
        Duration::from_secs(self.provider_connect_secs)
    }

    pub fn provider_request(&self) -> Duration {
        Duration::from_secs(self.provider_request_secs)
    }
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 120,
            provider_connect_secs: 5,
            provider_request_secs: 60,
        }
    }
}

/// Where breaker counters live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BreakerBackend {
    /// Process-local counters.
    #[default]
    Memory,
    /// Counters shared through Redis hashes.
    Redis,
    /// No circuit breaking; every route is always attempted.
    Disabled,
}

impl std::fmt::Display for BreakerBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BreakerBackend::Memory => f.write_str("memory"),
            BreakerBackend::Redis => f.write_str("redis"),
            BreakerBackend::Disabled => f.write_str("disabled"),
        }
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BreakerConfig {
    /// Counter storage backend.
    pub backend: BreakerBackend,

    /// Failures (without an intervening success) that open a route's breaker.
    pub max_failures: u64,

    /// Seconds after the last failure before an open breaker allows a probe.
    pub reset_timeout_secs: u64,

    /// Redis connection URL, required by the redis backend.
    pub redis_url: Option<String>,

    /// Prefix prepended to route ids to form Redis keys.
    pub key_prefix: String,
}

impl Default for BreakerConfig {
    fn default() -> Self {
        Self {
            backend: BreakerBackend::Memory,
            max_failures: 5,
            reset_timeout_secs: 30,
            redis_url: None,
            key_prefix: "gateway:breaker:".to_string(),
        }
    }
}

/// Provider endpoints by name.
pub type ProvidersConfig = BTreeMap<String, ProviderConfig>;

/// An OpenAI-compatible provider endpoint.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProviderConfig {
    /// Base URL; `/chat/completions` is appended.
    pub base_url: String,
}

/// Default provider table used when the config file has no `[providers]`.
pub fn default_providers() -> ProvidersConfig {
    let mut providers = BTreeMap::new();
    providers.insert(
        "openai".to_string(),
        ProviderConfig {
            base_url: "https://api.openai.com/v1".to_string(),
        },
    );
    providers
}

/// A project: one logical client with its own fallback chain.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ProjectConfig {
    /// Unique project identifier.
    pub id: String,

    /// Candidate routes; attempted in ascending priority order.
    #[serde(default)]
    pub routes: Vec<RouteConfig>,
}

/// A single fallback route.
#[derive(Clone, Deserialize, Serialize)]
pub struct RouteConfig {
    /// Route identifier, also used as the circuit breaker key.
    pub id: String,

    /// Route priority (lower = attempted first).
    #[serde(default)]
    pub priority: i32,

    /// Provider name, must match a key in `[providers]`.
    pub provider: String,

    /// Provider-specific model identifier.
    pub model: String,

    /// Literal provider credential.
    #[serde(default)]
    pub credential: Option<String>,

    /// Environment variable holding the provider credential.
    #[serde(default)]
    pub credential_env: Option<String>,
}

impl RouteConfig {
    /// Resolve the credential: literal value first, then the environment.
    pub fn resolve_credential(&self) -> Option<String> {
        if let Some(credential) = &self.credential {
            return Some(credential.clone());
        }
        self.credential_env
            .as_ref()
            .and_then(|name| std::env::var(name).ok())
    }
}

impl std::fmt::Debug for RouteConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RouteConfig")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("credential", &self.credential.as_ref().map(|_| "<redacted>"))
            .field("credential_env", &self.credential_env)
            .finish()
    }
}

/// Maps a gateway API token to a project.
#[derive(Clone, Deserialize, Serialize)]
pub struct TokenConfig {
    pub token: String,
    pub project: String,
}

impl std::fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenConfig")
            .field("token", &"<redacted>")
            .field("project", &self.project)
            .finish()
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines instead of human-readable text.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: true,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin API.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin API bind address.
    pub bind_address: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
            bind_address: "127.0.0.1:9201".to_string(),
        }
    }
}
