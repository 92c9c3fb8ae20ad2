//! Provider adapter subsystem.
//!
//! # Data Flow
//! ```text
//! Fallback router, per attempted route:
//!     → ProviderRegistry (name → adapter, resolved at router build)
//!     → openai.rs (set model, POST {base_url}/chat/completions)
//!     → ProviderResponse streamed back unchanged, or ProviderError
//! ```
//!
//! # Design Decisions
//! - Adapters classify failures (rate limit, timeout, status); the router does not
//! - Non-2xx upstream responses are errors so the next route gets a chance
//! - Response bodies are streamed, never buffered

pub mod openai;
pub mod request;

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{ProvidersConfig, TimeoutConfig};

pub use openai::OpenAiCompatProvider;
pub use request::{ChatRequest, RequestError};

/// Response handed back to the client as-is (status, headers, body stream).
pub type ProviderResponse = axum::response::Response;

/// Failure of a single provider call.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("rate limited by provider")]
    RateLimited,

    #[error("provider request timed out")]
    Timeout,

    #[error("provider returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("transport error: {0}")]
    Transport(String),
}

impl ProviderError {
    /// Short label used for metrics and structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::RateLimited => "rate_limited",
            ProviderError::Timeout => "timeout",
            ProviderError::Status { .. } => "status",
            ProviderError::Transport(_) => "transport",
        }
    }
}

/// A backend able to serve one chat completion.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn chat_completion(
        &self,
        request: &ChatRequest,
        model: &str,
        credential: &str,
    ) -> Result<ProviderResponse, ProviderError>;
}

/// Fixed mapping from provider name to adapter.
#[derive(Clone, Default)]
pub struct ProviderRegistry {
    providers: HashMap<String, Arc<dyn ChatProvider>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// One OpenAI-compatible adapter per configured provider.
    pub fn from_config(
        providers: &ProvidersConfig,
        timeouts: &TimeoutConfig,
    ) -> Result<Self, ProviderError> {
        let mut registry = Self::new();
        for (name, provider) in providers {
            let adapter = OpenAiCompatProvider::new(
                name.clone(),
                provider.base_url.clone(),
                timeouts.provider_connect(),
                timeouts.provider_request(),
            )?;
            registry.register(Arc::new(adapter));
        }
        Ok(registry)
    }

    /// Register an adapter under its own name, replacing any previous one.
    pub fn register(&mut self, provider: Arc<dyn ChatProvider>) {
        self.providers.insert(provider.name().to_string(), provider);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn ChatProvider>> {
        self.providers.get(name).cloned()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::default_providers;
    use crate::config::ProviderConfig;

    #[test]
    fn test_registry_from_config() {
        let mut providers = default_providers();
        providers.insert(
            "local".to_string(),
            ProviderConfig {
                base_url: "http://127.0.0.1:8000/v1".to_string(),
            },
        );

        let registry = ProviderRegistry::from_config(&providers, &TimeoutConfig::default()).unwrap();
        assert_eq!(registry.names(), vec!["local", "openai"]);
        assert_eq!(registry.get("local").unwrap().name(), "local");
        assert!(registry.get("missing").is_none());
    }

    #[test]
    fn test_error_display() {
        let err = ProviderError::Status {
            status: 503,
            body: "overloaded".to_string(),
        };
        assert_eq!(err.to_string(), "provider returned HTTP 503: overloaded");
        assert_eq!(err.kind(), "status");
        assert_eq!(ProviderError::RateLimited.to_string(), "rate limited by provider");
    }
}
