//! Route definition and ordering.
//!
//! # Responsibilities
//! - Hold one (provider, model, credential) destination with its priority
//! - Sort a route set into attempt order
//!
//! # Design Decisions
//! - Immutable after construction
//! - Lower priority value is tried first
//! - Stable sort: equal priorities keep their configured order
//! - Credential never printed by `Debug`

use crate::config::RouteConfig;

#[derive(Clone, PartialEq, Eq)]
pub struct Route {
    /// Unique id, also the breaker key.
    pub id: String,
    pub priority: i32,
    pub provider: String,
    pub model: String,
    credential: String,
}

impl Route {
    pub fn new(
        id: impl Into<String>,
        priority: i32,
        provider: impl Into<String>,
        model: impl Into<String>,
        credential: impl Into<String>,
    ) -> Self {
        Self {
            id: id.into(),
            priority,
            provider: provider.into(),
            model: model.into(),
            credential: credential.into(),
        }
    }

    pub fn credential(&self) -> &str {
        &self.credential
    }
}

impl From<&RouteConfig> for Route {
    fn from(config: &RouteConfig) -> Self {
        Route::new(
            config.id.clone(),
            config.priority,
            config.provider.clone(),
            config.model.clone(),
            config.resolve_credential().unwrap_or_default(),
        )
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("provider", &self.provider)
            .field("model", &self.model)
            .field("credential", &"<redacted>")
            .finish()
    }
}

/// Sort routes into attempt order.
pub fn sort_by_priority(routes: &mut [Route]) {
    // `sort_by_key` is stable.
    routes.sort_by_key(|route| route.priority);
}
