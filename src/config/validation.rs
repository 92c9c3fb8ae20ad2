//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check referential integrity (routes reference providers, tokens reference projects)
//! - Validate value ranges (thresholds and windows > 0)
//! - Detect duplicate identifiers (route ids double as breaker keys)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;

use thiserror::Error;

use crate::config::schema::{BreakerBackend, GatewayConfig};

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("invalid listener bind address '{0}'")]
    InvalidBindAddress(String),

    #[error("duplicate project id '{0}'")]
    DuplicateProject(String),

    #[error("project '{0}' has no routes")]
    EmptyProject(String),

    #[error("route id '{0}' is used more than once")]
    DuplicateRoute(String),

    #[error("route '{route}' references unknown provider '{provider}'")]
    UnknownProvider { route: String, provider: String },

    #[error("route '{0}' has no resolvable credential")]
    MissingCredential(String),

    #[error("provider '{provider}' has an invalid base_url: {reason}")]
    InvalidProviderUrl { provider: String, reason: String },

    #[error("token for project '{0}' references an unknown project")]
    UnknownProject(String),

    #[error("breaker.max_failures must be at least 1")]
    ZeroMaxFailures,

    #[error("breaker.reset_timeout_secs must be at least 1")]
    ZeroResetTimeout,

    #[error("breaker.redis_url is required for the redis backend")]
    MissingRedisUrl,

    #[error("timeouts.request_secs must be at least 1")]
    ZeroRequestTimeout,
}

/// Validate a parsed configuration, collecting every problem found.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config
        .listener
        .bind_address
        .parse::<std::net::SocketAddr>()
        .is_err()
    {
        errors.push(ValidationError::InvalidBindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroRequestTimeout);
    }

    validate_breaker(config, &mut errors);

    for (name, provider) in &config.providers {
        if let Err(e) = url::Url::parse(&provider.base_url) {
            errors.push(ValidationError::InvalidProviderUrl {
                provider: name.clone(),
                reason: e.to_string(),
            });
        }
    }

    let mut project_ids = HashSet::new();
    let mut route_ids = HashSet::new();
    for project in &config.projects {
        if !project_ids.insert(project.id.as_str()) {
            errors.push(ValidationError::DuplicateProject(project.id.clone()));
        }
        if project.routes.is_empty() {
            errors.push(ValidationError::EmptyProject(project.id.clone()));
        }
        for route in &project.routes {
            if !route_ids.insert(route.id.as_str()) {
                errors.push(ValidationError::DuplicateRoute(route.id.clone()));
            }
            if !config.providers.contains_key(&route.provider) {
                errors.push(ValidationError::UnknownProvider {
                    route: route.id.clone(),
                    provider: route.provider.clone(),
                });
            }
            if route.resolve_credential().is_none() {
                errors.push(ValidationError::MissingCredential(route.id.clone()));
            }
        }
    }

    for token in &config.tokens {
        if !project_ids.contains(token.project.as_str()) {
            errors.push(ValidationError::UnknownProject(token.project.clone()));
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_breaker(config: &GatewayConfig, errors: &mut Vec<ValidationError>) {
    let breaker = &config.breaker;
    if breaker.backend == BreakerBackend::Disabled {
        return;
    }
    if breaker.max_failures == 0 {
        errors.push(ValidationError::ZeroMaxFailures);
    }
    if breaker.reset_timeout_secs == 0 {
        errors.push(ValidationError::ZeroResetTimeout);
    }
    if breaker.backend == BreakerBackend::Redis
        && breaker.redis_url.as_deref().map_or(true, str::is_empty)
    {
        errors.push(ValidationError::MissingRedisUrl);
    }
}
