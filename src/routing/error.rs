//! Router errors and the ordered per-route failure record.

use std::collections::HashMap;

use crate::providers::ProviderError;

/// Per-route failures of one fallback call, in attempt order.
///
/// Routes skipped because their breaker was open are kept apart from
/// attempted routes: they never produced an error of their own.
#[derive(Debug, Default)]
pub struct AggregateError {
    errors: Vec<(String, ProviderError)>,
    index: HashMap<String, usize>,
    skipped: Vec<String>,
}

impl AggregateError {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the failure of an attempted route.
    pub fn push(&mut self, route_id: impl Into<String>, error: ProviderError) {
        let route_id = route_id.into();
        self.index.insert(route_id.clone(), self.errors.len());
        self.errors.push((route_id, error));
    }

    /// Record a route skipped without an attempt.
    pub fn skip(&mut self, route_id: impl Into<String>) {
        self.skipped.push(route_id.into());
    }

    pub fn get(&self, route_id: &str) -> Option<&ProviderError> {
        self.index.get(route_id).map(|&i| &self.errors[i].1)
    }

    /// Attempted routes and their errors, in attempt order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ProviderError)> {
        self.errors.iter().map(|(id, err)| (id.as_str(), err))
    }

    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    /// Number of attempted routes.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }
}

impl std::fmt::Display for AggregateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.errors.is_empty() {
            if self.skipped.is_empty() {
                return f.write_str("no routes configured");
            }
            return write!(
                f,
                "no route attempted, circuit open for: {}",
                self.skipped.join(", ")
            );
        }

        for (i, (route_id, error)) in self.errors.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            write!(f, "{route_id}: {error}")?;
        }
        if !self.skipped.is_empty() {
            write!(f, " (circuit open for: {})", self.skipped.join(", "))?;
        }
        Ok(())
    }
}

impl std::error::Error for AggregateError {}

#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    /// A route names a provider with no registered adapter.
    #[error("route '{route}' references unknown provider '{provider}'")]
    UnknownProvider { route: String, provider: String },

    #[error("all routes failed: {0}")]
    AllRoutesFailed(AggregateError),

    #[error("request cancelled")]
    Cancelled,
}
