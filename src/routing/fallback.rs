//! Priority-ordered fallback across routes.
//!
//! # Responsibilities
//! - Sort the route set once, at construction
//! - Per request: try routes in order, skipping any whose breaker is open
//! - Report each attempt's outcome to the breaker
//! - Return the first success, or every failure in attempt order
//!
//! # Design Decisions
//! - Provider adapters resolved once at construction, not per call
//! - Any adapter error moves on to the next route; no per-route retries
//! - Unknown provider aborts the whole call (configuration error)
//! - Cancellation stops the loop; an attempt it interrupts is never reported,
//!   an attempt that completed always is

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::observability::metrics;
use crate::providers::{ChatProvider, ChatRequest, ProviderRegistry, ProviderResponse};
use crate::resilience::CircuitBreaker;
use crate::routing::error::{AggregateError, RouterError};
use crate::routing::route::{sort_by_priority, Route};

struct ResolvedRoute {
    route: Route,
    provider: Option<Arc<dyn ChatProvider>>,
}

/// Fallback router for one project's route set.
pub struct FallbackRouter {
    routes: Vec<ResolvedRoute>,
    breaker: Arc<dyn CircuitBreaker>,
}

impl FallbackRouter {
    pub fn new(
        mut routes: Vec<Route>,
        providers: &ProviderRegistry,
        breaker: Arc<dyn CircuitBreaker>,
    ) -> Self {
        sort_by_priority(&mut routes);
        let routes = routes
            .into_iter()
            .map(|route| ResolvedRoute {
                provider: providers.get(&route.provider),
                route,
            })
            .collect();
        Self { routes, breaker }
    }

    /// Routes in attempt order.
    pub fn routes(&self) -> impl Iterator<Item = &Route> {
        self.routes.iter().map(|resolved| &resolved.route)
    }

    pub fn breaker(&self) -> &Arc<dyn CircuitBreaker> {
        &self.breaker
    }

    pub async fn chat_completion(
        &self,
        request: &ChatRequest,
        cancel: &CancellationToken,
    ) -> Result<ProviderResponse, RouterError> {
        let mut failures = AggregateError::new();

        for ResolvedRoute { route, provider } in &self.routes {
            if cancel.is_cancelled() {
                return Err(RouterError::Cancelled);
            }

            let state = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RouterError::Cancelled),
                state = self.breaker.state(&route.id) => state,
            };
            if !state.should_attempt() {
                tracing::info!(route = %route.id, "Circuit open, skipping route");
                metrics::record_route_skipped(&route.id);
                failures.skip(route.id.clone());
                continue;
            }

            let Some(provider) = provider else {
                return Err(RouterError::UnknownProvider {
                    route: route.id.clone(),
                    provider: route.provider.clone(),
                });
            };

            tracing::debug!(
                route = %route.id,
                provider = %route.provider,
                model = %route.model,
                breaker = %state,
                "Attempting route"
            );

            let outcome = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RouterError::Cancelled),
                outcome = provider.chat_completion(request, &route.model, route.credential()) => outcome,
            };

            match outcome {
                Ok(response) => {
                    metrics::record_route_attempt(&route.id, &route.provider, "success");
                    self.breaker.report_success(&route.id).await;
                    return Ok(response);
                }
                Err(error) => {
                    tracing::warn!(
                        route = %route.id,
                        provider = %route.provider,
                        kind = error.kind(),
                        error = %error,
                        "Route failed, falling back"
                    );
                    metrics::record_route_attempt(&route.id, &route.provider, "failure");
                    // A completed attempt is always reported, even if the
                    // deadline fired meanwhile. The loop head checks it.
                    self.breaker.report_failure(&route.id).await;
                    failures.push(route.id.clone(), error);
                }
            }
        }

        tracing::error!(
            attempted = failures.len(),
            skipped = failures.skipped().len(),
            error = %failures,
            "All routes failed"
        );
        Err(RouterError::AllRoutesFailed(failures))
    }
}

impl std::fmt::Debug for FallbackRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FallbackRouter")
            .field("routes", &self.routes().collect::<Vec<_>>())
            .finish_non_exhaustive()
    }
}
