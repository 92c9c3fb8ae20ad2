//! Projects and API tokens.
//!
//! # Responsibilities
//! - Resolve a gateway API token to its project id
//! - Hold each project's route set as configured
//!
//! # Design Decisions
//! - Both maps are built from config and replaced wholesale on reload
//! - Token lookups never log the token itself

use std::collections::HashMap;

use crate::config::{ProjectConfig, TokenConfig};
use crate::routing::Route;

/// One logical client and its fallback chain, in configured order.
#[derive(Debug, Clone)]
pub struct Project {
    pub id: String,
    pub routes: Vec<Route>,
}

impl From<&ProjectConfig> for Project {
    fn from(config: &ProjectConfig) -> Self {
        Self {
            id: config.id.clone(),
            routes: config.routes.iter().map(Route::from).collect(),
        }
    }
}

#[derive(Debug, Default)]
pub struct ProjectStore {
    projects: HashMap<String, Project>,
}

impl ProjectStore {
    pub fn from_config(projects: &[ProjectConfig]) -> Self {
        Self {
            projects: projects
                .iter()
                .map(|p| (p.id.clone(), Project::from(p)))
                .collect(),
        }
    }

    /// Projects sorted by id.
    pub fn iter(&self) -> impl Iterator<Item = &Project> {
        let mut projects: Vec<&Project> = self.projects.values().collect();
        projects.sort_by(|a, b| a.id.cmp(&b.id));
        projects.into_iter()
    }

    pub fn len(&self) -> usize {
        self.projects.len()
    }

    pub fn is_empty(&self) -> bool {
        self.projects.is_empty()
    }
}

/// Bearer token → project id.
#[derive(Default)]
pub struct TokenResolver {
    tokens: HashMap<String, String>,
}

impl TokenResolver {
    pub fn from_config(tokens: &[TokenConfig]) -> Self {
        Self {
            tokens: tokens
                .iter()
                .map(|t| (t.token.clone(), t.project.clone()))
                .collect(),
        }
    }

    pub fn resolve(&self, token: &str) -> Option<&str> {
        self.tokens.get(token).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.tokens.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tokens.is_empty()
    }
}

impl std::fmt::Debug for TokenResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenResolver")
            .field("tokens", &self.tokens.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RouteConfig;

    fn project(id: &str, route_ids: &[&str]) -> ProjectConfig {
        ProjectConfig {
            id: id.to_string(),
            routes: route_ids
                .iter()
                .map(|r| RouteConfig {
                    id: r.to_string(),
                    priority: 0,
                    provider: "openai".into(),
                    model: "gpt-4o-mini".into(),
                    credential: Some("sk".into()),
                    credential_env: None,
                })
                .collect(),
        }
    }

    #[test]
    fn test_project_store() {
        let store = ProjectStore::from_config(&[project("beta", &["b1"]), project("alpha", &["a1", "a2"])]);

        assert_eq!(store.len(), 2);
        let order: Vec<&str> = store.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(order, vec!["alpha", "beta"]);

        let alpha = store.iter().next().unwrap();
        let ids: Vec<&str> = alpha.routes.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["a1", "a2"]);
    }

    #[test]
    fn test_token_resolver() {
        let resolver = TokenResolver::from_config(&[
            TokenConfig {
                token: "gw-123".into(),
                project: "alpha".into(),
            },
            TokenConfig {
                token: "gw-456".into(),
                project: "beta".into(),
            },
        ]);

        assert_eq!(resolver.resolve("gw-123"), Some("alpha"));
        assert_eq!(resolver.resolve("gw-456"), Some("beta"));
        assert_eq!(resolver.resolve("gw-789"), None);
        assert!(!format!("{resolver:?}").contains("gw-123"));
    }
}
