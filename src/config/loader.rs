//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse and validate configuration from TOML text.
pub fn parse_config(content: &str) -> Result<GatewayConfig, ConfigError> {
    let config: GatewayConfig = toml::from_str(content)?;
    validate_config(&config).map_err(ConfigError::Validation)?;
    Ok(config)
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<GatewayConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::schema::BreakerBackend;
    use std::io::Write;

    const SAMPLE: &str = r#"
[listener]
bind_address = "127.0.0.1:9200"

[breaker]
backend = "memory"
max_failures = 3
reset_timeout_secs = 10

[providers.openai]
base_url = "https://api.openai.com/v1"

[providers.local]
base_url = "http://127.0.0.1:8000/v1"

[[projects]]
id = "project1"

[[projects.routes]]
id = "local-llama"
priority = 2
provider = "local"
model = "llama-3-8b"
credential = "none"

[[projects.routes]]
id = "openai-mini"
priority = 1
provider = "openai"
model = "gpt-4o-mini"
credential = "sk-test"

[[tokens]]
token = "test"
project = "project1"
"#;

    #[test]
    fn test_load_config_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(SAMPLE.as_bytes()).unwrap();

        let config = load_config(file.path()).unwrap();
        assert_eq!(config.breaker.backend, BreakerBackend::Memory);
        assert_eq!(config.breaker.max_failures, 3);
        assert_eq!(config.providers.len(), 2);
        assert_eq!(config.projects[0].routes.len(), 2);
        assert_eq!(config.tokens[0].project, "project1");
        // Unset sections fall back to defaults.
        assert_eq!(config.timeouts.provider_connect_secs, 5);
    }

    #[test]
    fn test_default_providers_when_section_missing() {
        let config = parse_config(
            r#"
[[projects]]
id = "p"

[[projects.routes]]
id = "r"
provider = "openai"
model = "gpt-4o"
credential = "sk-test"
"#,
        )
        .unwrap();
        assert!(config.providers.contains_key("openai"));
    }

    #[test]
    fn test_validation_error_surfaces() {
        let err = parse_config(
            r#"
[[projects]]
id = "p"
"#,
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
        assert_eq!(err.to_string(), "Validation failed: project 'p' has no routes");
    }

    #[test]
    fn test_parse_error_surfaces() {
        let err = parse_config("[breaker]\nbackend = \"etcd\"\n").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = load_config(Path::new("/nonexistent/gateway.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
