//! Runtime configuration for the completion endpoint and fallback chain.

use serde::{Deserialize, Serialize};

use crate::model::{DEFAULT_BACKENDS, DEFAULT_ENDPOINT};

/// Environment variable holding the endpoint credential.
pub const CREDENTIAL_ENV: &str = "OPENROUTER_API_KEY";

const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Endpoint, backend chain and timeout.
///
/// The credential is deliberately not part of the config; see [`credential_from_env`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DraftConfig {
    /// Chat completions URL.
    pub endpoint: String,
    /// Backend identifiers, tried in order.
    pub backends: Vec<String>,
    /// Per-call timeout.
    pub timeout_secs: u64,
}

impl Default for DraftConfig {
    fn default() -> Self {
        DraftConfig {
            endpoint: std::env::var("DRAFTSMITH_ENDPOINT")
                .unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string()),
            backends: std::env::var("DRAFTSMITH_BACKENDS")
                .ok()
                .map(|raw| parse_backend_list(&raw))
                .filter(|list| !list.is_empty())
                .unwrap_or_else(default_backends),
            timeout_secs: std::env::var("DRAFTSMITH_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.trim().parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl DraftConfig {
    /// Create a config from environment variables
    pub fn from_env() -> Self {
        Self::default()
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_backends<I, S>(mut self, backends: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.backends = backends.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = secs;
        self
    }
}

/// The built-in fallback chain as owned strings.
pub fn default_backends() -> Vec<String> {
    DEFAULT_BACKENDS.iter().map(|s| s.to_string()).collect()
}

/// Split a comma-separated backend list, dropping blanks.
pub fn parse_backend_list(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Read the endpoint credential from `OPENROUTER_API_KEY`.
pub fn credential_from_env() -> Option<String> {
    std::env::var(CREDENTIAL_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_backend_list() {
        assert_eq!(
            parse_backend_list(" a/b:free, ,c/d ,"),
            vec!["a/b:free".to_string(), "c/d".to_string()]
        );
        assert!(parse_backend_list("  ").is_empty());
    }

    #[test]
    fn test_default_backends_match_chain() {
        let backends = default_backends();
        assert_eq!(backends.len(), DEFAULT_BACKENDS.len());
        assert_eq!(backends[0], DEFAULT_BACKENDS[0]);
    }

    #[test]
    fn test_builders_override() {
        let config = DraftConfig::default()
            .with_endpoint("http://localhost:8080/v1/chat/completions")
            .with_backends(["x", "y"])
            .with_timeout_secs(5);
        assert_eq!(config.endpoint, "http://localhost:8080/v1/chat/completions");
        assert_eq!(config.backends, vec!["x".to_string(), "y".to_string()]);
        assert_eq!(config.timeout_secs, 5);
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let config = DraftConfig::default().with_backends(["only"]);
        let json = serde_json::to_string(&config).unwrap();
        let back: DraftConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(back, config);
    }
}
