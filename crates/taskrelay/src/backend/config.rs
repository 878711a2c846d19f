//! Task backend configuration.

use axum::http::HeaderValue;
use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Task backend configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Base URL of the task backend (e.g. "http://localhost:8000").
    pub base_url: String,

    /// Connect timeout in seconds. The stream itself has no deadline.
    pub connect_timeout_secs: u64,

    /// Workspace forwarded when the inbound request names none.
    pub default_workspace: String,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            connect_timeout_secs: 10,
            default_workspace: "default".to_string(),
        }
    }
}

impl BackendConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let url = Url::parse(&self.base_url)
            .map_err(|e| ConfigValidationError::InvalidBaseUrl(format!("{}: {}", self.base_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigValidationError::InvalidBaseUrl(format!(
                "{}: scheme must be http or https",
                self.base_url
            )));
        }
        if url.query().is_some() || url.fragment().is_some() {
            return Err(ConfigValidationError::InvalidBaseUrl(format!(
                "{}: must not carry a query or fragment",
                self.base_url
            )));
        }
        if self.connect_timeout_secs == 0 {
            return Err(ConfigValidationError::ZeroConnectTimeout);
        }
        if self.default_workspace.is_empty()
            || HeaderValue::from_str(&self.default_workspace).is_err()
        {
            return Err(ConfigValidationError::InvalidDefaultWorkspace(
                self.default_workspace.clone(),
            ));
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigValidationError {
    #[error("invalid backend.base_url {0}")]
    InvalidBaseUrl(String),

    #[error("backend.connect_timeout_secs must be greater than zero")]
    ZeroConnectTimeout,

    #[error("invalid backend.default_workspace {0:?}")]
    InvalidDefaultWorkspace(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(BackendConfig::default().validate().is_ok());
    }

    #[test]
    fn test_trailing_slash_is_accepted() {
        let config = BackendConfig {
            base_url: "https://tasks.internal:9000/api/".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_rejects_bad_base_urls() {
        for base_url in ["tasks.internal", "ws://tasks.internal", "http://tasks.internal/?a=b"] {
            let config = BackendConfig {
                base_url: base_url.to_string(),
                ..Default::default()
            };
            assert!(
                matches!(config.validate(), Err(ConfigValidationError::InvalidBaseUrl(_))),
                "{base_url} should be rejected"
            );
        }
    }

    #[test]
    fn test_rejects_empty_workspace() {
        let config = BackendConfig {
            default_workspace: String::new(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::InvalidDefaultWorkspace(_))
        ));
    }
}
