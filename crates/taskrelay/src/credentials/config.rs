//! Token endpoint configuration.

use reqwest::Url;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration for resolving bearer tokens from session cookies.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CredentialConfig {
    /// Token-issuing endpoint, called with the inbound `Cookie` header.
    pub token_url: String,

    /// Upper bound for the whole token request, in seconds.
    pub timeout_secs: u64,
}

impl Default for CredentialConfig {
    fn default() -> Self {
        Self {
            token_url: "http://localhost:3000/auth/token".to_string(),
            timeout_secs: 5,
        }
    }
}

impl CredentialConfig {
    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        let url = Url::parse(&self.token_url)
            .map_err(|e| ConfigValidationError::InvalidTokenUrl(format!("{}: {}", self.token_url, e)))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigValidationError::InvalidTokenUrl(format!(
                "{}: scheme must be http or https",
                self.token_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(ConfigValidationError::ZeroTimeout);
        }
        Ok(())
    }
}

/// Configuration validation errors.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigValidationError {
    #[error("invalid auth.token_url {0}")]
    InvalidTokenUrl(String),

    #[error("auth.timeout_secs must be greater than zero")]
    ZeroTimeout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        assert!(CredentialConfig::default().validate().is_ok());
    }

    #[test]
    fn test_rejects_relative_token_url() {
        let config = CredentialConfig {
            token_url: "/auth/token".to_string(),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigValidationError::InvalidTokenUrl(_))
        ));
    }

    #[test]
    fn test_rejects_non_http_scheme() {
        let config = CredentialConfig {
            token_url: "ftp://localhost/auth/token".to_string(),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_rejects_zero_timeout() {
        let config = CredentialConfig {
            timeout_secs: 0,
            ..Default::default()
        };
        assert_eq!(config.validate(), Err(ConfigValidationError::ZeroTimeout));
    }
}
