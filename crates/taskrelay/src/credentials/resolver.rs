//! Bearer token resolution.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use reqwest::header::COOKIE;
use serde::Deserialize;
use tracing::debug;

use super::{CredentialConfig, ResolutionError, ResolutionResult};
use crate::backend::error_chain;

/// An opaque bearer credential.
///
/// The token value never shows up in `Debug` output.
#[derive(Clone, PartialEq, Eq)]
pub struct BearerToken(String);

impl BearerToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value for an outbound `Authorization` header.
    pub fn authorization_value(&self) -> String {
        format!("Bearer {}", self.0)
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}

/// Extract a Bearer token from an Authorization header value.
pub fn bearer_token_from_header(header_value: &str) -> Result<&str, ResolutionError> {
    let mut parts = header_value.split_whitespace();
    let scheme = parts.next().ok_or(ResolutionError::InvalidAuthHeader)?;

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(ResolutionError::InvalidAuthHeader);
    }

    let token = parts.next().ok_or(ResolutionError::InvalidAuthHeader)?;
    if token.is_empty() {
        return Err(ResolutionError::InvalidAuthHeader);
    }

    if parts.next().is_some() {
        return Err(ResolutionError::InvalidAuthHeader);
    }

    Ok(token)
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    token: String,
}

/// Resolves the bearer token for one inbound request.
#[derive(Debug, Clone)]
pub struct CredentialResolver {
    client: Client,
    token_url: Arc<str>,
}

impl CredentialResolver {
    /// Create a resolver that exchanges session cookies at `config.token_url`.
    pub fn new(config: &CredentialConfig) -> ResolutionResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(ResolutionError::Client)?;

        Ok(Self {
            client,
            token_url: Arc::from(config.token_url.as_str()),
        })
    }

    pub fn token_url(&self) -> &str {
        &self.token_url
    }

    /// Resolve a bearer token from the inbound `Authorization` and `Cookie`
    /// header values.
    ///
    /// Returns `Ok(None)` when the request carries neither a usable bearer
    /// header nor a cookie. A usable bearer header never causes network I/O.
    pub async fn resolve(
        &self,
        authorization: Option<&str>,
        cookie: Option<&str>,
    ) -> ResolutionResult<Option<BearerToken>> {
        if let Some(value) = authorization {
            match bearer_token_from_header(value) {
                Ok(token) => return Ok(Some(BearerToken::new(token))),
                Err(e) => debug!("Ignoring authorization header: {}", e),
            }
        }

        let Some(cookie) = cookie.filter(|c| !c.trim().is_empty()) else {
            return Ok(None);
        };

        self.fetch_token(cookie).await.map(Some)
    }

    async fn fetch_token(&self, cookie: &str) -> ResolutionResult<BearerToken> {
        debug!("Exchanging session cookie at {}", self.token_url);

        let response = self
            .client
            .get(self.token_url.as_ref())
            .header(COOKIE, cookie)
            .send()
            .await
            .map_err(|e| ResolutionError::Request {
                url: self.token_url.to_string(),
                message: error_chain(&e),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolutionError::Rejected {
                status: status.as_u16(),
            });
        }

        let body: TokenResponse = response
            .json()
            .await
            .map_err(|e| ResolutionError::MalformedResponse(e.to_string()))?;

        if body.token.trim().is_empty() {
            return Err(ResolutionError::EmptyToken);
        }

        Ok(BearerToken::new(body.token))
    }
}
