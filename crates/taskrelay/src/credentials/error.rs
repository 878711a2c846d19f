//! Credential resolution errors.

use thiserror::Error;

/// Result type for credential resolution.
pub type ResolutionResult<T> = Result<T, ResolutionError>;

/// Errors that can occur while resolving a bearer token.
#[derive(Debug, Error)]
pub enum ResolutionError {
    /// Authorization header is not `Bearer <token>`.
    #[error("invalid authorization header format")]
    InvalidAuthHeader,

    /// The HTTP client for the token endpoint could not be built.
    #[error("failed to create token client: {0}")]
    Client(#[source] reqwest::Error),

    /// The token endpoint could not be reached.
    #[error("token request to {url} failed: {message}")]
    Request { url: String, message: String },

    /// The token endpoint answered with a non-2xx status.
    #[error("token endpoint rejected the session (status {status})")]
    Rejected { status: u16 },

    /// The token endpoint answered 2xx but the body was not `{ "token": "..." }`.
    #[error("malformed token response: {0}")]
    MalformedResponse(String),

    /// The token endpoint returned an empty token.
    #[error("token endpoint returned an empty token")]
    EmptyToken,
}
