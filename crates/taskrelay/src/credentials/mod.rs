//! Credential resolution.
//!
//! Turns an inbound request's `Authorization` header or session cookie into
//! the bearer token forwarded to the task backend:
//! - `Authorization: Bearer <token>` is used as-is, no network call
//! - otherwise the session cookie is exchanged at the token endpoint
//!
//! Resolution failures are soft: callers log them and proceed unauthenticated.

mod config;
mod error;
mod resolver;

pub use config::{ConfigValidationError, CredentialConfig};
pub use error::{ResolutionError, ResolutionResult};
pub use resolver::{BearerToken, CredentialResolver, bearer_token_from_header};
