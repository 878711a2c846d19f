//! Application state shared across handlers.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::backend::BackendClient;
use crate::credentials::CredentialResolver;

/// Application state.
///
/// Holds only immutable, per-process collaborators. Nothing here is shared
/// between requests beyond configuration.
#[derive(Clone)]
pub struct AppState {
    /// Turns inbound headers into a bearer token.
    pub credentials: CredentialResolver,
    /// Opens event streams on the task backend.
    pub backend: BackendClient,
    /// Allowed CORS origins. Empty means any origin.
    allowed_origins: Arc<Vec<String>>,
    /// Cancelled when the server starts shutting down; open streams end.
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(credentials: CredentialResolver, backend: BackendClient) -> Self {
        Self {
            credentials,
            backend,
            allowed_origins: Arc::new(Vec::new()),
            shutdown: CancellationToken::new(),
        }
    }

    /// Tie open streams to `token`.
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// Restrict CORS to the given origins.
    pub fn with_allowed_origins(mut self, origins: Vec<String>) -> Self {
        self.allowed_origins = Arc::new(origins);
        self
    }

    pub fn allowed_origins(&self) -> &[String] {
        &self.allowed_origins
    }
}
