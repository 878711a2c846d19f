//! Task backend error types.

use std::error::Error as StdError;

use reqwest::StatusCode;
use thiserror::Error;

/// Result type for backend operations.
pub type BackendResult<T> = Result<T, BackendError>;

/// Errors that can occur before a backend stream is handed out.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The HTTP client could not be built.
    #[error("failed to create backend client: {0}")]
    Client(#[source] reqwest::Error),

    /// An outbound header value could not be encoded.
    #[error("invalid outbound {name} header: {message}")]
    InvalidHeader { name: &'static str, message: String },

    /// Transport-level failure reaching the backend.
    #[error("failed to reach task backend at {url}: {message}")]
    Unreachable { url: String, message: String },

    /// The backend answered with a non-2xx status.
    #[error("{}", rejection_message(.status, .detail))]
    Rejected { status: StatusCode, detail: String },
}

fn rejection_message(status: &StatusCode, detail: &str) -> String {
    if detail.is_empty() {
        format!("task backend responded with {}", status)
    } else {
        format!("task backend responded with {}: {}", status, detail)
    }
}

/// Render an error with its source chain, e.g.
/// "error sending request: client error (Connect): connection refused".
pub(crate) fn error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        let text = cause.to_string();
        if !message.contains(&text) {
            message.push_str(": ");
            message.push_str(&text);
        }
        source = cause.source();
    }
    message
}
