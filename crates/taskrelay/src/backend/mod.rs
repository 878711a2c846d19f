//! Task backend access.
//!
//! [`BackendRequestSpec`] is pure data assembly for the two backend routes;
//! [`BackendClient`] sends a spec and hands back the live response only when
//! the backend accepted it.

mod client;
mod config;
mod error;
mod request;

pub use client::BackendClient;
pub use config::{BackendConfig, ConfigValidationError};
pub use error::{BackendError, BackendResult};
pub(crate) use error::error_chain;
pub use request::{BackendRequestSpec, ForwardHeaders, TaskRoute, WORKSPACE_HEADER};
