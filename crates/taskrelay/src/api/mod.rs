//! HTTP API module.
//!
//! Exposes the task event stream endpoints and the proxy that serves them.

mod error;
mod handlers;
mod inbound;
mod proxy;
mod routes;
mod state;

pub use error::{ApiError, ApiResult};
pub use inbound::InboundHeaders;
pub use proxy::proxy_task_stream;
pub use routes::create_router;
pub use state::AppState;
