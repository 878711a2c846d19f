//! Task event stream proxy.
//!
//! Request flow: resolve credential, build the backend request, call the
//! backend, then hand the live body to a [`StreamSession`]. Anything that
//! fails before the session starts becomes an error status. After that the
//! 200 and SSE headers are committed and failures only end the stream.

use axum::{
    body::Body,
    http::{StatusCode, header},
    response::Response,
};
use bytes::Bytes;
use tracing::{debug, warn};

use super::error::{ApiError, ApiResult};
use super::inbound::InboundHeaders;
use super::state::AppState;
use crate::backend::{ForwardHeaders, TaskRoute};
use crate::session::StreamSession;

/// Open a backend event stream for `route` and relay it to the client.
///
/// `body` is only forwarded for [`TaskRoute::Create`].
pub async fn proxy_task_stream(
    state: &AppState,
    route: TaskRoute,
    inbound: InboundHeaders,
    body: Option<Bytes>,
) -> ApiResult<Response> {
    let authorization = match state
        .credentials
        .resolve(inbound.authorization.as_deref(), inbound.cookie.as_deref())
        .await
    {
        Ok(token) => token,
        Err(e) => {
            // The backend is the authority on auth; let it reject the request.
            warn!(
                agent_id = %route.agent_id(),
                "Credential resolution failed, forwarding without a token: {}",
                e
            );
            None
        }
    };

    let workspace_id = inbound
        .workspace_id
        .unwrap_or_else(|| state.backend.default_workspace().to_string());

    let headers = ForwardHeaders {
        authorization,
        workspace_id: Some(workspace_id),
    };
    let spec = state.backend.request_spec(&route, headers, body);
    debug!(
        agent_id = %route.agent_id(),
        authenticated = spec.headers.authorization.is_some(),
        "Proxying task stream from {}",
        spec.url
    );

    let upstream = state.backend.open(spec).await?;

    // Until spawned, the session owns the upstream response; dropping it on
    // any early return closes the backend connection.
    let (session, body) = StreamSession::open(route, upstream.bytes_stream());
    let response = sse_response(body)?;
    session
        .with_shutdown(state.shutdown_token().child_token())
        .spawn();

    Ok(response)
}

/// Build the committed SSE response around `body`.
fn sse_response(body: Body) -> ApiResult<Response> {
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "text/event-stream")
        .header(header::CACHE_CONTROL, "no-cache")
        .header(header::CONNECTION, "keep-alive")
        .header("X-Accel-Buffering", "no") // Disable nginx buffering if present
        .body(body)
        .map_err(|e| ApiError::internal(format!("failed to build SSE response: {}", e)))
}
