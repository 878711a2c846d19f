//! API route definitions.

use axum::http::{HeaderValue, Method, header};
use axum::{
    Router,
    routing::{get, post},
};
use tower_http::cors::{AllowHeaders, AllowOrigin, Any, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use super::handlers;
use super::state::AppState;

/// Create the application router.
pub fn create_router(state: AppState) -> Router {
    let cors = build_cors_layer(&state);
    let open_cors = state.allowed_origins().is_empty();

    // Tracing layer with request IDs and timing
    let trace_layer = TraceLayer::new_for_http()
        .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
        .on_request(DefaultOnRequest::new().level(Level::INFO))
        .on_response(DefaultOnResponse::new().level(Level::INFO));

    let router = Router::new()
        .route("/health", get(handlers::health))
        // Existing task: stream its events
        .route("/events/stream", get(handlers::stream_task_events))
        .route(
            "/agents/{agent_id}/tasks/{task_id}/events/stream",
            get(handlers::stream_task_events_by_path),
        )
        // New task: create it and stream its events
        .route("/tasks", post(handlers::create_task))
        .route("/agents/{agent_id}/tasks", post(handlers::create_task_by_path))
        .with_state(state)
        .layer(cors);

    // Wildcard origin on every response, including ones CORS left alone.
    let router = if open_cors {
        router.layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_ORIGIN,
            HeaderValue::from_static("*"),
        ))
    } else {
        router
    };

    router.layer(trace_layer)
}

/// Build the CORS layer based on configuration.
///
/// With no configured origins any origin may read the streams, without
/// credentials. Configured origins may also send cookies.
fn build_cors_layer(state: &AppState) -> CorsLayer {
    let methods = [Method::GET, Method::POST, Method::OPTIONS];

    let allowed_origins = state.allowed_origins();
    if allowed_origins.is_empty() {
        return CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(methods)
            .allow_headers(Any);
    }

    let headers = [
        header::AUTHORIZATION,
        header::CONTENT_TYPE,
        header::ACCEPT,
        header::CACHE_CONTROL,
        header::HeaderName::from_static(crate::backend::WORKSPACE_HEADER),
    ];

    let origins: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| {
            origin.parse::<HeaderValue>().ok().or_else(|| {
                tracing::warn!("CORS: Invalid origin in config: {}", origin);
                None
            })
        })
        .collect();

    if origins.is_empty() {
        tracing::error!("CORS: All configured origins are invalid!");
        CorsLayer::new().allow_origin(AllowOrigin::exact(HeaderValue::from_static("null")))
    } else {
        tracing::info!("CORS: Allowing {} origin(s)", origins.len());
        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods(methods)
            .allow_headers(AllowHeaders::list(headers))
            .allow_credentials(true)
    }
}
