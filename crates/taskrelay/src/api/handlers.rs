//! HTTP request handlers.

use axum::{
    Json,
    extract::{Path, Query, State},
    response::Response,
};
use bytes::Bytes;
use serde::{Deserialize, Serialize, de::IgnoredAny};

use super::error::{ApiError, ApiResult};
use super::inbound::InboundHeaders;
use super::proxy::proxy_task_stream;
use super::state::AppState;
use crate::backend::TaskRoute;

/// Health check response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Health check endpoint.
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Query for `GET /events/stream`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventsQuery {
    pub agent_id: Option<String>,
    pub task_id: Option<String>,
}

/// Query for `POST /tasks`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskQuery {
    pub agent_id: Option<String>,
}

fn require(name: &str, value: Option<String>) -> ApiResult<String> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        _ => Err(ApiError::bad_request(format!("{} is required", name))),
    }
}

/// Check the task payload is JSON. Its schema is the backend's business.
fn check_json(body: &Bytes) -> ApiResult<()> {
    serde_json::from_slice::<IgnoredAny>(body)
        .map(|_| ())
        .map_err(|e| ApiError::bad_request(format!("request body must be valid JSON: {}", e)))
}

/// Stream events of an existing task.
///
/// Route: GET /events/stream?agentId=&taskId=
pub async fn stream_task_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
    inbound: InboundHeaders,
) -> ApiResult<Response> {
    let route = TaskRoute::Events {
        agent_id: require("agentId", query.agent_id)?,
        task_id: require("taskId", query.task_id)?,
    };
    proxy_task_stream(&state, route, inbound, None).await
}

/// Stream events of an existing task.
///
/// Route: GET /agents/{agent_id}/tasks/{task_id}/events/stream
pub async fn stream_task_events_by_path(
    State(state): State<AppState>,
    Path((agent_id, task_id)): Path<(String, String)>,
    inbound: InboundHeaders,
) -> ApiResult<Response> {
    let route = TaskRoute::Events {
        agent_id: require("agentId", Some(agent_id))?,
        task_id: require("taskId", Some(task_id))?,
    };
    proxy_task_stream(&state, route, inbound, None).await
}

/// Create a task and stream its events.
///
/// Route: POST /tasks?agentId=
pub async fn create_task(
    State(state): State<AppState>,
    Query(query): Query<CreateTaskQuery>,
    inbound: InboundHeaders,
    body: Bytes,
) -> ApiResult<Response> {
    let route = TaskRoute::Create {
        agent_id: require("agentId", query.agent_id)?,
    };
    check_json(&body)?;
    proxy_task_stream(&state, route, inbound, Some(body)).await
}

/// Create a task and stream its events.
///
/// Route: POST /agents/{agent_id}/tasks
pub async fn create_task_by_path(
    State(state): State<AppState>,
    Path(agent_id): Path<String>,
    inbound: InboundHeaders,
    body: Bytes,
) -> ApiResult<Response> {
    let route = TaskRoute::Create {
        agent_id: require("agentId", Some(agent_id))?,
    };
    check_json(&body)?;
    proxy_task_stream(&state, route, inbound, Some(body)).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_require_rejects_missing_and_blank() {
        assert!(require("agentId", None).is_err());
        assert!(require("agentId", Some("  ".to_string())).is_err());
        assert_eq!(require("agentId", Some("a1".to_string())).unwrap(), "a1");
    }

    #[test]
    fn test_check_json() {
        assert!(check_json(&Bytes::from_static(br#"{"description":"say hi"}"#)).is_ok());
        assert!(check_json(&Bytes::from_static(b"[1, 2]")).is_ok());
        assert!(check_json(&Bytes::from_static(b"{not json")).is_err());
        assert!(check_json(&Bytes::new()).is_err());
    }
}
