//! Outbound request assembly for the task backend.

use bytes::Bytes;
use reqwest::Method;
use reqwest::header::{ACCEPT, AUTHORIZATION, CACHE_CONTROL, CONTENT_TYPE, HeaderMap, HeaderValue};

use super::{BackendError, BackendResult};
use crate::credentials::BearerToken;

/// Workspace scoping header understood by the task backend.
pub const WORKSPACE_HEADER: &str = "x-workspace-id";

/// The two backend routes the proxy can open a stream on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TaskRoute {
    /// Stream events of an existing task.
    Events { agent_id: String, task_id: String },
    /// Create a task and stream its events.
    Create { agent_id: String },
}

impl TaskRoute {
    pub fn agent_id(&self) -> &str {
        match self {
            Self::Events { agent_id, .. } | Self::Create { agent_id } => agent_id,
        }
    }

    pub fn task_id(&self) -> Option<&str> {
        match self {
            Self::Events { task_id, .. } => Some(task_id),
            Self::Create { .. } => None,
        }
    }

    pub fn method(&self) -> Method {
        match self {
            Self::Events { .. } => Method::GET,
            Self::Create { .. } => Method::POST,
        }
    }

    /// Path below the backend base URL, with ids percent-encoded.
    fn path(&self) -> String {
        match self {
            Self::Events { agent_id, task_id } => format!(
                "v1/agents/{}/tasks/{}/events/stream",
                urlencoding::encode(agent_id),
                urlencoding::encode(task_id)
            ),
            Self::Create { agent_id } => {
                format!("v1/agents/{}/tasks/", urlencoding::encode(agent_id))
            }
        }
    }
}

/// Headers carried over from the inbound request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ForwardHeaders {
    pub authorization: Option<BearerToken>,
    pub workspace_id: Option<String>,
}

/// A fully assembled backend request. Built once, consumed once.
#[derive(Debug, Clone)]
pub struct BackendRequestSpec {
    pub method: Method,
    pub url: String,
    pub headers: ForwardHeaders,
    pub body: Option<Bytes>,
}

impl BackendRequestSpec {
    /// Assemble the request for `route` against `base_url`.
    ///
    /// Only the create route carries a body; a body passed for the events
    /// route is dropped.
    pub fn build(
        base_url: &str,
        route: &TaskRoute,
        headers: ForwardHeaders,
        body: Option<Bytes>,
    ) -> Self {
        let url = format!("{}/{}", base_url.trim_end_matches('/'), route.path());
        let body = match route {
            TaskRoute::Create { .. } => Some(body.unwrap_or_default()),
            TaskRoute::Events { .. } => None,
        };

        Self {
            method: route.method(),
            url,
            headers,
            body,
        }
    }

    /// Materialize the outbound header set.
    pub fn header_map(&self) -> BackendResult<HeaderMap> {
        let mut map = HeaderMap::new();
        map.insert(ACCEPT, HeaderValue::from_static("text/event-stream"));
        map.insert(CACHE_CONTROL, HeaderValue::from_static("no-cache"));

        if let Some(ref token) = self.headers.authorization {
            let value = HeaderValue::from_str(&token.authorization_value()).map_err(|e| {
                BackendError::InvalidHeader {
                    name: "authorization",
                    message: e.to_string(),
                }
            })?;
            map.insert(AUTHORIZATION, value);
        }

        if let Some(ref workspace_id) = self.headers.workspace_id {
            let value =
                HeaderValue::from_str(workspace_id).map_err(|e| BackendError::InvalidHeader {
                    name: WORKSPACE_HEADER,
                    message: e.to_string(),
                })?;
            map.insert(WORKSPACE_HEADER, value);
        }

        if self.body.is_some() {
            map.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        Ok(map)
    }
}
