//! Task backend HTTP client.

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use futures::StreamExt;
use reqwest::{Client, Response};
use tracing::debug;

use super::error::error_chain;
use super::{BackendConfig, BackendError, BackendRequestSpec, BackendResult, ForwardHeaders, TaskRoute};

/// Most of a rejection body kept for the error message.
const MAX_ERROR_BODY_BYTES: usize = 8 * 1024;

/// How long to wait for a rejection body before giving up on it.
const ERROR_BODY_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for opening event streams on the task backend.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    config: Arc<BackendConfig>,
}

impl BackendClient {
    /// Create a new backend client.
    ///
    /// Idle connections are not kept: every stream gets its own upstream
    /// connection, closed when the stream is dropped. Redirects are not
    /// followed; a 3xx is a rejection like any other non-2xx status.
    pub fn new(config: BackendConfig) -> BackendResult<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .pool_max_idle_per_host(0)
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(BackendError::Client)?;

        Ok(Self {
            client,
            config: Arc::new(config),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Workspace forwarded when the inbound request names none.
    pub fn default_workspace(&self) -> &str {
        &self.config.default_workspace
    }

    /// Assemble the request for `route` against the configured base URL.
    pub fn request_spec(
        &self,
        route: &TaskRoute,
        headers: ForwardHeaders,
        body: Option<Bytes>,
    ) -> BackendRequestSpec {
        BackendRequestSpec::build(&self.config.base_url, route, headers, body)
    }

    /// Send `spec` and return the response if the backend accepted it.
    ///
    /// A non-2xx response is drained (bounded) into
    /// [`BackendError::Rejected`] and its connection released.
    pub async fn open(&self, spec: BackendRequestSpec) -> BackendResult<Response> {
        let headers = spec.header_map()?;
        let BackendRequestSpec {
            method, url, body, ..
        } = spec;

        debug!("Opening backend stream: {} {}", method, url);

        let mut request = self.client.request(method, &url).headers(headers);
        if let Some(body) = body {
            request = request.body(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BackendError::Unreachable {
                url: url.clone(),
                message: error_chain(&e),
            })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let detail = read_error_body(response).await;
        Err(BackendError::Rejected { status, detail })
    }
}

/// Read at most [`MAX_ERROR_BODY_BYTES`] of a rejection body as text.
async fn read_error_body(response: Response) -> String {
    let mut stream = response.bytes_stream();
    let mut buf: Vec<u8> = Vec::new();

    let collect = async {
        while let Some(Ok(chunk)) = stream.next().await {
            let remaining = MAX_ERROR_BODY_BYTES - buf.len();
            buf.extend_from_slice(&chunk[..chunk.len().min(remaining)]);
            if buf.len() >= MAX_ERROR_BODY_BYTES {
                break;
            }
        }
    };

    if tokio::time::timeout(ERROR_BODY_TIMEOUT, collect).await.is_err() {
        debug!("Timed out reading backend error body");
    }

    String::from_utf8_lossy(&buf).trim().to_string()
}
