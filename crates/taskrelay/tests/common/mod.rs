//! Test utilities: a scriptable task backend, a token endpoint, and the proxy
//! router wired to both.
#![allow(dead_code)]

use std::convert::Infallible;
use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::{
    Json, Router,
    body::Body,
    extract::State,
    http::{HeaderMap, Method, StatusCode, Uri, header},
    response::{IntoResponse, Response},
    routing::get,
};
use bytes::Bytes;
use futures::StreamExt;
use futures::stream;
use serde_json::json;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use taskrelay::api::{AppState, create_router};
use taskrelay::backend::{BackendClient, BackendConfig};
use taskrelay::credentials::{CredentialConfig, CredentialResolver};

/// Serve `router` on an ephemeral local port.
pub async fn serve(router: Router) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    addr
}

/// Serve `router` until `shutdown` is cancelled, then drain gracefully.
pub async fn serve_until(router: Router, shutdown: CancellationToken) -> (SocketAddr, JoinHandle<()>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let handle = tokio::spawn(async move {
        axum::serve(listener, router)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await
            .unwrap();
    });
    (addr, handle)
}

/// A local port with nothing listening on it.
pub fn unused_port() -> u16 {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

/// One request as the fake backend saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl RecordedRequest {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

/// What the fake backend answers with.
#[derive(Clone)]
pub enum Reply {
    /// Stream these chunks, then end.
    Stream(Vec<&'static str>),
    /// Send `first`, wait for `gate`, send `rest`, then end.
    Gated {
        first: &'static str,
        rest: &'static str,
        gate: Arc<Notify>,
    },
    /// Send a comment line every `interval` until the connection goes away.
    /// `released` counts dropped response bodies.
    Heartbeat {
        interval: Duration,
        released: Arc<AtomicUsize>,
    },
    /// Send `first`, then break the connection.
    FailAfter(&'static str),
    /// Answer 307 pointing at `location`.
    Redirect(&'static str),
    /// Refuse with `status` and a plain-text body.
    Reject {
        status: StatusCode,
        body: &'static str,
    },
}

#[derive(Clone)]
struct BackendState {
    reply: Reply,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

/// Task backend stand-in that records every request it receives.
pub struct FakeBackend {
    pub addr: SocketAddr,
    requests: Arc<Mutex<Vec<RecordedRequest>>>,
}

impl FakeBackend {
    pub async fn start(reply: Reply) -> Self {
        let requests = Arc::new(Mutex::new(Vec::new()));
        let state = BackendState {
            reply,
            requests: requests.clone(),
        };
        let router = Router::new().fallback(backend_handler).with_state(state);
        let addr = serve(router).await;
        Self { addr, requests }
    }

    pub fn base_url(&self) -> String {
        format!("http://{}", self.addr)
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// The single request received so far.
    pub fn only_request(&self) -> RecordedRequest {
        let requests = self.requests();
        assert_eq!(requests.len(), 1, "expected exactly one backend request");
        requests.into_iter().next().unwrap()
    }
}

/// Increments a counter when dropped.
struct ReleaseGuard(Arc<AtomicUsize>);

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

fn event_stream(body: Body) -> Response {
    ([(header::CONTENT_TYPE, "text/event-stream")], body).into_response()
}

async fn backend_handler(
    State(state): State<BackendState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    state.requests.lock().unwrap().push(RecordedRequest {
        method,
        path: uri.path().to_string(),
        headers,
        body,
    });

    match state.reply {
        Reply::Stream(chunks) => {
            let frames = chunks
                .into_iter()
                .map(|c| Ok::<_, Infallible>(Bytes::from_static(c.as_bytes())));
            event_stream(Body::from_stream(stream::iter(frames)))
        }
        Reply::Gated { first, rest, gate } => {
            let frames = stream::once(async move {
                Ok::<_, Infallible>(Bytes::from_static(first.as_bytes()))
            })
            .chain(stream::once(async move {
                gate.notified().await;
                Ok::<_, Infallible>(Bytes::from_static(rest.as_bytes()))
            }));
            event_stream(Body::from_stream(frames))
        }
        Reply::Heartbeat { interval, released } => {
            let guard = ReleaseGuard(released);
            let frames = stream::unfold(guard, move |guard| async move {
                tokio::time::sleep(interval).await;
                Some((Ok::<_, Infallible>(Bytes::from_static(b": ping\n\n")), guard))
            });
            event_stream(Body::from_stream(frames))
        }
        Reply::FailAfter(first) => {
            let frames = stream::iter([Ok::<_, io::Error>(Bytes::from_static(first.as_bytes()))])
                .chain(stream::once(async {
                    tokio::time::sleep(Duration::from_millis(100)).await;
                    Err(io::Error::other("backend crashed"))
                }));
            event_stream(Body::from_stream(frames))
        }
        Reply::Redirect(location) => (
            StatusCode::TEMPORARY_REDIRECT,
            [(header::LOCATION, location)],
        )
            .into_response(),
        Reply::Reject { status, body } => {
            (status, [(header::CONTENT_TYPE, "text/plain")], body).into_response()
        }
    }
}

#[derive(Clone)]
struct TokenState {
    valid_cookie: &'static str,
    token: &'static str,
    cookies: Arc<Mutex<Vec<Option<String>>>>,
}

/// Web application stand-in that trades a session cookie for a token.
pub struct FakeTokenServer {
    pub addr: SocketAddr,
    cookies: Arc<Mutex<Vec<Option<String>>>>,
}

impl FakeTokenServer {
    /// Answers `{"token": token}` when the cookie contains `valid_cookie`,
    /// 401 otherwise.
    pub async fn start(valid_cookie: &'static str, token: &'static str) -> Self {
        let cookies = Arc::new(Mutex::new(Vec::new()));
        let state = TokenState {
            valid_cookie,
            token,
            cookies: cookies.clone(),
        };
        let router = Router::new()
            .route("/auth/token", get(token_handler))
            .with_state(state);
        let addr = serve(router).await;
        Self { addr, cookies }
    }

    pub fn token_url(&self) -> String {
        format!("http://{}/auth/token", self.addr)
    }

    /// Cookie header of every token request, in order.
    pub fn calls(&self) -> Vec<Option<String>> {
        self.cookies.lock().unwrap().clone()
    }
}

async fn token_handler(State(state): State<TokenState>, headers: HeaderMap) -> Response {
    let cookie = headers
        .get(header::COOKIE)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.cookies.lock().unwrap().push(cookie.clone());

    match cookie {
        Some(c) if c.contains(state.valid_cookie) => {
            Json(json!({ "token": state.token })).into_response()
        }
        _ => (StatusCode::UNAUTHORIZED, "not signed in").into_response(),
    }
}

pub fn backend_config(base_url: impl Into<String>) -> BackendConfig {
    BackendConfig {
        base_url: base_url.into(),
        connect_timeout_secs: 2,
        default_workspace: "default".to_string(),
    }
}

pub fn test_state(backend_url: impl Into<String>, token_url: impl Into<String>) -> AppState {
    let credentials = CredentialResolver::new(&CredentialConfig {
        token_url: token_url.into(),
        timeout_secs: 2,
    })
    .unwrap();
    let backend = BackendClient::new(backend_config(backend_url)).unwrap();
    AppState::new(credentials, backend)
}

/// Proxy router talking to `backend_url`, with a token endpoint nobody
/// listens on.
pub fn test_app(backend_url: impl Into<String>) -> Router {
    let token_url = format!("http://127.0.0.1:{}/auth/token", unused_port());
    create_router(test_state(backend_url, token_url))
}

pub fn test_app_with_tokens(backend_url: impl Into<String>, token_url: impl Into<String>) -> Router {
    create_router(test_state(backend_url, token_url))
}
