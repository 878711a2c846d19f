//! Stream sessions.
//!
//! A [`StreamSession`] owns exactly one upstream body and the sending half of
//! exactly one client response body. Running it pumps the first into the
//! second; when it returns, both ends have been dropped.
//!
//! A session also ends when its shutdown token is cancelled. The client body
//! then finishes cleanly.

use std::error::Error as StdError;

use axum::body::Body;
use bytes::Bytes;
use futures::Stream;
use tokio::task::JoinHandle;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, info_span, warn};
use uuid::Uuid;

use crate::backend::TaskRoute;
use crate::pump::{ChannelSink, Termination, pump};

/// Live pairing of one backend stream with one client response.
pub struct StreamSession<S> {
    id: Uuid,
    route: TaskRoute,
    source: S,
    sink: ChannelSink,
    shutdown: CancellationToken,
}

impl<S, E> StreamSession<S>
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: StdError + Send + Sync + 'static,
{
    /// Pair `source` with a fresh response body.
    ///
    /// Nothing is read from `source` until the session runs. Dropping the
    /// session unrun releases `source`, and the body then ends empty.
    pub fn open(route: TaskRoute, source: S) -> (Self, Body) {
        let (sink, rx) = ChannelSink::pair();
        let body = Body::from_stream(ReceiverStream::new(rx));
        let session = Self {
            id: Uuid::new_v4(),
            route,
            source,
            sink,
            shutdown: CancellationToken::new(),
        };
        (session, body)
    }

    /// End the session when `token` is cancelled.
    pub fn with_shutdown(mut self, token: CancellationToken) -> Self {
        self.shutdown = token;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn route(&self) -> &TaskRoute {
        &self.route
    }

    /// Relay until the backend finishes, fails, or the client goes away.
    pub async fn run(self) -> Termination {
        let Self {
            id,
            route,
            source,
            mut sink,
            shutdown,
        } = self;

        let span = info_span!(
            "stream_session",
            session_id = %id,
            agent_id = %route.agent_id(),
            task_id = route.task_id().unwrap_or("-"),
        );

        async move {
            debug!("Stream session started");
            let termination = tokio::select! {
                termination = pump(source, &mut sink) => termination,
                _ = shutdown.cancelled() => Termination::Shutdown,
            };
            drop(sink);

            match termination {
                Termination::Completed => info!(%termination, "Backend stream completed"),
                Termination::SourceError => {
                    warn!(%termination, "Backend stream dropped, closing client stream")
                }
                Termination::SinkError => debug!(%termination, "Client disconnected"),
                Termination::Shutdown => info!(%termination, "Closing stream for shutdown"),
            }
            termination
        }
        .instrument(span)
        .await
    }

    /// Run the session on its own task.
    pub fn spawn(self) -> JoinHandle<Termination> {
        tokio::spawn(self.run())
    }
}
