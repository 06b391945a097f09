//! HTTP surface: the Events API endpoint and a health probe.

use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::Router;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};
use watch::{CommandRequest, CommandService, NotificationSink};

use crate::events::Envelope;
use crate::signature::{SignatureError, SigningSecret};

const TIMESTAMP_HEADER: &str = "x-slack-request-timestamp";
const SIGNATURE_HEADER: &str = "x-slack-signature";
const RETRY_HEADER: &str = "x-slack-retry-num";

/// Shared state of the receiver.
#[derive(Clone)]
pub struct ListenerState {
    secret: SigningSecret,
    commands: Arc<dyn CommandService>,
    replies: Arc<dyn NotificationSink>,
    tasks: TaskTracker,
}

impl ListenerState {
    pub fn new(
        secret: SigningSecret,
        commands: Arc<dyn CommandService>,
        replies: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            secret,
            commands,
            replies,
            tasks: TaskTracker::new(),
        }
    }

    /// Tracker of in-flight command tasks, for draining on shutdown.
    pub fn tasks(&self) -> &TaskTracker {
        &self.tasks
    }

    fn dispatch(&self, request: CommandRequest) {
        let commands = Arc::clone(&self.commands);
        let replies = Arc::clone(&self.replies);
        self.tasks.spawn(async move {
            let channel = request.channel.clone();
            let user = request.user.clone();
            let reply = commands.handle(request).await;
            if let Err(err) = replies.post(&channel, &reply).await {
                warn!(%channel, %user, error = %err, "failed to post command reply");
            }
        });
    }
}

impl std::fmt::Debug for ListenerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ListenerState").finish_non_exhaustive()
    }
}

/// Builds the receiver's router.
pub fn router(state: ListenerState) -> Router {
    Router::new()
        .route("/slack/events", post(slack_events))
        .route("/healthz", get(healthz))
        .with_state(state)
}

/// Serves `router` on `listener` until `shutdown` is cancelled.
pub async fn serve(
    listener: TcpListener,
    router: Router,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    if let Ok(addr) = listener.local_addr() {
        info!(%addr, "slack events listener started");
    }
    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

fn header<'a>(headers: &'a HeaderMap, name: &'static str) -> Result<&'a str, SignatureError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .ok_or(SignatureError::MissingHeader(name))
}

fn verify(state: &ListenerState, headers: &HeaderMap, body: &[u8]) -> Result<(), SignatureError> {
    let timestamp = header(headers, TIMESTAMP_HEADER)?;
    let signature = header(headers, SIGNATURE_HEADER)?;
    state
        .secret
        .verify(timestamp, signature, body, chrono::Utc::now().timestamp())
}

async fn slack_events(
    State(state): State<ListenerState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    if let Err(err) = verify(&state, &headers, &body) {
        warn!(error = %err, "refused unsigned slack request");
        return StatusCode::UNAUTHORIZED.into_response();
    }

    let envelope: Envelope = match serde_json::from_slice(&body) {
        Ok(envelope) => envelope,
        Err(err) => {
            warn!(error = %err, "unreadable slack event payload");
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    match envelope {
        Envelope::UrlVerification { challenge } => challenge.into_response(),
        Envelope::EventCallback { event } => {
            if let Some(retry) = headers.get(RETRY_HEADER) {
                debug!(?retry, "ignoring slack redelivery");
                return StatusCode::OK.into_response();
            }
            match event.command_request() {
                Some(request) => {
                    info!(user = %request.user, channel = %request.channel, "chat command received");
                    state.dispatch(request);
                }
                None => debug!(kind = %event.kind, "ignoring slack event"),
            }
            StatusCode::OK.into_response()
        }
        Envelope::Unsupported => StatusCode::OK.into_response(),
    }
}
