//! Relay WebSocket handler
//!
//! Each browser connection gets a [`CallSession`] state machine and a driver
//! that executes its [`SessionAction`]s against the two sockets:
//!
//! - a sender task owns the browser socket's write half
//! - an upstream task opens the provider socket, then owns its read half
//! - the driver loop owns the provider write half and the handshake timer

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade, rejection::WebSocketUpgradeRejection},
    },
    http::StatusCode,
    response::{IntoResponse, Response},
};
use futures::{SinkExt, StreamExt};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::select;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{Duration, Instant};
use tokio_tungstenite::tungstenite::Message as UpstreamMessage;
use tracing::{debug, error, info, warn};
use uuid::Uuid;
use zeroize::Zeroizing;

use crate::core::relay::{CallSession, RelayError, SessionAction, SessionStage};
use crate::state::AppState;

use super::messages::{RelayMessageRoute, UpstreamEvent, UpstreamSink};

/// Optimized channel buffer size for audio workloads
const CHANNEL_BUFFER_SIZE: usize = 1024;

/// Maximum WebSocket frame size (10 MB)
const MAX_WS_FRAME_SIZE: usize = 10 * 1024 * 1024;

/// Maximum WebSocket message size (10 MB)
const MAX_WS_MESSAGE_SIZE: usize = 10 * 1024 * 1024;

/// How long queued frames may take to reach the browser after the session ends
const SENDER_DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

/// Relay WebSocket handler
///
/// Upgrades the HTTP connection to a WebSocket carrying one call. Requests
/// that are not WebSocket upgrades get `400 Expected WebSocket connection`.
pub async fn relay_handler(
    ws: Result<WebSocketUpgrade, WebSocketUpgradeRejection>,
    State(state): State<Arc<AppState>>,
) -> Response {
    let ws = match ws {
        Ok(ws) => ws,
        Err(rejection) => {
            debug!(reason = %rejection, "Rejected non-WebSocket request on relay endpoint");
            return (StatusCode::BAD_REQUEST, "Expected WebSocket connection").into_response();
        }
    };

    info!("Relay WebSocket connection upgrade requested");

    ws.max_frame_size(MAX_WS_FRAME_SIZE)
        .max_message_size(MAX_WS_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_relay_socket(socket, state))
}

/// Handle one browser connection from upgrade to teardown
async fn handle_relay_socket(socket: WebSocket, state: Arc<AppState>) {
    let session_id = Uuid::new_v4();
    state.sessions.register(session_id);
    info!(%session_id, "Relay WebSocket connection established");

    let (mut sender, mut receiver) = socket.split();
    let (message_tx, mut message_rx) = mpsc::channel::<RelayMessageRoute>(CHANNEL_BUFFER_SIZE);

    // Sender task for outgoing messages
    let sender_task = tokio::spawn(async move {
        while let Some(route) = message_rx.recv().await {
            let result = match route {
                RelayMessageRoute::Outgoing(text) => sender.send(Message::Text(text.into())).await,
                RelayMessageRoute::Close => {
                    info!("Closing relay WebSocket connection");
                    let _ = sender.send(Message::Close(None)).await;
                    break;
                }
            };

            if let Err(e) = result {
                error!("Failed to send WebSocket message: {}", e);
                break;
            }
        }
    });

    let (events_tx, mut events_rx) = mpsc::channel::<UpstreamEvent>(CHANNEL_BUFFER_SIZE);
    let mut driver = RelayDriver::new(session_id, state.clone(), message_tx, events_tx);

    match state.config.resolve_api_key() {
        Some(key) => driver.api_key = Some(Zeroizing::new(key)),
        None => {
            let actions = driver
                .session
                .reject_missing_credential(&state.config.api_key_env);
            driver.apply(actions).await;
        }
    }

    while !driver.client_closing {
        select! {
            msg_result = receiver.next() => {
                match msg_result {
                    Some(Ok(Message::Text(text))) => {
                        debug!(%session_id, "Received text message: {} bytes", text.as_str().len());
                        let actions = driver.session.on_client_text(text.as_str());
                        driver.apply(actions).await;
                    }
                    Some(Ok(Message::Binary(data))) => {
                        let actions = driver.session.on_client_binary(data.len());
                        driver.apply(actions).await;
                    }
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => {}
                    Some(Ok(Message::Close(_))) => {
                        info!(%session_id, "Relay WebSocket close received");
                        break;
                    }
                    Some(Err(e)) => {
                        warn!(%session_id, "Relay WebSocket error: {}", e);
                        break;
                    }
                    None => {
                        info!(%session_id, "Relay WebSocket connection closed by client");
                        break;
                    }
                }
            }
            Some(event) = events_rx.recv() => {
                driver.on_upstream_event(event).await;
            }
            _ = handshake_timer(driver.handshake_deadline) => {
                let timeout_secs = state.config.upstream.handshake_timeout_secs;
                let actions = driver.session.on_handshake_timeout(timeout_secs);
                driver.apply(actions).await;
            }
        }
    }

    // Cleanup
    let actions = driver.session.on_client_closed();
    driver.apply(actions).await;
    driver.shutdown_upstream().await;
    drop(driver);

    if tokio::time::timeout(SENDER_DRAIN_TIMEOUT, sender_task)
        .await
        .is_err()
    {
        debug!(%session_id, "Sender task did not drain in time");
    }

    state.sessions.remove(&session_id);
    info!(%session_id, "Relay WebSocket connection terminated");
}

/// Resolves at `deadline`, or never when there is none.
async fn handshake_timer(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => tokio::time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}

/// Executes session actions for one connection.
struct RelayDriver {
    session: CallSession,
    state: Arc<AppState>,
    message_tx: mpsc::Sender<RelayMessageRoute>,
    events_tx: mpsc::Sender<UpstreamEvent>,
    api_key: Option<Zeroizing<String>>,
    upstream_sink: Option<UpstreamSink>,
    upstream_task: Option<JoinHandle<()>>,
    handshake_deadline: Option<Instant>,
    client_closing: bool,
}

impl RelayDriver {
    fn new(
        session_id: Uuid,
        state: Arc<AppState>,
        message_tx: mpsc::Sender<RelayMessageRoute>,
        events_tx: mpsc::Sender<UpstreamEvent>,
    ) -> Self {
        let settings = Arc::new(state.config.upstream.clone());
        Self {
            session: CallSession::new(session_id, settings),
            state,
            message_tx,
            events_tx,
            api_key: None,
            upstream_sink: None,
            upstream_task: None,
            handshake_deadline: None,
            client_closing: false,
        }
    }

    fn id(&self) -> Uuid {
        self.session.id()
    }

    async fn apply(&mut self, actions: Vec<SessionAction>) {
        // Stage changes are visible before their side effects
        self.state.sessions.update(self.id(), self.session.stage());
        let mut queue: VecDeque<SessionAction> = actions.into();

        while let Some(action) = queue.pop_front() {
            match action {
                SessionAction::ToClient(text) => {
                    if self
                        .message_tx
                        .send(RelayMessageRoute::Outgoing(text))
                        .await
                        .is_err()
                    {
                        debug!(session_id = %self.id(), "Client sender already gone");
                        self.client_closing = true;
                    }
                }
                SessionAction::ToUpstream(text) => {
                    if let Err(reason) = self.send_upstream(text).await {
                        self.shutdown_upstream().await;
                        queue.extend(self.session.on_upstream_ended(Some(&reason)));
                    }
                }
                SessionAction::OpenUpstream => self.open_upstream(),
                SessionAction::CloseUpstream => self.shutdown_upstream().await,
                SessionAction::CloseClient => {
                    let _ = self.message_tx.send(RelayMessageRoute::Close).await;
                    self.client_closing = true;
                }
            }
        }

        let stage = self.session.stage();
        if !matches!(
            stage,
            SessionStage::UpstreamConnecting | SessionStage::UpstreamHandshaking
        ) {
            self.handshake_deadline = None;
        }
        self.state.sessions.update(self.id(), stage);
    }

    async fn send_upstream(&mut self, text: String) -> Result<(), String> {
        let Some(sink) = self.upstream_sink.as_mut() else {
            warn!(session_id = %self.id(), "No upstream socket to forward to");
            return Ok(());
        };
        sink.send(UpstreamMessage::Text(text.into()))
            .await
            .map_err(|e| e.to_string())
    }

    fn open_upstream(&mut self) {
        let Some(api_key) = self.api_key.clone() else {
            // Sessions without a credential never reach OpenUpstream
            error!(session_id = %self.id(), "Upstream requested without a credential");
            return;
        };

        self.handshake_deadline = self
            .state
            .config
            .upstream
            .handshake_timeout()
            .map(|timeout| Instant::now() + timeout);

        let connector = self.state.connector.clone();
        let events = self.events_tx.clone();
        let session_id = self.id();

        self.upstream_task = Some(tokio::spawn(async move {
            let socket = match connector.connect(&api_key).await {
                Ok(socket) => socket,
                Err(e) => {
                    let reason = match e {
                        RelayError::UpstreamConnectFailure(reason) => reason,
                        other => other.to_string(),
                    };
                    let _ = events.send(UpstreamEvent::ConnectFailed(reason)).await;
                    return;
                }
            };
            drop(api_key);

            let (sink, mut stream) = socket.split();
            if events.send(UpstreamEvent::Opened(sink)).await.is_err() {
                return;
            }

            while let Some(msg) = stream.next().await {
                let event = match msg {
                    Ok(UpstreamMessage::Text(text)) => UpstreamEvent::Text(text.as_str().to_owned()),
                    Ok(UpstreamMessage::Binary(data)) => {
                        warn!(%session_id, "Ignoring binary upstream frame: {} bytes", data.len());
                        continue;
                    }
                    Ok(UpstreamMessage::Close(frame)) => {
                        info!(%session_id, ?frame, "Upstream closed the connection");
                        let _ = events.send(UpstreamEvent::Closed).await;
                        return;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        warn!(%session_id, "Upstream WebSocket error: {}", e);
                        let _ = events.send(UpstreamEvent::Failed(e.to_string())).await;
                        return;
                    }
                };
                if events.send(event).await.is_err() {
                    return;
                }
            }

            info!(%session_id, "Upstream stream ended");
            let _ = events.send(UpstreamEvent::Closed).await;
        }));
    }

    async fn on_upstream_event(&mut self, event: UpstreamEvent) {
        let actions = match event {
            UpstreamEvent::Opened(sink) => {
                self.upstream_sink = Some(sink);
                self.session.on_upstream_opened()
            }
            UpstreamEvent::Text(text) => self.session.on_upstream_text(&text),
            UpstreamEvent::ConnectFailed(reason) => {
                self.upstream_task = None;
                self.session.on_upstream_connect_failed(&reason)
            }
            UpstreamEvent::Closed => {
                self.release_upstream();
                self.session.on_upstream_ended(None)
            }
            UpstreamEvent::Failed(reason) => {
                self.release_upstream();
                self.session.on_upstream_ended(Some(&reason))
            }
        };
        self.apply(actions).await;
    }

    /// Forget a provider socket that has already ended.
    fn release_upstream(&mut self) {
        self.upstream_sink = None;
        self.upstream_task = None;
    }

    /// Close the provider socket (if open) and stop its reader.
    async fn shutdown_upstream(&mut self) {
        if let Some(mut sink) = self.upstream_sink.take() {
            if let Err(e) = sink.send(UpstreamMessage::Close(None)).await {
                debug!(session_id = %self.id(), "Upstream close frame not sent: {}", e);
            }
            let _ = sink.close().await;
            info!(session_id = %self.id(), "Upstream connection closed");
        }
        if let Some(task) = self.upstream_task.take() {
            task.abort();
        }
    }
}
