//! Client session controller.
//!
//! Owns one WebSocket to the relay. `connect` sends `session.init` and starts
//! capture; a background task forwards captured chunks as
//! `input_audio_buffer.append` and dispatches inbound events to the audio
//! sink and the UI channel.

use futures_util::{SinkExt, StreamExt};
use parking_lot::{Mutex, RwLock};
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::events::UiEvent;
use super::transcript::{TranscriptMessage, TranscriptRole};
use crate::audio::{AudioError, AudioSink, AudioSource, codec};
use crate::core::realtime::openai::messages::SESSION_INIT;
use crate::core::realtime::{ClientEvent, ServerEvent};

/// Captured chunks waiting for the socket; overflow is dropped, never awaited
const OUTGOING_CAPACITY: usize = 64;

/// How long `disconnect` waits for the connection task to finish
const DISCONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors surfaced by [`RelayClient`].
#[derive(Debug, Error)]
pub enum ClientError {
    #[error("Failed to connect to relay: {0}")]
    Connect(String),

    #[error("Already connected")]
    AlreadyConnected,

    #[error("Failed to send to relay: {0}")]
    Send(String),

    #[error(transparent)]
    Audio(#[from] AudioError),
}

/// State shared between the controller and its connection task.
struct ClientShared {
    connected: AtomicBool,
    live_script: RwLock<String>,
    transcripts: RwLock<Vec<TranscriptMessage>>,
    sink: Arc<dyn AudioSink>,
    source: Mutex<Box<dyn AudioSource>>,
    ui: mpsc::UnboundedSender<UiEvent>,
}

impl ClientShared {
    fn emit(&self, event: UiEvent) {
        if self.ui.send(event).is_err() {
            debug!("UI event receiver dropped");
        }
    }

    fn push_transcript(&self, role: TranscriptRole, content: String) {
        let message = TranscriptMessage::new(role, content);
        self.transcripts.write().push(message.clone());
        self.emit(UiEvent::Transcript(message));
    }

    /// Route one inbound text frame.
    fn handle_server_text(&self, text: &str) {
        let event: ServerEvent = match serde_json::from_str(text) {
            Ok(event) => event,
            Err(e) => {
                warn!("Failed to parse relay event: {}", e);
                return;
            }
        };

        match event {
            ServerEvent::AudioDelta { delta } => {
                let result = codec::decode(&delta)
                    .map_err(|e| e.to_string())
                    .and_then(|pcm| self.sink.enqueue(&pcm).map_err(|e| e.to_string()));
                if let Err(e) = result {
                    warn!("Dropping audio delta: {}", e);
                }
            }
            ServerEvent::AudioTranscriptDelta { delta } => {
                let script = {
                    let mut live = self.live_script.write();
                    live.push_str(&delta);
                    live.clone()
                };
                self.emit(UiEvent::ScriptDelta { delta, script });
            }
            ServerEvent::AudioTranscriptDone { transcript } => {
                self.live_script.write().clear();
                self.push_transcript(TranscriptRole::Assistant, transcript);
            }
            ServerEvent::TranscriptionCompleted { transcript } => {
                self.push_transcript(TranscriptRole::RemoteParty, transcript);
            }
            ServerEvent::Error { .. } => {
                let message = event
                    .error_message()
                    .unwrap_or_else(|| "Connection error".to_string());
                warn!("Relay reported an error: {}", message);
                self.emit(UiEvent::Notice(message));
            }
            ServerEvent::SessionCreated => debug!("Provider session created"),
            ServerEvent::Other => {}
        }
    }

    /// The socket is gone: stop capture, reset the live script, tell the UI.
    fn finish(&self) {
        self.connected.store(false, Ordering::SeqCst);
        self.source.lock().stop();
        self.live_script.write().clear();
        self.emit(UiEvent::Disconnected);
        info!("Disconnected from relay");
    }
}

struct Connection {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// One call's connection to the relay.
pub struct RelayClient {
    url: String,
    shared: Arc<ClientShared>,
    connection: Option<Connection>,
}

impl RelayClient {
    /// Create a controller for the relay at `url` (e.g. `ws://host:3001/realtime-ai`).
    ///
    /// Returns the receiver for UI events alongside the controller.
    pub fn new(
        url: impl Into<String>,
        source: Box<dyn AudioSource>,
        sink: Arc<dyn AudioSink>,
    ) -> (Self, mpsc::UnboundedReceiver<UiEvent>) {
        let (ui_tx, ui_rx) = mpsc::unbounded_channel();
        let shared = Arc::new(ClientShared {
            connected: AtomicBool::new(false),
            live_script: RwLock::new(String::new()),
            transcripts: RwLock::new(Vec::new()),
            sink,
            source: Mutex::new(source),
            ui: ui_tx,
        });

        (
            Self {
                url: url.into(),
                shared,
                connection: None,
            },
            ui_rx,
        )
    }

    pub fn is_connected(&self) -> bool {
        self.shared.connected.load(Ordering::SeqCst)
    }

    /// Suggested script accumulated since the last finalized suggestion.
    pub fn live_script(&self) -> String {
        self.shared.live_script.read().clone()
    }

    /// Finalized transcript so far, oldest first.
    pub fn transcripts(&self) -> Vec<TranscriptMessage> {
        self.shared.transcripts.read().clone()
    }

    /// Open the relay socket, send `session.init` and start capture.
    ///
    /// Failures are also reported as [`UiEvent::Notice`].
    pub async fn connect(&mut self, context: &str) -> Result<(), ClientError> {
        if self.is_connected() {
            return Err(ClientError::AlreadyConnected);
        }
        // A previous connection that ended on its own still has a finished task
        self.connection = None;

        let (socket, _response) = match tokio_tungstenite::connect_async(self.url.as_str()).await
        {
            Ok(connected) => connected,
            Err(e) => {
                let error = ClientError::Connect(e.to_string());
                self.shared.emit(UiEvent::Notice(error.to_string()));
                return Err(error);
            }
        };
        let (mut ws_sink, mut ws_stream) = socket.split();

        let init = json!({ "type": SESSION_INIT, "context": context }).to_string();
        if let Err(e) = ws_sink.send(Message::Text(init.into())).await {
            let error = ClientError::Send(e.to_string());
            self.shared.emit(UiEvent::Notice(error.to_string()));
            return Err(error);
        }

        info!(url = %self.url, "Connected to relay");
        self.shared.connected.store(true, Ordering::SeqCst);
        self.shared.emit(UiEvent::Connected);

        let (audio_tx, mut audio_rx) = mpsc::channel::<String>(OUTGOING_CAPACITY);
        let capture = self.shared.source.lock().start(Box::new(move |chunk| {
            let event = ClientEvent::audio_append(&chunk);
            let Ok(json) = serde_json::to_string(&event) else {
                return;
            };
            match audio_tx.try_send(json) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => debug!("Outgoing audio queue full, dropping chunk"),
                Err(TrySendError::Closed(_)) => {}
            }
        }));
        if let Err(e) = capture {
            warn!("Audio capture failed to start: {}", e);
            self.shared
                .emit(UiEvent::Notice(ClientError::Audio(e).to_string()));
        }

        let cancel = CancellationToken::new();
        let task_cancel = cancel.clone();
        let shared = self.shared.clone();

        let task = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = task_cancel.cancelled() => {
                        let _ = ws_sink.send(Message::Close(None)).await;
                        break;
                    }
                    Some(audio) = audio_rx.recv() => {
                        if let Err(e) = ws_sink.send(Message::Text(audio.into())).await {
                            warn!("Failed to send audio chunk: {}", e);
                            break;
                        }
                    }
                    msg = ws_stream.next() => {
                        match msg {
                            Some(Ok(Message::Text(text))) => shared.handle_server_text(text.as_str()),
                            Some(Ok(Message::Close(_))) | None => {
                                info!("Relay closed the connection");
                                break;
                            }
                            Some(Ok(_)) => {}
                            Some(Err(e)) => {
                                warn!("Relay WebSocket error: {}", e);
                                break;
                            }
                        }
                    }
                }
            }
            shared.finish();
        });

        self.connection = Some(Connection { cancel, task });
        Ok(())
    }

    /// Close the socket and stop capture. A no-op when not connected.
    pub async fn disconnect(&mut self) {
        let Some(connection) = self.connection.take() else {
            return;
        };

        connection.cancel.cancel();
        if tokio::time::timeout(DISCONNECT_TIMEOUT, connection.task)
            .await
            .is_err()
        {
            warn!("Relay connection task did not stop in time");
            self.shared.finish();
        }
        self.shared.sink.stop();
    }
}

impl Drop for RelayClient {
    fn drop(&mut self) {
        if let Some(connection) = self.connection.take() {
            connection.cancel.cancel();
        }
    }
}
