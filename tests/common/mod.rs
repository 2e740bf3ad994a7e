//! Shared harness for relay integration tests
//!
//! - `MockProvider`: a scriptable stand-in for the realtime provider. Every
//!   accepted socket is handed to the test as a `ProviderConnection` that
//!   records the upgrade request and every frame the relay sends.
//! - `TestRelay`: the real router served on an ephemeral port.
//! - `TestClient`: a bare WebSocket playing the browser.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use http::HeaderMap;
use serde_json::Value;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, accept_hdr_async};

use callscript_relay::{ServerConfig, routes, state::AppState};

/// Upper bound for any single expected event
pub const STEP_TIMEOUT: Duration = Duration::from_secs(5);

/// Environment variable that is never set, so tests use the static key
pub const UNSET_KEY_ENV: &str = "CALLSCRIPT_RELAY_TEST_KEY_NEVER_SET";

pub const TEST_API_KEY: &str = "sk-test-relay";

// =============================================================================
// Mock provider
// =============================================================================

/// What the provider side observed on one connection
#[derive(Debug, Clone, PartialEq)]
pub enum ProviderFrame {
    Text(String),
    Closed,
}

enum ProviderCommand {
    Send(String),
    Close,
    Drop,
}

/// One relay -> provider connection, driven by the test
pub struct ProviderConnection {
    pub uri: String,
    pub headers: HeaderMap,
    commands: mpsc::UnboundedSender<ProviderCommand>,
    frames: mpsc::UnboundedReceiver<ProviderFrame>,
}

impl ProviderConnection {
    pub fn send(&self, event: Value) {
        self.send_text(&event.to_string());
    }

    pub fn send_text(&self, text: &str) {
        let _ = self.commands.send(ProviderCommand::Send(text.to_string()));
    }

    /// Send `session.created` the way the provider opens every session
    pub fn send_session_created(&self) -> String {
        let created = serde_json::json!({
            "type": "session.created",
            "event_id": "event_mock_1",
            "session": {"id": "sess_mock", "object": "realtime.session"}
        })
        .to_string();
        self.send_text(&created);
        created
    }

    /// Close with a close frame
    pub fn close(&self) {
        let _ = self.commands.send(ProviderCommand::Close);
    }

    /// Drop the TCP connection without a close frame
    pub fn abort(&self) {
        let _ = self.commands.send(ProviderCommand::Drop);
    }

    pub async fn recv_text(&mut self) -> String {
        match timeout(STEP_TIMEOUT, self.frames.recv()).await {
            Ok(Some(ProviderFrame::Text(text))) => text,
            Ok(Some(ProviderFrame::Closed)) => panic!("provider connection closed unexpectedly"),
            Ok(None) => panic!("provider connection task ended"),
            Err(_) => panic!("timed out waiting for a frame from the relay"),
        }
    }

    pub async fn recv_json(&mut self) -> Value {
        serde_json::from_str(&self.recv_text().await).expect("relay sent invalid JSON upstream")
    }

    pub async fn expect_closed(&mut self) {
        loop {
            match timeout(STEP_TIMEOUT, self.frames.recv()).await {
                Ok(Some(ProviderFrame::Closed)) | Ok(None) => return,
                Ok(Some(ProviderFrame::Text(text))) => {
                    panic!("expected upstream close, got frame: {text}")
                }
                Err(_) => panic!("timed out waiting for the relay to close upstream"),
            }
        }
    }

    /// Assert the relay sends nothing upstream for `window`
    pub async fn expect_quiet(&mut self, window: Duration) {
        if let Ok(Some(ProviderFrame::Text(text))) = timeout(window, self.frames.recv()).await {
            panic!("expected no upstream traffic, got: {text}");
        }
    }
}

pub struct MockProvider {
    pub addr: SocketAddr,
    attempts: Arc<AtomicUsize>,
    connections: mpsc::UnboundedReceiver<ProviderConnection>,
}

impl MockProvider {
    pub async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let attempts = Arc::new(AtomicUsize::new(0));
        let (conn_tx, conn_rx) = mpsc::unbounded_channel();

        let accept_attempts = attempts.clone();
        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                accept_attempts.fetch_add(1, Ordering::SeqCst);
                tokio::spawn(handle_provider_connection(stream, conn_tx.clone()));
            }
        });

        Self {
            addr,
            attempts,
            connections: conn_rx,
        }
    }

    /// Endpoint to put in `UpstreamSettings::url`
    pub fn url(&self) -> String {
        format!("ws://{}/v1/realtime", self.addr)
    }

    /// TCP connections accepted so far
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    pub async fn next_connection(&mut self) -> ProviderConnection {
        timeout(STEP_TIMEOUT, self.connections.recv())
            .await
            .expect("timed out waiting for the relay to connect upstream")
            .expect("mock provider stopped")
    }
}

async fn handle_provider_connection(
    stream: TcpStream,
    conn_tx: mpsc::UnboundedSender<ProviderConnection>,
) {
    let mut upgrade: Option<(String, HeaderMap)> = None;
    let callback = |req: &Request, resp: Response| -> Result<Response, ErrorResponse> {
        upgrade = Some((req.uri().to_string(), req.headers().clone()));
        Ok(resp)
    };
    let Ok(ws) = accept_hdr_async(stream, callback).await else {
        return;
    };
    let (uri, headers) = upgrade.unwrap_or_default();

    let (mut write, mut read) = ws.split();
    let (cmd_tx, mut cmd_rx) = mpsc::unbounded_channel();
    let (frame_tx, frame_rx) = mpsc::unbounded_channel();

    let connection = ProviderConnection {
        uri,
        headers,
        commands: cmd_tx,
        frames: frame_rx,
    };
    if conn_tx.send(connection).is_err() {
        return;
    }

    loop {
        tokio::select! {
            command = cmd_rx.recv() => match command {
                Some(ProviderCommand::Send(text)) => {
                    if write.send(Message::Text(text.into())).await.is_err() {
                        let _ = frame_tx.send(ProviderFrame::Closed);
                        return;
                    }
                }
                Some(ProviderCommand::Close) => {
                    let _ = write.send(Message::Close(None)).await;
                    let _ = frame_tx.send(ProviderFrame::Closed);
                    return;
                }
                Some(ProviderCommand::Drop) | None => return,
            },
            msg = read.next() => match msg {
                Some(Ok(Message::Text(text))) => {
                    let _ = frame_tx.send(ProviderFrame::Text(text.as_str().to_owned()));
                }
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => {
                    let _ = frame_tx.send(ProviderFrame::Closed);
                    return;
                }
                Some(Ok(_)) => {}
            },
        }
    }
}

// =============================================================================
// Relay under test
// =============================================================================

/// Relay configuration pointing at `provider_url`
pub fn relay_config(provider_url: &str, api_key: Option<&str>) -> ServerConfig {
    let mut config = ServerConfig::default();
    config.host = "127.0.0.1".to_string();
    config.port = 0;
    config.api_key_env = UNSET_KEY_ENV.to_string();
    config.openai_api_key = api_key.map(str::to_string);
    config.upstream.url = provider_url.to_string();
    config.upstream.handshake_timeout_secs = 5;
    config
}

pub struct TestRelay {
    pub addr: SocketAddr,
    pub state: Arc<AppState>,
}

impl TestRelay {
    pub async fn start(config: ServerConfig) -> Self {
        let state = AppState::new(config).expect("invalid relay config");
        let app = routes::app(state.clone());
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self { addr, state }
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/realtime-ai", self.addr)
    }

    /// Wait until every session has been removed from the registry
    pub async fn wait_for_no_sessions(&self) {
        let deadline = tokio::time::Instant::now() + STEP_TIMEOUT;
        while !self.state.sessions.is_empty() {
            assert!(
                tokio::time::Instant::now() < deadline,
                "sessions still registered: {}",
                self.state.sessions.len()
            );
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
    }
}

// =============================================================================
// Browser-side client
// =============================================================================

pub struct TestClient {
    socket: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

impl TestClient {
    pub async fn connect(url: &str) -> Self {
        let (socket, _) = tokio_tungstenite::connect_async(url)
            .await
            .expect("client failed to connect to relay");
        Self { socket }
    }

    pub async fn send(&mut self, event: Value) {
        self.send_text(&event.to_string()).await;
    }

    pub async fn send_text(&mut self, text: &str) {
        self.socket
            .send(Message::Text(text.to_string().into()))
            .await
            .expect("client send failed");
    }

    pub async fn init(&mut self, context: &str) {
        self.send(serde_json::json!({"type": "session.init", "context": context}))
            .await;
    }

    pub async fn recv_text(&mut self) -> String {
        loop {
            match timeout(STEP_TIMEOUT, self.socket.next()).await {
                Ok(Some(Ok(Message::Text(text)))) => return text.as_str().to_owned(),
                Ok(Some(Ok(Message::Ping(_) | Message::Pong(_)))) => continue,
                Ok(other) => panic!("expected a text frame, got {other:?}"),
                Err(_) => panic!("timed out waiting for the relay"),
            }
        }
    }

    pub async fn recv_json(&mut self) -> Value {
        serde_json::from_str(&self.recv_text().await).expect("relay sent invalid JSON")
    }

    /// Receive an `error` event and return its code
    pub async fn recv_error_code(&mut self) -> String {
        let event = self.recv_json().await;
        assert_eq!(event["type"], "error", "expected an error event, got {event}");
        assert!(event["message"].is_string());
        event["code"].as_str().unwrap_or_default().to_string()
    }

    pub async fn expect_closed(&mut self) {
        match timeout(STEP_TIMEOUT, self.socket.next()).await {
            Ok(Some(Ok(Message::Close(_)))) | Ok(None) | Ok(Some(Err(_))) => {}
            Ok(Some(Ok(other))) => panic!("expected close, got {other:?}"),
            Err(_) => panic!("timed out waiting for the relay to close"),
        }
    }

    /// Assert nothing arrives for `window`
    pub async fn expect_quiet(&mut self, window: Duration) {
        if let Ok(Some(Ok(msg))) = timeout(window, self.socket.next()).await {
            panic!("expected no traffic, got {msg:?}");
        }
    }

    pub async fn close(mut self) {
        let _ = self.socket.close(None).await;
    }
}

/// Drive a client and provider through `session.init` + handshake
pub async fn establish(
    relay: &TestRelay,
    provider: &mut MockProvider,
    context: &str,
) -> (TestClient, ProviderConnection) {
    let mut client = TestClient::connect(&relay.ws_url()).await;
    client.init(context).await;

    let mut upstream = provider.next_connection().await;
    let created = upstream.send_session_created();

    let update = upstream.recv_json().await;
    assert_eq!(update["type"], "session.update");
    assert_eq!(client.recv_text().await, created);

    (client, upstream)
}
