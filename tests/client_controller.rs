//! Client controller against a live relay
//!
//! The controller talks to a real relay in front of the mock provider. A
//! scripted audio source stands in for the microphone and a `PlaybackQueue`
//! for the speakers.

mod common;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use parking_lot::Mutex;
use serde_json::json;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::timeout;

use callscript_relay::audio::{AudioError, AudioSource, ChunkCallback, PlaybackQueue, codec};
use callscript_relay::client::{ClientError, RelayClient, TranscriptRole, UiEvent};
use common::{MockProvider, STEP_TIMEOUT, TEST_API_KEY, TestRelay, relay_config};

/// Microphone stand-in; the test pushes chunks through the stored callback.
#[derive(Clone, Default)]
struct ScriptedSource {
    callback: Arc<Mutex<Option<ChunkCallback>>>,
    running: Arc<AtomicBool>,
    starts: Arc<AtomicUsize>,
}

impl ScriptedSource {
    fn emit(&self, chunk: Vec<i16>) {
        let mut callback = self.callback.lock();
        let on_chunk = callback.as_mut().expect("capture not started");
        on_chunk(chunk);
    }

    fn running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }
}

impl AudioSource for ScriptedSource {
    fn start(&mut self, on_chunk: ChunkCallback) -> Result<(), AudioError> {
        if self.running() {
            return Err(AudioError::AlreadyRunning);
        }
        *self.callback.lock() = Some(on_chunk);
        self.running.store(true, Ordering::SeqCst);
        self.starts.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn stop(&mut self) {
        self.callback.lock().take();
        self.running.store(false, Ordering::SeqCst);
    }

    fn is_running(&self) -> bool {
        self.running()
    }
}

async fn next_event(events: &mut UnboundedReceiver<UiEvent>) -> UiEvent {
    timeout(STEP_TIMEOUT, events.recv())
        .await
        .expect("timed out waiting for a UI event")
        .expect("UI channel closed")
}

fn client_for(
    relay: &TestRelay,
) -> (
    RelayClient,
    UnboundedReceiver<UiEvent>,
    ScriptedSource,
    PlaybackQueue,
) {
    let source = ScriptedSource::default();
    let speaker = PlaybackQueue::new();
    let (client, events) = RelayClient::new(
        relay.ws_url(),
        Box::new(source.clone()),
        Arc::new(speaker.clone()),
    );
    (client, events, source, speaker)
}

#[tokio::test]
async fn test_full_call_flow() {
    let mut provider = MockProvider::start().await;
    let relay = TestRelay::start(relay_config(&provider.url(), Some(TEST_API_KEY))).await;
    let (mut client, mut events, source, speaker) = client_for(&relay);

    client.connect("Acme Corp, renewal due in March").await.unwrap();
    assert_eq!(next_event(&mut events).await, UiEvent::Connected);
    assert!(client.is_connected());
    assert!(source.running());

    let mut upstream = provider.next_connection().await;
    upstream.send_session_created();
    let update = upstream.recv_json().await;
    assert!(
        update["session"]["instructions"]
            .as_str()
            .unwrap()
            .contains("Acme Corp, renewal due in March")
    );

    // Microphone chunks reach the provider as input_audio_buffer.append
    let chunk = vec![0, 1, -1, i16::MAX, i16::MIN];
    source.emit(chunk.clone());
    let append = upstream.recv_json().await;
    assert_eq!(append["type"], "input_audio_buffer.append");
    assert_eq!(append["audio"], codec::encode(&chunk));

    // Provider output: audio, script deltas, finalized transcripts
    upstream.send(json!({"type": "response.audio.delta", "delta": codec::encode(&[5, 6, 7])}));
    upstream.send(json!({"type": "response.audio_transcript.delta", "delta": "Ask about "}));
    upstream.send(json!({"type": "response.audio_transcript.delta", "delta": "their renewal."}));
    upstream.send(json!({
        "type": "response.audio_transcript.done",
        "transcript": "Ask about their renewal."
    }));
    upstream.send(json!({
        "type": "conversation.item.input_audio_transcription.completed",
        "item_id": "item_1",
        "content_index": 0,
        "transcript": "We might switch vendors."
    }));

    assert_eq!(
        next_event(&mut events).await,
        UiEvent::ScriptDelta {
            delta: "Ask about ".to_string(),
            script: "Ask about ".to_string(),
        }
    );
    assert_eq!(
        next_event(&mut events).await,
        UiEvent::ScriptDelta {
            delta: "their renewal.".to_string(),
            script: "Ask about their renewal.".to_string(),
        }
    );
    match next_event(&mut events).await {
        UiEvent::Transcript(message) => {
            assert_eq!(message.role, TranscriptRole::Assistant);
            assert_eq!(message.content, "Ask about their renewal.");
        }
        other => panic!("unexpected event {other:?}"),
    }
    match next_event(&mut events).await {
        UiEvent::Transcript(message) => {
            assert_eq!(message.role, TranscriptRole::RemoteParty);
            assert_eq!(message.content, "We might switch vendors.");
        }
        other => panic!("unexpected event {other:?}"),
    }

    assert_eq!(speaker.len(), 3);
    assert!(client.live_script().is_empty());
    assert_eq!(client.transcripts().len(), 2);

    client.disconnect().await;
    assert_eq!(next_event(&mut events).await, UiEvent::Disconnected);
    assert!(!client.is_connected());
    assert!(!source.running());
    assert!(speaker.is_empty());
    upstream.expect_closed().await;
}

#[tokio::test]
async fn test_upstream_loss_is_a_notice_not_a_disconnect() {
    let mut provider = MockProvider::start().await;
    let relay = TestRelay::start(relay_config(&provider.url(), Some(TEST_API_KEY))).await;
    let (mut client, mut events, source, _speaker) = client_for(&relay);

    client.connect("Globex").await.unwrap();
    assert_eq!(next_event(&mut events).await, UiEvent::Connected);

    let mut upstream = provider.next_connection().await;
    upstream.send_session_created();
    upstream.recv_json().await;

    upstream.close();
    match next_event(&mut events).await {
        UiEvent::Notice(message) => assert!(message.starts_with("Upstream connection closed")),
        other => panic!("unexpected event {other:?}"),
    }
    assert!(client.is_connected());
    assert!(source.running());

    client.disconnect().await;
    assert_eq!(next_event(&mut events).await, UiEvent::Disconnected);
}

#[tokio::test]
async fn test_missing_credential_disconnects_client() {
    let provider = MockProvider::start().await;
    let relay = TestRelay::start(relay_config(&provider.url(), None)).await;
    let (mut client, mut events, source, _speaker) = client_for(&relay);

    client.connect("Initech").await.unwrap();
    assert_eq!(next_event(&mut events).await, UiEvent::Connected);

    match next_event(&mut events).await {
        UiEvent::Notice(message) => assert!(message.ends_with("not configured on server")),
        other => panic!("unexpected event {other:?}"),
    }
    assert_eq!(next_event(&mut events).await, UiEvent::Disconnected);
    assert!(!client.is_connected());
    assert!(!source.running());
    assert_eq!(provider.attempts(), 0);

    // Disconnecting an already closed controller is harmless
    client.disconnect().await;
}

#[tokio::test]
async fn test_reconnect_after_disconnect() {
    let mut provider = MockProvider::start().await;
    let relay = TestRelay::start(relay_config(&provider.url(), Some(TEST_API_KEY))).await;
    let (mut client, mut events, source, _speaker) = client_for(&relay);

    client.connect("First call").await.unwrap();
    assert_eq!(next_event(&mut events).await, UiEvent::Connected);
    assert!(matches!(
        client.connect("Again").await,
        Err(ClientError::AlreadyConnected)
    ));
    let mut first = provider.next_connection().await;

    client.disconnect().await;
    assert_eq!(next_event(&mut events).await, UiEvent::Disconnected);
    first.expect_closed().await;

    client.connect("Second call").await.unwrap();
    assert_eq!(next_event(&mut events).await, UiEvent::Connected);
    let mut second = provider.next_connection().await;
    second.send_session_created();
    let update = second.recv_json().await;
    assert!(
        update["session"]["instructions"]
            .as_str()
            .unwrap()
            .contains("Second call")
    );
    assert_eq!(source.starts.load(Ordering::SeqCst), 2);

    client.disconnect().await;
    assert_eq!(next_event(&mut events).await, UiEvent::Disconnected);
}
