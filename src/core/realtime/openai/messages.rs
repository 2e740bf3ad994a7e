//! OpenAI Realtime API WebSocket message types.
//!
//! The relay forwards almost every provider event verbatim, so only the pieces
//! it has to author or interpret are modelled here:
//!
//! Client events (sent to server):
//! - session.update - Configure the session once the provider has created it
//! - input_audio_buffer.append - Append base64 PCM16 audio to the input buffer
//!
//! Server events (received from server) interpreted by the call client:
//! - session.created - Provider allocated a session (handshake trigger)
//! - response.audio.delta - Audio data chunk
//! - response.audio_transcript.delta - Suggested-script chunk
//! - response.audio_transcript.done - Suggested script complete
//! - conversation.item.input_audio_transcription.completed - Remote party transcript
//! - error - Provider error, or an error synthesized by the relay

use serde::{Deserialize, Serialize};

use crate::audio::codec;

/// Provider event that opens every session
pub const SESSION_CREATED: &str = "session.created";
/// Relay-only event carrying the call context; never forwarded upstream
pub const SESSION_INIT: &str = "session.init";

// =============================================================================
// Session Configuration
// =============================================================================

/// Session configuration for OpenAI Realtime API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Response modalities (text, audio)
    pub modalities: Vec<String>,

    /// System instructions for the assistant
    pub instructions: String,

    /// Voice for audio output
    pub voice: String,

    pub input_audio_format: String,

    pub output_audio_format: String,

    /// Input audio transcription configuration
    pub input_audio_transcription: InputAudioTranscription,

    pub turn_detection: TurnDetection,

    /// Temperature for response generation
    pub temperature: f32,

    /// Maximum response output tokens
    pub max_response_output_tokens: MaxTokens,
}

/// Maximum tokens configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MaxTokens {
    /// Specific number of tokens
    Number(u32),
    /// Infinite tokens
    Infinite(String), // "inf"
}

/// Input audio transcription configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InputAudioTranscription {
    /// Transcription model (e.g., "whisper-1")
    pub model: String,
}

/// Turn detection configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TurnDetection {
    /// Server-side VAD
    #[serde(rename = "server_vad")]
    ServerVad {
        /// Activation threshold
        threshold: f32,
        /// Audio prefix padding in ms
        prefix_padding_ms: u32,
        /// Silence duration in ms
        silence_duration_ms: u32,
    },
}

// =============================================================================
// Client Events (sent to server)
// =============================================================================

/// Client events sent to the OpenAI Realtime API.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum ClientEvent {
    /// Update session configuration
    #[serde(rename = "session.update")]
    SessionUpdate {
        /// Session configuration
        session: SessionConfig,
    },

    /// Append audio to input buffer
    #[serde(rename = "input_audio_buffer.append")]
    InputAudioBufferAppend {
        /// Base64-encoded audio data
        audio: String,
    },
}

impl ClientEvent {
    /// Create an audio append event from PCM16 samples.
    pub fn audio_append(samples: &[i16]) -> Self {
        ClientEvent::InputAudioBufferAppend {
            audio: codec::encode(samples),
        }
    }
}

// =============================================================================
// Server Events (received from server)
// =============================================================================

/// Server events the call client reacts to. Everything else is `Other`.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type")]
pub enum ServerEvent {
    #[serde(rename = "session.created")]
    SessionCreated,

    /// Audio data chunk (base64 PCM16)
    #[serde(rename = "response.audio.delta")]
    AudioDelta { delta: String },

    /// Incremental transcript of the assistant's suggestion
    #[serde(rename = "response.audio_transcript.delta")]
    AudioTranscriptDelta { delta: String },

    /// Final transcript of the assistant's suggestion
    #[serde(rename = "response.audio_transcript.done")]
    AudioTranscriptDone {
        #[serde(default)]
        transcript: String,
    },

    /// Final transcript of captured speech
    #[serde(rename = "conversation.item.input_audio_transcription.completed")]
    TranscriptionCompleted {
        #[serde(default)]
        transcript: String,
    },

    /// Either a relay error (`message`) or a provider error (`error.message`)
    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        code: Option<String>,
        #[serde(default)]
        message: Option<String>,
        #[serde(default)]
        error: Option<ApiError>,
    },

    #[serde(other)]
    Other,
}

impl ServerEvent {
    /// Human readable text of an error event.
    pub fn error_message(&self) -> Option<String> {
        match self {
            ServerEvent::Error { message, error, .. } => Some(
                message
                    .clone()
                    .or_else(|| error.as_ref().map(|e| e.message.clone()))
                    .unwrap_or_else(|| "Connection error".to_string()),
            ),
            _ => None,
        }
    }
}

/// API error information.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ApiError {
    /// Error type
    #[serde(rename = "type", default)]
    pub error_type: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
    pub message: String,
}
