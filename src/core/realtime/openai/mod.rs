//! OpenAI Realtime API module.
//!
//! Provider-specific pieces of the relay's upstream leg:
//!
//! - `config`: endpoint, voices and audio formats
//! - `messages`: the events the relay authors (`session.update`) or that the
//!   call client interprets
//! - `connector`: opens the authenticated provider WebSocket
//!
//! # Audio Format
//!
//! Input and output audio is PCM 16-bit signed little-endian at 24kHz,
//! base64 encoded inside JSON text frames.

mod config;
mod connector;
pub mod messages;

pub use config::{
    DEFAULT_REALTIME_MODEL, DEFAULT_TRANSCRIPTION_MODEL, OPENAI_BETA_HEADER,
    OPENAI_REALTIME_SAMPLE_RATE, OPENAI_REALTIME_URL, OpenAIRealtimeAudioFormat,
    OpenAIRealtimeVoice,
};
pub use connector::{OpenAIRealtimeConnector, UpstreamSocket};
pub use messages::{
    ClientEvent, InputAudioTranscription, MaxTokens, ServerEvent, SessionConfig, TurnDetection,
};
