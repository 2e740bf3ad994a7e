//! OpenAI Realtime API configuration types.
//!
//! Voices and audio formats accepted by the provider, plus the endpoint and
//! defaults the relay uses when nothing else is configured.

use serde::{Deserialize, Serialize};

/// OpenAI Realtime API WebSocket endpoint.
pub const OPENAI_REALTIME_URL: &str = "wss://api.openai.com/v1/realtime";

/// Model requested when none is configured.
pub const DEFAULT_REALTIME_MODEL: &str = "gpt-4o-realtime-preview-2024-10-01";

/// Transcription model used for the remote party's speech.
pub const DEFAULT_TRANSCRIPTION_MODEL: &str = "whisper-1";

/// Default audio sample rate for OpenAI Realtime API.
pub const OPENAI_REALTIME_SAMPLE_RATE: u32 = 24000;

/// Value of the `OpenAI-Beta` header required by the realtime endpoint.
pub const OPENAI_BETA_HEADER: &str = "realtime=v1";

// =============================================================================
// Voices
// =============================================================================

/// Available voices for OpenAI Realtime API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OpenAIRealtimeVoice {
    /// Alloy voice (default)
    #[default]
    Alloy,
    Ash,
    Ballad,
    Coral,
    Echo,
    Sage,
    Shimmer,
    Verse,
}

impl OpenAIRealtimeVoice {
    /// Convert to the API parameter value.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Alloy => "alloy",
            Self::Ash => "ash",
            Self::Ballad => "ballad",
            Self::Coral => "coral",
            Self::Echo => "echo",
            Self::Sage => "sage",
            Self::Shimmer => "shimmer",
            Self::Verse => "verse",
        }
    }

    /// Parse from string, with fallback to default.
    pub fn from_str_or_default(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "alloy" => Self::Alloy,
            "ash" => Self::Ash,
            "ballad" => Self::Ballad,
            "coral" => Self::Coral,
            "echo" => Self::Echo,
            "sage" => Self::Sage,
            "shimmer" => Self::Shimmer,
            "verse" => Self::Verse,
            _ => Self::default(),
        }
    }
}

impl std::fmt::Display for OpenAIRealtimeVoice {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// =============================================================================
// Audio Formats
// =============================================================================

/// Audio formats supported by the realtime endpoint.
///
/// Only PCM16 is negotiated: 16-bit signed little-endian, 24kHz, mono.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum OpenAIRealtimeAudioFormat {
    #[default]
    #[serde(rename = "pcm16")]
    Pcm16,
}

impl OpenAIRealtimeAudioFormat {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pcm16 => "pcm16",
        }
    }
}
