use serde::{Deserialize, Serialize};
use std::fmt;
use time::OffsetDateTime;

/// Who spoke a finalized utterance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TranscriptRole {
    /// The caller operating the client
    User,
    /// The person on the other end of the call, as heard by the microphone
    RemoteParty,
    /// Suggested script produced by the model
    Assistant,
}

impl fmt::Display for TranscriptRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TranscriptRole::User => write!(f, "user"),
            TranscriptRole::RemoteParty => write!(f, "remote-party"),
            TranscriptRole::Assistant => write!(f, "assistant"),
        }
    }
}

/// A finalized, attributed utterance. Never mutated once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptMessage {
    pub role: TranscriptRole,
    pub content: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl TranscriptMessage {
    pub fn new(role: TranscriptRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            timestamp: OffsetDateTime::now_utc(),
        }
    }
}
