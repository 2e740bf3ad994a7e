use serde::Serialize;
use thiserror::Error;

/// Failures local to one call session.
///
/// None of these affect other sessions. Each is reported to the client as an
/// `error` event carrying [`RelayError::code`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RelayError {
    /// Provider credential absent; fatal for the session
    #[error("{0} not configured on server")]
    ConfigurationMissing(String),

    /// A frame on either leg was not a JSON wire event
    #[error("Failed to process message: {0}")]
    MalformedMessage(String),

    /// Message not allowed in the session's current stage
    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    /// Upstream socket could not be opened
    #[error("Upstream connection error: {0}")]
    UpstreamConnectFailure(String),

    /// Upstream socket closed or failed after opening
    #[error("Upstream connection closed: {0}")]
    UpstreamClosed(String),

    /// Provider never sent `session.created`
    #[error("Upstream did not create a session within {0}s")]
    UpstreamHandshakeTimeout(u64),

    /// Either leg closed; triggers cleanup, never reported
    #[error("Transport closed")]
    TransportClosed,
}

/// Result type for relay operations.
pub type RelayResult<T> = Result<T, RelayError>;

/// Locally synthesized relay -> client events.
#[derive(Debug, Serialize)]
#[serde(tag = "type")]
enum RelayEvent<'a> {
    #[serde(rename = "error")]
    Error { code: &'a str, message: String },
}

impl RelayError {
    /// Stable machine-readable code sent alongside the message.
    pub fn code(&self) -> &'static str {
        match self {
            RelayError::ConfigurationMissing(_) => "configuration_missing",
            RelayError::MalformedMessage(_) => "malformed_message",
            RelayError::ProtocolViolation(_) => "protocol_violation",
            RelayError::UpstreamConnectFailure(_) => "upstream_connect_failure",
            RelayError::UpstreamClosed(_) => "upstream_closed",
            RelayError::UpstreamHandshakeTimeout(_) => "upstream_handshake_timeout",
            RelayError::TransportClosed => "transport_closed",
        }
    }

    /// Serialize as a `{"type":"error","code":..,"message":..}` text frame.
    pub fn to_event_json(&self) -> String {
        let event = RelayEvent::Error {
            code: self.code(),
            message: self.to_string(),
        };
        // A two-string struct cannot fail to serialize
        serde_json::to_string(&event).unwrap_or_else(|_| {
            format!(r#"{{"type":"error","code":"{}","message":"relay error"}}"#, self.code())
        })
    }
}
