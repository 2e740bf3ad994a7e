//! Channel message types used inside a relay connection.
//!
//! Wire payloads are plain JSON text and are forwarded without re-encoding,
//! so these types only describe routing between the connection's tasks.

use futures::stream::SplitSink;
use tokio_tungstenite::tungstenite::Message as UpstreamMessage;

use crate::core::realtime::UpstreamSocket;

/// Write half of the provider socket.
pub type UpstreamSink = SplitSink<UpstreamSocket, UpstreamMessage>;

/// Frames queued for the browser socket's sender task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayMessageRoute {
    /// JSON text frame
    Outgoing(String),
    /// Close frame; the sender task exits afterwards
    Close,
}

/// Notifications from the task that owns the provider socket's read half.
///
/// A connection produces at most one `Opened` and exactly one terminal
/// event (`ConnectFailed`, `Closed` or `Failed`) unless it is aborted.
pub enum UpstreamEvent {
    /// Socket opened; the driver takes the write half
    Opened(UpstreamSink),
    /// Text frame from the provider
    Text(String),
    /// The socket could not be opened
    ConnectFailed(String),
    /// Provider closed the socket cleanly
    Closed,
    /// Transport error after opening
    Failed(String),
}

impl std::fmt::Debug for UpstreamEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UpstreamEvent::Opened(_) => f.write_str("Opened"),
            UpstreamEvent::Text(text) => write!(f, "Text({} bytes)", text.len()),
            UpstreamEvent::ConnectFailed(reason) => write!(f, "ConnectFailed({reason})"),
            UpstreamEvent::Closed => f.write_str("Closed"),
            UpstreamEvent::Failed(reason) => write!(f, "Failed({reason})"),
        }
    }
}
