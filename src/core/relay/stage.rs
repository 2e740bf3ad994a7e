use serde::Serialize;
use std::fmt;

/// Lifecycle of a call session.
///
/// ```text
/// AWAITING_INIT -> UPSTREAM_CONNECTING -> UPSTREAM_HANDSHAKING -> RELAYING -> CLOSED
///        \________________\______________________\__________________\____-> ERROR
/// ```
///
/// `CLOSED` and `ERROR` are terminal. Any live stage may move to either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SessionStage {
    AwaitingInit,
    UpstreamConnecting,
    UpstreamHandshaking,
    Relaying,
    Closed,
    Error,
}

impl SessionStage {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionStage::Closed | SessionStage::Error)
    }

    /// An upstream socket is open in this stage.
    pub fn has_upstream(self) -> bool {
        matches!(
            self,
            SessionStage::UpstreamHandshaking | SessionStage::Relaying
        )
    }

    /// An upstream connection exists or is being opened.
    pub fn upstream_pending_or_open(self) -> bool {
        self == SessionStage::UpstreamConnecting || self.has_upstream()
    }

    pub fn can_transition_to(self, next: SessionStage) -> bool {
        use SessionStage::*;

        if self.is_terminal() {
            return false;
        }
        matches!(
            (self, next),
            (_, Closed)
                | (_, Error)
                | (AwaitingInit, UpstreamConnecting)
                | (UpstreamConnecting, UpstreamHandshaking)
                | (UpstreamHandshaking, Relaying)
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            SessionStage::AwaitingInit => "AWAITING_INIT",
            SessionStage::UpstreamConnecting => "UPSTREAM_CONNECTING",
            SessionStage::UpstreamHandshaking => "UPSTREAM_HANDSHAKING",
            SessionStage::Relaying => "RELAYING",
            SessionStage::Closed => "CLOSED",
            SessionStage::Error => "ERROR",
        }
    }
}

impl fmt::Display for SessionStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
