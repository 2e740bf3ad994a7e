use super::transcript::TranscriptMessage;

/// Events delivered to the UI boundary, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum UiEvent {
    /// Socket open and `session.init` sent
    Connected,
    /// Incremental suggested-script text; `script` is the whole live buffer
    ScriptDelta { delta: String, script: String },
    /// A finalized utterance was appended to the transcript
    Transcript(TranscriptMessage),
    /// Non-fatal problem worth showing; the connection is unaffected
    Notice(String),
    /// The relay socket closed; capture has stopped
    Disconnected,
}
