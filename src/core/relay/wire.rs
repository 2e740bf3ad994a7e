//! Minimal views over the JSON text frames crossing the relay.
//!
//! Frames are forwarded verbatim; these types only exist to read the `type`
//! discriminator and the `session.init` payload.

use serde::Deserialize;

use super::error::{RelayError, RelayResult};

/// Just enough of a wire event to route it.
#[derive(Debug, Deserialize)]
pub struct WireEnvelope {
    #[serde(rename = "type", default)]
    pub kind: Option<String>,
}

impl WireEnvelope {
    /// Parse a text frame, rejecting anything that is not a JSON object.
    pub fn parse(text: &str) -> RelayResult<Self> {
        let value: serde_json::Value = serde_json::from_str(text)
            .map_err(|e| RelayError::MalformedMessage(e.to_string()))?;
        if !value.is_object() {
            return Err(RelayError::MalformedMessage(
                "expected a JSON object".to_string(),
            ));
        }
        serde_json::from_value(value).map_err(|e| RelayError::MalformedMessage(e.to_string()))
    }

    pub fn is(&self, kind: &str) -> bool {
        self.kind.as_deref() == Some(kind)
    }

    pub fn kind_or_unknown(&self) -> &str {
        self.kind.as_deref().unwrap_or("<untyped>")
    }
}

/// `{"type":"session.init","context":"..."}`
#[derive(Debug, Default, Deserialize)]
pub struct SessionInit {
    #[serde(default)]
    pub context: String,
}

impl SessionInit {
    pub fn parse(text: &str) -> RelayResult<Self> {
        serde_json::from_str(text).map_err(|e| RelayError::MalformedMessage(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_reads_type() {
        let envelope = WireEnvelope::parse(r#"{"type":"response.create","extra":1}"#).unwrap();
        assert!(envelope.is("response.create"));
    }

    #[test]
    fn test_envelope_without_type() {
        let envelope = WireEnvelope::parse(r#"{"foo":"bar"}"#).unwrap();
        assert_eq!(envelope.kind, None);
        assert_eq!(envelope.kind_or_unknown(), "<untyped>");
    }

    #[test]
    fn test_envelope_rejects_non_json() {
        assert!(matches!(
            WireEnvelope::parse("not json"),
            Err(RelayError::MalformedMessage(_))
        ));
        assert!(WireEnvelope::parse("[1,2]").is_err());
        assert!(WireEnvelope::parse(r#""text""#).is_err());
    }

    #[test]
    fn test_session_init_context() {
        let init = SessionInit::parse(r#"{"type":"session.init","context":"Acme"}"#).unwrap();
        assert_eq!(init.context, "Acme");

        let empty = SessionInit::parse(r#"{"type":"session.init"}"#).unwrap();
        assert_eq!(empty.context, "");
    }

    #[test]
    fn test_session_init_wrong_context_type() {
        assert!(SessionInit::parse(r#"{"type":"session.init","context":42}"#).is_err());
    }
}
