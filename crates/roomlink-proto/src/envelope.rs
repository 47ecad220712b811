//! The envelope carried between peers.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// An event name paired with an opaque payload.
///
/// The session layer never looks inside `payload`; schemas belong to the
/// application that emits the event.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    /// Event name used to route the payload to local subscribers.
    #[serde(rename = "eventName")]
    pub event: String,
    /// Opaque application payload.
    #[serde(default)]
    pub payload: Value,
}

impl Envelope {
    /// Build an envelope from an event name and payload.
    pub fn new(event: impl Into<String>, payload: Value) -> Self {
        Self {
            event: event.into(),
            payload,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn serializes_with_event_name_field() {
        let env = Envelope::new("message", json!("hi"));
        let text = serde_json::to_string(&env).unwrap();
        assert_eq!(text, r#"{"eventName":"message","payload":"hi"}"#);
    }

    #[test]
    fn missing_payload_defaults_to_null() {
        let env: Envelope = serde_json::from_str(r#"{"eventName":"typing"}"#).unwrap();
        assert_eq!(env.event, "typing");
        assert!(env.payload.is_null());
    }
}
