//! Chat payloads and the terminal client's input grammar.
//!
//! The session layer treats payloads as opaque JSON; this module gives the
//! four chat events their shape.

use chrono::{DateTime, Utc};
use roomlink_proto::ChatEvent;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: String,
    pub author: String,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

impl ChatMessage {
    /// A new message with a fresh id, stamped now.
    pub fn new(author: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            id: short_id(),
            author: author.into(),
            text: text.into(),
            sent_at: Utc::now(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reaction {
    pub message_id: String,
    pub author: String,
    pub emoji: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Typing {
    pub author: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Delete {
    pub message_id: String,
    pub author: String,
}

/// A decoded chat event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChatPayload {
    Message(ChatMessage),
    Reaction(Reaction),
    Typing(Typing),
    Delete(Delete),
}

impl ChatPayload {
    pub fn event(&self) -> ChatEvent {
        match self {
            Self::Message(_) => ChatEvent::Message,
            Self::Reaction(_) => ChatEvent::Reaction,
            Self::Typing(_) => ChatEvent::Typing,
            Self::Delete(_) => ChatEvent::Delete,
        }
    }

    /// Encode for [`Session::emit`](crate::session::Session::emit).
    pub fn to_value(&self) -> serde_json::Result<Value> {
        match self {
            Self::Message(m) => serde_json::to_value(m),
            Self::Reaction(r) => serde_json::to_value(r),
            Self::Typing(t) => serde_json::to_value(t),
            Self::Delete(d) => serde_json::to_value(d),
        }
    }

    /// Decode a payload received under `event`.
    pub fn decode(event: ChatEvent, payload: &Value) -> serde_json::Result<Self> {
        let payload = payload.clone();
        Ok(match event {
            ChatEvent::Message => Self::Message(serde_json::from_value(payload)?),
            ChatEvent::Reaction => Self::Reaction(serde_json::from_value(payload)?),
            ChatEvent::Typing => Self::Typing(serde_json::from_value(payload)?),
            ChatEvent::Delete => Self::Delete(serde_json::from_value(payload)?),
        })
    }

    /// One line of terminal output.
    pub fn render(&self) -> String {
        match self {
            Self::Message(m) => format!(
                "[{}] <{}> {} ({})",
                m.sent_at.format("%H:%M:%S"),
                m.author,
                m.text,
                m.id
            ),
            Self::Reaction(r) => format!("* {} reacted {} to {}", r.author, r.emoji, r.message_id),
            Self::Typing(t) => format!("* {} is typing...", t.author),
            Self::Delete(d) => format!("* {} deleted {}", d.author, d.message_id),
        }
    }
}

/// One line typed at the terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Input {
    Say(String),
    React { message_id: String, emoji: String },
    Typing,
    Delete { message_id: String },
    Quit,
    Empty,
    /// A slash command that did not parse; carries a usage hint.
    Invalid(&'static str),
}

impl Input {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Empty;
        }
        let Some(command) = line.strip_prefix('/') else {
            return Self::Say(line.to_string());
        };

        let mut parts = command.split_whitespace();
        match parts.next().map(str::to_ascii_lowercase).as_deref() {
            Some("react") => match (parts.next(), parts.next()) {
                (Some(id), Some(emoji)) => Self::React {
                    message_id: id.to_string(),
                    emoji: emoji.to_string(),
                },
                _ => Self::Invalid("usage: /react <id> <emoji>"),
            },
            Some("typing") => Self::Typing,
            Some("delete") => match parts.next() {
                Some(id) => Self::Delete {
                    message_id: id.to_string(),
                },
                None => Self::Invalid("usage: /delete <id>"),
            },
            Some("quit") => Self::Quit,
            _ => Self::Invalid("commands: /react <id> <emoji>, /typing, /delete <id>, /quit"),
        }
    }

    /// The payload to emit for this input, if any.
    pub fn into_payload(self, author: &str) -> Option<ChatPayload> {
        let author = author.to_string();
        match self {
            Self::Say(text) => Some(ChatPayload::Message(ChatMessage::new(author, text))),
            Self::React { message_id, emoji } => Some(ChatPayload::Reaction(Reaction {
                message_id,
                author,
                emoji,
            })),
            Self::Typing => Some(ChatPayload::Typing(Typing { author })),
            Self::Delete { message_id } => Some(ChatPayload::Delete(Delete { message_id, author })),
            Self::Quit | Self::Empty | Self::Invalid(_) => None,
        }
    }
}

fn short_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn plain_line_is_a_message() {
        assert_eq!(Input::parse("  hello there "), Input::Say("hello there".into()));
        assert_eq!(Input::parse("   "), Input::Empty);
    }

    #[test]
    fn commands_parse() {
        assert_eq!(
            Input::parse("/react ab12cd34 👍"),
            Input::React {
                message_id: "ab12cd34".into(),
                emoji: "👍".into()
            }
        );
        assert_eq!(Input::parse("/TYPING"), Input::Typing);
        assert_eq!(
            Input::parse("/delete ab12cd34"),
            Input::Delete {
                message_id: "ab12cd34".into()
            }
        );
        assert_eq!(Input::parse("/quit"), Input::Quit);
    }

    #[test]
    fn bad_commands_are_invalid() {
        assert!(matches!(Input::parse("/react onlyid"), Input::Invalid(_)));
        assert!(matches!(Input::parse("/delete"), Input::Invalid(_)));
        assert!(matches!(Input::parse("/dance"), Input::Invalid(_)));
    }

    #[test]
    fn message_payload_shape() {
        let payload = Input::Say("hi".into()).into_payload("ada").unwrap();
        assert_eq!(payload.event(), ChatEvent::Message);
        let value = payload.to_value().unwrap();
        assert_eq!(value["author"], "ada");
        assert_eq!(value["text"], "hi");
        assert_eq!(value["id"].as_str().map(str::len), Some(8));
        assert!(value["sent_at"].is_string());
    }

    #[test]
    fn decode_rejects_wrong_shape() {
        assert!(ChatPayload::decode(ChatEvent::Reaction, &json!({"author": "x"})).is_err());
        let typing = ChatPayload::decode(ChatEvent::Typing, &json!({"author": "bob"})).unwrap();
        assert_eq!(typing.render(), "* bob is typing...");
    }
}
