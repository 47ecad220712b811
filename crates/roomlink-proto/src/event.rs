//! Well-known event names.

use std::fmt;
use std::str::FromStr;

/// Local-only event name carrying [`StatusEvent`](crate::StatusEvent) payloads.
///
/// Never transmitted to peers.
pub const STATUS: &str = "status";

/// Chat-domain events carried as [`Envelope`](crate::Envelope) names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ChatEvent {
    /// A chat message.
    Message,
    /// A reaction on an earlier message.
    Reaction,
    /// A typing indicator.
    Typing,
    /// Deletion of an earlier message.
    Delete,
}

impl ChatEvent {
    /// All chat events, in a stable order.
    pub const ALL: [ChatEvent; 4] = [Self::Message, Self::Reaction, Self::Typing, Self::Delete];

    /// Wire name of the event.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Message => "message",
            Self::Reaction => "reaction",
            Self::Typing => "typing",
            Self::Delete => "delete",
        }
    }
}

impl fmt::Display for ChatEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChatEvent {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL.into_iter().find(|e| e.as_str() == s).ok_or(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn names_round_trip_through_from_str() {
        for ev in ChatEvent::ALL {
            assert_eq!(ev.as_str().parse::<ChatEvent>(), Ok(ev));
        }
        assert!("status".parse::<ChatEvent>().is_err());
    }
}
