//! Room name normalization.
//!
//! Every peer that joins "the same room" must race for the same rendezvous
//! key, so room names are folded with [`normalize`] (ASCII lowercase, only
//! `[a-z0-9]` kept) and prefixed with [`NAMESPACE`] so that other users of a
//! shared discovery service do not collide with us.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ProtocolError;

/// Namespace tag prepended to every canonical id.
pub const NAMESPACE: &str = "roomlink-";

/// Fold a single character, returning `None` if it is dropped.
#[inline]
pub const fn room_fold_char(c: char) -> Option<char> {
    match c {
        'A'..='Z' => Some((c as u8 + 32) as char),
        'a'..='z' | '0'..='9' => Some(c),
        _ => None,
    }
}

/// Fold a room name. Idempotent: the output only contains characters the
/// fold keeps unchanged.
pub fn normalize(room: &str) -> String {
    room.chars().filter_map(room_fold_char).collect()
}

/// Normalized, namespaced room identifier.
///
/// Always `NAMESPACE` followed by a [`normalize`]d room name. Ids received
/// off the wire are checked against that shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct CanonicalId(String);

impl CanonicalId {
    /// Derive the canonical id for a user-supplied room name.
    pub fn from_room(room: &str) -> Self {
        let body = normalize(room);
        let mut id = String::with_capacity(NAMESPACE.len() + body.len());
        id.push_str(NAMESPACE);
        id.push_str(&body);
        Self(id)
    }

    /// The full id, including the namespace tag.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The room part of the id, without the namespace tag.
    pub fn room(&self) -> &str {
        self.0.strip_prefix(NAMESPACE).unwrap_or_default()
    }

    /// True when the room name had no usable characters at all.
    pub fn is_blank(&self) -> bool {
        self.room().is_empty()
    }
}

impl TryFrom<String> for CanonicalId {
    type Error = ProtocolError;

    fn try_from(id: String) -> Result<Self, Self::Error> {
        match id.strip_prefix(NAMESPACE) {
            Some(body) if normalize(body) == body => Ok(Self(id)),
            _ => Err(ProtocolError::InvalidRoomId(id)),
        }
    }
}

impl From<CanonicalId> for String {
    fn from(id: CanonicalId) -> Self {
        id.0
    }
}

impl fmt::Display for CanonicalId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_room_fold_char() {
        assert_eq!(room_fold_char('A'), Some('a'));
        assert_eq!(room_fold_char('z'), Some('z'));
        assert_eq!(room_fold_char('7'), Some('7'));
        assert_eq!(room_fold_char(' '), None);
        assert_eq!(room_fold_char('!'), None);
        assert_eq!(room_fold_char('é'), None);
    }

    #[test]
    fn lobby_variants_collide() {
        let a = CanonicalId::from_room("Lobby");
        let b = CanonicalId::from_room("  lobby!!");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "roomlink-lobby");
        assert_eq!(a.room(), "lobby");
    }

    #[test]
    fn normalizing_twice_is_stable() {
        let once = normalize("Team Standup #3");
        assert_eq!(once, "teamstandup3");
        assert_eq!(normalize(&once), once);
    }

    #[test]
    fn case_only_difference_is_same_room() {
        let upper = CanonicalId::from_room("Roomlink-Lobby");
        let lower = CanonicalId::from_room("roomlink-lobby");
        assert_eq!(upper, lower);
        assert_eq!(upper.as_str(), "roomlink-roomlinklobby");
    }

    #[test]
    fn namespace_text_is_part_of_the_name() {
        assert_ne!(
            CanonicalId::from_room("roomlink-lobby"),
            CanonicalId::from_room("lobby")
        );
    }

    #[test]
    fn blank_room() {
        assert!(CanonicalId::from_room("!!!").is_blank());
        assert!(CanonicalId::from_room("").is_blank());
        assert!(!CanonicalId::from_room("a").is_blank());
    }

    #[test]
    fn serializes_as_plain_string() {
        let id = CanonicalId::from_room("Ops");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"roomlink-ops\"");
        let back: CanonicalId = serde_json::from_str("\"roomlink-ops\"").unwrap();
        assert_eq!(back, id);
    }

    #[test]
    fn deserialize_rejects_non_canonical_ids() {
        for bad in ["\"lobby\"", "\"roomlink-Lobby\"", "\"x\"", "\"é\"", "\"roomlink-a b\""] {
            assert!(
                serde_json::from_str::<CanonicalId>(bad).is_err(),
                "accepted {bad}"
            );
        }
        assert!(matches!(
            CanonicalId::try_from("ops".to_string()),
            Err(ProtocolError::InvalidRoomId(_))
        ));
    }
}
