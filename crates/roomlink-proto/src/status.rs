//! Session roles, connection states and the status events derived from them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Which side of the claim race a session ended up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Arbitration has not completed.
    Unresolved,
    /// Won the claim; relays between every other peer in the room.
    Coordinator,
    /// Lost the claim; talks only to the coordinator.
    Subordinate,
}

/// Connectivity of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// No transport and no arbitration in flight.
    Disconnected,
    /// Claim or dial in flight.
    Connecting,
    /// Transport available in the given role.
    Active(Role),
    /// Arbitration failed; the caller decides whether to retry.
    Error,
}

impl ConnectionState {
    /// True for `Active(_)`.
    #[inline]
    pub fn is_active(&self) -> bool {
        matches!(self, Self::Active(_))
    }

    /// The status reported to the application for this state.
    pub fn status(&self) -> StatusKind {
        match self {
            Self::Disconnected => StatusKind::Disconnected,
            Self::Connecting | Self::Active(Role::Unresolved) => StatusKind::Connecting,
            Self::Active(Role::Coordinator) => StatusKind::Host,
            Self::Active(Role::Subordinate) => StatusKind::Client,
            Self::Error => StatusKind::Error,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.status().as_str())
    }
}

/// Status values visible to the application layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusKind {
    /// See [`ConnectionState::Disconnected`].
    Disconnected,
    /// See [`ConnectionState::Connecting`].
    Connecting,
    /// Active as coordinator.
    Host,
    /// Active as subordinate.
    Client,
    /// See [`ConnectionState::Error`].
    Error,
}

impl StatusKind {
    /// Stable lowercase name, also used for metric labels.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Host => "host",
            Self::Client => "client",
            Self::Error => "error",
        }
    }
}

/// A status transition as delivered to status subscribers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusEvent {
    /// Machine-readable status.
    pub status: StatusKind,
    /// Human-readable label, e.g. "resolving" or "upstream lost".
    pub label: String,
}

impl StatusEvent {
    /// Build the event reported when entering `state`.
    pub fn new(state: ConnectionState, label: impl Into<String>) -> Self {
        Self {
            status: state.status(),
            label: label.into(),
        }
    }
}
