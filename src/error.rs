//! Unified error handling for roomlink.
//!
//! Errors are grouped by the layer that produces them. Each runtime error
//! exposes a static `error_code()` for metric and log labels.

use roomlink_proto::{ConnectionState, ProtocolError};
use thiserror::Error;

// ============================================================================
// Transport Errors (connection handles)
// ============================================================================

/// Failures on a single peer link.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("connection closed")]
    Closed,

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    #[error("unexpected frame: {0}")]
    UnexpectedFrame(String),
}

impl TransportError {
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Io(_) => "io",
            Self::Protocol(_) => "protocol",
            Self::UnexpectedFrame(_) => "unexpected_frame",
        }
    }
}

// ============================================================================
// Rendezvous Errors
// ============================================================================

/// Outcome of a failed claim.
///
/// `AlreadyClaimed` is the expected collision that sends a session down the
/// subordinate path; everything else is a real failure.
#[derive(Debug, Error)]
pub enum ClaimError {
    #[error("room already claimed")]
    AlreadyClaimed,

    #[error("claim timed out")]
    Timeout,

    #[error("rendezvous rejected claim: {0}")]
    Rejected(String),

    #[error("rendezvous transport failure: {0}")]
    Transport(#[from] TransportError),
}

impl ClaimError {
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AlreadyClaimed => "already_claimed",
            Self::Timeout => "timeout",
            Self::Rejected(_) => "rejected",
            Self::Transport(e) => e.error_code(),
        }
    }
}

/// Failure to reach the coordinator of a room.
#[derive(Debug, Error)]
pub enum DialError {
    #[error("no coordinator for room")]
    NotFound,

    #[error("dial timed out")]
    Timeout,

    #[error("rendezvous rejected dial: {0}")]
    Rejected(String),

    #[error("dial transport failure: {0}")]
    Transport(#[from] TransportError),
}

impl DialError {
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::NotFound => "not_found",
            Self::Timeout => "timeout",
            Self::Rejected(_) => "rejected",
            Self::Transport(e) => e.error_code(),
        }
    }
}

// ============================================================================
// Session Errors
// ============================================================================

/// Errors returned by [`Session`](crate::session::Session) operations.
///
/// Every failure is also reported on the status stream; the `Result` is for
/// callers that prefer to await the outcome directly.
#[derive(Debug, Error)]
pub enum SessionError {
    #[error("session already {0}")]
    AlreadyConnected(ConnectionState),

    #[error("room name has no usable characters: {0:?}")]
    InvalidRoom(String),

    #[error("event name is reserved: {0}")]
    ReservedEvent(String),

    #[error("claim failed: {0}")]
    Claim(ClaimError),

    #[error("dial failed: {0}")]
    Dial(#[from] DialError),

    #[error("session closed during arbitration")]
    Cancelled,
}

impl SessionError {
    #[inline]
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::AlreadyConnected(_) => "already_connected",
            Self::InvalidRoom(_) => "invalid_room",
            Self::ReservedEvent(_) => "reserved_event",
            Self::Claim(e) => e.error_code(),
            Self::Dial(e) => e.error_code(),
            Self::Cancelled => "cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nested_codes_bubble_up() {
        let err = SessionError::Dial(DialError::Transport(TransportError::Closed));
        assert_eq!(err.error_code(), "closed");
        assert_eq!(err.to_string(), "dial failed: dial transport failure: connection closed");
    }

    #[test]
    fn already_connected_names_state() {
        let err = SessionError::AlreadyConnected(ConnectionState::Connecting);
        assert_eq!(err.to_string(), "session already connecting");
    }

    #[test]
    fn io_converts_to_claim_transport() {
        let io = std::io::Error::new(std::io::ErrorKind::ConnectionRefused, "refused");
        let err: ClaimError = TransportError::from(io).into();
        assert_eq!(err.error_code(), "io");
    }
}
