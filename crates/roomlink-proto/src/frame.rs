//! Frames exchanged on peer links and with the rendezvous service.

use serde::{Deserialize, Serialize};

use crate::envelope::Envelope;
use crate::room::CanonicalId;

/// A frame on a peer-to-peer link.
///
/// The dialing side sends exactly one `Hello` first; every following frame is
/// an `Event`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum LinkFrame {
    /// Identifies the dialing peer.
    Hello {
        /// Identity of the dialer.
        peer: String,
    },
    /// An application envelope.
    Event(Envelope),
}

/// Requests sent to the rendezvous service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RendezvousRequest {
    /// Claim `id`, advertising `addr` for dialers. The claim is held for as
    /// long as the control connection stays open.
    Claim {
        /// Room being claimed.
        id: CanonicalId,
        /// Address dialers should connect to.
        addr: String,
    },
    /// Look up the coordinator address for `id`.
    Lookup {
        /// Room being looked up.
        id: CanonicalId,
        /// Require an in-order, lossless transport.
        reliable: bool,
    },
}

/// Replies from the rendezvous service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RendezvousResponse {
    /// The claim was granted.
    Claimed,
    /// Another peer holds the claim.
    AlreadyClaimed,
    /// Coordinator address for a lookup.
    Found {
        /// Address to dial.
        addr: String,
    },
    /// Nobody holds the claim.
    NotFound,
    /// The request could not be served.
    Error {
        /// Reason, for logging.
        reason: String,
    },
}
