//! Rendezvous: deciding who coordinates a room and reaching them.
//!
//! Every implementation must guarantee that, for one canonical id, at most
//! one live claim exists at a time (a compare-and-swap on the id). Losing
//! the race yields [`ClaimError::AlreadyClaimed`]; the loser then dials the
//! winner.

pub mod memory;
pub mod server;
pub mod tcp;

use crate::error::{ClaimError, DialError};
use crate::transport::{Link, PeerId};
use async_trait::async_trait;
use roomlink_proto::CanonicalId;
use tokio::sync::mpsc;

pub use memory::MemoryRendezvous;
pub use server::RendezvousServer;
pub use tcp::TcpRendezvous;

/// A granted claim on a room.
///
/// New inbound links arrive on `incoming`. Dropping the claim releases it.
#[derive(Debug)]
pub struct Claim {
    pub identity: PeerId,
    pub incoming: mpsc::Receiver<Link>,
}

#[async_trait]
pub trait Rendezvous: Send + Sync {
    /// Try to become the coordinator of `id`.
    async fn claim(&self, id: &CanonicalId, local: &PeerId) -> Result<Claim, ClaimError>;

    /// Open a reliable (in-order, lossless) link to the coordinator of `id`.
    async fn dial(&self, id: &CanonicalId, local: &PeerId) -> Result<Link, DialError>;
}
