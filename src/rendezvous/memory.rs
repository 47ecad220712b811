//! In-process rendezvous shared by sessions in one process.

use super::{Claim, Rendezvous};
use crate::error::{ClaimError, DialError, TransportError};
use crate::transport::{Link, PeerId, memory};
use async_trait::async_trait;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use roomlink_proto::CanonicalId;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::debug;

const ACCEPT_BACKLOG: usize = 64;

#[derive(Debug, Clone)]
struct ClaimSlot {
    owner: PeerId,
    accept: mpsc::Sender<Link>,
}

/// Rendezvous backed by a shared map. Clones share the same registry.
///
/// A claim whose [`Claim`] has been dropped is stale and may be taken over.
#[derive(Debug, Clone, Default)]
pub struct MemoryRendezvous {
    claims: Arc<DashMap<CanonicalId, ClaimSlot>>,
}

impl MemoryRendezvous {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current live owner of `id`, if any.
    pub fn owner(&self, id: &CanonicalId) -> Option<PeerId> {
        self.claims
            .get(id)
            .filter(|slot| !slot.accept.is_closed())
            .map(|slot| slot.owner.clone())
    }
}

#[async_trait]
impl Rendezvous for MemoryRendezvous {
    async fn claim(&self, id: &CanonicalId, local: &PeerId) -> Result<Claim, ClaimError> {
        let (accept, incoming) = mpsc::channel(ACCEPT_BACKLOG);
        let slot = ClaimSlot {
            owner: local.clone(),
            accept,
        };

        match self.claims.entry(id.clone()) {
            Entry::Occupied(mut e) => {
                if !e.get().accept.is_closed() {
                    return Err(ClaimError::AlreadyClaimed);
                }
                debug!(room = %id, stale = %e.get().owner, "Replacing stale claim");
                e.insert(slot);
            }
            Entry::Vacant(e) => {
                e.insert(slot);
            }
        }

        Ok(Claim {
            identity: local.clone(),
            incoming,
        })
    }

    async fn dial(&self, id: &CanonicalId, local: &PeerId) -> Result<Link, DialError> {
        // Clone out so the map guard is not held across the await below.
        let slot = self
            .claims
            .get(id)
            .map(|slot| slot.clone())
            .ok_or(DialError::NotFound)?;

        let (ours, theirs) = memory::pair(local.clone(), slot.owner.clone());
        slot.accept
            .send(theirs)
            .await
            .map_err(|_| DialError::Transport(TransportError::Closed))?;
        Ok(ours)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roomlink_proto::Envelope;
    use serde_json::json;

    #[tokio::test]
    async fn second_claim_collides() {
        let rv = MemoryRendezvous::new();
        let id = CanonicalId::from_room("lobby");

        let _claim = rv.claim(&id, &PeerId::new("a")).await.unwrap();
        let second = rv.claim(&id, &PeerId::new("b")).await;
        assert!(matches!(second, Err(ClaimError::AlreadyClaimed)));
        assert_eq!(rv.owner(&id), Some(PeerId::new("a")));
    }

    #[tokio::test]
    async fn dropped_claim_can_be_retaken() {
        let rv = MemoryRendezvous::new();
        let id = CanonicalId::from_room("lobby");

        drop(rv.claim(&id, &PeerId::new("a")).await.unwrap());
        assert_eq!(rv.owner(&id), None);
        assert!(rv.claim(&id, &PeerId::new("b")).await.is_ok());
    }

    #[tokio::test]
    async fn dial_reaches_claimant() {
        let rv = MemoryRendezvous::new();
        let id = CanonicalId::from_room("lobby");
        let mut claim = rv.claim(&id, &PeerId::new("coord")).await.unwrap();

        let link = rv.dial(&id, &PeerId::new("sub")).await.unwrap();
        assert_eq!(link.peer().as_str(), "coord");

        let mut accepted = claim.incoming.recv().await.unwrap();
        assert_eq!(accepted.peer().as_str(), "sub");

        link.handle.send(Envelope::new("message", json!("hi"))).unwrap();
        assert_eq!(accepted.inbound.recv().await.unwrap().payload, json!("hi"));
    }

    #[tokio::test]
    async fn dial_without_claim_fails() {
        let rv = MemoryRendezvous::new();
        let result = rv.dial(&CanonicalId::from_room("empty"), &PeerId::new("x")).await;
        assert!(matches!(result, Err(DialError::NotFound)));
    }
}
