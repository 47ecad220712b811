//! Rendezvous implementations with scripted outcomes.

use async_trait::async_trait;
use roomlink::error::TransportError;
use roomlink::{CanonicalId, Claim, ClaimError, DialError, Link, PeerId, Rendezvous};
use std::time::Duration;

/// What [`ScriptedRendezvous`] does on each call.
#[derive(Debug, Clone, Copy)]
pub enum Outcome {
    /// Report a collision (claim) or a transport failure (dial).
    Refuse,
    /// Report a transport failure.
    Break,
    /// Never answer.
    Hang,
}

/// A rendezvous that never grants anything.
#[derive(Debug, Clone, Copy)]
pub struct ScriptedRendezvous {
    pub claim: Outcome,
    pub dial: Outcome,
}

#[allow(dead_code)]
impl ScriptedRendezvous {
    /// Claims collide, dials fail.
    pub fn unreachable_coordinator() -> Self {
        Self {
            claim: Outcome::Refuse,
            dial: Outcome::Break,
        }
    }

    /// The rendezvous itself is down.
    pub fn broken() -> Self {
        Self {
            claim: Outcome::Break,
            dial: Outcome::Break,
        }
    }

    pub fn hanging() -> Self {
        Self {
            claim: Outcome::Hang,
            dial: Outcome::Hang,
        }
    }
}

fn broken_pipe() -> TransportError {
    std::io::Error::new(std::io::ErrorKind::BrokenPipe, "scripted failure").into()
}

#[async_trait]
impl Rendezvous for ScriptedRendezvous {
    async fn claim(&self, _id: &CanonicalId, _local: &PeerId) -> Result<Claim, ClaimError> {
        match self.claim {
            Outcome::Refuse => Err(ClaimError::AlreadyClaimed),
            Outcome::Break => Err(ClaimError::Transport(broken_pipe())),
            Outcome::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(ClaimError::Timeout)
            }
        }
    }

    async fn dial(&self, _id: &CanonicalId, _local: &PeerId) -> Result<Link, DialError> {
        match self.dial {
            Outcome::Refuse => Err(DialError::NotFound),
            Outcome::Break => Err(DialError::Transport(broken_pipe())),
            Outcome::Hang => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(DialError::Timeout)
            }
        }
    }
}
