use crate::error::TransportError;
use roomlink_proto::Envelope;
use std::fmt;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Identity of a peer on a link. Not authenticated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerId(String);

impl PeerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// A fresh random identity.
    pub fn random() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PeerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Receiving half of a link. Yields `None` once the link is closed.
pub type Inbound = mpsc::UnboundedReceiver<Envelope>;

/// Sending half of a link to one remote peer.
///
/// Closing is idempotent and closes the whole link: both directions stop and
/// the remote side observes the end of its inbound stream.
#[derive(Debug)]
pub struct ConnectionHandle {
    peer: PeerId,
    tx: mpsc::UnboundedSender<Envelope>,
    shutdown: CancellationToken,
}

impl ConnectionHandle {
    pub(crate) fn new(
        peer: PeerId,
        tx: mpsc::UnboundedSender<Envelope>,
        shutdown: CancellationToken,
    ) -> Self {
        Self { peer, tx, shutdown }
    }

    /// The remote peer this handle writes to.
    pub fn peer(&self) -> &PeerId {
        &self.peer
    }

    pub fn is_open(&self) -> bool {
        !self.shutdown.is_cancelled() && !self.tx.is_closed()
    }

    /// Queue `envelope` for transmission. Never blocks.
    pub fn send(&self, envelope: Envelope) -> Result<(), TransportError> {
        self.try_send(envelope).map_err(|_| TransportError::Closed)
    }

    /// Like [`send`](Self::send), but hands the envelope back if the link
    /// is closed.
    pub fn try_send(&self, envelope: Envelope) -> Result<(), Envelope> {
        if self.shutdown.is_cancelled() {
            return Err(envelope);
        }
        self.tx.send(envelope).map_err(|e| e.0)
    }

    pub fn close(&self) {
        self.shutdown.cancel();
    }

    /// Resolves once the link has been closed from either side.
    pub async fn closed(&self) {
        self.shutdown.cancelled().await;
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

/// A connected link: write through `handle`, read from `inbound`.
#[derive(Debug)]
pub struct Link {
    pub handle: ConnectionHandle,
    pub inbound: Inbound,
}

impl Link {
    pub fn peer(&self) -> &PeerId {
        self.handle.peer()
    }

    pub fn into_parts(self) -> (ConnectionHandle, Inbound) {
        (self.handle, self.inbound)
    }
}
