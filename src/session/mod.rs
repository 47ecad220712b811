//! Peer session: arbitration, relay and the public emit/subscribe surface.
//!
//! A [`Session`] joins one room at a time. [`Session::connect`] races the
//! other members for the room's claim: the winner becomes the coordinator
//! and accepts links from everyone else, the losers dial it. Emitted events
//! are delivered locally first, then sent (or queued until a transport
//! exists).
//!
//! Status changes are published on the local-only `status` event; see
//! [`Session::on_status`].

mod state;
mod relay;

use self::state::SessionCore;
use crate::bus::{EventBus, SubscriptionId};
use crate::config::SessionConfig;
use crate::error::{ClaimError, DialError, SessionError};
use crate::rendezvous::{Claim, Rendezvous};
use crate::telemetry::spans;
use crate::transport::{Inbound, Link, PeerId};
use parking_lot::Mutex;
use roomlink_proto::event::STATUS;
use roomlink_proto::{CanonicalId, ConnectionState, Envelope, Role, StatusEvent};
use serde_json::Value;
use std::sync::{Arc, Weak};
use tokio::sync::mpsc;
use tracing::{Instrument, debug, info, warn};

struct Inner {
    local: PeerId,
    bus: EventBus,
    rendezvous: Arc<dyn Rendezvous>,
    settings: SessionConfig,
    core: Mutex<SessionCore>,
}

impl Drop for Inner {
    fn drop(&mut self) {
        self.core.get_mut().shutdown();
    }
}

/// One participant's session. Clones share the same session.
#[derive(Clone)]
pub struct Session {
    inner: Arc<Inner>,
}

impl Session {
    /// Create a disconnected session with default settings.
    pub fn new(rendezvous: Arc<dyn Rendezvous>) -> Self {
        Self::with_config(rendezvous, SessionConfig::default())
    }

    pub fn with_config(rendezvous: Arc<dyn Rendezvous>, settings: SessionConfig) -> Self {
        Self::with_identity(PeerId::random(), rendezvous, settings)
    }

    /// Create a session with a fixed local identity.
    pub fn with_identity(
        local: PeerId,
        rendezvous: Arc<dyn Rendezvous>,
        settings: SessionConfig,
    ) -> Self {
        let core = SessionCore::new(settings.queue_capacity);
        Self {
            inner: Arc::new(Inner {
                local,
                bus: EventBus::new(),
                rendezvous,
                settings,
                core: Mutex::new(core),
            }),
        }
    }

    pub fn local_peer(&self) -> &PeerId {
        &self.inner.local
    }

    pub fn state(&self) -> ConnectionState {
        self.inner.core.lock().state
    }

    pub fn role(&self) -> Role {
        self.inner.core.lock().role
    }

    /// Canonical id of the room last passed to [`connect`](Self::connect).
    pub fn room(&self) -> Option<CanonicalId> {
        self.inner.core.lock().room.clone()
    }

    /// Envelopes waiting for a transport.
    pub fn queued(&self) -> usize {
        self.inner.core.lock().queue.len()
    }

    /// Peers currently linked to this session as coordinator.
    pub fn downstream_peers(&self) -> Vec<PeerId> {
        let mut peers: Vec<PeerId> = self.inner.core.lock().downstream.keys().cloned().collect();
        peers.sort();
        peers
    }

    // ------------------------------------------------------------------
    // Subscriptions
    // ------------------------------------------------------------------

    /// Subscribe to `event`, whether emitted locally or received from a peer.
    pub fn on<F>(&self, event: &str, handler: F) -> SubscriptionId
    where
        F: Fn(&Value) + Send + Sync + 'static,
    {
        self.inner.bus.subscribe(event, handler)
    }

    pub fn off(&self, id: SubscriptionId) -> bool {
        self.inner.bus.unsubscribe(id)
    }

    /// Subscribe to status transitions.
    pub fn on_status<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&StatusEvent) + Send + Sync + 'static,
    {
        self.on(STATUS, move |value| {
            match serde_json::from_value::<StatusEvent>(value.clone()) {
                Ok(status) => handler(&status),
                Err(e) => warn!(error = %e, "Malformed status payload"),
            }
        })
    }

    // ------------------------------------------------------------------
    // Sending
    // ------------------------------------------------------------------

    /// Deliver locally, then send to the room or queue until connected.
    pub fn emit(&self, event: &str, payload: Value) -> Result<(), SessionError> {
        if event == STATUS {
            return Err(SessionError::ReservedEvent(event.to_string()));
        }
        crate::metrics::record_emitted();
        self.inner.bus.publish(event, &payload);
        self.inner.core.lock().route(Envelope::new(event, payload));
        Ok(())
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Join `room`, resolving this session's role.
    ///
    /// Every outcome is also reported on the status stream.
    pub async fn connect(&self, room: &str) -> Result<Role, SessionError> {
        let id = CanonicalId::from_room(room);
        if id.is_blank() {
            return Err(SessionError::InvalidRoom(room.to_string()));
        }
        let span = spans::session(id.as_str(), self.inner.local.as_str());

        let (generation, status) = self.inner.core.lock().begin(id.clone())?;
        self.publish_status(&status);

        self.arbitrate(generation, id).instrument(span).await
    }

    async fn arbitrate(&self, generation: u64, id: CanonicalId) -> Result<Role, SessionError> {
        let timeout = self.inner.settings.connect_timeout();
        let claimed = tokio::time::timeout(
            timeout,
            self.inner.rendezvous.claim(&id, &self.inner.local),
        )
        .await
        .unwrap_or(Err(ClaimError::Timeout));

        match claimed {
            Ok(claim) => {
                info!(identity = %claim.identity, "Claimed room");
                self.become_coordinator(generation, claim)
            }
            Err(ClaimError::AlreadyClaimed) => {
                debug!("Room already claimed, dialing coordinator");
                self.become_subordinate(generation, &id).await
            }
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "Claim failed");
                self.fail(generation, "claim failed");
                Err(SessionError::Claim(e))
            }
        }
    }

    fn become_coordinator(&self, generation: u64, claim: Claim) -> Result<Role, SessionError> {
        let status = self.inner.core.lock().activate_coordinator(generation)?;
        self.publish_status(&status);

        let acceptor = tokio::spawn(
            accept_loop(Arc::downgrade(&self.inner), generation, claim.incoming)
                .instrument(tracing::Span::current()),
        );
        let mut core = self.inner.core.lock();
        if core.is_current(generation) {
            core.acceptor = Some(acceptor);
            Ok(Role::Coordinator)
        } else {
            acceptor.abort();
            Err(SessionError::Cancelled)
        }
    }

    async fn become_subordinate(&self, generation: u64, id: &CanonicalId) -> Result<Role, SessionError> {
        let status = self.inner.core.lock().begin_handshake(generation)?;
        self.publish_status(&status);

        let timeout = self.inner.settings.connect_timeout();
        let dialed = tokio::time::timeout(timeout, self.inner.rendezvous.dial(id, &self.inner.local))
            .await
            .unwrap_or(Err(DialError::Timeout));

        let link = match dialed {
            Ok(link) => link,
            Err(e) => {
                warn!(error = %e, code = e.error_code(), "Dial failed");
                self.fail(generation, "dial failed");
                return Err(e.into());
            }
        };

        let (handle, inbound) = link.into_parts();
        let peer = handle.peer().clone();
        let status = self.inner.core.lock().activate_subordinate(generation, handle)?;
        info!(coordinator = %peer, "Linked to coordinator");
        spawn_reader(Arc::downgrade(&self.inner), generation, peer, inbound);
        self.publish_status(&status);
        Ok(Role::Subordinate)
    }

    fn fail(&self, generation: u64, label: &str) {
        let status = self.inner.core.lock().fail(generation, label);
        if let Some(status) = status {
            self.publish_status(&status);
        }
    }

    /// Leave the room: close every link, drop the claim and the queue.
    ///
    /// Subscriptions are kept; the session may [`connect`](Self::connect)
    /// again afterwards.
    pub fn close(&self) {
        let status = self.inner.core.lock().shutdown();
        if let Some(status) = status {
            self.publish_status(&status);
        }
    }

    fn publish_status(&self, status: &StatusEvent) {
        self.inner.publish_status(status);
    }
}

impl Inner {
    fn publish_status(&self, status: &StatusEvent) {
        match serde_json::to_value(status) {
            Ok(value) => {
                self.bus.publish(STATUS, &value);
            }
            Err(e) => warn!(error = %e, "Failed to encode status"),
        }
    }

    fn on_link(self: &Arc<Self>, generation: u64, link: Link) {
        let (handle, inbound) = link.into_parts();
        let peer = handle.peer().clone();
        if self.core.lock().attach_downstream(generation, handle) {
            info!(peer = %peer, "Peer joined");
            spawn_reader(Arc::downgrade(self), generation, peer, inbound);
        }
    }

    fn on_inbound(&self, generation: u64, origin: &PeerId, envelope: Envelope) {
        if envelope.event == STATUS {
            warn!(peer = %origin, "Dropping reserved status event from peer");
            return;
        }
        self.bus.publish(&envelope.event, &envelope.payload);
        let forwarded = self.core.lock().forward(generation, origin, &envelope);
        if forwarded > 0 {
            debug!(event = %envelope.event, origin = %origin, forwarded, "Relayed envelope");
        }
    }

    fn on_link_closed(&self, generation: u64, peer: &PeerId) {
        let status = self.core.lock().link_closed(generation, peer);
        if let Some(status) = status {
            self.publish_status(&status);
        }
    }
}

async fn accept_loop(inner: Weak<Inner>, generation: u64, mut incoming: mpsc::Receiver<Link>) {
    while let Some(link) = incoming.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        inner.on_link(generation, link);
    }
    debug!("Acceptor finished");
}

fn spawn_reader(inner: Weak<Inner>, generation: u64, peer: PeerId, mut inbound: Inbound) {
    let span = spans::link(peer.as_str());
    tokio::spawn(
        async move {
            while let Some(envelope) = inbound.recv().await {
                let Some(inner) = inner.upgrade() else {
                    return;
                };
                inner.on_inbound(generation, &peer, envelope);
            }
            if let Some(inner) = inner.upgrade() {
                inner.on_link_closed(generation, &peer);
            }
        }
        .instrument(span),
    );
}
