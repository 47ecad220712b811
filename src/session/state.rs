//! Session state machine.
//!
//! Pure, synchronous transitions over the session's mutable state. The
//! async layer in [`super`] holds the lock, calls one transition, and
//! publishes the returned [`StatusEvent`] after releasing it.
//!
//! Every arbitration bumps `generation`. Callbacks carry the generation
//! they were created under and are ignored once it is stale.

use super::relay;
use crate::error::SessionError;
use crate::queue::OutboundQueue;
use crate::transport::{ConnectionHandle, PeerId};
use roomlink_proto::{CanonicalId, ConnectionState, Envelope, Role, StatusEvent};
use std::collections::HashMap;
use tokio::task::JoinHandle;
use tracing::{debug, info};

pub(crate) struct SessionCore {
    pub(crate) state: ConnectionState,
    pub(crate) role: Role,
    pub(crate) room: Option<CanonicalId>,
    pub(crate) generation: u64,
    pub(crate) upstream: Option<ConnectionHandle>,
    pub(crate) downstream: HashMap<PeerId, ConnectionHandle>,
    pub(crate) queue: OutboundQueue,
    pub(crate) acceptor: Option<JoinHandle<()>>,
}

impl SessionCore {
    pub(crate) fn new(queue_capacity: usize) -> Self {
        Self {
            state: ConnectionState::Disconnected,
            role: Role::Unresolved,
            room: None,
            generation: 0,
            upstream: None,
            downstream: HashMap::new(),
            queue: OutboundQueue::new(queue_capacity),
            acceptor: None,
        }
    }

    fn transition(&mut self, state: ConnectionState, label: &str) -> StatusEvent {
        let event = StatusEvent::new(state, label);
        info!(from = %self.state, to = %state, label, "Session status");
        self.state = state;
        crate::metrics::record_status(event.status.as_str());
        event
    }

    #[inline]
    pub(crate) fn is_current(&self, generation: u64) -> bool {
        self.generation == generation
    }

    fn ensure_current(&self, generation: u64) -> Result<(), SessionError> {
        if self.is_current(generation) {
            Ok(())
        } else {
            Err(SessionError::Cancelled)
        }
    }

    /// Start arbitrating for `room`. Rejected while connecting or active.
    pub(crate) fn begin(&mut self, room: CanonicalId) -> Result<(u64, StatusEvent), SessionError> {
        if matches!(
            self.state,
            ConnectionState::Connecting | ConnectionState::Active(_)
        ) {
            return Err(SessionError::AlreadyConnected(self.state));
        }
        self.release_links();
        self.generation += 1;
        self.role = Role::Unresolved;
        self.room = Some(room);
        let status = self.transition(ConnectionState::Connecting, "resolving");
        Ok((self.generation, status))
    }

    /// Claim won: coordinate, then flush the queue to current downstreams.
    pub(crate) fn activate_coordinator(&mut self, generation: u64) -> Result<StatusEvent, SessionError> {
        self.ensure_current(generation)?;
        self.role = Role::Coordinator;
        let status = self.transition(ConnectionState::Active(Role::Coordinator), "active");

        let downstream = &self.downstream;
        let flushed = self.queue.drain_into(|env| {
            relay::fan_out(downstream, None, &env);
        });
        if flushed > 0 {
            debug!(flushed, links = downstream.len(), "Flushed outbound queue");
        }
        Ok(status)
    }

    /// Claim lost: about to dial the coordinator.
    pub(crate) fn begin_handshake(&mut self, generation: u64) -> Result<StatusEvent, SessionError> {
        self.ensure_current(generation)?;
        self.role = Role::Subordinate;
        Ok(self.transition(ConnectionState::Connecting, "handshaking"))
    }

    /// Dial succeeded: hold the upstream, then flush the queue into it.
    pub(crate) fn activate_subordinate(
        &mut self,
        generation: u64,
        upstream: ConnectionHandle,
    ) -> Result<StatusEvent, SessionError> {
        self.ensure_current(generation)?;
        let status = self.transition(ConnectionState::Active(Role::Subordinate), "active");

        let flushed = self.queue.try_drain_into(|env| {
            upstream.try_send(env)?;
            crate::metrics::record_sent_upstream();
            Ok(())
        });
        if !self.queue.is_empty() {
            debug!(flushed, kept = self.queue.len(), "Upstream closed during flush");
        } else if flushed > 0 {
            debug!(flushed, "Flushed outbound queue");
        }
        self.upstream = Some(upstream);
        Ok(status)
    }

    /// Arbitration failed. Ignored if the attempt is stale.
    pub(crate) fn fail(&mut self, generation: u64, label: &str) -> Option<StatusEvent> {
        if !self.is_current(generation) {
            return None;
        }
        self.release_links();
        Some(self.transition(ConnectionState::Error, label))
    }

    /// Add an accepted link. Returns false (and closes it) if this session
    /// is no longer coordinating under `generation`.
    pub(crate) fn attach_downstream(&mut self, generation: u64, handle: ConnectionHandle) -> bool {
        if !self.is_current(generation) || self.state != ConnectionState::Active(Role::Coordinator) {
            handle.close();
            return false;
        }
        if let Some(previous) = self.downstream.insert(handle.peer().clone(), handle) {
            debug!(peer = %previous.peer(), "Replacing existing downstream link");
            previous.close();
        }
        crate::metrics::set_downstream_links(self.downstream.len());
        true
    }

    /// A link to `peer` ended.
    ///
    /// Losing the upstream disconnects a subordinate. A coordinator keeps
    /// its role when a downstream link ends and reports `host "peer left"`.
    pub(crate) fn link_closed(&mut self, generation: u64, peer: &PeerId) -> Option<StatusEvent> {
        if !self.is_current(generation) {
            debug!(peer = %peer, "Ignoring close from a previous session");
            return None;
        }
        match self.role {
            Role::Coordinator => {
                let stale = self.downstream.get(peer).is_some_and(|h| !h.is_open());
                if !stale || !self.state.is_active() {
                    return None;
                }
                self.downstream.remove(peer);
                crate::metrics::set_downstream_links(self.downstream.len());
                info!(peer = %peer, remaining = self.downstream.len(), "Peer left");
                Some(StatusEvent::new(self.state, "peer left"))
            }
            Role::Subordinate => {
                let ours = self
                    .upstream
                    .as_ref()
                    .is_some_and(|h| h.peer() == peer && !h.is_open());
                if !ours || !self.state.is_active() {
                    return None;
                }
                self.upstream = None;
                Some(self.transition(ConnectionState::Disconnected, "upstream lost"))
            }
            Role::Unresolved => None,
        }
    }

    /// Send an emitted envelope now if active, otherwise queue it.
    pub(crate) fn route(&mut self, envelope: Envelope) {
        match self.state {
            ConnectionState::Active(Role::Coordinator) => {
                relay::fan_out(&self.downstream, None, &envelope);
            }
            ConnectionState::Active(Role::Subordinate) => {
                let unsent = match &self.upstream {
                    Some(upstream) => upstream.try_send(envelope).err(),
                    None => Some(envelope),
                };
                match unsent {
                    Some(envelope) => {
                        self.queue.enqueue(envelope);
                    }
                    None => crate::metrics::record_sent_upstream(),
                }
            }
            _ => {
                self.queue.enqueue(envelope);
            }
        }
    }

    /// Forward an inbound envelope if coordinating under `generation`.
    pub(crate) fn forward(&self, generation: u64, origin: &PeerId, envelope: &Envelope) -> usize {
        if !self.is_current(generation) || self.role != Role::Coordinator {
            return 0;
        }
        relay::fan_out(&self.downstream, Some(origin), envelope)
    }

    /// Tear everything down. Subscriptions live on the bus and survive.
    pub(crate) fn shutdown(&mut self) -> Option<StatusEvent> {
        self.generation += 1;
        self.release_links();
        self.queue.clear();
        self.role = Role::Unresolved;
        self.room = None;
        if self.state == ConnectionState::Disconnected {
            None
        } else {
            Some(self.transition(ConnectionState::Disconnected, "closed"))
        }
    }

    fn release_links(&mut self) {
        if let Some(acceptor) = self.acceptor.take() {
            acceptor.abort();
        }
        if let Some(upstream) = self.upstream.take() {
            upstream.close();
        }
        for (_, handle) in self.downstream.drain() {
            handle.close();
        }
        crate::metrics::set_downstream_links(0);
    }
}
