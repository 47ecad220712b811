//! roomlink - serverless chat rooms over direct peer links.
//!
//! Peers sharing a room name race for the room's claim at a rendezvous
//! service. The winner relays for everyone else; see [`session`].

pub mod bus;
pub mod chat;
pub mod config;
pub mod error;
pub mod http;
pub mod metrics;
pub mod queue;
pub mod rendezvous;
pub mod session;
pub mod telemetry;
pub mod transport;

pub use crate::bus::{EventBus, SubscriptionId};
pub use crate::error::{ClaimError, DialError, SessionError, TransportError};
pub use crate::rendezvous::{Claim, MemoryRendezvous, Rendezvous, TcpRendezvous};
pub use crate::session::Session;
pub use crate::transport::{ConnectionHandle, Link, PeerId};
pub use roomlink_proto::{CanonicalId, ConnectionState, Envelope, Role, StatusEvent, StatusKind};
