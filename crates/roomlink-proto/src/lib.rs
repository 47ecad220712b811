//! # roomlink-proto
//!
//! Wire-level types shared by every roomlink peer:
//!
//! - [`Envelope`]: the unit of transmission and local delivery
//! - [`CanonicalId`]: namespaced, normalized room identifiers
//! - [`Role`], [`ConnectionState`] and [`StatusEvent`]: session status surface
//! - [`LinkFrame`] and the rendezvous control frames
//! - [`JsonLinesCodec`]: newline-delimited JSON framing for tokio transports
//!
//! ## Quick Start
//!
//! ```rust
//! use roomlink_proto::{CanonicalId, Envelope};
//!
//! let id = CanonicalId::from_room("  Lobby!!");
//! assert_eq!(id.as_str(), "roomlink-lobby");
//!
//! let env = Envelope::new("message", serde_json::json!({"text": "hi"}));
//! assert_eq!(env.event, "message");
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

#[cfg(feature = "tokio")]
pub mod codec;
pub mod envelope;
pub mod error;
pub mod event;
pub mod frame;
pub mod room;
pub mod status;

#[cfg(feature = "tokio")]
pub use self::codec::JsonLinesCodec;
pub use self::envelope::Envelope;
pub use self::error::ProtocolError;
pub use self::event::ChatEvent;
pub use self::frame::{LinkFrame, RendezvousRequest, RendezvousResponse};
pub use self::room::{CanonicalId, NAMESPACE, normalize};
pub use self::status::{ConnectionState, Role, StatusEvent, StatusKind};
