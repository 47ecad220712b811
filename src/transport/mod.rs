//! Peer links.
//!
//! A [`Link`] is one logical, in-order, lossless transport to one remote
//! peer: a [`ConnectionHandle`] for writing plus a receiver of inbound
//! envelopes. Two backends produce links: in-process channel pairs
//! ([`memory`]) and newline-delimited JSON over TCP ([`tcp`]).

mod handle;
pub mod memory;
pub mod tcp;

pub use handle::{ConnectionHandle, Inbound, Link, PeerId};
