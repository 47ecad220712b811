//! Tracing setup and standardized spans.

use tracing_subscriber::EnvFilter;

/// Install the global `fmt` subscriber, filtered by `RUST_LOG` (default `info`).
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(true)
        .init();
}

/// Standardized span constructors.
pub mod spans {
    use tracing::{Span, info_span};

    /// Span for one session joining a room.
    pub fn session(room: &str, peer: &str) -> Span {
        info_span!("session", room = %room, peer = %peer)
    }

    /// Span for a task driving one peer link.
    pub fn link(peer: &str) -> Span {
        info_span!("link", peer = %peer)
    }

    /// Span for one connection to the rendezvous server.
    pub fn rendezvous(remote: &str) -> Span {
        info_span!("rendezvous", remote = %remote)
    }
}
