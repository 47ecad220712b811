//! Integration test common infrastructure.
//!
//! Provides recording peers on top of [`roomlink::Session`] and scripted
//! rendezvous implementations for failure paths.

pub mod peer;
pub mod rendezvous;

#[allow(unused_imports)]
pub use peer::TestPeer;
#[allow(unused_imports)]
pub use rendezvous::ScriptedRendezvous;

use std::time::Duration;

/// Upper bound for any single wait in these tests.
#[allow(dead_code)]
pub const WAIT: Duration = Duration::from_secs(5);

/// Poll `check` until it holds or [`WAIT`] elapses.
#[allow(dead_code)]
pub async fn wait_until<F: FnMut() -> bool>(mut check: F) -> bool {
    tokio::time::timeout(WAIT, async {
        while !check() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .is_ok()
}
