//! Coordinator fan-out.

use crate::transport::{ConnectionHandle, PeerId};
use roomlink_proto::Envelope;
use std::collections::HashMap;
use tracing::debug;

/// Write `envelope` to every open downstream handle except `origin`.
///
/// Returns the number of handles written to.
pub(crate) fn fan_out(
    downstream: &HashMap<PeerId, ConnectionHandle>,
    origin: Option<&PeerId>,
    envelope: &Envelope,
) -> usize {
    let mut recipients = 0;
    for (peer, handle) in downstream {
        if origin == Some(peer) || !handle.is_open() {
            continue;
        }
        match handle.send(envelope.clone()) {
            Ok(()) => recipients += 1,
            Err(e) => debug!(peer = %peer, error = %e, "Skipping closed downstream link"),
        }
    }
    crate::metrics::record_relay(recipients);
    recipients
}
