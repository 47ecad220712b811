//! In-process links built from tokio channels.

use super::{ConnectionHandle, Link, PeerId};
use roomlink_proto::Envelope;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Create both ends of an in-process link between `a` and `b`.
///
/// The first link is `a`'s end (its handle writes to `b`), the second is
/// `b`'s end. Must be called inside a tokio runtime.
pub fn pair(a: PeerId, b: PeerId) -> (Link, Link) {
    let shutdown = CancellationToken::new();
    let (a_out_tx, a_out_rx) = mpsc::unbounded_channel();
    let (b_out_tx, b_out_rx) = mpsc::unbounded_channel();
    let (a_in_tx, a_in_rx) = mpsc::unbounded_channel();
    let (b_in_tx, b_in_rx) = mpsc::unbounded_channel();

    tokio::spawn(pump(a_out_rx, b_in_tx, shutdown.clone()));
    tokio::spawn(pump(b_out_rx, a_in_tx, shutdown.clone()));

    let a_end = Link {
        handle: ConnectionHandle::new(b, a_out_tx, shutdown.clone()),
        inbound: a_in_rx,
    };
    let b_end = Link {
        handle: ConnectionHandle::new(a, b_out_tx, shutdown),
        inbound: b_in_rx,
    };
    (a_end, b_end)
}

async fn pump(
    mut rx: mpsc::UnboundedReceiver<Envelope>,
    tx: mpsc::UnboundedSender<Envelope>,
    shutdown: CancellationToken,
) {
    loop {
        tokio::select! {
            biased;
            env = rx.recv() => match env {
                Some(env) => {
                    if tx.send(env).is_err() {
                        break;
                    }
                }
                None => break,
            },
            _ = shutdown.cancelled() => break,
        }
    }
    shutdown.cancel();
}
