//! Links over any async byte stream, framed as newline-delimited JSON.
//!
//! The dialing side sends `Hello` first and the accepting side answers with
//! its own `Hello`; after that both directions carry `Event` frames only.

use super::{ConnectionHandle, Link, PeerId};
use crate::error::TransportError;
use futures_util::{SinkExt, StreamExt};
use roomlink_proto::{Envelope, JsonLinesCodec, LinkFrame};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, info, warn};

/// A byte stream framed for link traffic.
pub type LinkFramed<S> = Framed<S, JsonLinesCodec<LinkFrame>>;

/// Frame `stream` with the link codec.
pub fn framed<S>(stream: S, max_line_len: usize) -> LinkFramed<S>
where
    S: AsyncRead + AsyncWrite,
{
    Framed::new(stream, JsonLinesCodec::with_max_len(max_line_len))
}

pub async fn send_hello<S>(framed: &mut LinkFramed<S>, local: &PeerId) -> Result<(), TransportError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    framed
        .send(LinkFrame::Hello {
            peer: local.as_str().to_string(),
        })
        .await?;
    Ok(())
}

pub async fn recv_hello<S>(framed: &mut LinkFramed<S>) -> Result<PeerId, TransportError>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    match framed.next().await {
        Some(Ok(LinkFrame::Hello { peer })) => Ok(PeerId::new(peer)),
        Some(Ok(other)) => Err(TransportError::UnexpectedFrame(format!("{other:?}"))),
        Some(Err(e)) => Err(e.into()),
        None => Err(TransportError::Closed),
    }
}

/// Drive a handshaken stream as a [`Link`] to `peer`.
///
/// Spawns one task that owns the stream. The task exits when the handle is
/// closed, the remote hangs up, or a frame fails to decode.
pub fn spawn_link<S>(mut framed: LinkFramed<S>, peer: PeerId) -> Link
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let shutdown = CancellationToken::new();
    let (out_tx, mut out_rx) = mpsc::unbounded_channel::<Envelope>();
    let (in_tx, in_rx) = mpsc::unbounded_channel::<Envelope>();
    let span = crate::telemetry::spans::link(peer.as_str());

    let task_shutdown = shutdown.clone();
    tokio::spawn(
        async move {
            loop {
                tokio::select! {
                    biased;
                    out = out_rx.recv() => match out {
                        Some(env) => {
                            if let Err(e) = framed.send(LinkFrame::Event(env)).await {
                                warn!(error = %e, "Failed to write to peer");
                                break;
                            }
                        }
                        None => break,
                    },
                    frame = framed.next() => match frame {
                        Some(Ok(LinkFrame::Event(env))) => {
                            if in_tx.send(env).is_err() {
                                break;
                            }
                        }
                        Some(Ok(LinkFrame::Hello { .. })) => {
                            debug!("Ignoring repeated hello");
                        }
                        Some(Err(e)) => {
                            warn!(error = %e, "Stream error");
                            break;
                        }
                        None => {
                            info!("Connection closed by peer");
                            break;
                        }
                    },
                    _ = task_shutdown.cancelled() => break,
                }
            }
            task_shutdown.cancel();
            let _ = SinkExt::<LinkFrame>::close(&mut framed).await;
        }
        .instrument(span),
    );

    Link {
        handle: ConnectionHandle::new(peer, out_tx, shutdown),
        inbound: in_rx,
    }
}
