//! TCP rendezvous service.
//!
//! Holds at most one claim per canonical id. A claim belongs to the control
//! connection that made it and is released when that connection closes.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures_util::{SinkExt, StreamExt};
use roomlink_proto::{CanonicalId, JsonLinesCodec, RendezvousRequest, RendezvousResponse};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::Framed;
use tracing::{Instrument, debug, info, warn};

#[derive(Debug, Clone)]
struct ClaimRecord {
    addr: String,
    conn: u64,
}

/// The rendezvous server. Cheap to clone; clones share state.
#[derive(Debug, Clone)]
pub struct RendezvousServer {
    claims: Arc<DashMap<CanonicalId, ClaimRecord>>,
    next_conn: Arc<AtomicU64>,
    max_line_len: usize,
}

impl RendezvousServer {
    pub fn new(max_line_len: usize) -> Self {
        Self {
            claims: Arc::new(DashMap::new()),
            next_conn: Arc::new(AtomicU64::new(1)),
            max_line_len,
        }
    }

    /// Number of rooms currently claimed.
    pub fn claim_count(&self) -> usize {
        self.claims.len()
    }

    /// Accept control connections until the listener fails.
    pub async fn run(self, listener: TcpListener) -> std::io::Result<()> {
        info!(addr = %listener.local_addr()?, "Rendezvous server listening");
        loop {
            let (stream, remote) = listener.accept().await?;
            let server = self.clone();
            let span = crate::telemetry::spans::rendezvous(&remote.to_string());
            tokio::spawn(server.handle_connection(stream).instrument(span));
        }
    }

    /// Grant `id` to connection `conn` unless someone else holds it.
    fn try_claim(&self, id: &CanonicalId, addr: String, conn: u64) -> RendezvousResponse {
        match self.claims.entry(id.clone()) {
            Entry::Occupied(e) if e.get().conn == conn => {
                debug!(room = %id, "Repeated claim from owner");
                RendezvousResponse::Claimed
            }
            Entry::Occupied(_) => {
                crate::metrics::record_claim("collision");
                RendezvousResponse::AlreadyClaimed
            }
            Entry::Vacant(e) => {
                e.insert(ClaimRecord { addr, conn });
                crate::metrics::record_claim("granted");
                RendezvousResponse::Claimed
            }
        }
    }

    fn lookup(&self, id: &CanonicalId, reliable: bool) -> RendezvousResponse {
        if !reliable {
            return RendezvousResponse::Error {
                reason: "only reliable links are offered".to_string(),
            };
        }
        match self.claims.get(id) {
            Some(rec) => RendezvousResponse::Found {
                addr: rec.addr.clone(),
            },
            None => RendezvousResponse::NotFound,
        }
    }

    fn release(&self, id: &CanonicalId, conn: u64) {
        if self.claims.remove_if(id, |_, rec| rec.conn == conn).is_some() {
            crate::metrics::record_claim("released");
            info!(room = %id, "Released claim");
        }
    }

    async fn handle_connection(self, stream: TcpStream) {
        let conn = self.next_conn.fetch_add(1, Ordering::Relaxed);
        let mut framed = Framed::new(
            stream,
            JsonLinesCodec::<RendezvousRequest>::with_max_len(self.max_line_len),
        );
        let mut held: Vec<CanonicalId> = Vec::new();

        while let Some(frame) = framed.next().await {
            let req = match frame {
                Ok(req) => req,
                Err(e) => {
                    warn!(error = %e, "Malformed rendezvous request");
                    let _ = framed
                        .send(RendezvousResponse::Error {
                            reason: e.to_string(),
                        })
                        .await;
                    break;
                }
            };

            let resp = match req {
                RendezvousRequest::Claim { id, addr } => {
                    let resp = self.try_claim(&id, addr, conn);
                    if resp == RendezvousResponse::Claimed && !held.contains(&id) {
                        held.push(id);
                    }
                    resp
                }
                RendezvousRequest::Lookup { id, reliable } => self.lookup(&id, reliable),
            };

            if let Err(e) = framed.send(resp).await {
                warn!(error = %e, "Failed to reply");
                break;
            }
        }

        for id in &held {
            self.release(id, conn);
        }
        debug!(conn, "Control connection closed");
    }
}
