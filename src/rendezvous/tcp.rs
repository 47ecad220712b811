//! Rendezvous client for [`RendezvousServer`](super::RendezvousServer).
//!
//! A claimant binds its own TCP listener, registers the listener address
//! over a control connection, and keeps that connection open for as long
//! as the claim should live. Dialers look the address up and connect to the
//! coordinator directly.

use super::{Claim, Rendezvous};
use crate::config::{RendezvousConfig, SessionConfig};
use crate::error::{ClaimError, DialError, TransportError};
use crate::transport::{Link, PeerId, tcp};
use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use roomlink_proto::{CanonicalId, JsonLinesCodec, RendezvousRequest, RendezvousResponse};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_util::codec::Framed;
use tracing::{Instrument, debug, info, warn};

const ACCEPT_BACKLOG: usize = 64;
const HELLO_TIMEOUT: Duration = Duration::from_secs(10);

type ControlFramed = Framed<TcpStream, JsonLinesCodec<RendezvousResponse>>;

/// Client for the TCP rendezvous service.
#[derive(Debug, Clone)]
pub struct TcpRendezvous {
    server: String,
    bind_host: String,
    advertise_host: Option<String>,
    max_line_len: usize,
}

impl TcpRendezvous {
    pub fn new(server: impl Into<String>) -> Self {
        Self {
            server: server.into(),
            bind_host: crate::config::defaults::default_bind_host(),
            advertise_host: None,
            max_line_len: crate::config::defaults::default_max_line_len(),
        }
    }

    pub fn from_config(rendezvous: &RendezvousConfig, session: &SessionConfig) -> Self {
        Self {
            server: rendezvous.server.clone(),
            bind_host: rendezvous.bind_host.clone(),
            advertise_host: rendezvous.advertise_host.clone(),
            max_line_len: session.max_line_len,
        }
    }

    /// Host to listen on when claiming; port 0 picks a free port.
    pub fn with_bind_host(mut self, host: impl Into<String>) -> Self {
        self.bind_host = host.into();
        self
    }

    async fn control(&self) -> Result<ControlFramed, TransportError> {
        let stream = TcpStream::connect(&self.server).await?;
        Ok(Framed::new(
            stream,
            JsonLinesCodec::with_max_len(self.max_line_len),
        ))
    }

    fn advertised(&self, bound: SocketAddr) -> String {
        match &self.advertise_host {
            Some(host) => format!("{}:{}", host, bound.port()),
            None => bound.to_string(),
        }
    }
}

async fn request(
    control: &mut ControlFramed,
    req: RendezvousRequest,
) -> Result<RendezvousResponse, TransportError> {
    control.send(req).await?;
    match control.next().await {
        Some(Ok(resp)) => Ok(resp),
        Some(Err(e)) => Err(e.into()),
        None => Err(TransportError::Closed),
    }
}

#[async_trait]
impl Rendezvous for TcpRendezvous {
    async fn claim(&self, id: &CanonicalId, local: &PeerId) -> Result<Claim, ClaimError> {
        let listener = TcpListener::bind((self.bind_host.as_str(), 0))
            .await
            .map_err(TransportError::from)?;
        let addr = self.advertised(listener.local_addr().map_err(TransportError::from)?);

        let mut control = self.control().await?;
        let req = RendezvousRequest::Claim {
            id: id.clone(),
            addr: addr.clone(),
        };
        match request(&mut control, req).await? {
            RendezvousResponse::Claimed => {}
            RendezvousResponse::AlreadyClaimed => return Err(ClaimError::AlreadyClaimed),
            RendezvousResponse::Error { reason } => return Err(ClaimError::Rejected(reason)),
            other => {
                return Err(TransportError::UnexpectedFrame(format!("{other:?}")).into());
            }
        }
        info!(room = %id, addr = %addr, "Claimed room");

        let (accept, incoming) = mpsc::channel(ACCEPT_BACKLOG);
        let identity = local.clone();
        let local = local.clone();
        let max_line_len = self.max_line_len;
        let span = crate::telemetry::spans::rendezvous(&self.server);
        tokio::spawn(
            async move {
                loop {
                    tokio::select! {
                        _ = accept.closed() => {
                            debug!("Claim dropped, releasing");
                            break;
                        }
                        ctrl = control.next() => {
                            match ctrl {
                                Some(Ok(resp)) => debug!(?resp, "Ignoring unsolicited rendezvous frame"),
                                Some(Err(e)) => {
                                    warn!(error = %e, "Rendezvous control stream error");
                                    break;
                                }
                                None => {
                                    warn!("Rendezvous control connection lost; no new peers will be accepted");
                                    break;
                                }
                            }
                        }
                        accepted = listener.accept() => {
                            let (stream, remote) = match accepted {
                                Ok(pair) => pair,
                                Err(e) => {
                                    warn!(error = %e, "Accept failed");
                                    continue;
                                }
                            };
                            let accept = accept.clone();
                            let local = local.clone();
                            tokio::spawn(async move {
                                match accept_peer(stream, &local, max_line_len).await {
                                    Ok(link) => {
                                        info!(remote = %remote, peer = %link.peer(), "Accepted peer link");
                                        let _ = accept.send(link).await;
                                    }
                                    Err(e) => warn!(remote = %remote, error = %e, "Inbound handshake failed"),
                                }
                            });
                        }
                    }
                }
            }
            .instrument(span),
        );

        Ok(Claim {
            identity,
            incoming,
        })
    }

    async fn dial(&self, id: &CanonicalId, local: &PeerId) -> Result<Link, DialError> {
        let mut control = self.control().await?;
        let req = RendezvousRequest::Lookup {
            id: id.clone(),
            reliable: true,
        };
        let addr = match request(&mut control, req).await? {
            RendezvousResponse::Found { addr } => addr,
            RendezvousResponse::NotFound => return Err(DialError::NotFound),
            RendezvousResponse::Error { reason } => return Err(DialError::Rejected(reason)),
            other => {
                return Err(TransportError::UnexpectedFrame(format!("{other:?}")).into());
            }
        };
        drop(control);

        let stream = TcpStream::connect(&addr).await.map_err(TransportError::from)?;
        let mut framed = tcp::framed(stream, self.max_line_len);
        tcp::send_hello(&mut framed, local).await?;
        let remote = tokio::time::timeout(HELLO_TIMEOUT, tcp::recv_hello(&mut framed))
            .await
            .map_err(|_| DialError::Timeout)??;
        info!(room = %id, addr = %addr, coordinator = %remote, "Dialed coordinator");
        Ok(tcp::spawn_link(framed, remote))
    }
}

async fn accept_peer(
    stream: TcpStream,
    local: &PeerId,
    max_line_len: usize,
) -> Result<Link, TransportError> {
    let mut framed = tcp::framed(stream, max_line_len);
    let remote = tokio::time::timeout(HELLO_TIMEOUT, tcp::recv_hello(&mut framed))
        .await
        .map_err(|_| TransportError::Closed)??;
    tcp::send_hello(&mut framed, local).await?;
    Ok(tcp::spawn_link(framed, remote))
}
