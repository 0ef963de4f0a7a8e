//! TCP server and connection handling
//!
//! Serves inbound gossip requests and provides the client side of the
//! exchange. Every network step is bounded by the caller's IO timeout.

use crate::network::message::{
    encode_peer_list, parse_peer_list, Request, RequestCodec, MAX_MESSAGE_SIZE,
};
use crate::network::peer::{PeerAddress, PeerError, PeerRegistry};
use futures::stream::StreamExt;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio_util::codec::FramedRead;

/// TCP server for accepting peer connections
pub struct Server {
    listener: TcpListener,
    port: u16,
}

impl Server {
    /// Bind to a port and create the server
    pub async fn bind(port: u16) -> Result<Self, PeerError> {
        let addr = format!("0.0.0.0:{}", port);
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| PeerError::Bind { port, source })?;
        log::info!("Node listening on {}", addr);

        Ok(Self { listener, port })
    }

    /// Get the listening port
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Accept incoming connections
    pub async fn accept(&self) -> Result<(TcpStream, SocketAddr), std::io::Error> {
        self.listener.accept().await
    }
}

async fn with_timeout<T, F>(limit: Duration, what: &str, fut: F) -> Result<T, PeerError>
where
    F: Future<Output = Result<T, PeerError>>,
{
    tokio::time::timeout(limit, fut)
        .await
        .map_err(|_| PeerError::Timeout(what.to_string()))?
}

/// Connect to a peer
pub async fn connect_to_peer(
    addr: &PeerAddress,
    io_timeout: Duration,
) -> Result<TcpStream, PeerError> {
    let target = addr.to_string();
    with_timeout(io_timeout, &format!("connecting to {}", target), async {
        TcpStream::connect(&target)
            .await
            .map_err(|e| PeerError::ConnectionFailed(format!("{}: {}", target, e)))
    })
    .await
}

/// Ask for a peer list over an already open connection
pub async fn request_peer_list_over(
    mut stream: TcpStream,
    io_timeout: Duration,
) -> Result<Vec<PeerAddress>, PeerError> {
    let data = with_timeout(io_timeout, "exchanging peer list", async {
        stream
            .write_all(Request::GetNodesInfo.to_wire().as_bytes())
            .await?;
        // Half-close so the responder sees the end of the request
        stream.shutdown().await?;

        let mut buf = Vec::new();
        (&mut stream)
            .take(MAX_MESSAGE_SIZE as u64 + 1)
            .read_to_end(&mut buf)
            .await?;
        Ok::<_, PeerError>(buf)
    })
    .await?;

    if data.len() > MAX_MESSAGE_SIZE {
        return Err(PeerError::MessageTooLarge(MAX_MESSAGE_SIZE));
    }

    let peers = parse_peer_list(&String::from_utf8_lossy(&data));
    log::debug!("Received {} peer records", peers.len());
    Ok(peers)
}

/// Connect to a peer and fetch its known peers
pub async fn request_peer_list(
    addr: &PeerAddress,
    io_timeout: Duration,
) -> Result<Vec<PeerAddress>, PeerError> {
    let stream = connect_to_peer(addr, io_timeout).await?;
    request_peer_list_over(stream, io_timeout).await
}

/// Open a connection to a peer and announce our own address
pub async fn announce_to_peer(
    addr: &PeerAddress,
    own_address: &PeerAddress,
    io_timeout: Duration,
) -> Result<(), PeerError> {
    let mut stream = connect_to_peer(addr, io_timeout).await?;
    log::info!("Connected to peer: {}", addr);

    let request = Request::RegisterNode(own_address.clone());
    with_timeout(io_timeout, &format!("announcing to {}", addr), async {
        stream.write_all(request.to_wire().as_bytes()).await?;
        stream.shutdown().await?;
        Ok::<_, PeerError>(())
    })
    .await
}

/// Handle one inbound connection: read a single request and answer it
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    registry: Arc<PeerRegistry>,
    io_timeout: Duration,
) -> Result<(), PeerError> {
    let (reader, mut writer) = stream.into_split();
    let mut requests = FramedRead::new(reader, RequestCodec);

    let request = match tokio::time::timeout(io_timeout, requests.next()).await {
        Err(_) => return Err(PeerError::Timeout(format!("reading request from {}", addr))),
        Ok(None) => {
            log::debug!("Peer {} closed without a request", addr);
            return Ok(());
        }
        Ok(Some(result)) => result?,
    };

    log::debug!("Received {} from {}", request.type_name(), addr);

    match request {
        Request::GetNodesInfo => {
            let payload = encode_peer_list(&registry.snapshot());
            with_timeout(io_timeout, &format!("answering {}", addr), async {
                writer.write_all(payload.as_bytes()).await?;
                writer.shutdown().await?;
                Ok::<_, PeerError>(())
            })
            .await?;
        }
        Request::RegisterNode(peer) => {
            registry.register(peer);
        }
        Request::Unknown(raw) => {
            log::debug!("Ignoring unknown request from {}: {:?}", addr, raw);
        }
    }

    Ok(())
}
