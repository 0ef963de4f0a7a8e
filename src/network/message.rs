//! Gossip wire format
//!
//! The protocol is plain text. A request is a single command, optionally
//! newline terminated. The peer-list response is a run of `host:port` lines
//! and ends when the responder closes its side of the stream.

use crate::network::peer::PeerAddress;
use bytes::BytesMut;
use tokio_util::codec::Decoder;

/// Request token asking a node for its known peers
pub const GET_NODES_INFO: &str = "getNodesInfo";

/// Command prefix announcing a node's own address
pub const REGISTER_NODE: &str = "registerNode";

/// Largest request accepted by the inbound handler
pub const MAX_REQUEST_SIZE: usize = 1024;

/// Largest peer-list response read from another node
pub const MAX_MESSAGE_SIZE: usize = 64 * 1024;

/// Inbound request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Ask for the node's peer list
    GetNodesInfo,
    /// Announce a node so the receiver registers it
    RegisterNode(PeerAddress),
    /// Anything else, ignored by the handler
    Unknown(String),
}

impl Request {
    /// Parse one request line (without its terminator)
    pub fn parse(line: &str) -> Self {
        let line = line.trim_end_matches('\r');

        if line == GET_NODES_INFO {
            return Request::GetNodesInfo;
        }

        if let Some(rest) = line.strip_prefix(REGISTER_NODE) {
            if let Some(addr) = rest.strip_prefix(' ').and_then(|a| a.parse().ok()) {
                return Request::RegisterNode(addr);
            }
        }

        Request::Unknown(line.to_string())
    }

    /// Encode for the wire
    pub fn to_wire(&self) -> String {
        match self {
            // The bare token, no terminator
            Request::GetNodesInfo => GET_NODES_INFO.to_string(),
            Request::RegisterNode(addr) => format!("{} {}\n", REGISTER_NODE, addr),
            Request::Unknown(raw) => raw.clone(),
        }
    }

    /// Get request name for logging
    pub fn type_name(&self) -> &'static str {
        match self {
            Request::GetNodesInfo => "GetNodesInfo",
            Request::RegisterNode(_) => "RegisterNode",
            Request::Unknown(_) => "Unknown",
        }
    }
}

/// Decoder that waits until a whole request has arrived
///
/// A request is complete at a newline, when the buffer holds exactly the
/// bare `getNodesInfo` token, or at end of stream.
#[derive(Debug, Default)]
pub struct RequestCodec;

impl Decoder for RequestCodec {
    type Item = Request;
    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(pos) = src.iter().position(|b| *b == b'\n') {
            let line = src.split_to(pos + 1);
            let text = String::from_utf8_lossy(&line[..pos]);
            return Ok(Some(Request::parse(&text)));
        }

        if &src[..] == GET_NODES_INFO.as_bytes() {
            src.clear();
            return Ok(Some(Request::GetNodesInfo));
        }

        if src.len() > MAX_REQUEST_SIZE {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                format!("request larger than {} bytes", MAX_REQUEST_SIZE),
            ));
        }

        Ok(None)
    }

    fn decode_eof(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(request) = self.decode(src)? {
            return Ok(Some(request));
        }

        if src.is_empty() {
            return Ok(None);
        }

        let rest = src.split();
        Ok(Some(Request::parse(&String::from_utf8_lossy(&rest))))
    }
}

/// Serialize peers as newline-separated `host:port` records
pub fn encode_peer_list(peers: &[PeerAddress]) -> String {
    peers.iter().map(|peer| format!("{}\n", peer)).collect()
}

/// Parse a peer-list response
///
/// Lines without a `:` are skipped silently. Lines with an unusable port are
/// dropped too, with a debug log.
pub fn parse_peer_list(data: &str) -> Vec<PeerAddress> {
    data.split('\n')
        .map(|line| line.trim_end_matches('\r'))
        .filter(|line| line.contains(':'))
        .filter_map(|line| match line.parse::<PeerAddress>() {
            Ok(addr) => Some(addr),
            Err(e) => {
                log::debug!("Skipping peer record {:?}: {}", line, e);
                None
            }
        })
        .collect()
}
