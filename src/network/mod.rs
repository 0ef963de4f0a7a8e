//! P2P gossip module
//!
//! Lets nodes discover each other and exchange the set of known peers.
//!
//! # Features
//! - TCP-based plain text protocol
//! - Bootstrap join
//! - Periodic peer-list gossip
//! - Shared, deduplicated peer registry

pub mod message;
pub mod node;
pub mod peer;
pub mod server;

pub use message::{
    encode_peer_list, parse_peer_list, Request, RequestCodec, GET_NODES_INFO, MAX_MESSAGE_SIZE,
    MAX_REQUEST_SIZE, REGISTER_NODE,
};
pub use node::{Node, NodeConfig, DEFAULT_BOOTSTRAP_HOST, DEFAULT_BOOTSTRAP_PORT, DEFAULT_HOST};
pub use peer::{PeerAddress, PeerError, PeerRegistry};
pub use server::{
    announce_to_peer, connect_to_peer, handle_connection, request_peer_list, Server,
};
