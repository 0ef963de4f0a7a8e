//! Peer addresses and the shared peer registry
//!
//! The registry is the only state written by many connection tasks at once.
//! Every operation takes the lock for the in-memory work only, so callers
//! copy a snapshot before doing any network I/O.

use std::fmt;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard};
use thiserror::Error;

/// Peer connection errors
#[derive(Error, Debug)]
pub enum PeerError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Timed out: {0}")]
    Timeout(String),
    #[error("Message too large: more than {0} bytes")]
    MessageTooLarge(usize),
    #[error("Invalid peer address: {0}")]
    InvalidAddress(String),
    #[error("Failed to bind port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },
}

/// Address of a node on the network
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerAddress {
    pub host: String,
    pub port: u16,
}

impl PeerAddress {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.host, self.port)
    }
}

impl FromStr for PeerAddress {
    type Err = PeerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (host, port) = s
            .rsplit_once(':')
            .ok_or_else(|| PeerError::InvalidAddress(s.to_string()))?;

        if host.is_empty() {
            return Err(PeerError::InvalidAddress(s.to_string()));
        }

        let port = port
            .trim()
            .parse::<u16>()
            .map_err(|_| PeerError::InvalidAddress(s.to_string()))?;

        Ok(Self::new(host.trim(), port))
    }
}

/// Set of known peers, deduplicated and kept in insertion order
#[derive(Debug, Default)]
pub struct PeerRegistry {
    peers: Mutex<Vec<PeerAddress>>,
}

impl PeerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<PeerAddress>> {
        // Inserts never leave the list half-written, so a poisoned lock is still usable
        self.peers.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Register a peer. Returns true if it was not known before.
    pub fn register(&self, addr: PeerAddress) -> bool {
        let mut peers = self.lock();
        if peers.contains(&addr) {
            log::debug!("Node {} already registered", addr);
            return false;
        }

        log::info!("Node registered: {}", addr);
        peers.push(addr);
        true
    }

    /// Register every address, one at a time. Returns how many were new.
    pub fn merge<I>(&self, addrs: I) -> usize
    where
        I: IntoIterator<Item = PeerAddress>,
    {
        addrs
            .into_iter()
            .filter(|addr| self.register(addr.clone()))
            .count()
    }

    /// Point-in-time copy of the known peers
    pub fn snapshot(&self) -> Vec<PeerAddress> {
        self.lock().clone()
    }

    pub fn contains(&self, addr: &PeerAddress) -> bool {
        self.lock().contains(addr)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
