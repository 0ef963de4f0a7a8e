//! Gossip node implementation
//!
//! A node serves inbound peer-list requests, joins the network through the
//! bootstrap node, and periodically merges the peer lists of every known
//! node into its own registry. The bootstrap node only serves.

use crate::network::peer::{PeerAddress, PeerError, PeerRegistry};
use crate::network::server::{
    announce_to_peer, connect_to_peer, handle_connection, request_peer_list,
    request_peer_list_over, Server,
};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinSet;

/// Host a node advertises for itself unless told otherwise
pub const DEFAULT_HOST: &str = "localhost";

/// Well-known bootstrap host
pub const DEFAULT_BOOTSTRAP_HOST: &str = "localhost";

/// Well-known bootstrap port
pub const DEFAULT_BOOTSTRAP_PORT: u16 = 9090;

/// Gossip node configuration
#[derive(Debug, Clone)]
pub struct NodeConfig {
    /// Port to listen on
    pub port: u16,
    /// Host this node advertises to others
    pub host: String,
    /// Rendezvous node contacted on startup
    pub bootstrap: PeerAddress,
    /// Whether this node is the bootstrap node itself
    pub is_bootstrap: bool,
    /// Delay between gossip rounds
    pub refresh_interval: Duration,
    /// Bound on every connect, read and write
    pub io_timeout: Duration,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            port: 8081,
            host: DEFAULT_HOST.to_string(),
            bootstrap: PeerAddress::new(DEFAULT_BOOTSTRAP_HOST, DEFAULT_BOOTSTRAP_PORT),
            is_bootstrap: false,
            refresh_interval: Duration::from_secs(10),
            io_timeout: Duration::from_secs(5),
        }
    }
}

impl NodeConfig {
    /// Configuration for the bootstrap node serving at `bootstrap`
    pub fn bootstrap_node(bootstrap: PeerAddress) -> Self {
        Self {
            port: bootstrap.port,
            host: bootstrap.host.clone(),
            bootstrap,
            is_bootstrap: true,
            ..Default::default()
        }
    }

    /// The address this node registers for itself
    pub fn self_address(&self) -> PeerAddress {
        if self.is_bootstrap {
            self.bootstrap.clone()
        } else {
            PeerAddress::new(self.host.clone(), self.port)
        }
    }
}

async fn wait_for_flag(flag: &mut watch::Receiver<bool>) {
    loop {
        let set = *flag.borrow_and_update();
        if set || flag.changed().await.is_err() {
            return;
        }
    }
}

/// The gossip node
pub struct Node {
    config: NodeConfig,
    registry: Arc<PeerRegistry>,
    shutdown_tx: watch::Sender<bool>,
    /// Set once the listener is up and the bootstrap join was attempted
    started_tx: watch::Sender<bool>,
}

impl Node {
    /// Create a node with a fresh registry
    pub fn new(config: NodeConfig) -> Self {
        Self::with_registry(config, Arc::new(PeerRegistry::new()))
    }

    /// Create a node around an existing registry
    pub fn with_registry(config: NodeConfig, registry: Arc<PeerRegistry>) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        let (started_tx, _) = watch::channel(false);
        Self {
            config,
            registry,
            shutdown_tx,
            started_tx,
        }
    }

    pub fn config(&self) -> &NodeConfig {
        &self.config
    }

    /// Get the peer registry
    pub fn registry(&self) -> Arc<PeerRegistry> {
        Arc::clone(&self.registry)
    }

    /// Ask `run` to stop. Outstanding gossip exchanges are aborted.
    pub fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);
    }

    /// Wait until `run` has finished starting up
    ///
    /// Returns once the listener is bound and, for a regular node, the first
    /// bootstrap join has completed or failed. Also returns when `run` fails
    /// to bind or the node is shut down.
    pub async fn wait_started(&self) {
        let mut started = self.started_tx.subscribe();
        let mut shutdown = self.shutdown_tx.subscribe();
        tokio::select! {
            _ = wait_for_flag(&mut started) => {}
            _ = wait_for_flag(&mut shutdown) => {}
        }
    }

    /// Run the node until `shutdown` is called
    ///
    /// Fails only when the listening port cannot be bound.
    pub async fn run(&self) -> Result<(), PeerError> {
        let own_address = self.config.self_address();
        if self.config.is_bootstrap {
            self.registry.register(own_address.clone());
        }

        let server = match Server::bind(self.config.port).await {
            Ok(server) => server,
            Err(e) => {
                self.started_tx.send_replace(true);
                return Err(e);
            }
        };
        log::info!(
            "Node {} started on port {} (bootstrap: {})",
            own_address,
            server.port(),
            self.config.is_bootstrap
        );

        let accept_task = tokio::spawn(accept_loop(
            server,
            Arc::clone(&self.registry),
            self.config.io_timeout,
            self.shutdown_tx.subscribe(),
        ));

        if self.config.is_bootstrap {
            self.started_tx.send_replace(true);
            // The bootstrap node never gossips on its own
            wait_for_flag(&mut self.shutdown_tx.subscribe()).await;
        } else {
            if let Err(e) = self.join_bootstrap().await {
                log::warn!(
                    "Error connecting to bootstrap node {}: {}",
                    self.config.bootstrap,
                    e
                );
            }
            self.started_tx.send_replace(true);
            self.refresh_loop().await;
        }

        log::info!("Node {} shutting down...", own_address);
        if let Err(e) = accept_task.await {
            log::error!("Accept loop failed: {}", e);
        }
        Ok(())
    }

    /// Join the network through the bootstrap node
    ///
    /// Registers ourselves, fetches the bootstrap's peer list, merges it and
    /// announces ourselves to every listed peer. Returns how many peers were
    /// announced to.
    pub async fn join_bootstrap(&self) -> Result<usize, PeerError> {
        let own_address = self.config.self_address();
        let bootstrap = &self.config.bootstrap;
        let io_timeout = self.config.io_timeout;

        let stream = connect_to_peer(bootstrap, io_timeout).await?;
        self.registry.register(own_address.clone());

        let existing = request_peer_list_over(stream, io_timeout).await?;
        log::info!(
            "Received {} existing nodes from bootstrap node {}",
            existing.len(),
            bootstrap
        );

        self.registry.register(bootstrap.clone());
        self.registry.merge(existing.iter().cloned());

        let mut announced = HashSet::new();
        let mut announcements = JoinSet::new();
        for peer in existing {
            if peer == own_address || !announced.insert(peer.clone()) {
                continue;
            }

            let own_address = own_address.clone();
            announcements.spawn(async move {
                if let Err(e) = announce_to_peer(&peer, &own_address, io_timeout).await {
                    log::warn!("Error connecting to peer {}: {}", peer, e);
                }
            });
        }

        while let Some(result) = announcements.join_next().await {
            if let Err(e) = result {
                log::warn!("Announcement task failed: {}", e);
            }
        }

        log::info!("Known nodes after joining: {}", self.registry.len());
        Ok(announced.len())
    }

    /// Exchange peer lists with every known node once
    ///
    /// Returns the number of newly learned peers.
    pub async fn refresh_peers(&self) -> usize {
        let own_address = self.config.self_address();
        let io_timeout = self.config.io_timeout;
        let mut exchanges = JoinSet::new();

        for peer in self.registry.snapshot() {
            if peer == own_address {
                continue;
            }

            let registry = Arc::clone(&self.registry);
            exchanges.spawn(async move {
                match request_peer_list(&peer, io_timeout).await {
                    Ok(peers) => registry.merge(peers),
                    Err(e) => {
                        log::warn!("Error exchanging nodes with {}: {}", peer, e);
                        0
                    }
                }
            });
        }

        let mut added = 0;
        while let Some(result) = exchanges.join_next().await {
            match result {
                Ok(count) => added += count,
                Err(e) => log::warn!("Gossip task failed: {}", e),
            }
        }

        if added > 0 {
            log::info!("Learned {} new nodes, {} known", added, self.registry.len());
        }
        added
    }

    async fn gossip_round(&self) {
        if self.registry.contains(&self.config.bootstrap) {
            self.refresh_peers().await;
        } else if let Err(e) = self.join_bootstrap().await {
            log::warn!(
                "Error connecting to bootstrap node {}: {}",
                self.config.bootstrap,
                e
            );
        }
    }

    async fn refresh_loop(&self) {
        let mut shutdown = self.shutdown_tx.subscribe();
        let mut ticker = tokio::time::interval(self.config.refresh_interval);
        // The first tick completes immediately
        ticker.tick().await;

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = wait_for_flag(&mut shutdown) => break,
            }

            // Dropping the round on shutdown aborts its JoinSet
            tokio::select! {
                _ = self.gossip_round() => {}
                _ = wait_for_flag(&mut shutdown) => break,
            }
        }
    }
}

async fn accept_loop(
    server: Server,
    registry: Arc<PeerRegistry>,
    io_timeout: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            accepted = server.accept() => match accepted {
                Ok((stream, addr)) => {
                    log::debug!("Incoming connection from {}", addr);
                    let registry = Arc::clone(&registry);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, addr, registry, io_timeout).await {
                            log::warn!("Connection error with {}: {}", addr, e);
                        }
                    });
                }
                Err(e) => {
                    log::error!("Error accepting connection: {}", e);
                }
            },
            _ = wait_for_flag(&mut shutdown) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::future::Future;

    fn config(port: u16, bootstrap_port: u16) -> NodeConfig {
        NodeConfig {
            port,
            bootstrap: PeerAddress::new("localhost", bootstrap_port),
            refresh_interval: Duration::from_millis(300),
            io_timeout: Duration::from_secs(2),
            ..Default::default()
        }
    }

    fn spawn_node(node: &Arc<Node>) -> tokio::task::JoinHandle<Result<(), PeerError>> {
        let node = Arc::clone(node);
        tokio::spawn(async move { node.run().await })
    }

    async fn eventually<F, Fut>(mut check: F) -> bool
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = bool>,
    {
        for _ in 0..50 {
            if check().await {
                return true;
            }
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        false
    }

    fn knows_all(registry: &PeerRegistry, ports: &[u16]) -> bool {
        ports
            .iter()
            .all(|port| registry.contains(&PeerAddress::new("localhost", *port)))
    }

    #[test]
    fn test_node_config_defaults() {
        let config = NodeConfig::default();
        assert_eq!(config.port, 8081);
        assert_eq!(config.host, DEFAULT_HOST);
        assert_eq!(config.self_address(), PeerAddress::new("localhost", 8081));
        assert_eq!(config.bootstrap, PeerAddress::new("localhost", 9090));

        let bootstrap = NodeConfig::bootstrap_node(PeerAddress::new("localhost", 9090));
        assert!(bootstrap.is_bootstrap);
        assert_eq!(bootstrap.port, 9090);
        assert_eq!(bootstrap.self_address(), PeerAddress::new("localhost", 9090));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_two_node_gossip() {
        let x = Arc::new(Node::new(NodeConfig::bootstrap_node(PeerAddress::new(
            "localhost",
            9090,
        ))));
        let x_task = spawn_node(&x);
        x.wait_started().await;

        let y = Arc::new(Node::new(config(8081, 9090)));
        let y_task = spawn_node(&y);

        // The joiner knows the network as soon as it has started
        y.wait_started().await;
        let (x_reg, y_reg) = (x.registry(), y.registry());
        assert!(knows_all(&y_reg, &[9090, 8081]));
        assert!(
            eventually(|| {
                let (x_reg, y_reg) = (x_reg.clone(), y_reg.clone());
                async move { knows_all(&x_reg, &[9090, 8081]) && knows_all(&y_reg, &[9090, 8081]) }
            })
            .await
        );

        x.shutdown();
        y.shutdown();
        x_task.await.unwrap().unwrap();
        y_task.await.unwrap().unwrap();
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_late_joiner_propagates() {
        let bootstrap = Arc::new(Node::new(NodeConfig::bootstrap_node(PeerAddress::new(
            "localhost",
            19090,
        ))));
        let bootstrap_task = spawn_node(&bootstrap);
        tokio::time::sleep(Duration::from_millis(200)).await;

        let first = Arc::new(Node::new(config(18081, 19090)));
        let first_task = spawn_node(&first);
        let first_reg = first.registry();
        assert!(
            eventually(|| {
                let reg = first_reg.clone();
                async move { knows_all(&reg, &[19090, 18081]) }
            })
            .await
        );

        let second = Arc::new(Node::new(config(18082, 19090)));
        let second_task = spawn_node(&second);

        // The first node learns about the second through the bootstrap's list
        let all = [19090, 18081, 18082];
        let (b_reg, s_reg) = (bootstrap.registry(), second.registry());
        assert!(
            eventually(|| {
                let (b, f, s) = (b_reg.clone(), first_reg.clone(), s_reg.clone());
                async move { knows_all(&b, &all) && knows_all(&f, &all) && knows_all(&s, &all) }
            })
            .await
        );

        for node in [&bootstrap, &first, &second] {
            node.shutdown();
        }
        for task in [bootstrap_task, first_task, second_task] {
            task.await.unwrap().unwrap();
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_join_announces_concurrently() {
        // Non-routable peers stand in for stale entries that never answer
        let registry = Arc::new(PeerRegistry::new());
        for port in 1..=4 {
            registry.register(PeerAddress::new("10.255.255.1", port));
        }
        let bootstrap = Arc::new(Node::with_registry(
            NodeConfig::bootstrap_node(PeerAddress::new("localhost", 29190)),
            registry,
        ));
        let bootstrap_task = spawn_node(&bootstrap);
        bootstrap.wait_started().await;

        let node = Node::new(NodeConfig {
            io_timeout: Duration::from_millis(500),
            ..config(0, 29190)
        });
        let started = std::time::Instant::now();
        assert_eq!(node.join_bootstrap().await.unwrap(), 5);
        assert!(started.elapsed() < Duration::from_millis(1500));
        assert_eq!(node.registry().len(), 6);

        bootstrap.shutdown();
        bootstrap_task.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn test_bootstrap_unreachable() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let free_port = listener.local_addr().unwrap().port();
        drop(listener);

        let node = Node::new(config(0, free_port));
        assert!(node.join_bootstrap().await.is_err());
        // Nothing gets registered when the bootstrap cannot be reached
        assert!(node.registry().is_empty());
        assert_eq!(node.refresh_peers().await, 0);
    }

    #[tokio::test]
    async fn test_run_fails_on_bound_port() {
        let listener = std::net::TcpListener::bind("0.0.0.0:0").unwrap();
        let port = listener.local_addr().unwrap().port();

        let node = Node::new(config(port, 9));
        assert!(matches!(node.run().await, Err(PeerError::Bind { .. })));
        // A failed start still releases anyone waiting on it
        tokio::time::timeout(Duration::from_secs(1), node.wait_started())
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_shutdown_before_run() {
        let node = Node::new(NodeConfig::bootstrap_node(PeerAddress::new("localhost", 0)));
        node.shutdown();
        node.run().await.unwrap();
        assert_eq!(node.registry().len(), 1);
    }
}
