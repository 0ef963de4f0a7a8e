//! Vehicle-Ledger node
//!
//! Starts the gossip node (and by default an embedded bootstrap node), mines
//! the demo genesis block and prints the chain, the network and a vehicle
//! history report. Keeps serving peers until Ctrl+C.

use clap::{Parser, ValueEnum};
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;
use vehicle_ledger::cli::{self, DEMO_VIN};
use vehicle_ledger::core::{Block, Ledger};
use vehicle_ledger::mining::{Miner, DEFAULT_DIFFICULTY};
use vehicle_ledger::network::{
    Node, NodeConfig, PeerAddress, DEFAULT_BOOTSTRAP_HOST, DEFAULT_BOOTSTRAP_PORT, DEFAULT_HOST,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Role {
    /// Embedded bootstrap node plus a regular node
    Combined,
    /// Only the bootstrap node
    Bootstrap,
    /// Only a regular node joining an external bootstrap node
    Peer,
}

#[derive(Parser)]
#[command(name = "blockchain")]
#[command(author = "Darshan")]
#[command(version = "0.1.0")]
#[command(about = "A minimal vehicle history ledger with gossip peer discovery", long_about = None)]
struct Cli {
    /// Port number for the node
    #[arg(short, long, default_value_t = 8081)]
    port: u16,

    /// Mining difficulty (number of '0' characters required)
    #[arg(short, long, default_value_t = DEFAULT_DIFFICULTY)]
    difficulty: usize,

    /// Which nodes this process runs
    #[arg(long, value_enum, default_value_t = Role::Combined)]
    role: Role,

    /// Host this node advertises to its peers
    #[arg(long, default_value = DEFAULT_HOST)]
    host: String,

    /// Bootstrap node host
    #[arg(long, default_value = DEFAULT_BOOTSTRAP_HOST)]
    bootstrap_host: String,

    /// Bootstrap node port
    #[arg(long, default_value_t = DEFAULT_BOOTSTRAP_PORT)]
    bootstrap_port: u16,

    /// Seconds between gossip rounds
    #[arg(long, default_value_t = 10)]
    refresh_secs: u64,

    /// VIN for the history report
    #[arg(long, default_value = DEMO_VIN)]
    vin: String,

    /// Print blocks as JSON
    #[arg(long)]
    json: bool,
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Cli::parse();

    let rt = tokio::runtime::Runtime::new()?;
    rt.block_on(run(args))
}

async fn run(args: Cli) -> Result<(), Box<dyn std::error::Error>> {
    let bootstrap = PeerAddress::new(args.bootstrap_host.clone(), args.bootstrap_port);
    let mut nodes = Vec::new();

    if args.role != Role::Peer {
        println!("🌐 Starting bootstrap node on {}...", bootstrap);
        let (node, task) = spawn_node(NodeConfig::bootstrap_node(bootstrap.clone()));
        node.wait_started().await;
        nodes.push((node, task));
    }

    if args.role != Role::Bootstrap {
        let config = NodeConfig {
            port: args.port,
            host: args.host.clone(),
            bootstrap,
            is_bootstrap: false,
            refresh_interval: Duration::from_secs(args.refresh_secs),
            ..Default::default()
        };
        println!("🌐 Starting node on port {}...", args.port);
        let (node, task) = spawn_node(config);
        // Report only once the bootstrap join has run
        node.wait_started().await;

        mine_and_report(&args, &node).await?;
        nodes.push((node, task));
    }

    tokio::signal::ctrl_c().await?;
    println!("\n📴 Shutting down...");

    for (node, _) in &nodes {
        node.shutdown();
    }
    for (_, task) in nodes {
        if let Err(e) = task.await? {
            log::error!("Node error: {}", e);
        }
    }

    Ok(())
}

type NodeTask = tokio::task::JoinHandle<Result<(), vehicle_ledger::PeerError>>;

fn spawn_node(config: NodeConfig) -> (Arc<Node>, NodeTask) {
    let node = Arc::new(Node::new(config));
    let runner = Arc::clone(&node);
    let task = tokio::spawn(async move {
        let result = runner.run().await;
        if let Err(e) = &result {
            log::error!("Node stopped: {}", e);
        }
        result
    });
    (node, task)
}

async fn mine_and_report(args: &Cli, node: &Node) -> Result<(), Box<dyn std::error::Error>> {
    let ledger = Ledger::shared();
    let miner = Miner::new(args.difficulty);

    let genesis = Block::genesis(cli::demo_transactions());
    println!("⛏️  Mining genesis block (difficulty {})...", args.difficulty);

    // Mined off the async workers so the node keeps serving
    let cancel = Arc::new(AtomicBool::new(false));
    let (block, stats) = miner
        .mine_detached(genesis, cancel)
        .await
        .ok_or("mining did not complete")?;
    println!(
        "   └─ Nonce {} found in {}ms ({} attempts)",
        block.nonce, stats.time_ms, stats.hash_attempts
    );
    ledger.write().await.append(block);

    println!();
    cli::display_network(&node.registry());
    println!();

    let ledger = ledger.read().await;
    if args.json {
        cli::display_blocks_json(&ledger)?;
    } else {
        cli::display_blocks(&ledger);
    }
    cli::history_report(&ledger, &args.vin);

    Ok(())
}
