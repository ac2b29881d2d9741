//! brahms-agent: joins a gossip network and relays messages typed on stdin.
//!
//! Every non-empty stdin line is emitted to a sampled peer. Messages from
//! other agents are printed and relayed once.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use brahms::{Node, View};
use brahms_agent::{Agent, AgentConfig};
use clap::Parser;
use sha2::{Digest, Sha256};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

const EMIT_TIMEOUT: Duration = Duration::from_secs(1);

#[derive(Parser, Debug)]
#[command(name = "brahms-agent")]
#[command(about = "Brahms peer sampling agent")]
struct Args {
    /// Peer to join through, as ip:port
    bootstrap: Option<Node>,

    /// Port to listen on
    #[arg(long, env = "PORT")]
    port: Option<u16>,

    /// YAML config file
    #[arg(long, env = "BRAHMS_CONFIG")]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Set up logging - respects RUST_LOG env var, defaults to info (or debug with --verbose)
    let default_filter = if args.verbose {
        "debug,brahms=debug"
    } else {
        "info,brahms=info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let mut config = match &args.config {
        Some(path) => AgentConfig::load(path)?,
        None => AgentConfig {
            update_timeout_ms: 1_000,
            validate_timeout_ms: 1_000,
            ..AgentConfig::local_test()
        },
    };
    if let Some(port) = args.port {
        config.listen_port = port;
    }

    let v0 = View::from_nodes(&args.bootstrap);
    let mut agent = Agent::bind(config).await?;
    agent.join(v0.clone())?;
    let agent = Arc::new(agent);

    tokio::spawn(relay(agent.clone()));
    tokio::spawn(emit_stdin(agent.clone()));

    info!("Agent started with v0={v0}, advertising as: {}", agent.self_node());

    tokio::signal::ctrl_c().await?;
    info!("Received Ctrl+C, shutting down gracefully");

    agent.shutdown().await?;
    Ok(())
}

/// Print and pass on every message we haven't relayed yet.
async fn relay(agent: Arc<Agent>) {
    let mut relayed: HashSet<[u8; 32]> = HashSet::new();

    while let Ok(msg) = agent.receive().await {
        let digest: [u8; 32] = Sha256::digest(&msg).into();
        if relayed.contains(&digest) {
            continue;
        }

        println!("new message, relaying: {}", String::from_utf8_lossy(&msg));
        if agent.emit(&msg, 2, 1, EMIT_TIMEOUT).await {
            relayed.insert(digest);
        }
    }

    debug!("Receive loop stopped");
}

async fn emit_stdin(agent: Arc<Agent>) {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    while let Ok(Some(line)) = lines.next_line().await {
        if line.is_empty() {
            continue;
        }

        println!("{}", agent.emit(line.as_bytes(), 1, 1, EMIT_TIMEOUT).await);
    }
}
