//! fountaincast command line.
//!
//! `run` starts a broadcast node from a peer config file, optionally
//! originating a broadcast of a local file and supervising it to quorum.
//! `gen-configs` turns a graph adjacency file into per-node config files
//! for standing up local clusters.

use {
    clap::{Parser, Subcommand},
    fountaincast_broadcast::{graph, EngineConfig, Node, PeerSet},
    log::{error, info},
    std::path::PathBuf,
};

#[derive(Parser)]
#[command(name = "fountaincast", version, about = "Cooperative FEC-assisted gossip broadcast")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run a broadcast node.
    Run {
        /// Per-node peer config file (one `self` line plus neighbors).
        #[arg(long)]
        config: PathBuf,

        /// Shared membership file merged into the full peer set.
        #[arg(long)]
        all_peers: Option<PathBuf>,

        /// Broadcast this file once the node is up, supervise it to
        /// quorum, then exit.  Without it the node runs as a receiver
        /// until killed.
        #[arg(long)]
        broadcast: Option<PathBuf>,

        /// Backoff floor in milliseconds.
        #[arg(long)]
        initial_delay_ms: Option<f64>,

        /// Backoff ceiling in milliseconds.
        #[arg(long)]
        max_delay_ms: Option<f64>,

        /// Backoff growth base.
        #[arg(long)]
        exp_base: Option<f64>,

        /// Pause between neighbor sends while relaying, in milliseconds.
        #[arg(long)]
        relay_delay_ms: Option<f64>,

        /// Initial hop budget stamped into originated symbols.
        #[arg(long)]
        hop: Option<u8>,
    },

    /// Generate per-node config files from a graph adjacency file.
    GenConfigs {
        /// Graph file: first line is the node count, then `i j1 j2 …`
        /// adjacency rows.
        graph: PathBuf,

        /// Directory the config files are written to.
        #[arg(long, default_value = "configs")]
        out_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() {
    env_logger::init();
    if let Err(e) = run(Cli::parse()).await {
        error!("{e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> fountaincast_broadcast::Result<()> {
    match cli.command {
        Command::Run {
            config,
            all_peers,
            broadcast,
            initial_delay_ms,
            max_delay_ms,
            exp_base,
            relay_delay_ms,
            hop,
        } => {
            let mut peers = PeerSet::load(&config)?;
            if let Some(path) = all_peers {
                peers.merge_membership(&path)?;
            }

            let mut engine = EngineConfig::default();
            if let Some(v) = initial_delay_ms {
                engine.initial_delay_ms = v;
            }
            if let Some(v) = max_delay_ms {
                engine.max_delay_ms = v;
            }
            if let Some(v) = exp_base {
                engine.exp_base = v;
            }
            if let Some(v) = relay_delay_ms {
                engine.relay_delay_ms = v;
            }
            if let Some(v) = hop {
                engine.hop = v;
            }

            let node = Node::bind(peers, engine).await?;
            node.start().await?;

            match broadcast {
                Some(path) => {
                    let blob = std::fs::read(&path)?;
                    info!("broadcasting {} ({} bytes)", path.display(), blob.len());
                    let handle = node.broadcast(blob)?;
                    let summary = node.stop_broadcast(handle).await;
                    for (chunk_id, elapsed) in &summary.per_chunk_elapsed {
                        println!("chunk {chunk_id}: quorum after {} ms", elapsed.as_millis());
                    }
                    if summary.all_acked() {
                        println!(
                            "broadcast complete in {} ms",
                            summary.total_elapsed.as_millis()
                        );
                    } else {
                        println!("chunks below quorum: {:?}", summary.unfinished);
                        std::process::exit(1);
                    }
                }
                None => {
                    // Receiver mode: background tasks do all the work.
                    std::future::pending::<()>().await;
                }
            }
        }
        Command::GenConfigs {
            graph: graph_file,
            out_dir,
        } => {
            graph::generate_configs(&graph_file, &out_dir)?;
            println!("configs written to {}", out_dir.display());
        }
    }
    Ok(())
}
