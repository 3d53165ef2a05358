//! Shared test utilities for fountaincast end-to-end tests.
//!
//! Clusters are built over real localhost sockets: each node's UDP socket
//! is bound up front on port 0 so the assigned port can be written into
//! every peer's config, while TCP ports are reserved and released so the
//! node's own `start()` can bind them.  `all_peers` lists the whole
//! cluster, self included, matching the quorum arithmetic a deployment
//! sees.

use {
    fountaincast_broadcast::{EngineConfig, Node, Peer, PeerSet},
    std::{
        sync::{
            atomic::{AtomicUsize, Ordering},
            Arc,
        },
        time::{Duration, Instant},
    },
    tokio::net::UdpSocket,
};

/// Distinguishes received-blob directories across clusters in one process.
static CLUSTER_SEQ: AtomicUsize = AtomicUsize::new(0);

/// Initialise env_logger once; safe to call from every test.
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Dev-profile engine config with eviction slowed down so mid-test cache
/// inspection isn't racing the sweeper.  Eviction tests dial the intervals
/// back down themselves.
pub fn quiet_sweeper_config() -> EngineConfig {
    let mut config = EngineConfig::dev_default();
    config.cache_clear_interval_secs = 30;
    config.enforce_clear_interval_secs = 120;
    config
}

/// Reserve a localhost TCP port by binding and immediately releasing it.
pub fn reserve_tcp_port() -> u16 {
    let probe = std::net::TcpListener::bind("127.0.0.1:0").expect("bind probe");
    probe.local_addr().expect("probe addr").port()
}

/// Build (but do not start) a cluster with the given adjacency: node `i`'s
/// direct neighbors are `adjacency[i]`.
pub async fn cluster_nodes(adjacency: &[Vec<usize>], config: &EngineConfig) -> Vec<Arc<Node>> {
    let n = adjacency.len();
    let run = CLUSTER_SEQ.fetch_add(1, Ordering::Relaxed);

    let mut sockets = Vec::with_capacity(n);
    for _ in 0..n {
        sockets.push(UdpSocket::bind("127.0.0.1:0").await.expect("bind udp"));
    }
    let peers: Vec<Peer> = sockets
        .iter()
        .enumerate()
        .map(|(i, udp)| Peer {
            sid: i as u16,
            ip: "127.0.0.1".parse().expect("loopback"),
            tcp_port: reserve_tcp_port(),
            udp_port: udp.local_addr().expect("udp addr").port(),
            pubkey: [i as u8; 20],
        })
        .collect();

    sockets
        .into_iter()
        .enumerate()
        .map(|(i, udp)| {
            let mut config = config.clone();
            config.received_dir = std::env::temp_dir().join(format!(
                "fountaincast-e2e-{}-{run}-{i}",
                std::process::id(),
            ));
            let set = PeerSet {
                self_peer: peers[i].clone(),
                peer_list: adjacency[i].iter().map(|&j| peers[j].clone()).collect(),
                all_peers: peers.clone(),
            };
            Node::from_socket(set, config, udp)
        })
        .collect()
}

/// Build a cluster and start every node's background tasks.
pub async fn start_cluster(adjacency: &[Vec<usize>], config: &EngineConfig) -> Vec<Arc<Node>> {
    let nodes = cluster_nodes(adjacency, config).await;
    for node in &nodes {
        node.start().await.expect("start node");
    }
    nodes
}

/// Poll `check` every 20 ms until it holds or `timeout` expires.
pub async fn wait_until(timeout: Duration, check: impl Fn() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if check() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
}

/// Whether `node` holds a fully decoded copy of the blob with `hash`.
pub fn blob_complete(node: &Node, hash: &[u8; 20]) -> bool {
    node.cache()
        .get(hash)
        .map(|state| state.lock().expect("blob lock").is_complete())
        .unwrap_or(false)
}

/// Deterministic non-trivial test payload.
pub fn patterned_blob(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i * 7 % 251) as u8).collect()
}
