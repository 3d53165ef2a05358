//! Composition root: a running broadcast node.
//!
//! A [`Node`] owns the cluster view, the shared UDP socket, the blob cache,
//! and the two pieces of originator-side shared state: the set of hashes
//! this node has broadcast (`SenderSet`) and the per-hash, per-chunk count
//! of distinct peer acknowledgements.  [`Node::start`] launches the
//! long-lived background activities — the UDP receive loop, the cache
//! sweeper, and the TCP acknowledgement server — which run for the life of
//! the process; `broadcast` / `stop_broadcast` drive the sender side.
//!
//! Lock discipline: the node-level locks (`cache` map, `sender_set`,
//! `peer_decoded`) and each per-blob lock are leaf locks, held only for
//! map/field access and never across network I/O or a timer.

use {
    crate::{
        cache::BlobCache,
        config::EngineConfig,
        error::Result,
        packet::RootHash,
        peer::PeerSet,
        receiver,
        sender::{self, BroadcastHandle, BroadcastSummary},
    },
    log::info,
    std::{
        collections::{HashMap, HashSet},
        sync::{Arc, Mutex},
        time::Duration,
    },
    tokio::net::{TcpListener, UdpSocket},
};

/// A broadcast node: local identity, cluster view, and all shared state.
pub struct Node {
    pub(crate) config: EngineConfig,
    pub(crate) peers: PeerSet,
    /// Shared packet socket: the receive loop reads it, sender and relay
    /// tasks write it concurrently.
    pub(crate) socket: Arc<UdpSocket>,
    pub(crate) cache: Arc<BlobCache>,
    /// Hashes this node originated.  The receive path never processes a
    /// frame whose hash is in here.
    pub(crate) sender_set: Mutex<HashSet<RootHash>>,
    /// For originated hashes: per chunk, how many distinct peers have
    /// acknowledged a decode.
    pub(crate) peer_decoded: Mutex<HashMap<RootHash, HashMap<u32, usize>>>,
}

impl Node {
    /// Bind the node's packet socket from its peer config and build the
    /// node.  The TCP ack listener binds later, in [`Node::start`].
    pub async fn bind(peers: PeerSet, config: EngineConfig) -> Result<Arc<Self>> {
        let udp = UdpSocket::bind((peers.self_peer.ip, peers.self_peer.udp_port)).await?;
        Ok(Self::from_socket(peers, config, udp))
    }

    /// Build a node around a pre-bound packet socket.  Tests bind to port 0
    /// first, read the assigned port into the peer config, then hand the
    /// socket over here.
    pub fn from_socket(peers: PeerSet, config: EngineConfig, udp: UdpSocket) -> Arc<Self> {
        Arc::new(Self {
            config,
            peers,
            socket: Arc::new(udp),
            cache: Arc::new(BlobCache::default()),
            sender_set: Mutex::new(HashSet::new()),
            peer_decoded: Mutex::new(HashMap::new()),
        })
    }

    /// Launch the long-lived background tasks: UDP receive loop, cache
    /// sweeper, and the TCP ack server.  Call once; the tasks run until
    /// the process exits.  Failing to bind the ack listener is the only
    /// error, and it is fatal to the node.
    pub async fn start(self: &Arc<Self>) -> Result<()> {
        let listener =
            TcpListener::bind((self.peers.self_peer.ip, self.peers.self_peer.tcp_port)).await?;

        info!(
            "node {}: listening on udp {} / tcp {}",
            self.peers.self_peer.sid,
            self.peers.self_peer.udp_addr(),
            self.peers.self_peer.tcp_addr(),
        );

        tokio::spawn(receiver::run(Arc::clone(self)));
        tokio::spawn(crate::ack::run_server(Arc::clone(self), listener));
        tokio::spawn(Arc::clone(&self.cache).run_sweeper(
            Duration::from_secs(self.config.cache_clear_interval_secs),
            Duration::from_secs(self.config.enforce_clear_interval_secs),
        ));
        Ok(())
    }

    /// Originate a broadcast of `blob` to the cluster.  Returns immediately
    /// with a handle; pass it to [`Node::stop_broadcast`] to supervise
    /// quorum and terminate the per-chunk producers.
    pub fn broadcast(self: &Arc<Self>, blob: Vec<u8>) -> Result<BroadcastHandle> {
        sender::start_broadcast(self, blob)
    }

    /// Supervise an in-flight broadcast until every chunk reaches its ack
    /// quorum or the configured time bound expires.
    pub async fn stop_broadcast(self: &Arc<Self>, handle: BroadcastHandle) -> BroadcastSummary {
        sender::stop_broadcast(self, handle).await
    }

    /// Engine configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Cluster view.
    pub fn peers(&self) -> &PeerSet {
        &self.peers
    }

    /// The blob cache (exposed for inspection; tests assert on eviction).
    pub fn cache(&self) -> &Arc<BlobCache> {
        &self.cache
    }

    /// Ack quorum per chunk: `ceil(threshold_fraction · |all_peers|)`.
    pub fn ack_threshold(&self) -> usize {
        (self.config.threshold_fraction * self.peers.all_peers.len() as f64).ceil() as usize
    }

    /// Number of distinct peers that acked a decode of `(hash, chunk_id)`.
    pub fn decoded_count(&self, hash: &RootHash, chunk_id: u32) -> usize {
        self.peer_decoded
            .lock()
            .expect("ack counter lock")
            .get(hash)
            .and_then(|chunks| chunks.get(&chunk_id))
            .copied()
            .unwrap_or(0)
    }

    /// Whether this node originated the blob with the given hash.
    pub(crate) fn is_origin(&self, hash: &RootHash) -> bool {
        self.sender_set.lock().expect("sender set lock").contains(hash)
    }

    /// Record this node as the originator of `hash`.
    pub(crate) fn mark_origin(&self, hash: RootHash) {
        self.sender_set.lock().expect("sender set lock").insert(hash);
    }

    /// Count one peer ack for `(hash, chunk_id)`.  Only ever called for
    /// hashes in the sender set; the counter is monotone.
    pub(crate) fn note_ack(&self, hash: RootHash, chunk_id: u32) -> usize {
        let mut counters = self.peer_decoded.lock().expect("ack counter lock");
        let count = counters
            .entry(hash)
            .or_default()
            .entry(chunk_id)
            .or_insert(0);
        *count += 1;
        *count
    }
}
