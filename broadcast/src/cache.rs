//! Per-blob state and the timed eviction sweeper.
//!
//! Every blob a node originates or hears about gets one [`BlobState`],
//! keyed by its root hash.  The cache map is guarded by its own lock; each
//! entry is guarded by a per-blob lock.  Readers take the map lock only to
//! look up the `Arc`, then the blob lock to touch fields — neither lock is
//! ever held across I/O or a timer.

use {
    crate::{
        fec::{ChunkDecoder, ChunkEncoder},
        packet::RootHash,
    },
    log::info,
    std::{
        collections::{HashMap, HashSet},
        sync::{Arc, Mutex},
        time::{Duration, Instant, SystemTime, UNIX_EPOCH},
    },
};

/// Mutable per-blob bookkeeping shared by the sender and receiver paths.
pub struct BlobState {
    /// SHA-1 of the blob; primary key.
    pub root_hash: RootHash,
    /// Peer id of the blob's originator.  On the receiver path this is
    /// populated from the first (and every subsequent) symbol frame.
    pub sender_id: u16,
    /// Total chunk count.
    pub num_chunks: u32,
    /// Nominal chunk byte length; the tail chunk may be shorter, and its
    /// actual length travels in each symbol frame.
    pub chunk_size: usize,
    /// Distinct per-chunk acks that terminate that chunk's broadcast.
    pub threshold: usize,
    /// Sender side: lazily built per-chunk encoders.
    pub encoders: HashMap<u32, ChunkEncoder>,
    /// Receiver side: lazily built per-chunk decoders.
    pub decoders: HashMap<u32, ChunkDecoder>,
    /// Symbol ids already observed, per chunk.  Monotone-growing.
    pub received_symbols: HashMap<u32, HashSet<u32>>,
    /// Chunks whose decoder has signalled completion.
    pub num_decoded: u32,
    /// When this entry was created.
    pub init_at: Instant,
    /// When the last chunk decoded, if the blob is complete.
    pub success_at: Option<Instant>,
    /// Wall-clock nanoseconds captured at completion; names the dump file.
    pub success_unix_nanos: u128,
    /// Sender side: elapsed time from broadcast start to quorum, per chunk.
    pub per_chunk_elapsed: HashMap<u32, Duration>,
}

impl BlobState {
    /// Entry for a blob this node originates.
    pub fn new_sender(
        root_hash: RootHash,
        sender_id: u16,
        num_chunks: u32,
        chunk_size: usize,
        threshold: usize,
    ) -> Self {
        Self {
            root_hash,
            sender_id,
            num_chunks,
            chunk_size,
            threshold,
            encoders: HashMap::new(),
            decoders: HashMap::new(),
            received_symbols: HashMap::new(),
            num_decoded: 0,
            init_at: Instant::now(),
            success_at: None,
            success_unix_nanos: 0,
            per_chunk_elapsed: HashMap::new(),
        }
    }

    /// Entry for a blob first heard about over UDP; `sender_id` and
    /// `num_chunks` are filled in from the frames.
    pub fn new_receiver(root_hash: RootHash, chunk_size: usize, threshold: usize) -> Self {
        Self::new_sender(root_hash, 0, 0, chunk_size, threshold)
    }

    /// Record an observed symbol.  Returns `true` the first time a given
    /// `(chunk_id, symbol_id)` is seen — that observation is the one fed to
    /// the decoder and relayed.
    pub fn mark_symbol_seen(&mut self, chunk_id: u32, symbol_id: u32) -> bool {
        self.received_symbols
            .entry(chunk_id)
            .or_default()
            .insert(symbol_id)
    }

    /// Whether every chunk has decoded.
    pub fn is_complete(&self) -> bool {
        self.num_chunks > 0 && self.num_decoded >= self.num_chunks
    }

    /// Stamp the completion time, exactly once.  Returns the wall-clock
    /// nanosecond timestamp used to name the dump file.
    pub fn mark_success(&mut self) -> u128 {
        if self.success_at.is_none() {
            self.success_at = Some(Instant::now());
            self.success_unix_nanos = SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap_or_default()
                .as_nanos();
        }
        self.success_unix_nanos
    }
}

/// Map of root hash → shared blob state, plus the eviction policy.
#[derive(Default)]
pub struct BlobCache {
    entries: Mutex<HashMap<RootHash, Arc<Mutex<BlobState>>>>,
}

impl BlobCache {
    /// Look up a blob's state.
    pub fn get(&self, hash: &RootHash) -> Option<Arc<Mutex<BlobState>>> {
        self.entries.lock().expect("cache lock").get(hash).cloned()
    }

    /// Fetch the entry for `hash`, creating it with `init` on first
    /// observation.  Creation happens at most once per hash; concurrent
    /// callers all receive the same `Arc`.
    pub fn get_or_insert_with(
        &self,
        hash: RootHash,
        init: impl FnOnce() -> BlobState,
    ) -> Arc<Mutex<BlobState>> {
        let mut entries = self.entries.lock().expect("cache lock");
        entries
            .entry(hash)
            .or_insert_with(|| Arc::new(Mutex::new(init())))
            .clone()
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.entries.lock().expect("cache lock").len()
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// One eviction pass.  Removes entries that completed more than
    /// `clear_after` ago, and entries older than `enforce_after` whether or
    /// not they ever completed.  Holds the map lock and takes each blob
    /// lock briefly; in-flight handlers that still hold an `Arc` keep their
    /// entry alive until they drop it.
    pub fn sweep(&self, clear_after: Duration, enforce_after: Duration) {
        let mut entries = self.entries.lock().expect("cache lock");
        entries.retain(|hash, state| {
            let state = state.lock().expect("blob lock");
            let expired_success = state
                .success_at
                .is_some_and(|at| at.elapsed() > clear_after);
            let expired_hard = state.init_at.elapsed() > enforce_after;
            if expired_success {
                info!("cache: dropping decoded blob {}", hex::encode(hash));
            } else if expired_hard {
                info!("cache: force-dropping stale blob {}", hex::encode(hash));
            }
            !(expired_success || expired_hard)
        });
    }

    /// Background sweeper: runs [`Self::sweep`] every `interval` for the
    /// lifetime of the node.  The post-success retention window equals the
    /// sweep interval.
    pub async fn run_sweeper(self: Arc<Self>, interval: Duration, enforce_after: Duration) {
        loop {
            tokio::time::sleep(interval).await;
            self.sweep(interval, enforce_after);
        }
    }
}
