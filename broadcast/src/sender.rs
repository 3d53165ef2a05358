//! Originator side: chunked symbol production and quorum supervision.
//!
//! `broadcast` splits the blob into chunks and spawns one producer task per
//! chunk.  Each producer lazily builds its RaptorQ encoder, then emits
//! symbols forever under the exponential-backoff pacing, round-robining
//! across direct neighbors, until its cancellation flag flips.
//!
//! `stop_broadcast` is the supervisor: it polls the per-chunk ack counters
//! and cancels each chunk's producer once a quorum of peers has confirmed
//! decoding — never before.  It returns a summary either when every chunk
//! is done or when the configured time bound expires, cancelling any
//! stragglers so no producer outlives its broadcast.

use {
    crate::{
        backoff::ExpBackoff,
        cache::BlobState,
        error::{BroadcastError, Result},
        fec::ChunkEncoder,
        node::Node,
        packet::{RootHash, SymbolPacket},
    },
    log::{debug, info, warn},
    sha1::{Digest, Sha1},
    std::{
        collections::HashMap,
        sync::{
            atomic::{AtomicBool, Ordering},
            Arc, Mutex,
        },
        time::{Duration, Instant},
    },
};

/// How often the supervisor re-checks the ack counters.
const QUORUM_POLL_INTERVAL: Duration = Duration::from_millis(200);

/// A live broadcast: the blob's identity plus one cancellation flag per
/// chunk producer.
pub struct BroadcastHandle {
    root_hash: RootHash,
    num_chunks: u32,
    threshold: usize,
    started_at: Instant,
    cancels: HashMap<u32, Arc<AtomicBool>>,
}

impl BroadcastHandle {
    /// Root hash of the blob being broadcast.
    pub fn root_hash(&self) -> RootHash {
        self.root_hash
    }

    /// Number of chunks the blob was split into.
    pub fn num_chunks(&self) -> u32 {
        self.num_chunks
    }
}

/// Outcome of a supervised broadcast.
#[derive(Debug)]
pub struct BroadcastSummary {
    /// Root hash of the blob.
    pub root_hash: RootHash,
    /// Time from broadcast start to quorum, per chunk that reached it.
    pub per_chunk_elapsed: HashMap<u32, Duration>,
    /// Chunks that never reached quorum before the time bound.
    pub unfinished: Vec<u32>,
    /// Total supervision time.
    pub total_elapsed: Duration,
}

impl BroadcastSummary {
    /// Whether every chunk reached its ack quorum.
    pub fn all_acked(&self) -> bool {
        self.unfinished.is_empty()
    }
}

/// Number of chunks a blob of `len` bytes splits into.
pub(crate) fn chunk_count(len: usize, chunk_size: usize) -> u32 {
    len.div_ceil(chunk_size) as u32
}

/// Hash, register, chunk, and launch one producer task per chunk.
pub(crate) fn start_broadcast(node: &Arc<Node>, blob: Vec<u8>) -> Result<BroadcastHandle> {
    if blob.is_empty() {
        return Err(BroadcastError::EmptyBlob);
    }

    let root_hash: RootHash = Sha1::digest(&blob).into();
    let chunk_size = node.config.normal_chunk_size;
    let num_chunks = chunk_count(blob.len(), chunk_size);
    let threshold = node.ack_threshold();

    node.mark_origin(root_hash);
    let state = node.cache.get_or_insert_with(root_hash, || {
        BlobState::new_sender(
            root_hash,
            node.peers.self_peer.sid,
            num_chunks,
            chunk_size,
            threshold,
        )
    });

    info!(
        "broadcast {}: {} bytes in {} chunks, quorum {}",
        hex::encode(root_hash),
        blob.len(),
        num_chunks,
        threshold,
    );

    let blob = Arc::new(blob);
    let mut cancels = HashMap::new();
    for chunk_id in 0..num_chunks {
        let cancel = Arc::new(AtomicBool::new(false));
        cancels.insert(chunk_id, Arc::clone(&cancel));
        tokio::spawn(chunk_producer(
            Arc::clone(node),
            Arc::clone(&blob),
            Arc::clone(&state),
            chunk_id,
            cancel,
        ));
    }

    Ok(BroadcastHandle {
        root_hash,
        num_chunks,
        threshold,
        started_at: Instant::now(),
        cancels,
    })
}

/// Per-chunk producer: build the encoder, then emit paced symbols until
/// cancelled.  Every failure in here is local — log and move on (or give
/// the chunk up), never tear down the node.
async fn chunk_producer(
    node: Arc<Node>,
    blob: Arc<Vec<u8>>,
    state: Arc<Mutex<BlobState>>,
    chunk_id: u32,
    cancel: Arc<AtomicBool>,
) {
    let config = &node.config;
    let peer_list = &node.peers.peer_list;
    if peer_list.is_empty() {
        warn!("chunk {chunk_id}: no neighbors to send to, producer idle");
        return;
    }

    let start = chunk_id as usize * config.normal_chunk_size;
    let end = blob.len().min(start + config.normal_chunk_size);
    let chunk_len = (end - start) as u32;

    let k0 = {
        let mut state = state.lock().expect("blob lock");
        if !state.encoders.contains_key(&chunk_id) {
            match ChunkEncoder::new(&blob[start..end], config.symbol_size) {
                Ok(encoder) => {
                    state.encoders.insert(chunk_id, encoder);
                }
                Err(e) => {
                    warn!("chunk {chunk_id}: encoder construction failed, skipping: {e}");
                    return;
                }
            }
        }
        state.encoders[&chunk_id].min_symbols()
    };

    let backoff = ExpBackoff::new(config.initial_delay_ms, config.max_delay_ms, config.exp_base);
    let (root_hash, sender_id, num_chunks) = {
        let state = state.lock().expect("blob lock");
        (state.root_hash, state.sender_id, state.num_chunks)
    };

    let mut index: u32 = 0;
    loop {
        if cancel.load(Ordering::Relaxed) {
            debug!("chunk {chunk_id}: broadcast stopped after {index} symbols");
            return;
        }
        tokio::time::sleep(backoff.delay(index, k0)).await;
        if cancel.load(Ordering::Relaxed) {
            debug!("chunk {chunk_id}: broadcast stopped after {index} symbols");
            return;
        }

        let (symbol_id, symbol) = {
            let state = state.lock().expect("blob lock");
            state.encoders[&chunk_id].symbol(index)
        };
        let frame = SymbolPacket {
            root_hash,
            hop: config.hop,
            sender_id,
            num_chunks,
            chunk_id,
            chunk_len,
            symbol_id,
            symbol,
        }
        .encode();

        let peer = &peer_list[index as usize % peer_list.len()];
        match node.socket.send_to(&frame, peer.udp_addr()).await {
            Ok(n) if n < frame.len() => {
                // Counted as sent; FEC redundancy covers the loss.
                warn!(
                    "chunk {chunk_id}: short udp write to {} ({n} of {} bytes)",
                    peer.udp_addr(),
                    frame.len(),
                );
            }
            Ok(_) => {}
            Err(e) => warn!("chunk {chunk_id}: udp send to {} failed: {e}", peer.udp_addr()),
        }
        if index % 100 == 0 {
            debug!("chunk {chunk_id}: symbol {symbol_id} sent to {}", peer.udp_addr());
        }
        index += 1;
    }
}

/// Poll the ack counters and cancel each chunk once its quorum is reached.
/// Exits when every chunk is cancelled or after the configured time bound,
/// cancelling any producers still running.
pub(crate) async fn stop_broadcast(node: &Arc<Node>, handle: BroadcastHandle) -> BroadcastSummary {
    let deadline = handle.started_at + Duration::from_secs(node.config.stop_broadcast_secs);
    let mut per_chunk_elapsed = HashMap::new();

    while Instant::now() < deadline && per_chunk_elapsed.len() < handle.num_chunks as usize {
        for (&chunk_id, cancel) in &handle.cancels {
            if per_chunk_elapsed.contains_key(&chunk_id) {
                continue;
            }
            if node.decoded_count(&handle.root_hash, chunk_id) >= handle.threshold {
                cancel.store(true, Ordering::Relaxed);
                let elapsed = handle.started_at.elapsed();
                per_chunk_elapsed.insert(chunk_id, elapsed);
                info!(
                    "chunk {chunk_id}: quorum reached, cancelled after {} ms",
                    elapsed.as_millis(),
                );
            }
        }
        if per_chunk_elapsed.len() < handle.num_chunks as usize {
            tokio::time::sleep(QUORUM_POLL_INTERVAL).await;
        }
    }

    // Stragglers past the time bound stop transmitting too; the summary
    // records them as unfinished.
    let mut unfinished: Vec<u32> = Vec::new();
    for (&chunk_id, cancel) in &handle.cancels {
        if !per_chunk_elapsed.contains_key(&chunk_id) {
            cancel.store(true, Ordering::Relaxed);
            unfinished.push(chunk_id);
        }
    }
    unfinished.sort_unstable();

    if let Some(state) = node.cache.get(&handle.root_hash) {
        let mut state = state.lock().expect("blob lock");
        state.per_chunk_elapsed.extend(&per_chunk_elapsed);
    }

    let total_elapsed = handle.started_at.elapsed();
    if unfinished.is_empty() {
        let config = &node.config;
        info!(
            "broadcast {} finished in {} ms (t0 {} ms, t1 {} ms, base {}, relay {} ms, hop {})",
            hex::encode(handle.root_hash),
            total_elapsed.as_millis(),
            config.initial_delay_ms,
            config.max_delay_ms,
            config.exp_base,
            config.relay_delay_ms,
            config.hop,
        );
        for (chunk_id, elapsed) in &per_chunk_elapsed {
            info!("chunk {chunk_id}: quorum after {} ms", elapsed.as_millis());
        }
    } else {
        warn!(
            "broadcast {}: chunks {unfinished:?} below quorum after {} ms",
            hex::encode(handle.root_hash),
            total_elapsed.as_millis(),
        );
    }

    BroadcastSummary {
        root_hash: handle.root_hash,
        per_chunk_elapsed,
        unfinished,
        total_elapsed,
    }
}
