//! UDP receive loop: classify, deduplicate, decode, relay.
//!
//! A single loop reads the node's shared packet socket.  Each datagram is
//! copied out of the reusable read buffer and handed to a task, so frame
//! processing is concurrent; the per-blob lock serialises decoder access.
//!
//! Per frame:
//!
//! 1. decode the fixed header; malformed frames are dropped;
//! 2. drop frames for hashes this node originated (no self-gossip);
//! 3. find or create the blob's cache entry and the chunk's decoder;
//! 4. drop symbols already seen; otherwise feed the decoder and spawn a
//!    relay of the frame as received;
//! 5. on chunk completion, ack the originator; on blob completion, stamp
//!    the success time and dump the reassembled bytes to disk.

use {
    crate::{
        ack,
        cache::BlobState,
        fec::ChunkDecoder,
        node::Node,
        packet::{RootHash, SymbolPacket},
        relay,
    },
    log::{debug, error, info, warn},
    sha1::{Digest, Sha1},
    std::sync::Arc,
};

/// The node's UDP read loop.  Runs for the lifetime of the process.
pub(crate) async fn run(node: Arc<Node>) {
    let mut buf = vec![0u8; node.config.udp_cache_size];
    loop {
        let (len, from) = match node.socket.recv_from(&mut buf).await {
            Ok(read) => read,
            Err(e) => {
                warn!("udp receive failed: {e}");
                continue;
            }
        };
        // The read buffer is reused; give the handler its own copy.
        let frame = buf[..len].to_vec();
        debug!("received {len} byte frame from {from}");
        tokio::spawn(handle_frame(Arc::clone(&node), frame));
    }
}

async fn handle_frame(node: Arc<Node>, frame: Vec<u8>) {
    let packet = match SymbolPacket::decode(&frame, node.config.symbol_size) {
        Ok(packet) => packet,
        Err(e) => {
            debug!("dropping malformed frame: {e}");
            return;
        }
    };

    // Never consume our own broadcasts.
    if node.is_origin(&packet.root_hash) {
        return;
    }

    let state = node.cache.get_or_insert_with(packet.root_hash, || {
        info!(
            "first symbol for blob {} (sender {}, {} chunks)",
            hex::encode(packet.root_hash),
            packet.sender_id,
            packet.num_chunks,
        );
        BlobState::new_receiver(
            packet.root_hash,
            node.config.normal_chunk_size,
            node.ack_threshold(),
        )
    });

    let (completed, sender_id) = {
        let mut state = state.lock().expect("blob lock");
        state.sender_id = packet.sender_id;
        state.num_chunks = packet.num_chunks;

        if !state.decoders.contains_key(&packet.chunk_id) {
            match ChunkDecoder::new(packet.chunk_len, node.config.symbol_size) {
                Ok(decoder) => {
                    state.decoders.insert(packet.chunk_id, decoder);
                }
                Err(e) => {
                    warn!(
                        "chunk {}: decoder construction failed, symbol discarded: {e}",
                        packet.chunk_id,
                    );
                    return;
                }
            }
        }

        // First observation only: later copies are neither fed nor relayed.
        if !state.mark_symbol_seen(packet.chunk_id, packet.symbol_id) {
            return;
        }

        let decoder = state
            .decoders
            .get_mut(&packet.chunk_id)
            .expect("decoder just ensured");
        let completed = if decoder.is_ready() {
            false
        } else {
            decoder.absorb(packet.symbol_id, packet.symbol)
        };
        (completed, packet.sender_id)
    };

    // Relay the frame as received; the relay decrements the hop itself.
    tokio::spawn(relay::relay_symbol(Arc::clone(&node), frame));

    if completed {
        handle_decode_success(node, packet.root_hash, packet.chunk_id, sender_id).await;
    }
}

/// One chunk finished decoding: count it, ack the originator, and if it was
/// the last chunk, reassemble the blob and dump it.
async fn handle_decode_success(node: Arc<Node>, hash: RootHash, chunk_id: u32, sender_id: u16) {
    let Some(state) = node.cache.get(&hash) else {
        // Evicted between decode and handling; nothing left to do.
        return;
    };

    let assembled = {
        let mut state = state.lock().expect("blob lock");
        state.num_decoded += 1;
        if let Some(chunk) = state.decoders.get(&chunk_id).and_then(|d| d.source_object()) {
            debug!(
                "chunk {chunk_id} decoded, sha1 {}",
                hex::encode(Sha1::digest(chunk)),
            );
        }
        if state.is_complete() {
            let nanos = state.mark_success();
            Some((reassemble(&state), nanos))
        } else {
            None
        }
    };

    tokio::spawn(ack::send_decoded_ack(
        Arc::clone(&node),
        hash,
        chunk_id,
        sender_id,
    ));

    if let Some((blob, nanos)) = assembled {
        info!(
            "blob {} complete: {} bytes from sender {sender_id}",
            hex::encode(hash),
            blob.len(),
        );
        dump_blob(&node, sender_id, nanos, blob).await;
    }
}

/// Concatenate the decoded chunks in chunk-id order.  Lengths come from the
/// decoders, not the nominal chunk size — the tail chunk is shorter.
fn reassemble(state: &BlobState) -> Vec<u8> {
    let total: u64 = (0..state.num_chunks)
        .filter_map(|chunk_id| state.decoders.get(&chunk_id))
        .map(|decoder| decoder.transfer_length())
        .sum();
    let mut blob = Vec::with_capacity(total as usize);
    for chunk_id in 0..state.num_chunks {
        match state.decoders.get(&chunk_id).and_then(|d| d.source_object()) {
            Some(chunk) => blob.extend_from_slice(chunk),
            None => {
                // Unreachable once num_decoded == num_chunks; guard anyway.
                error!("chunk {chunk_id} missing during reassembly");
                return blob;
            }
        }
    }
    blob
}

/// Write a completed blob to `received_dir/{senderId}_{successTimeNanos}`.
/// Failures are logged; the blob stays decodable in the cache until swept.
async fn dump_blob(node: &Node, sender_id: u16, nanos: u128, blob: Vec<u8>) {
    let dir = node.config.received_dir.clone();
    if let Err(e) = tokio::fs::create_dir_all(&dir).await {
        error!("cannot create {}: {e}", dir.display());
        return;
    }
    let path = dir.join(format!("{sender_id}_{nanos}"));
    match tokio::fs::write(&path, blob).await {
        Ok(()) => info!("wrote received blob to {}", path.display()),
        Err(e) => error!("cannot write {}: {e}", path.display()),
    }
}
