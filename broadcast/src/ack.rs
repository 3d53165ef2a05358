//! TCP acknowledgement channel.
//!
//! Sender side: an accept loop on the node's TCP port.  Each connection
//! carries one ack frame — a root hash, a kind byte, and for the
//! "received" kind a chunk id and the acking peer's id.  Acks for hashes
//! this node did not originate are dropped; unknown kinds are logged and
//! ignored.
//!
//! Receiver side: after a chunk decodes, the node dials the originator's
//! TCP port and writes the ack frame.  A failed dial is retried under a
//! slow exponential backoff with a bounded attempt budget; a send failure
//! after a successful dial is not retried — the quorum only needs most
//! peers to get through.

use {
    crate::{
        backoff::ExpBackoff,
        error::{BroadcastError, Result},
        node::Node,
        packet::{AckFrame, RootHash, ACK_KIND_RECEIVED, HASH_SIZE},
    },
    log::{debug, error, info, warn},
    std::{net::SocketAddr, sync::Arc},
    tokio::{
        io::{AsyncReadExt, AsyncWriteExt},
        net::{TcpListener, TcpStream},
    },
};

/// Retry budget for the ack dial, after the initial attempt.
const DIAL_RETRIES: u32 = 10;

/// Dial retry backoff floor (ms).
const DIAL_RETRY_INITIAL_MS: f64 = 1_000.0;

/// Dial retry backoff ceiling (ms).
const DIAL_RETRY_MAX_MS: f64 = 15_000.0;

/// Dial retry backoff base.
const DIAL_RETRY_BASE: f64 = 1.35;

/// Accept loop for incoming acknowledgements.  Runs for the lifetime of
/// the node.
pub(crate) async fn run_server(node: Arc<Node>, listener: TcpListener) {
    loop {
        match listener.accept().await {
            Ok((stream, addr)) => {
                debug!("ack connection from {addr}");
                tokio::spawn(handle_connection(Arc::clone(&node), stream, addr));
            }
            Err(e) => error!("ack accept failed: {e}"),
        }
    }
}

/// Read one acknowledgement frame from an accepted connection.
async fn handle_connection(node: Arc<Node>, mut stream: TcpStream, addr: SocketAddr) {
    let mut hash: RootHash = [0u8; HASH_SIZE];
    if let Err(e) = stream.read_exact(&mut hash).await {
        warn!("ack hash read from {addr} failed: {e}");
        return;
    }
    // Acks only make sense for blobs this node originated.
    if !node.is_origin(&hash) {
        debug!("ack from {addr} for foreign hash {}", hex::encode(hash));
        return;
    }

    let mut kind = [0u8; 1];
    if let Err(e) = stream.read_exact(&mut kind).await {
        warn!("ack kind read from {addr} failed: {e}");
        return;
    }
    match kind[0] {
        ACK_KIND_RECEIVED => {
            let mut body = [0u8; 8];
            if let Err(e) = stream.read_exact(&mut body).await {
                warn!("ack body read from {addr} failed: {e}");
                return;
            }
            let chunk_id = u32::from_be_bytes([body[0], body[1], body[2], body[3]]);
            let peer_id = u32::from_be_bytes([body[4], body[5], body[6], body[7]]);
            let count = node.note_ack(hash, chunk_id);
            info!("chunk {chunk_id}: decode confirmed by peer {peer_id} ({count} so far)");
        }
        other => warn!("unknown ack kind {other:#04x} from {addr}"),
    }
}

/// Tell the originator of `hash` that this node decoded `chunk_id`.
pub(crate) async fn send_decoded_ack(
    node: Arc<Node>,
    hash: RootHash,
    chunk_id: u32,
    sender_id: u16,
) {
    let Some(sender) = node.peers.find(sender_id).cloned() else {
        warn!("chunk {chunk_id}: originator {sender_id} not in peer set, ack dropped");
        return;
    };
    let addr = sender.tcp_addr();

    let frame = AckFrame {
        root_hash: hash,
        chunk_id,
        peer_id: u32::from(node.peers.self_peer.sid),
    }
    .encode();

    let mut stream = match connect_with_retry(addr).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!("chunk {chunk_id}: {e}");
            return;
        }
    };
    match stream.write_all(&frame).await {
        Ok(()) => {
            let _ = stream.flush().await;
            debug!("chunk {chunk_id}: ack sent to {addr}");
        }
        // Not retried: the dial worked, and quorum tolerates a lost ack.
        Err(e) => warn!("chunk {chunk_id}: ack write to {addr} failed: {e}"),
    }
}

/// Dial `addr`, retrying under a slow exponential backoff.
async fn connect_with_retry(addr: SocketAddr) -> Result<TcpStream> {
    match TcpStream::connect(addr).await {
        Ok(stream) => return Ok(stream),
        Err(e) => debug!("ack dial to {addr} failed: {e}"),
    }

    let backoff = ExpBackoff::new(DIAL_RETRY_INITIAL_MS, DIAL_RETRY_MAX_MS, DIAL_RETRY_BASE);
    for attempt in 0..DIAL_RETRIES {
        tokio::time::sleep(backoff.delay(attempt, 0)).await;
        match TcpStream::connect(addr).await {
            Ok(stream) => return Ok(stream),
            Err(e) => debug!("ack dial to {addr} failed (retry {attempt}): {e}"),
        }
    }
    Err(BroadcastError::AckRetriesExhausted {
        addr,
        attempts: DIAL_RETRIES + 1,
    })
}
