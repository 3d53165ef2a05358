//! Hop-bounded symbol forwarding.
//!
//! Each freshly-seen symbol is forwarded to every direct neighbor exactly
//! once.  The hop byte in the raw frame bounds the flood: a packet arriving
//! with hop 0 is dropped, anything else is re-sent with the hop
//! decremented in place.  Iteration starts at a random neighbor so
//! concurrent relays across the cluster don't all hammer the same peer
//! first.

use {
    crate::{
        node::Node,
        packet::{decrement_frame_hop, frame_hop},
    },
    log::warn,
    rand::Rng,
    std::{sync::Arc, time::Duration},
};

/// Forward one raw symbol frame, as received, to the node's neighbors.
///
/// Called at most once per `(hash, chunk_id, symbol_id)` — the receive
/// path's dedup set guarantees the first observation is the only one that
/// gets here.  Send errors are logged and do not stop the iteration.
pub(crate) async fn relay_symbol(node: Arc<Node>, mut frame: Vec<u8>) {
    match frame_hop(&frame) {
        Some(hop) if hop > 0 => decrement_frame_hop(&mut frame),
        _ => return,
    }

    let peer_list = &node.peers.peer_list;
    if peer_list.is_empty() {
        return;
    }

    let delay = Duration::from_secs_f64(node.config.relay_delay_ms / 1_000.0);
    let offset = rand::rng().random_range(0..peer_list.len());
    for i in 0..peer_list.len() {
        let peer = &peer_list[(offset + i) % peer_list.len()];
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }
        match node.socket.send_to(&frame, peer.udp_addr()).await {
            Ok(n) if n < frame.len() => warn!(
                "relay: short udp write to {} ({n} of {} bytes)",
                peer.udp_addr(),
                frame.len(),
            ),
            Ok(_) => {}
            Err(e) => warn!("relay to {} failed: {e}", peer.udp_addr()),
        }
    }
}
