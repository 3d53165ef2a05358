//! Wire frames for the broadcast engine.
//!
//! Two frame types exist, both with fixed layouts and big-endian integers.
//!
//! UDP symbol frame:
//!
//! ```text
//! [20: root hash][1: hop][2: sender id][4: chunk count]
//! [4: chunk id][4: chunk byte length][4: symbol id][symbol_size: payload]
//! ```
//!
//! TCP acknowledgement frame:
//!
//! ```text
//! [20: root hash][1: kind = 0x01 "received"][4: chunk id][4: acking peer id]
//! ```
//!
//! Parsers reject short frames with a recoverable error; the receive loops
//! log and move on.

use crate::error::{BroadcastError, Result};

/// Length of a blob's root hash (SHA-1).
pub const HASH_SIZE: usize = 20;

/// A blob's primary key: the SHA-1 of its contents.
pub type RootHash = [u8; HASH_SIZE];

/// Fixed symbol-frame header length; the encoded symbol payload follows.
pub const SYMBOL_HEADER_LEN: usize = 39;

/// Total length of an acknowledgement frame.
pub const ACK_FRAME_LEN: usize = HASH_SIZE + 1 + 4 + 4;

/// Ack kind byte: the acking peer decoded the named chunk.
pub const ACK_KIND_RECEIVED: u8 = 0x01;

/// Byte offset of the hop counter within a symbol frame.
const HOP_OFFSET: usize = HASH_SIZE;

/// One RaptorQ symbol on the wire, together with its routing header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolPacket {
    /// SHA-1 of the whole blob; keys all per-blob state.
    pub root_hash: RootHash,
    /// Remaining forwarding budget.
    pub hop: u8,
    /// Peer id of the blob's originator.
    pub sender_id: u16,
    /// Total chunk count of the blob.
    pub num_chunks: u32,
    /// Which chunk this symbol belongs to.
    pub chunk_id: u32,
    /// Byte length of that chunk (the tail chunk is shorter than the rest).
    pub chunk_len: u32,
    /// Encoding symbol identifier within the chunk.
    pub symbol_id: u32,
    /// The encoded symbol payload.
    pub symbol: Vec<u8>,
}

impl SymbolPacket {
    /// Serialize into a fresh wire buffer.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(SYMBOL_HEADER_LEN + self.symbol.len());
        buf.extend_from_slice(&self.root_hash);
        buf.push(self.hop);
        buf.extend_from_slice(&self.sender_id.to_be_bytes());
        buf.extend_from_slice(&self.num_chunks.to_be_bytes());
        buf.extend_from_slice(&self.chunk_id.to_be_bytes());
        buf.extend_from_slice(&self.chunk_len.to_be_bytes());
        buf.extend_from_slice(&self.symbol_id.to_be_bytes());
        buf.extend_from_slice(&self.symbol);
        buf
    }

    /// Parse a received datagram.
    ///
    /// `symbol_size` is the deployment's symbol payload length; frames
    /// shorter than the header plus one full symbol are rejected.
    pub fn decode(buf: &[u8], symbol_size: u16) -> Result<Self> {
        let need = SYMBOL_HEADER_LEN + symbol_size as usize;
        if buf.len() < need {
            return Err(BroadcastError::FrameTooShort {
                len: buf.len(),
                need,
            });
        }

        let mut root_hash = [0u8; HASH_SIZE];
        root_hash.copy_from_slice(&buf[..HASH_SIZE]);

        Ok(Self {
            root_hash,
            hop: buf[HOP_OFFSET],
            sender_id: u16::from_be_bytes([buf[21], buf[22]]),
            num_chunks: u32::from_be_bytes([buf[23], buf[24], buf[25], buf[26]]),
            chunk_id: u32::from_be_bytes([buf[27], buf[28], buf[29], buf[30]]),
            chunk_len: u32::from_be_bytes([buf[31], buf[32], buf[33], buf[34]]),
            symbol_id: u32::from_be_bytes([buf[35], buf[36], buf[37], buf[38]]),
            symbol: buf[SYMBOL_HEADER_LEN..need].to_vec(),
        })
    }
}

/// Read the hop counter of a raw symbol frame without a full parse.
pub fn frame_hop(frame: &[u8]) -> Option<u8> {
    frame.get(HOP_OFFSET).copied()
}

/// Decrement the hop counter of a raw symbol frame in place.
///
/// The caller must have checked `frame_hop(frame) > 0` first; a relay never
/// decrements below zero.
pub fn decrement_frame_hop(frame: &mut [u8]) {
    frame[HOP_OFFSET] -= 1;
}

/// A decoded-chunk acknowledgement sent to the blob's originator over TCP.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AckFrame {
    /// Root hash of the blob the ack refers to.
    pub root_hash: RootHash,
    /// The chunk the acking peer finished decoding.
    pub chunk_id: u32,
    /// Peer id of the acker.
    pub peer_id: u32,
}

impl AckFrame {
    /// Serialize into the fixed wire layout.
    pub fn encode(&self) -> [u8; ACK_FRAME_LEN] {
        let mut buf = [0u8; ACK_FRAME_LEN];
        buf[..HASH_SIZE].copy_from_slice(&self.root_hash);
        buf[HASH_SIZE] = ACK_KIND_RECEIVED;
        buf[21..25].copy_from_slice(&self.chunk_id.to_be_bytes());
        buf[25..29].copy_from_slice(&self.peer_id.to_be_bytes());
        buf
    }

    /// Parse a full acknowledgement frame.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        if buf.len() < ACK_FRAME_LEN {
            return Err(BroadcastError::FrameTooShort {
                len: buf.len(),
                need: ACK_FRAME_LEN,
            });
        }
        if buf[HASH_SIZE] != ACK_KIND_RECEIVED {
            return Err(BroadcastError::UnknownAckKind(buf[HASH_SIZE]));
        }

        let mut root_hash = [0u8; HASH_SIZE];
        root_hash.copy_from_slice(&buf[..HASH_SIZE]);

        Ok(Self {
            root_hash,
            chunk_id: u32::from_be_bytes([buf[21], buf[22], buf[23], buf[24]]),
            peer_id: u32::from_be_bytes([buf[25], buf[26], buf[27], buf[28]]),
        })
    }
}
