//! RaptorQ chunk encoder / decoder wrappers.
//!
//! Each chunk of a blob is one independent RaptorQ source object with a
//! single source block and no sub-blocking (`Z = 1`, `N = 1`, `Al = 4`).
//! Both sides derive identical transmission parameters from the chunk byte
//! length and the deployment's symbol size, so no out-of-band OTI exchange
//! is needed — the chunk length travels in every symbol frame.

use {
    crate::error::{BroadcastError, Result},
    raptorq::{Decoder, Encoder, EncodingPacket, ObjectTransmissionInformation, PayloadId},
    std::collections::HashSet,
};

/// Source blocks per chunk.
const SOURCE_BLOCKS: u8 = 1;

/// Sub-blocks per source block.
const SUB_BLOCKS: u16 = 1;

/// Symbol alignment in bytes; `symbol_size` must be a multiple of this.
const ALIGNMENT: u8 = 4;

fn transmission_info(chunk_len: u32, symbol_size: u16) -> ObjectTransmissionInformation {
    ObjectTransmissionInformation::new(
        u64::from(chunk_len),
        symbol_size,
        SOURCE_BLOCKS,
        SUB_BLOCKS,
        ALIGNMENT,
    )
}

/// Produces encoded symbols for one chunk, in symbol-id order.
pub struct ChunkEncoder {
    inner: Encoder,
    /// Source symbols, extracted once; index == wire symbol id.
    source: Vec<(u32, Vec<u8>)>,
}

impl ChunkEncoder {
    /// Build an encoder over one chunk's bytes.
    pub fn new(chunk: &[u8], symbol_size: u16) -> Result<Self> {
        if chunk.is_empty() {
            return Err(BroadcastError::Codec(
                "cannot encode a zero-length chunk".to_string(),
            ));
        }
        let chunk_len = u32::try_from(chunk.len())
            .map_err(|_| BroadcastError::Codec(format!("chunk of {} bytes", chunk.len())))?;

        let inner = Encoder::new(chunk, transmission_info(chunk_len, symbol_size));
        let source = inner.get_block_encoders()[0]
            .source_packets()
            .into_iter()
            .map(|packet| {
                (
                    packet.payload_id().encoding_symbol_id(),
                    packet.data().to_vec(),
                )
            })
            .collect();

        Ok(Self { inner, source })
    }

    /// Minimum number of symbols any receiver needs to decode this chunk.
    pub fn min_symbols(&self) -> u32 {
        self.source.len() as u32
    }

    /// Produce the `index`-th symbol of this chunk.
    ///
    /// Indices below [`Self::min_symbols`] yield the source symbols; higher
    /// indices yield repair symbols, generated on demand.  Returns the wire
    /// symbol id together with the payload — for repair symbols the codec
    /// assigns the id, and it is carried in the frame rather than assumed.
    pub fn symbol(&self, index: u32) -> (u32, Vec<u8>) {
        if let Some((esi, data)) = self.source.get(index as usize) {
            return (*esi, data.clone());
        }
        let repair_index = index - self.min_symbols();
        let packet = self.inner.get_block_encoders()[0]
            .repair_packets(repair_index, 1)
            .remove(0);
        (
            packet.payload_id().encoding_symbol_id(),
            packet.data().to_vec(),
        )
    }
}

/// Incrementally reconstructs one chunk from received symbols.
pub struct ChunkDecoder {
    inner: Decoder,
    transfer_length: u64,
    received: HashSet<u32>,
    decoded: Option<Vec<u8>>,
}

impl ChunkDecoder {
    /// Build a decoder for a chunk of the given byte length.
    pub fn new(chunk_len: u32, symbol_size: u16) -> Result<Self> {
        if chunk_len == 0 {
            return Err(BroadcastError::Codec(
                "cannot decode a zero-length chunk".to_string(),
            ));
        }
        Ok(Self {
            inner: Decoder::new(transmission_info(chunk_len, symbol_size)),
            transfer_length: u64::from(chunk_len),
            received: HashSet::new(),
            decoded: None,
        })
    }

    /// Feed one symbol.  Returns `true` exactly once: when this symbol
    /// completes the chunk.  Duplicate symbol ids and symbols fed after
    /// completion are ignored.
    pub fn absorb(&mut self, symbol_id: u32, symbol: Vec<u8>) -> bool {
        if self.decoded.is_some() || !self.received.insert(symbol_id) {
            return false;
        }
        let packet = EncodingPacket::new(PayloadId::new(0, symbol_id), symbol);
        match self.inner.decode(packet) {
            Some(data) => {
                self.decoded = Some(data);
                true
            }
            None => false,
        }
    }

    /// Whether the source object has been reconstructed.
    pub fn is_ready(&self) -> bool {
        self.decoded.is_some()
    }

    /// The reconstructed chunk, once ready.
    pub fn source_object(&self) -> Option<&[u8]> {
        self.decoded.as_deref()
    }

    /// Byte length of the chunk being reconstructed.
    pub fn transfer_length(&self) -> u64 {
        self.transfer_length
    }
}
