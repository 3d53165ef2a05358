//! Configuration for the broadcast engine.

use std::path::PathBuf;

/// Tunables and deployment constants for a broadcast node.
///
/// The pacing fields (`initial_delay_ms`, `max_delay_ms`, `exp_base`,
/// `relay_delay_ms`, `hop`) shape how aggressively a node pushes and
/// forwards symbols.  The remaining fields are deployment constants that
/// must agree across every node of a cluster — two nodes with different
/// `symbol_size` or `normal_chunk_size` cannot decode each other's streams.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Backoff floor: delay before each of the first `k0` symbols (ms).
    pub initial_delay_ms: f64,

    /// Backoff ceiling: the delay saturates here (ms).
    pub max_delay_ms: f64,

    /// Backoff growth base applied per symbol past `k0`.
    pub exp_base: f64,

    /// Pause between consecutive neighbor sends while relaying (ms).
    pub relay_delay_ms: f64,

    /// Initial hop budget stamped into every originated symbol packet.
    /// A relay decrements it; packets arriving with hop 0 are not forwarded.
    pub hop: u8,

    /// Size of one encoded symbol payload in bytes.
    /// Default: 1200 — a full symbol frame (39-byte header + payload) still
    /// fits a common 1500-byte MTU.
    pub symbol_size: u16,

    /// Chunk size the blob is partitioned into; each chunk is an independent
    /// RaptorQ source object.  The last chunk may be shorter.
    pub normal_chunk_size: usize,

    /// Fraction of `|AllPeers|` whose acks terminate a chunk's broadcast.
    pub threshold_fraction: f64,

    /// Sweeper period; also how long a decoded blob is retained (seconds).
    pub cache_clear_interval_secs: u64,

    /// Hard retention bound for blobs that never finish decoding (seconds).
    pub enforce_clear_interval_secs: u64,

    /// Upper bound on how long `stop_broadcast` waits for quorum (seconds).
    pub stop_broadcast_secs: u64,

    /// UDP receive buffer size in bytes.  Must be at least the full symbol
    /// frame length (header + `symbol_size`).
    pub udp_cache_size: usize,

    /// Directory fully decoded blobs are dumped into.
    pub received_dir: PathBuf,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            initial_delay_ms: 10.0,
            max_delay_ms: 1_000.0,
            exp_base: 1.05,
            relay_delay_ms: 1.0,
            hop: 1,
            symbol_size: 1_200,
            normal_chunk_size: 256 * 1024,
            threshold_fraction: 0.5,
            cache_clear_interval_secs: 10,
            enforce_clear_interval_secs: 300,
            stop_broadcast_secs: 60,
            udp_cache_size: 4_096,
            received_dir: PathBuf::from("received"),
        }
    }
}

impl EngineConfig {
    /// Config for local testing: tiny chunks, tight pacing, fast eviction.
    pub fn dev_default() -> Self {
        Self {
            initial_delay_ms: 1.0,
            max_delay_ms: 20.0,
            exp_base: 1.2,
            relay_delay_ms: 0.0,
            hop: 1,
            symbol_size: 64,
            normal_chunk_size: 1_024,
            threshold_fraction: 0.5,
            cache_clear_interval_secs: 1,
            enforce_clear_interval_secs: 3,
            stop_broadcast_secs: 10,
            udp_cache_size: 2_048,
            received_dir: std::env::temp_dir().join("fountaincast-received"),
        }
    }

    /// Full length of a symbol frame under this config.
    pub fn symbol_frame_len(&self) -> usize {
        crate::packet::SYMBOL_HEADER_LEN + self.symbol_size as usize
    }
}
