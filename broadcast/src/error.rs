//! Error types for the broadcast engine.

use thiserror::Error;

/// Errors that can occur in the broadcast engine.
#[derive(Error, Debug)]
pub enum BroadcastError {
    /// Network-level I/O error (UDP bind/send, TCP listen/dial/read/write).
    #[error("transport error: {0}")]
    Transport(#[from] std::io::Error),

    /// A received frame is shorter than its fixed layout requires.
    #[error("frame too short: {len} bytes (need {need})")]
    FrameTooShort {
        /// Bytes actually present.
        len: usize,
        /// Minimum bytes the layout requires.
        need: usize,
    },

    /// A TCP acknowledgement frame carried an unknown kind byte.
    #[error("unknown ack kind: {0:#04x}")]
    UnknownAckKind(u8),

    /// Broadcasting an empty blob is rejected; RaptorQ cannot represent a
    /// zero-length source object.
    #[error("cannot broadcast an empty blob")]
    EmptyBlob,

    /// Encoder or decoder construction failed; the affected chunk is
    /// skipped (sender) or the symbol discarded (receiver).
    #[error("codec error: {0}")]
    Codec(String),

    /// A peer config line did not have the expected six columns.
    #[error("config line {line}: expected 6 columns, found {found}")]
    ConfigColumns {
        /// 1-based line number.
        line: usize,
        /// Columns actually present.
        found: usize,
    },

    /// A peer config field failed to parse.
    #[error("config line {line}: invalid {field}: {value}")]
    ConfigField {
        /// 1-based line number.
        line: usize,
        /// Which column was malformed.
        field: &'static str,
        /// The offending text.
        value: String,
    },

    /// The config file did not contain exactly one `self` line.
    #[error("config must contain exactly one 'self' peer, found {0}")]
    SelfPeerCount(usize),

    /// The ack dialer exhausted its retry budget.
    #[error("ack dial to {addr} failed after {attempts} attempts")]
    AckRetriesExhausted {
        /// The sender's TCP address.
        addr: std::net::SocketAddr,
        /// How many dials were attempted.
        attempts: u32,
    },
}

/// Convenience result type for broadcast engine operations.
pub type Result<T> = std::result::Result<T, BroadcastError>;
