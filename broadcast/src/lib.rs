//! Cooperative FEC Broadcast Engine
//!
//! This crate disseminates a byte blob from one designated sender to every
//! peer in a small static cluster.  The blob is split into fixed-size chunks,
//! each chunk is RaptorQ-encoded, and encoded symbols are pushed over UDP
//! under an exponential-backoff pacing.  Receivers opportunistically relay
//! fresh symbols to their neighbors, decode each chunk incrementally, and
//! acknowledge decoded chunks to the sender over TCP so it can stop
//! transmitting once a quorum of peers has the data.
//!
//! ## Architecture
//!
//! ```text
//!  sender                               each receiver
//!  ┌─────────────────────┐             ┌──────────────────────────┐
//!  │ broadcast()         │  UDP        │ receiver loop            │
//!  │  per-chunk producer ├────────────▶│  dedup → decoder         │
//!  │  (backoff pacing)   │  symbols    │        └─▶ relay to      │
//!  │                     │             │            neighbors     │
//!  │ stop_broadcast()    │             │                          │
//!  │  quorum supervisor  │◀────────────┤ ack client (on decode)   │
//!  └─────────────────────┘  TCP acks   └──────────────────────────┘
//! ```
//!
//! ## Crate modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`]   | Engine tunables and deployment constants |
//! | [`error`]    | Crate-wide error enum |
//! | [`packet`]   | Wire frames: UDP symbol packet, TCP ack frame |
//! | [`backoff`]  | Exponential per-symbol delay schedule |
//! | [`fec`]      | RaptorQ chunk encoder / decoder wrappers |
//! | [`peer`]     | Peer identity and config-file loading |
//! | [`cache`]    | Per-blob state and the timed eviction sweeper |
//! | [`sender`]   | Chunked symbol production and quorum supervision |
//! | [`relay`]    | Hop-bounded symbol forwarding |
//! | [`receiver`] | UDP receive loop and decode-success handling |
//! | [`ack`]      | TCP acknowledgement server and retrying client |
//! | [`node`]     | Composition root owning sockets and shared state |
//! | [`graph`]    | Topology-file → per-node config generator |

pub mod ack;
pub mod backoff;
pub mod cache;
pub mod config;
pub mod error;
pub mod fec;
pub mod graph;
pub mod node;
pub mod packet;
pub mod peer;
pub mod receiver;
pub mod relay;
pub mod sender;

pub use {
    config::EngineConfig,
    error::{BroadcastError, Result},
    node::Node,
    peer::{Peer, PeerSet},
    sender::{BroadcastHandle, BroadcastSummary},
};
