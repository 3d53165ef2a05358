//! fountaincast End-to-End Test Suite
//!
//! Spins up multi-node clusters over real localhost UDP/TCP sockets and
//! exercises the full broadcast pipeline: chunked symbol production,
//! gossip relay, incremental decode, acknowledgement, quorum-driven
//! cancellation, and cache eviction.
//!
//! Each test file can be run independently:
//!
//! ```bash
//! cargo test -p fountaincast-e2e-tests --test line_topology -- --nocapture
//! cargo test -p fountaincast-e2e-tests --test full_mesh -- --nocapture
//! cargo test -p fountaincast-e2e-tests --test gossip_robustness -- --nocapture
//! cargo test -p fountaincast-e2e-tests --test cache_eviction -- --nocapture
//! cargo test -p fountaincast-e2e-tests --test ack_retry -- --nocapture
//! ```

pub mod helpers;
