//! E2E: 3-node line, small blob.
//!
//! A's only neighbor is B; B's only neighbor is A; C is known cluster-wide
//! but nobody forwards to it.  B decodes and acks, C never hears a symbol,
//! and with a quorum of 2 the broadcast runs out the clock and reports the
//! chunk unfinished.

use {fountaincast_e2e_tests::helpers::*, std::time::Duration};

#[tokio::test]
async fn test_line_topology_small_blob_partial_quorum() {
    init_logging();
    let mut config = quiet_sweeper_config();
    config.stop_broadcast_secs = 2;

    let nodes = start_cluster(&[vec![1], vec![0], vec![1]], &config).await;
    assert_eq!(nodes[0].ack_threshold(), 2);

    let blob = patterned_blob(100);
    let handle = nodes[0].broadcast(blob).unwrap();
    assert_eq!(handle.num_chunks(), 1);
    let hash = handle.root_hash();

    // B decodes almost immediately and its ack lands while the supervisor
    // is still polling.
    assert!(
        wait_until(Duration::from_secs(2), || blob_complete(&nodes[1], &hash)).await,
        "B never decoded",
    );

    let summary = nodes[0].stop_broadcast(handle).await;

    // One acker out of a quorum of two: the time bound expires.
    assert_eq!(nodes[0].decoded_count(&hash, 0), 1);
    assert!(!summary.all_acked());
    assert_eq!(summary.unfinished, vec![0]);
    assert!(summary.per_chunk_elapsed.is_empty());

    // C was never reachable: no symbol, no cache entry.
    assert!(nodes[2].cache().get(&hash).is_none());

    // B relayed back to A, but A never consumes its own broadcast: its
    // entry carries encoders only, no receive-side artifacts.
    let state = nodes[0].cache().get(&hash).expect("sender entry");
    let state = state.lock().unwrap();
    assert!(state.decoders.is_empty());
    assert!(state.received_symbols.is_empty());
}
