//! E2E: 3-node full mesh, multi-chunk blob.
//!
//! A 3000-byte blob over 1024-byte chunks gives three chunks with a
//! 952-byte tail.  Both receivers decode all three chunks and ack each
//! one; the counters reach the quorum of 2 and every producer is
//! cancelled before the time bound.  Each receiver reassembles the exact
//! original bytes and dumps them to its received directory.

use {fountaincast_e2e_tests::helpers::*, std::time::Duration};

#[tokio::test]
async fn test_full_mesh_broadcast_reaches_quorum() {
    init_logging();
    let config = quiet_sweeper_config();
    let nodes = start_cluster(&[vec![1, 2], vec![0, 2], vec![0, 1]], &config).await;

    let blob = patterned_blob(3_000);
    let handle = nodes[0].broadcast(blob.clone()).unwrap();
    assert_eq!(handle.num_chunks(), 3);
    let hash = handle.root_hash();

    let summary = nodes[0].stop_broadcast(handle).await;
    assert!(summary.all_acked(), "unfinished: {:?}", summary.unfinished);
    assert_eq!(summary.per_chunk_elapsed.len(), 3);
    for chunk_id in 0..3 {
        assert!(
            nodes[0].decoded_count(&hash, chunk_id) >= 2,
            "chunk {chunk_id} below quorum",
        );
    }

    for node in &nodes[1..] {
        assert!(blob_complete(node, &hash));

        // The dump is written by a background task; give it a moment.
        let dir = node.config().received_dir.clone();
        assert!(
            wait_until(Duration::from_secs(2), || {
                std::fs::read_dir(&dir)
                    .map(|mut entries| entries.next().is_some())
                    .unwrap_or(false)
            })
            .await,
            "no dump in {}",
            dir.display(),
        );

        let entry = std::fs::read_dir(&dir).unwrap().next().unwrap().unwrap();
        let name = entry.file_name().into_string().unwrap();
        assert!(name.starts_with("0_"), "dump named by sender id: {name}");
        assert_eq!(std::fs::read(entry.path()).unwrap(), blob);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
