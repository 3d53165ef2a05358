//! E2E: acknowledgement dial retry.
//!
//! The sender's TCP port stays closed until well after the receiver has
//! decoded; the receiver's ack dialer must keep retrying under its backoff
//! and land the ack once the listener appears.

use {fountaincast_e2e_tests::helpers::*, std::time::Duration};

#[tokio::test]
async fn test_ack_dial_retries_until_sender_listens() {
    init_logging();
    let mut config = quiet_sweeper_config();
    config.stop_broadcast_secs = 10;

    let nodes = cluster_nodes(&[vec![1], vec![0]], &config).await;
    let sender = nodes[0].clone();
    let receiver = nodes[1].clone();

    // Only the receiver comes up; the sender broadcasts without its ack
    // listener, so every dial is refused.
    receiver.start().await.unwrap();
    let handle = sender.broadcast(patterned_blob(100)).unwrap();
    let hash = handle.root_hash();

    assert!(
        wait_until(Duration::from_secs(3), || blob_complete(&receiver, &hash)).await,
        "receiver never decoded",
    );

    // Keep the port closed through the first retry.
    tokio::time::sleep(Duration::from_secs(2)).await;
    assert_eq!(sender.decoded_count(&hash, 0), 0);

    // Listener up: a later attempt within the retry budget must land.
    sender.start().await.unwrap();
    let summary = sender.stop_broadcast(handle).await;
    assert!(summary.all_acked(), "ack never landed: {summary:?}");
    assert!(sender.decoded_count(&hash, 0) >= 1);
}
