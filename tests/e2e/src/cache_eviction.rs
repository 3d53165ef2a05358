//! E2E: cache lifecycle on live nodes.
//!
//! A decoded blob is released one sweep interval after completion; a blob
//! that never completes is force-evicted once it outlives the hard bound.

use {
    fountaincast_broadcast::{
        fec::ChunkEncoder,
        packet::SymbolPacket,
        Node, Peer, PeerSet,
    },
    fountaincast_e2e_tests::helpers::*,
    std::time::Duration,
    tokio::net::UdpSocket,
};

#[tokio::test]
async fn test_decoded_blob_swept_after_clear_interval() {
    init_logging();
    let mut config = quiet_sweeper_config();
    config.cache_clear_interval_secs = 1;
    config.enforce_clear_interval_secs = 30;
    config.stop_broadcast_secs = 5;

    let nodes = start_cluster(&[vec![1], vec![0]], &config).await;
    let handle = nodes[0].broadcast(patterned_blob(100)).unwrap();
    let hash = handle.root_hash();
    let origin = nodes[0].clone();
    tokio::spawn(async move { origin.stop_broadcast(handle).await });

    assert!(
        wait_until(Duration::from_secs(2), || blob_complete(&nodes[1], &hash)).await,
        "receiver never decoded",
    );

    // Completion plus one retention window plus one sweep: entry gone.
    assert!(
        wait_until(Duration::from_secs(4), || {
            nodes[1].cache().get(&hash).is_none()
        })
        .await,
        "decoded blob survived the sweeper",
    );
}

#[tokio::test]
async fn test_stalled_blob_force_evicted() {
    init_logging();
    let mut config = quiet_sweeper_config();
    config.cache_clear_interval_secs = 1;
    config.enforce_clear_interval_secs = 2;

    // A lone receiver with no neighbors; symbols are injected raw.
    let node_udp = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let node_addr = node_udp.local_addr().unwrap();
    let self_peer = Peer {
        sid: 1,
        ip: "127.0.0.1".parse().unwrap(),
        tcp_port: reserve_tcp_port(),
        udp_port: node_addr.port(),
        pubkey: [1; 20],
    };
    let node = Node::from_socket(
        PeerSet {
            self_peer: self_peer.clone(),
            peer_list: vec![],
            all_peers: vec![self_peer],
        },
        config.clone(),
        node_udp,
    );
    node.start().await.unwrap();

    // One symbol of a chunk that needs eight: the decode can never finish.
    let chunk = patterned_blob(500);
    let encoder = ChunkEncoder::new(&chunk, config.symbol_size).unwrap();
    let (symbol_id, symbol) = encoder.symbol(0);
    let hash = [0xe7; 20];
    let frame = SymbolPacket {
        root_hash: hash,
        hop: 0,
        sender_id: 7,
        num_chunks: 1,
        chunk_id: 0,
        chunk_len: 500,
        symbol_id,
        symbol,
    }
    .encode();

    let injector = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    injector.send_to(&frame, node_addr).await.unwrap();

    assert!(
        wait_until(Duration::from_secs(1), || node.cache().get(&hash).is_some()).await,
        "symbol never admitted",
    );

    // Still incomplete when the hard bound lapses: swept anyway.
    assert!(
        wait_until(Duration::from_secs(5), || node.cache().get(&hash).is_none()).await,
        "stalled blob survived the hard bound",
    );
}
