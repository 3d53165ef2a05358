//! E2E: gossip robustness — duplicate suppression and hop bounding.
//!
//! A duplicate storm of one symbol must produce exactly one relay and one
//! decoder feed; the hop byte must stop the flood at the configured depth.

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
async fn test_duplicate_symbol_storm_relays_and_feeds_once() {
    init_logging();
    let config = quiet_sweeper_config();

    // One real node whose only neighbor is an observation socket, so every
    // relayed datagram can be counted.
    let observer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let node_udp = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    let node_addr = node_udp.local_addr().unwrap();

    let loopback = "127.0.0.1".parse().unwrap();
    let self_peer = Peer {
        sid: 1,
        ip: loopback,
        tcp_port: reserve_tcp_port(),
        udp_port: node_addr.port(),
        pubkey: [1; 20],
    };
    let phantom = Peer {
        sid: 9,
        ip: loopback,
        tcp_port: reserve_tcp_port(),
        udp_port: observer.local_addr().unwrap().port(),
        pubkey: [9; 20],
    };
    let node = Node::from_socket(
        PeerSet {
            self_peer: self_peer.clone(),
            peer_list: vec![phantom.clone()],
            all_peers: vec![self_peer, phantom],
        },
        config.clone(),
        node_udp,
    );
    node.start().await.unwrap();

    // One valid symbol of a chunk that needs eight, stormed 1000 times.
    let chunk = patterned_blob(500);
    let encoder = ChunkEncoder::new(&chunk, config.symbol_size).unwrap();
    let (symbol_id, symbol) = encoder.symbol(0);
    let hash = [0x5c; 20];
    let frame = SymbolPacket {
        root_hash: hash,
        hop: 1,
        sender_id: 9,
        num_chunks: 1,
        chunk_id: 0,
        chunk_len: 500,
        symbol_id,
        symbol,
    }
    .encode();

    let injector = UdpSocket::bind("127.0.0.1:0").await.unwrap();
    for _ in 0..1_000 {
        injector.send_to(&frame, node_addr).await.unwrap();
    }

    // Exactly one relay, hop decremented to zero.
    let mut buf = vec![0u8; config.udp_cache_size];
    let (len, _) = tokio::time::timeout(Duration::from_secs(2), observer.recv_from(&mut buf))
        .await
        .expect("first relay never arrived")
        .unwrap();
    let relayed = SymbolPacket::decode(&buf[..len], config.symbol_size).unwrap();
    assert_eq!(relayed.root_hash, hash);
    assert_eq!(relayed.symbol_id, symbol_id);
    assert_eq!(relayed.hop, 0);

    assert!(
        tokio::time::timeout(Duration::from_millis(500), observer.recv_from(&mut buf))
            .await
            .is_err(),
        "duplicate was relayed",
    );

    // The decoder saw the symbol once and is still waiting for more.
    let state = node.cache().get(&hash).expect("blob state exists");
    let state = state.lock().unwrap();
    assert_eq!(state.received_symbols.get(&0).map(|s| s.len()), Some(1));
    assert!(!state.decoders[&0].is_ready());
}

#[tokio::test]
async fn test_hop_one_never_reaches_third_hop() {
    init_logging();
    let mut config = quiet_sweeper_config();
    config.hop = 1;
    config.stop_broadcast_secs = 5;

    // Line A–B–C–D.
    let nodes = start_cluster(&[vec![1], vec![0, 2], vec![1, 3], vec![2]], &config).await;
    let handle = nodes[0].broadcast(patterned_blob(200)).unwrap();
    let hash = handle.root_hash();
    let origin = nodes[0].clone();
    tokio::spawn(async move { origin.stop_broadcast(handle).await });

    // C hears B's hop-0 relays and decodes...
    assert!(
        wait_until(Duration::from_secs(3), || blob_complete(&nodes[2], &hash)).await,
        "C never decoded",
    );
    // ...but drops them without forwarding, so D never sees a symbol.
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert!(nodes[3].cache().get(&hash).is_none());
}

#[tokio::test]
async fn test_hop_two_reaches_third_hop() {
    init_logging();
    let mut config = quiet_sweeper_config();
    config.hop = 2;
    config.stop_broadcast_secs = 5;

    let nodes = start_cluster(&[vec![1], vec![0, 2], vec![1, 3], vec![2]], &config).await;
    let handle = nodes[0].broadcast(patterned_blob(300)).unwrap();
    let hash = handle.root_hash();
    let origin = nodes[0].clone();
    tokio::spawn(async move { origin.stop_broadcast(handle).await });

    assert!(
        wait_until(Duration::from_secs(5), || blob_complete(&nodes[3], &hash)).await,
        "D never decoded with hop 2",
    );
}
