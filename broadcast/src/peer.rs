//! Peer identity and static cluster membership.
//!
//! Membership is fixed for the lifetime of a process.  Each node loads a
//! whitespace-separated config file with one peer per line:
//!
//! ```text
//! sid ip tcpPort udpPort pubKeyHex role
//! ```
//!
//! where `role` is `self` (exactly once), `neighbor` (direct forwarding
//! fan-out, also counted in the full peer set), or `all` (full peer set
//! only).  A second, shared file listing every node with role `all` can be
//! merged in so acks and quorum math see the whole cluster even when the
//! per-node file only names direct neighbors.

use {
    crate::error::{BroadcastError, Result},
    std::{
        net::{IpAddr, SocketAddr},
        path::Path,
    },
};

/// Length of a peer's public key in bytes.  The key is carried through the
/// config pipeline but not consumed by the broadcast core.
pub const PUBKEY_SIZE: usize = 20;

/// A cluster member, immutable after config load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Peer {
    /// Stable numeric identifier; fits in 16 bits on the wire.
    pub sid: u16,
    /// Network address of the peer.
    pub ip: IpAddr,
    /// Port for the acknowledgement channel.
    pub tcp_port: u16,
    /// Port symbols are delivered to.
    pub udp_port: u16,
    /// Opaque identity key.
    pub pubkey: [u8; PUBKEY_SIZE],
}

impl Peer {
    /// The address symbols are sent to.
    pub fn udp_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.udp_port)
    }

    /// The address acknowledgements are dialed to.
    pub fn tcp_addr(&self) -> SocketAddr {
        SocketAddr::new(self.ip, self.tcp_port)
    }
}

/// The local node's view of the cluster.
#[derive(Debug, Clone)]
pub struct PeerSet {
    /// The local peer.
    pub self_peer: Peer,
    /// Direct neighbors — the forwarding fan-out for broadcast and relay.
    pub peer_list: Vec<Peer>,
    /// Every known peer, the denominator of the ack quorum.  Includes the
    /// local peer when the merged membership file lists it.
    pub all_peers: Vec<Peer>,
}

impl PeerSet {
    /// Load a per-node config file.  Requires exactly one `self` line.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        Self::parse(&std::fs::read_to_string(path)?)
    }

    /// Parse config text; see the module docs for the line format.
    pub fn parse(text: &str) -> Result<Self> {
        let mut self_peers = Vec::new();
        let mut peer_list = Vec::new();
        let mut all_peers = Vec::new();

        for (idx, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let (peer, role) = parse_line(idx + 1, line)?;
            match role {
                "self" => self_peers.push(peer),
                "neighbor" => {
                    peer_list.push(peer.clone());
                    all_peers.push(peer);
                }
                "all" => all_peers.push(peer),
                other => {
                    return Err(BroadcastError::ConfigField {
                        line: idx + 1,
                        field: "role",
                        value: other.to_string(),
                    })
                }
            }
        }

        if self_peers.len() != 1 {
            return Err(BroadcastError::SelfPeerCount(self_peers.len()));
        }

        Ok(Self {
            self_peer: self_peers.remove(0),
            peer_list,
            all_peers,
        })
    }

    /// Merge a shared membership file (every node, role `all`) into
    /// `all_peers`.  Peers already known by sid are left untouched, so a
    /// neighbor entry is not duplicated.
    pub fn merge_membership(&mut self, path: impl AsRef<Path>) -> Result<()> {
        let text = std::fs::read_to_string(path)?;
        for (idx, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            let (peer, _role) = parse_line(idx + 1, line)?;
            if self.all_peers.iter().any(|p| p.sid == peer.sid) {
                continue;
            }
            if peer.sid == self.self_peer.sid {
                // The local node counts toward the quorum denominator.
                self.all_peers.push(self.self_peer.clone());
            } else {
                self.all_peers.push(peer);
            }
        }
        Ok(())
    }

    /// Look up any known peer (self included) by sid.
    pub fn find(&self, sid: u16) -> Option<&Peer> {
        if self.self_peer.sid == sid {
            return Some(&self.self_peer);
        }
        self.all_peers
            .iter()
            .chain(self.peer_list.iter())
            .find(|p| p.sid == sid)
    }
}

fn parse_line(line_no: usize, line: &str) -> Result<(Peer, &str)> {
    let columns: Vec<&str> = line.split_whitespace().collect();
    if columns.len() != 6 {
        return Err(BroadcastError::ConfigColumns {
            line: line_no,
            found: columns.len(),
        });
    }

    let field = |field: &'static str, value: &str| BroadcastError::ConfigField {
        line: line_no,
        field,
        value: value.to_string(),
    };

    let sid: u16 = columns[0].parse().map_err(|_| field("sid", columns[0]))?;
    let ip: IpAddr = columns[1].parse().map_err(|_| field("ip", columns[1]))?;
    let tcp_port: u16 = columns[2]
        .parse()
        .map_err(|_| field("tcpPort", columns[2]))?;
    let udp_port: u16 = columns[3]
        .parse()
        .map_err(|_| field("udpPort", columns[3]))?;

    let key_bytes = hex::decode(columns[4]).map_err(|_| field("pubKey", columns[4]))?;
    let pubkey: [u8; PUBKEY_SIZE] = key_bytes
        .try_into()
        .map_err(|_| field("pubKey", columns[4]))?;

    Ok((
        Peer {
            sid,
            ip,
            tcp_port,
            udp_port,
            pubkey,
        },
        columns[5],
    ))
}
