//! Topology-file → per-node config generator.
//!
//! An ops helper for standing up local clusters.  The input file's first
//! line is the node count `n`; every following line is an adjacency row
//! `i j1 j2 …` naming node `i`'s direct neighbors.  The generator emits:
//!
//! - `config_allpeers.txt` — every node with role `all`, for merging into
//!   each node's full peer set;
//! - `config_i.txt` per adjacency row — node `i` as `self` plus its
//!   neighbors.
//!
//! UDP ports start at 10000 and TCP ports at 20000, both offset by the
//! node index.  Public keys are 20 random bytes, hex-encoded.

use {
    crate::{
        error::{BroadcastError, Result},
        peer::PUBKEY_SIZE,
    },
    log::info,
    rand::RngCore,
    std::{fmt::Write as _, fs, path::Path},
};

/// First UDP port handed out; node `i` gets `UDP_PORT_BASE + i`.
const UDP_PORT_BASE: u16 = 10_000;

/// First TCP port handed out; node `i` gets `TCP_PORT_BASE + i`.
const TCP_PORT_BASE: u16 = 20_000;

/// Largest supported cluster — keeps the two port ranges disjoint.
const MAX_NODES: usize = (TCP_PORT_BASE - UDP_PORT_BASE) as usize;

struct NodeEntry {
    sid: usize,
    tcp_port: u16,
    udp_port: u16,
    pubkey: [u8; PUBKEY_SIZE],
}

impl NodeEntry {
    fn config_line(&self, role: &str) -> String {
        format!(
            "{} 127.0.0.1 {} {} {} {role}\n",
            self.sid,
            self.tcp_port,
            self.udp_port,
            hex::encode(self.pubkey),
        )
    }
}

/// Generate config files for the topology in `graph_file` into `out_dir`.
pub fn generate_configs(graph_file: impl AsRef<Path>, out_dir: impl AsRef<Path>) -> Result<()> {
    let text = fs::read_to_string(graph_file)?;
    let out_dir = out_dir.as_ref();
    let mut lines = text.lines().enumerate();

    let count_field = |value: &str| BroadcastError::ConfigField {
        line: 1,
        field: "node count",
        value: value.to_string(),
    };
    let n: usize = match lines.next() {
        Some((_, first)) => first.trim().parse().map_err(|_| count_field(first))?,
        None => return Err(count_field("")),
    };
    if n == 0 || n > MAX_NODES {
        return Err(count_field(&n.to_string()));
    }

    let mut rng = rand::rng();
    let nodes: Vec<NodeEntry> = (0..n)
        .map(|sid| {
            let mut pubkey = [0u8; PUBKEY_SIZE];
            rng.fill_bytes(&mut pubkey);
            NodeEntry {
                sid,
                tcp_port: TCP_PORT_BASE + sid as u16,
                udp_port: UDP_PORT_BASE + sid as u16,
                pubkey,
            }
        })
        .collect();

    fs::create_dir_all(out_dir)?;

    let mut all = String::new();
    for node in &nodes {
        let _ = write!(all, "{}", node.config_line("all"));
    }
    fs::write(out_dir.join("config_allpeers.txt"), all)?;

    for (idx, line) in lines {
        if line.trim().is_empty() {
            continue;
        }
        let line_no = idx + 1;
        let columns: Vec<&str> = line.split_whitespace().collect();
        let node_index = |value: &str| BroadcastError::ConfigField {
            line: line_no,
            field: "node index",
            value: value.to_string(),
        };
        let sid: usize = columns[0].parse().map_err(|_| node_index(columns[0]))?;
        if sid >= n {
            return Err(node_index(columns[0]));
        }

        let mut config = nodes[sid].config_line("self");
        for neighbor in &columns[1..] {
            let j: usize = neighbor.parse().map_err(|_| node_index(neighbor))?;
            if j >= n {
                return Err(node_index(neighbor));
            }
            let _ = write!(config, "{}", nodes[j].config_line("neighbor"));
        }
        fs::write(out_dir.join(format!("config_{sid}.txt")), config)?;
    }

    info!("wrote configs for {n} nodes to {}", out_dir.display());
    Ok(())
}
