//! Connection options per topology.

use std::collections::BTreeMap;

/// Address used when none is configured.
pub const DEFAULT_ADDR: &str = "localhost:6379";

/// Options for a single-node client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// `host:port` of the node.
    pub addr: String,
    /// Logical database index selected on connect.
    pub db: u32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            addr: DEFAULT_ADDR.to_string(),
            db: 0,
        }
    }
}

/// Options for a cluster client. Clusters have no logical database index.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterOptions {
    /// Seed nodes, in configured order.
    pub addrs: Vec<String>,
}

/// Options for a sharded ring.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RingOptions {
    /// Shard name → `host:port`. Ordered by shard name.
    pub addrs: BTreeMap<String, String>,
    /// Logical database index selected on every shard.
    pub db: u32,
}

impl RingOptions {
    /// Shard addresses flattened in shard-name order.
    pub fn addr_list(&self) -> Vec<String> {
        self.addrs.values().cloned().collect()
    }
}
