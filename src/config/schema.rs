//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML files and
//! every field has a default, so an empty file is a valid configuration.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::kv::client::{Client, ClusterClient, Ring, UniversalClient};
use crate::kv::executor::Executor;
use crate::kv::options::{ClusterOptions, Options, RingOptions, DEFAULT_ADDR};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct KvTraceConfig {
    /// Which client to build and where it points.
    pub client: ClientConfig,

    /// Log output settings for the binary.
    pub logging: LoggingConfig,
}

/// Client topology selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ClientMode {
    /// Ring if shards are set, cluster if more than one address, else single.
    #[default]
    Auto,
    Single,
    Cluster,
    Ring,
}

impl std::fmt::Display for ClientMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ClientMode::Auto => "auto",
            ClientMode::Single => "single",
            ClientMode::Cluster => "cluster",
            ClientMode::Ring => "ring",
        };
        f.write_str(name)
    }
}

/// Client configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ClientConfig {
    pub mode: ClientMode,

    /// Node addresses (single: at most one; cluster: seed nodes).
    pub addrs: Vec<String>,

    /// Ring shards, shard name → address.
    pub shards: BTreeMap<String, String>,

    /// Logical database index. Not allowed for clusters.
    pub db: Option<u32>,
}

impl ClientConfig {
    /// The concrete mode after resolving `Auto`.
    pub fn resolved_mode(&self) -> ClientMode {
        match self.mode {
            ClientMode::Auto if !self.shards.is_empty() => ClientMode::Ring,
            ClientMode::Auto if self.addrs.len() > 1 => ClientMode::Cluster,
            ClientMode::Auto => ClientMode::Single,
            mode => mode,
        }
    }

    /// Build the client this configuration describes on top of `executor`.
    pub fn build(&self, executor: Arc<dyn Executor>) -> Box<dyn UniversalClient> {
        let db = self.db.unwrap_or(0);
        match self.resolved_mode() {
            ClientMode::Cluster => Box::new(ClusterClient::new(
                ClusterOptions {
                    addrs: self.addrs.clone(),
                },
                executor,
            )),
            ClientMode::Ring => Box::new(Ring::new(
                RingOptions {
                    addrs: self.shards.clone(),
                    db,
                },
                executor,
            )),
            ClientMode::Single | ClientMode::Auto => Box::new(Client::new(
                Options {
                    addr: self
                        .addrs
                        .first()
                        .cloned()
                        .unwrap_or_else(|| DEFAULT_ADDR.to_string()),
                    db,
                },
                executor,
            )),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive (e.g. "info" or "kvtrace=debug"). `RUST_LOG` overrides it.
    pub level: String,

    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::memory::MemoryExecutor;

    fn config(addrs: &[&str], shards: &[(&str, &str)]) -> ClientConfig {
        ClientConfig {
            addrs: addrs.iter().map(|a| a.to_string()).collect(),
            shards: shards
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            ..Default::default()
        }
    }

    #[test]
    fn test_auto_mode_resolution() {
        assert_eq!(config(&[], &[]).resolved_mode(), ClientMode::Single);
        assert_eq!(config(&["a:1"], &[]).resolved_mode(), ClientMode::Single);
        assert_eq!(config(&["a:1", "b:1"], &[]).resolved_mode(), ClientMode::Cluster);
        assert_eq!(config(&[], &[("s1", "a:1")]).resolved_mode(), ClientMode::Ring);
    }

    #[test]
    fn test_explicit_mode_wins() {
        let mut cfg = config(&["a:1"], &[]);
        cfg.mode = ClientMode::Cluster;
        assert_eq!(cfg.resolved_mode(), ClientMode::Cluster);
    }

    #[test]
    fn test_build_each_topology() {
        let executor = Arc::new(MemoryExecutor::new());

        let single = config(&[], &[]).build(executor.clone());
        assert_eq!(single.into_topology().unwrap().name(), "single");

        let cluster = config(&["a:1", "b:1"], &[]).build(executor.clone());
        assert_eq!(cluster.into_topology().unwrap().name(), "cluster");

        let ring = config(&[], &[("s1", "a:1")]).build(executor);
        assert_eq!(ring.into_topology().unwrap().name(), "ring");
    }

    #[test]
    fn test_defaults() {
        let cfg = KvTraceConfig::default();
        assert_eq!(cfg.client.mode, ClientMode::Auto);
        assert_eq!(cfg.logging.level, "info");
        assert_eq!(cfg.logging.format, LogFormat::Pretty);
    }
}
