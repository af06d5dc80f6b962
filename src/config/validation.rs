//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Check that addresses fit the selected topology
//! - Validate the log filter directive
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: KvTraceConfig → Result<(), Vec<ValidationError>>

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::schema::{ClientConfig, ClientMode, KvTraceConfig};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{mode} mode needs at least one address")]
    MissingAddresses { mode: ClientMode },

    #[error("single mode takes one address, got {count}")]
    TooManyAddresses { count: usize },

    #[error("address #{index} is blank")]
    BlankAddress { index: usize },

    #[error("shard '{shard}' has a blank name or address")]
    BlankShard { shard: String },

    #[error("shards are only used in ring mode, not {mode}")]
    UnexpectedShards { mode: ClientMode },

    #[error("ring mode takes shards, not addrs")]
    UnexpectedAddrs,

    #[error("cluster mode has no logical database; remove db")]
    ClusterDatabase,

    #[error("invalid log filter '{0}'")]
    InvalidLogFilter(String),
}

/// Validate the whole configuration.
pub fn validate_config(config: &KvTraceConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = validate_client(&config.client);

    if EnvFilter::try_new(&config.logging.level).is_err() {
        errors.push(ValidationError::InvalidLogFilter(config.logging.level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn validate_client(client: &ClientConfig) -> Vec<ValidationError> {
    let mut errors = Vec::new();
    let mode = client.resolved_mode();

    for (index, addr) in client.addrs.iter().enumerate() {
        if addr.trim().is_empty() {
            errors.push(ValidationError::BlankAddress { index });
        }
    }

    match mode {
        ClientMode::Single | ClientMode::Auto => {
            if client.addrs.len() > 1 {
                errors.push(ValidationError::TooManyAddresses {
                    count: client.addrs.len(),
                });
            }
        }
        ClientMode::Cluster => {
            if client.addrs.is_empty() {
                errors.push(ValidationError::MissingAddresses { mode });
            }
            if client.db.is_some() {
                errors.push(ValidationError::ClusterDatabase);
            }
        }
        ClientMode::Ring => {
            if client.shards.is_empty() {
                errors.push(ValidationError::MissingAddresses { mode });
            }
            if !client.addrs.is_empty() {
                errors.push(ValidationError::UnexpectedAddrs);
            }
        }
    }

    if mode == ClientMode::Ring {
        for (shard, addr) in &client.shards {
            if shard.trim().is_empty() || addr.trim().is_empty() {
                errors.push(ValidationError::BlankShard {
                    shard: shard.clone(),
                });
            }
        }
    } else if !client.shards.is_empty() {
        errors.push(ValidationError::UnexpectedShards { mode });
    }

    errors
}
