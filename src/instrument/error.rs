//! Factory errors.

use thiserror::Error;

/// Errors returned by `wrap_client`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WrapError {
    /// The context or the client was missing.
    #[error("invalid argument: {0}")]
    InvalidArgument(&'static str),

    /// The client is not a single-node, cluster or ring client.
    #[error("unsupported client topology")]
    UnsupportedTopology,
}
