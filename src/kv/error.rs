//! Key-value client errors.

use thiserror::Error;

use crate::context::ContextError;

/// Errors surfaced by a key-value command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum KvError {
    /// The calling context was cancelled or its deadline passed.
    #[error(transparent)]
    Context(#[from] ContextError),

    /// The store answered with an error reply.
    #[error("{0}")]
    Reply(String),

    /// A registered hook refused the command.
    #[error("hook error: {0}")]
    Hook(String),

    /// The reply had an unexpected shape for the helper that asked for it.
    #[error("unexpected reply: {0}")]
    UnexpectedReply(String),
}

/// Result type for key-value operations.
pub type KvResult<T> = Result<T, KvError>;
