//! Key-value client subsystem.
//!
//! # Data Flow
//! ```text
//! Cmdable helper (get/set/...) builds a Cmd (command.rs)
//!     → client.rs (bound Context + Hooks)
//!     → hooks.rs (before-steps, in order)
//!     → executor.rs (transport, raced against ctx.done())
//!     → hooks.rs (after-steps, reverse order)
//!     → reply or KvError (error.rs)
//! ```
//!
//! # Design Decisions
//! - Transport is behind `Executor`; `memory.rs` is the in-process one
//! - Options are immutable once a client is built (options.rs)
//! - Single-node, cluster and ring clients share one core

pub mod client;
pub mod command;
pub mod error;
pub mod executor;
pub mod hooks;
pub mod memory;
pub mod options;

pub use client::{Client, ClusterClient, Cmdable, Ring, Topology, UniversalClient};
pub use command::{Cmd, Value};
pub use error::{KvError, KvResult};
pub use executor::Executor;
pub use hooks::{Hook, Hooks};
pub use memory::MemoryExecutor;
pub use options::{ClusterOptions, Options, RingOptions};
