//! Distributed-tracing instrumentation for key-value store clients.
//!
//! Wrap a single-node, cluster or ring client with [`wrap_client`] and every
//! command or pipeline it runs is bracketed by a client span carrying
//! `db.type`, `db.instance`, `peer.address`, `peer.service`, `span.kind` and
//! `db.statement`. Spans whose calling context was cancelled get an `error`
//! log record before they finish.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use kvtrace::{wrap_client, Client, Cmdable, Context, MemoryExecutor, Options, TracingTracer};
//!
//! let client = Client::new(Options::default(), Arc::new(MemoryExecutor::new()));
//! let ctx = Context::background();
//! let traced = wrap_client(Some(&ctx), Some(Box::new(client)), Arc::new(TracingTracer::new()))?;
//! traced.set("greeting", "hello").await?;
//! ```

pub mod config;
pub mod context;
pub mod instrument;
pub mod kv;
pub mod observability;

pub use config::{load_config, KvTraceConfig};
pub use context::{CancelHandle, Context, ContextError};
pub use instrument::{wrap_client, HookConfig, TracingHook, WrapError, WrappedClient};
pub use kv::{
    Client, ClusterClient, ClusterOptions, Cmd, Cmdable, KvError, MemoryExecutor, Options, Ring,
    RingOptions, Topology, UniversalClient,
};
pub use observability::{MockTracer, Tracer, TracingTracer};
