//! Key-value client instrumentation.
//!
//! # Data Flow
//! ```text
//! caller: wrap_client(ctx, client, tracer)       (adapter.rs)
//!     → narrow to Topology (single / cluster / ring)
//!     → rebind to ctx, derive HookConfig
//!     → register TracingHook                      (hook.rs)
//!
//! every command / pipeline:
//!     TracingHook::before_process*  → span started, tagged, put in ctx
//!     executor runs
//!     TracingHook::after_process*   → context error logged, span finished
//! ```

pub mod adapter;
pub mod error;
pub mod hook;

pub use adapter::{wrap_client, WrappedClient};
pub use error::WrapError;
pub use hook::{HookConfig, TracingHook};
