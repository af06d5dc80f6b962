//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! instrument::hook
//!     → tracer.rs (Tracer / Span traits, context helpers)
//!     → one backend:
//!         - bridge.rs (spans through the `tracing` crate)
//!         - mock.rs (in-memory recorder for tests and span dumps)
//!
//! Binary only:
//!     → logging.rs (tracing-subscriber setup)
//! ```
//!
//! # Design Decisions
//! - Backends are injected; there is no global tracer
//! - Span identity travels inside `Context`, so concurrent calls never share it
//! - Sampling is left to the backend

pub mod bridge;
pub mod logging;
pub mod mock;
pub mod tracer;

pub use bridge::TracingTracer;
pub use mock::MockTracer;
pub use tracer::{Span, SpanRef, Tracer};
