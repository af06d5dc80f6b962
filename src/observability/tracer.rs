//! Tracer abstraction the instrumentation hook talks to.
//!
//! # Responsibilities
//! - Start spans as children of the span carried by a `Context`
//! - Set string tags and attach log records
//! - Finish spans
//!
//! # Design Decisions
//! - The tracer is injected, never looked up from process-wide state
//! - The current span is found only through `Context::span`
//! - Backends downcast parents through `Span::as_any`

use std::any::Any;
use std::sync::Arc;

use serde::Serialize;

use crate::context::Context;

/// Database system, e.g. "redis".
pub const DB_TYPE: &str = "db.type";
/// Logical database index.
pub const DB_INSTANCE: &str = "db.instance";
/// Command or pipeline statement.
pub const DB_STATEMENT: &str = "db.statement";
/// Remote addresses, comma separated.
pub const PEER_ADDRESS: &str = "peer.address";
/// Remote service name.
pub const PEER_SERVICE: &str = "peer.service";
/// "client" or "server".
pub const SPAN_KIND: &str = "span.kind";

pub const SPAN_KIND_CLIENT: &str = "client";

/// Log field key used to report a done context.
pub const LOG_ERROR: &str = "error";

/// One key/value pair inside a span log record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogField {
    pub key: String,
    pub value: String,
}

impl LogField {
    pub fn string(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A timed unit of work owned by a tracing backend.
pub trait Span: Send + Sync {
    fn set_tag(&self, key: &str, value: &str);

    /// Attach one log record made of `fields`, timestamped now.
    fn log_fields(&self, fields: &[LogField]);

    fn finish(&self);

    fn as_any(&self) -> &dyn Any;
}

/// Shared handle to a live span.
pub type SpanRef = Arc<dyn Span>;

/// Creates spans.
pub trait Tracer: Send + Sync {
    /// Start a span named `operation`, child of `parent` or a root span.
    fn start_span(&self, operation: &str, parent: Option<&SpanRef>) -> SpanRef;
}

/// Start a span under the context's current span and return a context carrying it.
pub fn start_span_from_context(
    tracer: &dyn Tracer,
    ctx: &Context,
    operation: &str,
) -> (SpanRef, Context) {
    let span = tracer.start_span(operation, ctx.span());
    let ctx = ctx.with_span(span.clone());
    (span, ctx)
}

/// The context's current span, if any.
pub fn span_from_context(ctx: &Context) -> Option<SpanRef> {
    ctx.span().cloned()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::mock::{MockSpan, MockTracer};

    #[test]
    fn test_start_span_from_context_links_parent() {
        let tracer = MockTracer::new();
        let (root, ctx) = start_span_from_context(&tracer, &Context::background(), "outer");
        let (child, child_ctx) = start_span_from_context(&tracer, &ctx, "inner");

        let root = root.as_any().downcast_ref::<MockSpan>().unwrap();
        let child = child.as_any().downcast_ref::<MockSpan>().unwrap();
        assert_eq!(root.parent_id(), None);
        assert_eq!(child.parent_id(), Some(root.span_id()));

        let current = span_from_context(&child_ctx).unwrap();
        let current = current.as_any().downcast_ref::<MockSpan>().unwrap();
        assert_eq!(current.span_id(), child.span_id());
    }

    #[test]
    fn test_span_from_empty_context() {
        assert!(span_from_context(&Context::background()).is_none());
    }
}
