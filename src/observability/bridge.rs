//! `Tracer` backed by the `tracing` crate.
//!
//! Spans become `tracing` spans with the key-value tag set declared as
//! fields, so any subscriber layer (fmt, json, an OpenTelemetry layer) sees
//! them. Log records become events parented to the span.

use std::any::Any;
use std::sync::Mutex;

use tracing::field::Empty;
use tracing::Span as TracingSpanHandle;

use crate::instrument::hook::{CMD_SPAN, PIPELINE_SPAN};
use crate::observability::tracer::{LogField, Span, SpanRef, Tracer, LOG_ERROR};

/// Tracer that emits `tracing` spans.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingTracer;

impl TracingTracer {
    pub fn new() -> Self {
        Self
    }
}

impl Tracer for TracingTracer {
    fn start_span(&self, operation: &str, parent: Option<&SpanRef>) -> SpanRef {
        let parent = parent
            .and_then(|p| p.as_any().downcast_ref::<TracingSpan>())
            .and_then(TracingSpan::handle);

        // Span names are static metadata, so the known operations get their own callsite.
        let span = match operation {
            CMD_SPAN => tracing::info_span!(
                parent: parent.as_ref().and_then(TracingSpanHandle::id),
                "redis:cmd",
                "db.type" = Empty,
                "db.instance" = Empty,
                "db.statement" = Empty,
                "peer.address" = Empty,
                "peer.service" = Empty,
                "span.kind" = Empty
            ),
            PIPELINE_SPAN => tracing::info_span!(
                parent: parent.as_ref().and_then(TracingSpanHandle::id),
                "redis:pipeline:cmd",
                "db.type" = Empty,
                "db.instance" = Empty,
                "db.statement" = Empty,
                "peer.address" = Empty,
                "peer.service" = Empty,
                "span.kind" = Empty
            ),
            other => tracing::info_span!(
                parent: parent.as_ref().and_then(TracingSpanHandle::id),
                "kv.span",
                "otel.name" = other,
                "db.type" = Empty,
                "db.instance" = Empty,
                "db.statement" = Empty,
                "peer.address" = Empty,
                "peer.service" = Empty,
                "span.kind" = Empty
            ),
        };

        std::sync::Arc::new(TracingSpan {
            inner: Mutex::new(Some(span)),
        })
    }
}

/// A live `tracing` span. Finishing drops the handle, which closes the span.
#[derive(Debug)]
pub struct TracingSpan {
    inner: Mutex<Option<TracingSpanHandle>>,
}

impl TracingSpan {
    /// The underlying `tracing` span, or `None` once finished.
    pub fn handle(&self) -> Option<TracingSpanHandle> {
        self.inner
            .lock()
            .ok()
            .and_then(|guard| guard.as_ref().cloned())
    }
}

impl Span for TracingSpan {
    fn set_tag(&self, key: &str, value: &str) {
        if let Some(span) = self.handle() {
            // Keys outside the declared field set are ignored by `tracing`.
            span.record(key, value);
        }
    }

    fn log_fields(&self, fields: &[LogField]) {
        let Some(span) = self.handle() else {
            return;
        };
        for field in fields {
            if field.key == LOG_ERROR {
                tracing::error!(parent: &span, error = %field.value, "span log");
            } else {
                tracing::info!(parent: &span, key = %field.key, value = %field.value, "span log");
            }
        }
    }

    fn finish(&self) {
        if let Ok(mut guard) = self.inner.lock() {
            guard.take();
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
