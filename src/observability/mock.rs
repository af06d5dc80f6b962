//! In-memory recording tracer.
//!
//! Keeps every span it starts so tests (and the `--dump-spans` mode of the
//! binary) can inspect tags, log records and timings after the fact.

use std::any::Any;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;

use crate::observability::tracer::{LogField, Span, SpanRef, Tracer};

/// A log record attached to a span.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogRecord {
    /// Microseconds since the Unix epoch.
    pub timestamp_us: u64,
    pub fields: Vec<LogField>,
}

#[derive(Debug, Default)]
struct MockSpanState {
    tags: BTreeMap<String, String>,
    logs: Vec<LogRecord>,
    finish_time: Option<SystemTime>,
    finish_count: usize,
}

/// A span recorded by `MockTracer`.
#[derive(Debug)]
pub struct MockSpan {
    span_id: u64,
    parent_id: Option<u64>,
    operation: String,
    start_time: SystemTime,
    state: Mutex<MockSpanState>,
}

impl MockSpan {
    pub fn span_id(&self) -> u64 {
        self.span_id
    }

    pub fn parent_id(&self) -> Option<u64> {
        self.parent_id
    }

    pub fn operation_name(&self) -> &str {
        &self.operation
    }

    pub fn start_time(&self) -> SystemTime {
        self.start_time
    }

    pub fn tags(&self) -> BTreeMap<String, String> {
        self.state().tags.clone()
    }

    pub fn tag(&self, key: &str) -> Option<String> {
        self.state().tags.get(key).cloned()
    }

    pub fn logs(&self) -> Vec<LogRecord> {
        self.state().logs.clone()
    }

    pub fn finish_time(&self) -> Option<SystemTime> {
        self.state().finish_time
    }

    /// How many times `finish` was called. Anything but 1 is a bug in the caller.
    pub fn finish_count(&self) -> usize {
        self.state().finish_count
    }

    /// Serializable copy of the span as it is right now.
    pub fn record(&self) -> SpanRecord {
        let state = self.state();
        SpanRecord {
            span_id: self.span_id,
            parent_id: self.parent_id,
            operation: self.operation.clone(),
            start_us: micros(self.start_time),
            finish_us: state.finish_time.map(micros),
            tags: state.tags.clone(),
            logs: state.logs.clone(),
        }
    }

    fn state(&self) -> std::sync::MutexGuard<'_, MockSpanState> {
        self.state.lock().expect("mock span mutex poisoned")
    }
}

impl Span for MockSpan {
    fn set_tag(&self, key: &str, value: &str) {
        self.state().tags.insert(key.to_string(), value.to_string());
    }

    fn log_fields(&self, fields: &[LogField]) {
        let record = LogRecord {
            timestamp_us: micros(SystemTime::now()),
            fields: fields.to_vec(),
        };
        self.state().logs.push(record);
    }

    fn finish(&self) {
        let mut state = self.state();
        state.finish_count += 1;
        if state.finish_time.is_none() {
            state.finish_time = Some(SystemTime::now());
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

/// Snapshot of a `MockSpan`, ready for JSON output.
#[derive(Debug, Clone, Serialize)]
pub struct SpanRecord {
    pub span_id: u64,
    pub parent_id: Option<u64>,
    pub operation: String,
    pub start_us: u64,
    pub finish_us: Option<u64>,
    pub tags: BTreeMap<String, String>,
    pub logs: Vec<LogRecord>,
}

/// Tracer that records spans in memory.
#[derive(Debug, Default)]
pub struct MockTracer {
    next_id: AtomicU64,
    spans: Mutex<Vec<Arc<MockSpan>>>,
}

impl MockTracer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every span started so far, finished or not, in start order.
    pub fn started_spans(&self) -> Vec<Arc<MockSpan>> {
        self.spans.lock().expect("mock tracer mutex poisoned").clone()
    }

    /// Spans that have been finished at least once, in start order.
    pub fn finished_spans(&self) -> Vec<Arc<MockSpan>> {
        self.started_spans()
            .into_iter()
            .filter(|span| span.finish_count() > 0)
            .collect()
    }

    pub fn reset(&self) {
        self.spans.lock().expect("mock tracer mutex poisoned").clear();
    }
}

impl Tracer for MockTracer {
    fn start_span(&self, operation: &str, parent: Option<&SpanRef>) -> SpanRef {
        let parent_id = parent
            .and_then(|p| p.as_any().downcast_ref::<MockSpan>())
            .map(|p| p.span_id);
        let span = Arc::new(MockSpan {
            span_id: self.next_id.fetch_add(1, Ordering::Relaxed) + 1,
            parent_id,
            operation: operation.to_string(),
            start_time: SystemTime::now(),
            state: Mutex::new(MockSpanState::default()),
        });
        self.spans
            .lock()
            .expect("mock tracer mutex poisoned")
            .push(span.clone());
        span
    }
}

fn micros(time: SystemTime) -> u64 {
    time.duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_micros() as u64
}
