//! Shared utilities for integration tests.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use kvtrace::kv::{
    Client, ClusterClient, ClusterOptions, MemoryExecutor, Options, Ring, RingOptions,
    UniversalClient,
};
use kvtrace::observability::mock::MockSpan;
use kvtrace::observability::MockTracer;
use kvtrace::{wrap_client, Context, WrappedClient};

/// Single-node client on db 10.
pub fn single(executor: &MemoryExecutor) -> Box<dyn UniversalClient> {
    Box::new(Client::new(
        Options {
            addr: "127.0.0.1:6379".into(),
            db: 10,
        },
        Arc::new(executor.clone()),
    ))
}

/// Two-node cluster client.
pub fn cluster(executor: &MemoryExecutor) -> Box<dyn UniversalClient> {
    Box::new(ClusterClient::new(
        ClusterOptions {
            addrs: vec!["127.0.0.1:7000".into(), "127.0.0.1:7001".into()],
        },
        Arc::new(executor.clone()),
    ))
}

/// Two-shard ring on db 3.
pub fn ring(executor: &MemoryExecutor) -> Box<dyn UniversalClient> {
    let addrs = BTreeMap::from([
        ("shard1".to_string(), "127.0.0.1:6379".to_string()),
        ("shard2".to_string(), "127.0.0.1:6378".to_string()),
    ]);
    Box::new(Ring::new(
        RingOptions {
            addrs,
            db: 3,
        },
        Arc::new(executor.clone()),
    ))
}

/// Wrap `client` with a fresh recording tracer.
pub fn traced(ctx: &Context, client: Box<dyn UniversalClient>) -> (WrappedClient, Arc<MockTracer>) {
    let tracer = Arc::new(MockTracer::new());
    let wrapped = wrap_client(Some(ctx), Some(client), tracer.clone()).unwrap();
    (wrapped, tracer)
}

/// Executor that answers after `ms` milliseconds.
#[allow(dead_code)]
pub fn slow_executor(ms: u64) -> MemoryExecutor {
    MemoryExecutor::new().with_latency(Duration::from_millis(ms))
}

/// The only finished span; panics if there is not exactly one.
#[allow(dead_code)]
pub fn only_span(tracer: &MockTracer) -> Arc<MockSpan> {
    let spans = tracer.finished_spans();
    assert_eq!(spans.len(), 1, "expected one finished span, got {}", spans.len());
    spans[0].clone()
}
