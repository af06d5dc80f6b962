//! Span-per-command hook.
//!
//! # Responsibilities
//! - Start a client span for every command and every pipeline
//! - Tag it with store type, database index, peers and statement
//! - Finish it after the call, logging the context error if the call was cancelled
//!
//! # Design Decisions
//! - The span travels to the after-step inside the returned `Context` only
//! - `db.instance` is always set; topologies without an index report "0"
//! - Neither step can fail; a missing span in the after-step is a no-op

use std::sync::Arc;

use crate::context::Context;
use crate::kv::command::Cmd;
use crate::kv::error::KvResult;
use crate::kv::hooks::Hook;
use crate::observability::tracer::{
    self, start_span_from_context, LogField, SpanRef, Tracer, DB_INSTANCE, DB_STATEMENT, DB_TYPE,
    LOG_ERROR, PEER_ADDRESS, PEER_SERVICE, SPAN_KIND, SPAN_KIND_CLIENT,
};

/// Store identifier used for `db.type` and `peer.service`.
pub const STORE: &str = "redis";

/// Operation name of single-command spans.
pub const CMD_SPAN: &str = "redis:cmd";

/// Operation name of pipeline spans.
pub const PIPELINE_SPAN: &str = "redis:pipeline:cmd";

/// Separator between command names in a pipeline statement.
pub const PIPELINE_SEPARATOR: &str = " --> ";

/// `Hook::kind` of the tracing hook.
pub const HOOK_KIND: &str = "kvtrace.tracing";

/// Connection metadata stamped on every span.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookConfig {
    /// Peer addresses, in the order they are reported.
    pub addrs: Vec<String>,
    /// Logical database index; 0 when the topology has none.
    pub database: u32,
}

impl HookConfig {
    pub fn new(addrs: Vec<String>, database: u32) -> Self {
        Self { addrs, database }
    }

    /// `peer.address` value: addresses joined with ", ".
    pub fn peer_address(&self) -> String {
        self.addrs.join(", ")
    }
}

/// Hook that brackets commands with spans from an injected tracer.
#[derive(Clone)]
pub struct TracingHook {
    config: Arc<HookConfig>,
    tracer: Arc<dyn Tracer>,
}

impl TracingHook {
    pub fn new(config: HookConfig, tracer: Arc<dyn Tracer>) -> Self {
        Self {
            config: Arc::new(config),
            tracer,
        }
    }

    pub fn config(&self) -> &HookConfig {
        &self.config
    }

    fn start(&self, ctx: &Context, operation: &str, statement: &str) -> Context {
        let (span, ctx) = start_span_from_context(self.tracer.as_ref(), ctx, operation);
        self.tag(&span, statement);
        ctx
    }

    fn tag(&self, span: &SpanRef, statement: &str) {
        span.set_tag(DB_TYPE, STORE);
        span.set_tag(DB_INSTANCE, &self.config.database.to_string());
        span.set_tag(PEER_ADDRESS, &self.config.peer_address());
        span.set_tag(PEER_SERVICE, STORE);
        span.set_tag(SPAN_KIND, SPAN_KIND_CLIENT);
        span.set_tag(DB_STATEMENT, statement);
    }

    fn finish(&self, ctx: &Context) {
        let Some(span) = tracer::span_from_context(ctx) else {
            return;
        };
        if let Some(err) = ctx.err() {
            span.log_fields(&[LogField::string(LOG_ERROR, err.to_string())]);
        }
        span.finish();
    }
}

impl std::fmt::Debug for TracingHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TracingHook")
            .field("config", &self.config)
            .finish()
    }
}

/// Upper-cased statement for a single command.
pub fn statement(cmd: &Cmd) -> String {
    cmd.name().to_uppercase()
}

/// Upper-cased command names joined with " --> ", in call order.
pub fn pipeline_statement(cmds: &[Cmd]) -> String {
    cmds.iter()
        .map(statement)
        .collect::<Vec<_>>()
        .join(PIPELINE_SEPARATOR)
}

impl Hook for TracingHook {
    fn kind(&self) -> &'static str {
        HOOK_KIND
    }

    fn before_process(&self, ctx: &Context, cmd: &Cmd) -> KvResult<Context> {
        Ok(self.start(ctx, CMD_SPAN, &statement(cmd)))
    }

    fn after_process(&self, ctx: &Context, _cmd: &Cmd) -> KvResult<()> {
        self.finish(ctx);
        Ok(())
    }

    fn before_process_pipeline(&self, ctx: &Context, cmds: &[Cmd]) -> KvResult<Context> {
        Ok(self.start(ctx, PIPELINE_SPAN, &pipeline_statement(cmds)))
    }

    fn after_process_pipeline(&self, ctx: &Context, _cmds: &[Cmd]) -> KvResult<()> {
        self.finish(ctx);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::mock::{MockSpan, MockTracer};
    use std::thread;
    use std::time::{Duration, SystemTime};

    fn hook(tracer: &Arc<MockTracer>) -> TracingHook {
        TracingHook::new(
            HookConfig::new(vec!["127.0.0.1:6379".into(), "127.0.0.1:6378".into()], 10),
            tracer.clone(),
        )
    }

    fn current(ctx: &Context) -> &MockSpan {
        ctx.span().unwrap().as_any().downcast_ref::<MockSpan>().unwrap()
    }

    fn assert_common_tags(span: &MockSpan) {
        let tags = span.tags();
        assert_eq!(tags.len(), 6);
        assert_eq!(tags[DB_TYPE], "redis");
        assert_eq!(tags[DB_INSTANCE], "10");
        assert_eq!(tags[PEER_ADDRESS], "127.0.0.1:6379, 127.0.0.1:6378");
        assert_eq!(tags[PEER_SERVICE], "redis");
        assert_eq!(tags[SPAN_KIND], "client");
    }

    #[test]
    fn test_before_process() {
        let tracer = Arc::new(MockTracer::new());
        let ctx = hook(&tracer)
            .before_process(&Context::background(), &Cmd::new(["get", "ALLAN"]))
            .unwrap();

        let span = current(&ctx);
        assert_eq!(span.operation_name(), CMD_SPAN);
        assert_eq!(span.parent_id(), None);
        assert_common_tags(span);
        assert_eq!(span.tag(DB_STATEMENT).as_deref(), Some("GET"));
        assert_eq!(span.finish_count(), 0);
    }

    #[test]
    fn test_before_process_pipeline() {
        let tracer = Arc::new(MockTracer::new());
        let cmds = [Cmd::new(["get", "ALLAN"]), Cmd::new(["set", "ALLAN"])];
        let ctx = hook(&tracer)
            .before_process_pipeline(&Context::background(), &cmds)
            .unwrap();

        let span = current(&ctx);
        assert_eq!(span.operation_name(), PIPELINE_SPAN);
        assert_common_tags(span);
        assert_eq!(span.tag(DB_STATEMENT).as_deref(), Some("GET --> SET"));
    }

    #[test]
    fn test_empty_pipeline_still_spans() {
        let tracer = Arc::new(MockTracer::new());
        let ctx = hook(&tracer)
            .before_process_pipeline(&Context::background(), &[])
            .unwrap();
        assert_eq!(current(&ctx).tag(DB_STATEMENT).as_deref(), Some(""));
        assert_eq!(tracer.started_spans().len(), 1);
    }

    #[test]
    fn test_span_is_child_of_context_span() {
        let tracer = Arc::new(MockTracer::new());
        let parent = tracer.start_span("request", None);
        let ctx = Context::background().with_span(parent.clone());

        let ctx = hook(&tracer).before_process(&ctx, &Cmd::new(["ping"])).unwrap();
        let parent = parent.as_any().downcast_ref::<MockSpan>().unwrap();
        assert_eq!(current(&ctx).parent_id(), Some(parent.span_id()));
    }

    #[test]
    fn test_after_process_success() {
        let tracer = Arc::new(MockTracer::new());
        let hk = hook(&tracer);
        let cmd = Cmd::new(["get", "ALLAN"]);

        let ctx = hk.before_process(&Context::background(), &cmd).unwrap();
        let start = current(&ctx).start_time();
        thread::sleep(Duration::from_millis(1));
        hk.after_process(&ctx, &cmd).unwrap();

        let span = current(&ctx);
        assert!(span.logs().is_empty());
        assert_eq!(span.finish_count(), 1);
        assert!(span.finish_time().unwrap() > start);
    }

    #[test]
    fn test_after_process_cancelled() {
        let tracer = Arc::new(MockTracer::new());
        let hk = hook(&tracer);
        let cmd = Cmd::new(["get", "ALLAN"]);
        let (fail_ctx, cancel) = Context::with_cancel(&Context::background());
        cancel.cancel();

        let ctx = hk.before_process(&fail_ctx, &cmd).unwrap();
        let now = SystemTime::now();
        thread::sleep(Duration::from_millis(1));
        hk.after_process(&ctx, &cmd).unwrap();

        let span = current(&ctx);
        assert!(span.finish_time().unwrap() > now);
        let records = span.logs();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].fields.len(), 1);
        assert_eq!(records[0].fields[0].key, "error");
        assert_eq!(records[0].fields[0].value, "context canceled");
    }

    #[test]
    fn test_after_process_pipeline_deadline() {
        let tracer = Arc::new(MockTracer::new());
        let hk = hook(&tracer);
        let cmds = [Cmd::new(["get", "ALLAN"]), Cmd::new(["set", "ALLAN"])];
        let deadline_ctx = Context::with_timeout(&Context::background(), Duration::from_millis(1));

        let ctx = hk.before_process_pipeline(&deadline_ctx, &cmds).unwrap();
        thread::sleep(Duration::from_millis(5));
        hk.after_process_pipeline(&ctx, &cmds).unwrap();

        let span = current(&ctx);
        assert_eq!(span.finish_count(), 1);
        assert_eq!(span.logs()[0].fields[0].value, "context deadline exceeded");
    }

    #[test]
    fn test_after_process_pipeline_success() {
        let tracer = Arc::new(MockTracer::new());
        let hk = hook(&tracer);
        let cmds = [Cmd::new(["get", "ALLAN"]), Cmd::new(["set", "ALLAN"])];

        let ctx = hk.before_process_pipeline(&Context::background(), &cmds).unwrap();
        let now = SystemTime::now();
        thread::sleep(Duration::from_millis(1));
        hk.after_process_pipeline(&ctx, &cmds).unwrap();

        let span = current(&ctx);
        assert!(span.logs().is_empty());
        assert!(span.finish_time().unwrap() > now);
    }

    #[test]
    fn test_after_process_without_span_is_noop() {
        let tracer = Arc::new(MockTracer::new());
        let hk = hook(&tracer);
        let (ctx, cancel) = Context::with_cancel(&Context::background());
        cancel.cancel();

        assert!(hk.after_process(&ctx, &Cmd::new(["get"])).is_ok());
        assert!(hk.after_process_pipeline(&ctx, &[]).is_ok());
        assert!(tracer.started_spans().is_empty());
    }

    #[test]
    fn test_cluster_config_reports_zero_instance() {
        let tracer = Arc::new(MockTracer::new());
        let hk = TracingHook::new(HookConfig::new(vec![], 0), tracer.clone());
        let ctx = hk.before_process(&Context::background(), &Cmd::new(["ping"])).unwrap();

        assert_eq!(current(&ctx).tag(DB_INSTANCE).as_deref(), Some("0"));
        assert_eq!(current(&ctx).tag(PEER_ADDRESS).as_deref(), Some(""));
    }
}
