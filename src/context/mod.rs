//! Per-call context.
//!
//! # Data Flow
//! ```text
//! Context::background()
//!     → with_cancel / with_deadline (cancellation.rs)
//!     → bound to a client (kv::Client::with_context)
//!     → hook before-step attaches the current span (with_span)
//!     → executor races the call against done()
//!     → hook after-step reads span() and err()
//! ```
//!
//! # Design Decisions
//! - A context is an immutable value; every "modification" returns a new one
//! - The current span only ever travels inside a context, never in a global
//! - Deadlines are checked lazily, no timer task is spawned per context

mod cancellation;

pub use cancellation::{CancelHandle, ContextError};

use std::fmt;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;

use crate::observability::tracer::SpanRef;

/// Carries cancellation, deadline and the current span across one call.
#[derive(Clone, Default)]
pub struct Context {
    cancel: Option<CancellationToken>,
    deadline: Option<Instant>,
    span: Option<SpanRef>,
}

impl Context {
    /// An empty context: never cancelled, no deadline, no span.
    pub fn background() -> Self {
        Self::default()
    }

    /// Derive a cancellable child.
    ///
    /// Cancelling the returned handle cancels the child and everything
    /// derived from it. Cancelling any ancestor cancels the child too.
    pub fn with_cancel(parent: &Context) -> (Context, CancelHandle) {
        let token = parent
            .cancel
            .as_ref()
            .map_or_else(CancellationToken::new, CancellationToken::child_token);
        let ctx = Context {
            cancel: Some(token.clone()),
            deadline: parent.deadline,
            span: parent.span.clone(),
        };
        (ctx, CancelHandle::new(token))
    }

    /// Derive a child that expires at `deadline` (or earlier if the parent does).
    pub fn with_deadline(parent: &Context, deadline: Instant) -> Context {
        let deadline = match parent.deadline {
            Some(current) if current <= deadline => current,
            _ => deadline,
        };
        Context {
            cancel: parent.cancel.clone(),
            deadline: Some(deadline),
            span: parent.span.clone(),
        }
    }

    /// Derive a child that expires after `timeout`.
    ///
    /// A timeout too large to represent as an `Instant` never expires; the
    /// child keeps the parent's deadline.
    pub fn with_timeout(parent: &Context, timeout: Duration) -> Context {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => Self::with_deadline(parent, deadline),
            None => parent.clone(),
        }
    }

    /// Derive a child whose current span is `span`.
    pub fn with_span(&self, span: SpanRef) -> Context {
        Context {
            cancel: self.cancel.clone(),
            deadline: self.deadline,
            span: Some(span),
        }
    }

    /// The span attached by the closest `with_span`, if any.
    pub fn span(&self) -> Option<&SpanRef> {
        self.span.as_ref()
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Why this context is done, or `None` while it is still live.
    pub fn err(&self) -> Option<ContextError> {
        if self.cancel.as_ref().is_some_and(CancellationToken::is_cancelled) {
            return Some(ContextError::Canceled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Some(ContextError::DeadlineExceeded),
            _ => None,
        }
    }

    /// Resolves once the context is cancelled or its deadline passes.
    ///
    /// Never resolves for a context with neither.
    pub async fn done(&self) -> ContextError {
        let cancelled = async {
            match &self.cancel {
                Some(token) => {
                    token.cancelled().await;
                    ContextError::Canceled
                }
                None => std::future::pending().await,
            }
        };
        let expired = async {
            match self.deadline {
                Some(deadline) => {
                    tokio::time::sleep_until(deadline.into()).await;
                    ContextError::DeadlineExceeded
                }
                None => std::future::pending().await,
            }
        };
        tokio::select! {
            err = cancelled => err,
            err = expired => err,
        }
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("cancellable", &self.cancel.is_some())
            .field("deadline", &self.deadline)
            .field("has_span", &self.span.is_some())
            .field("err", &self.err())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::mock::MockTracer;
    use crate::observability::tracer::Tracer;

    #[test]
    fn test_background_is_live() {
        let ctx = Context::background();
        assert!(ctx.err().is_none());
        assert!(ctx.span().is_none());
        assert!(ctx.deadline().is_none());
    }

    #[test]
    fn test_cancel_propagates_to_children() {
        let (parent, cancel) = Context::with_cancel(&Context::background());
        let (child, _child_cancel) = Context::with_cancel(&parent);
        let grandchild = Context::with_timeout(&child, Duration::from_secs(60));

        assert!(grandchild.err().is_none());
        cancel.cancel();

        assert_eq!(parent.err(), Some(ContextError::Canceled));
        assert_eq!(child.err(), Some(ContextError::Canceled));
        assert_eq!(grandchild.err(), Some(ContextError::Canceled));
    }

    #[test]
    fn test_child_cancel_leaves_parent_live() {
        let (parent, _cancel) = Context::with_cancel(&Context::background());
        let (child, child_cancel) = Context::with_cancel(&parent);
        child_cancel.cancel();

        assert!(parent.err().is_none());
        assert_eq!(child.err(), Some(ContextError::Canceled));
    }

    #[test]
    fn test_child_of_cancelled_parent_starts_cancelled() {
        let (parent, cancel) = Context::with_cancel(&Context::background());
        cancel.cancel();
        let (child, _) = Context::with_cancel(&parent);
        assert_eq!(child.err(), Some(ContextError::Canceled));
    }

    #[test]
    fn test_deadline_keeps_earliest() {
        let soon = Instant::now() + Duration::from_millis(5);
        let parent = Context::with_deadline(&Context::background(), soon);
        let child = Context::with_timeout(&parent, Duration::from_secs(3600));
        assert_eq!(child.deadline(), Some(soon));
    }

    #[test]
    fn test_expired_deadline() {
        let ctx = Context::with_deadline(&Context::background(), Instant::now());
        assert_eq!(ctx.err(), Some(ContextError::DeadlineExceeded));
        assert_eq!(ctx.err().unwrap().to_string(), "context deadline exceeded");
    }

    #[test]
    fn test_with_span_keeps_cancellation() {
        let tracer = MockTracer::new();
        let (ctx, cancel) = Context::with_cancel(&Context::background());
        let spanned = ctx.with_span(tracer.start_span("op", None));
        cancel.cancel();

        assert!(spanned.span().is_some());
        assert!(ctx.span().is_none());
        assert_eq!(spanned.err(), Some(ContextError::Canceled));
    }

    #[test]
    fn test_huge_timeout_keeps_parent_deadline() {
        let ctx = Context::with_timeout(&Context::background(), Duration::MAX);
        assert!(ctx.deadline().is_none());
        assert!(ctx.err().is_none());

        let soon = Instant::now() + Duration::from_secs(1);
        let parent = Context::with_deadline(&Context::background(), soon);
        let child = Context::with_timeout(&parent, Duration::MAX);
        assert_eq!(child.deadline(), Some(soon));
    }

    #[tokio::test]
    async fn test_done_on_parent_cancel() {
        let (parent, cancel) = Context::with_cancel(&Context::background());
        let (child, _child_cancel) = Context::with_cancel(&parent);
        let waiter = tokio::spawn(async move { child.done().await });
        cancel.cancel();
        assert_eq!(waiter.await.unwrap(), ContextError::Canceled);
    }

    #[tokio::test]
    async fn test_done_on_cancel() {
        let (ctx, cancel) = Context::with_cancel(&Context::background());
        let waiter = {
            let ctx = ctx.clone();
            tokio::spawn(async move { ctx.done().await })
        };
        cancel.cancel();
        assert_eq!(waiter.await.unwrap(), ContextError::Canceled);
    }

    #[tokio::test]
    async fn test_done_on_deadline() {
        let ctx = Context::with_timeout(&Context::background(), Duration::from_millis(10));
        assert_eq!(ctx.done().await, ContextError::DeadlineExceeded);
    }
}
