//! Hook registration and dispatch.
//!
//! # Responsibilities
//! - Hold the hooks registered on a client
//! - Run before-steps in registration order, threading the returned context
//! - Run after-steps in reverse, only for hooks whose before-step succeeded
//!
//! # Design Decisions
//! - A hook that fails its before-step stops the chain and the call is skipped;
//!   the error lands on the command, never in a panic
//! - `replace_hook` swaps the hook of the same kind instead of stacking a
//!   second copy, so rebinding a client cannot double-instrument it

use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::kv::command::Cmd;
use crate::kv::error::KvResult;

/// Interception pair around commands and pipelines.
pub trait Hook: Send + Sync {
    /// Identifies the hook family for `Hooks::replace_hook`.
    fn kind(&self) -> &'static str;

    fn before_process(&self, ctx: &Context, cmd: &Cmd) -> KvResult<Context>;

    fn after_process(&self, ctx: &Context, cmd: &Cmd) -> KvResult<()>;

    fn before_process_pipeline(&self, ctx: &Context, cmds: &[Cmd]) -> KvResult<Context>;

    fn after_process_pipeline(&self, ctx: &Context, cmds: &[Cmd]) -> KvResult<()>;
}

/// The hooks registered on one client.
#[derive(Clone, Default)]
pub struct Hooks {
    hooks: Vec<Arc<dyn Hook>>,
}

impl Hooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a hook.
    pub fn add_hook(&mut self, hook: Arc<dyn Hook>) {
        self.hooks.push(hook);
    }

    /// Replace the registered hook of the same kind, or append if there is none.
    pub fn replace_hook(&mut self, hook: Arc<dyn Hook>) {
        match self.hooks.iter_mut().find(|h| h.kind() == hook.kind()) {
            Some(slot) => *slot = hook,
            None => self.hooks.push(hook),
        }
    }

    pub fn len(&self) -> usize {
        self.hooks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hooks.is_empty()
    }

    /// Count of registered hooks of `kind`.
    pub fn count_kind(&self, kind: &str) -> usize {
        self.hooks.iter().filter(|h| h.kind() == kind).count()
    }

    /// Run before-steps. Returns the final context and how many hooks succeeded.
    ///
    /// A failing hook records its error on `cmd` and stops the chain.
    pub(crate) fn before_process(&self, ctx: &Context, cmd: &mut Cmd) -> (Context, usize) {
        let mut ctx = ctx.clone();
        for (ran, hook) in self.hooks.iter().enumerate() {
            match hook.before_process(&ctx, cmd) {
                Ok(next) => ctx = next,
                Err(err) => {
                    tracing::debug!(hook = hook.kind(), error = %err, "before_process hook failed");
                    cmd.set_err(err);
                    return (ctx, ran);
                }
            }
        }
        (ctx, self.hooks.len())
    }

    /// Run after-steps in reverse for the first `ran` hooks.
    pub(crate) fn after_process(&self, ctx: &Context, cmd: &mut Cmd, ran: usize) {
        for hook in self.hooks[..ran].iter().rev() {
            if let Err(err) = hook.after_process(ctx, cmd) {
                tracing::debug!(hook = hook.kind(), error = %err, "after_process hook failed");
                cmd.set_err(err);
            }
        }
    }

    pub(crate) fn before_process_pipeline(
        &self,
        ctx: &Context,
        cmds: &mut [Cmd],
    ) -> (Context, usize) {
        let mut ctx = ctx.clone();
        for (ran, hook) in self.hooks.iter().enumerate() {
            match hook.before_process_pipeline(&ctx, cmds) {
                Ok(next) => ctx = next,
                Err(err) => {
                    tracing::debug!(
                        hook = hook.kind(),
                        error = %err,
                        "before_process_pipeline hook failed"
                    );
                    set_all_errs(cmds, &err);
                    return (ctx, ran);
                }
            }
        }
        (ctx, self.hooks.len())
    }

    pub(crate) fn after_process_pipeline(&self, ctx: &Context, cmds: &mut [Cmd], ran: usize) {
        for hook in self.hooks[..ran].iter().rev() {
            if let Err(err) = hook.after_process_pipeline(ctx, cmds) {
                tracing::debug!(
                    hook = hook.kind(),
                    error = %err,
                    "after_process_pipeline hook failed"
                );
                set_all_errs(cmds, &err);
            }
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.hooks.iter().map(|h| h.kind()))
            .finish()
    }
}

pub(crate) fn set_all_errs(cmds: &mut [Cmd], err: &crate::kv::error::KvError) {
    for cmd in cmds.iter_mut() {
        cmd.set_err(err.clone());
    }
}
