//! Client topologies.
//!
//! # Responsibilities
//! - Bind a client to a calling `Context`
//! - Run every command and pipeline through the registered `Hooks`
//! - Race the executor against the context so cancellation returns promptly
//! - Expose the command surface through `Cmdable`
//!
//! # Design Decisions
//! - `with_context` is a shallow copy: options and executor are shared,
//!   hooks are copied, so registering on the copy never touches the original
//! - Exactly three topologies exist; `Topology` is the closed set

use std::sync::Arc;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::context::Context;
use crate::kv::command::Cmd;
use crate::kv::error::{KvError, KvResult};
use crate::kv::executor::Executor;
use crate::kv::hooks::{set_all_errs, Hook, Hooks};
use crate::kv::options::{ClusterOptions, Options, RingOptions};

/// State shared by every topology.
#[derive(Clone)]
struct ClientCore {
    ctx: Context,
    hooks: Hooks,
    executor: Arc<dyn Executor>,
}

impl ClientCore {
    fn new(executor: Arc<dyn Executor>) -> Self {
        Self {
            ctx: Context::background(),
            hooks: Hooks::new(),
            executor,
        }
    }

    async fn process(&self, cmd: &mut Cmd) -> KvResult<()> {
        let (ctx, ran) = self.hooks.before_process(&self.ctx, cmd);
        if ran == self.hooks.len() {
            let result = tokio::select! {
                biased;
                err = ctx.done() => Err(KvError::from(err)),
                result = self.executor.exec(&ctx, cmd) => result,
            };
            if let Err(err) = result {
                cmd.set_err(err);
            }
        }
        self.hooks.after_process(&ctx, cmd, ran);
        cmd.result()
    }

    async fn process_pipeline(&self, cmds: &mut [Cmd]) -> KvResult<()> {
        let (ctx, ran) = self.hooks.before_process_pipeline(&self.ctx, cmds);
        if ran == self.hooks.len() {
            let result = tokio::select! {
                biased;
                err = ctx.done() => Err(KvError::from(err)),
                result = self.executor.exec_pipeline(&ctx, cmds) => result,
            };
            if let Err(err) = result {
                // Executors record per-command errors themselves; fill in the rest.
                if matches!(err, KvError::Context(_)) || cmds.iter().all(|c| c.err().is_none()) {
                    set_all_errs(cmds, &err);
                }
            }
        }
        self.hooks.after_process_pipeline(&ctx, cmds, ran);
        match cmds.iter().find_map(Cmd::err) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

/// The command surface shared by every client.
pub trait Cmdable: Send + Sync {
    /// Run one command through hooks and executor.
    fn process<'a>(&'a self, cmd: &'a mut Cmd) -> BoxFuture<'a, KvResult<()>>;

    /// Run a batch through hooks and executor. Fails with the first command error.
    fn process_pipeline<'a>(&'a self, cmds: &'a mut [Cmd]) -> BoxFuture<'a, KvResult<()>>;

    fn ping(&self) -> BoxFuture<'_, KvResult<String>> {
        async move {
            let mut cmd = Cmd::new(["ping"]);
            self.process(&mut cmd).await?;
            Ok(cmd.string_reply()?.unwrap_or_default())
        }
        .boxed()
    }

    fn get<'a>(&'a self, key: &str) -> BoxFuture<'a, KvResult<Option<String>>> {
        let mut cmd = Cmd::new(["get", key]);
        async move {
            self.process(&mut cmd).await?;
            cmd.string_reply()
        }
        .boxed()
    }

    fn set<'a>(&'a self, key: &str, value: &str) -> BoxFuture<'a, KvResult<()>> {
        let mut cmd = Cmd::new(["set", key, value]);
        async move { self.process(&mut cmd).await }.boxed()
    }

    fn del<'a>(&'a self, keys: &[&str]) -> BoxFuture<'a, KvResult<i64>> {
        let mut cmd = Cmd::new(std::iter::once("del").chain(keys.iter().copied()));
        async move {
            self.process(&mut cmd).await?;
            cmd.int_reply()
        }
        .boxed()
    }

    fn exists<'a>(&'a self, keys: &[&str]) -> BoxFuture<'a, KvResult<i64>> {
        let mut cmd = Cmd::new(std::iter::once("exists").chain(keys.iter().copied()));
        async move {
            self.process(&mut cmd).await?;
            cmd.int_reply()
        }
        .boxed()
    }

    fn incr<'a>(&'a self, key: &str) -> BoxFuture<'a, KvResult<i64>> {
        let mut cmd = Cmd::new(["incr", key]);
        async move {
            self.process(&mut cmd).await?;
            cmd.int_reply()
        }
        .boxed()
    }

    /// Run `cmds` as one pipeline and hand them back with replies filled in.
    ///
    /// Per-command errors stay on the commands; only context errors fail the call.
    fn pipelined(&self, mut cmds: Vec<Cmd>) -> BoxFuture<'_, KvResult<Vec<Cmd>>> {
        async move {
            match self.process_pipeline(&mut cmds).await {
                Err(err @ KvError::Context(_)) => Err(err),
                _ => Ok(cmds),
            }
        }
        .boxed()
    }
}

/// Any client that can be handed to the instrumentation factory.
pub trait UniversalClient: Cmdable {
    /// The context commands currently run under.
    fn context(&self) -> &Context;

    fn hooks(&self) -> &Hooks;

    /// Convert into one of the supported topologies.
    ///
    /// Clients outside the closed set keep the default and are rejected.
    fn into_topology(self: Box<Self>) -> Option<Topology> {
        None
    }
}

/// The closed set of supported client topologies.
#[derive(Clone)]
pub enum Topology {
    Single(Client),
    Cluster(ClusterClient),
    Ring(Ring),
}

impl Topology {
    pub fn name(&self) -> &'static str {
        match self {
            Topology::Single(_) => "single",
            Topology::Cluster(_) => "cluster",
            Topology::Ring(_) => "ring",
        }
    }

    pub fn as_cmdable(&self) -> &dyn Cmdable {
        match self {
            Topology::Single(c) => c,
            Topology::Cluster(c) => c,
            Topology::Ring(c) => c,
        }
    }

    pub fn context(&self) -> &Context {
        match self {
            Topology::Single(c) => c.context(),
            Topology::Cluster(c) => c.context(),
            Topology::Ring(c) => c.context(),
        }
    }

    pub fn hooks(&self) -> &Hooks {
        match self {
            Topology::Single(c) => c.hooks(),
            Topology::Cluster(c) => c.hooks(),
            Topology::Ring(c) => c.hooks(),
        }
    }
}

impl std::fmt::Debug for Topology {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Topology::Single(c) => f.debug_tuple("Single").field(c).finish(),
            Topology::Cluster(c) => f.debug_tuple("Cluster").field(c).finish(),
            Topology::Ring(c) => f.debug_tuple("Ring").field(c).finish(),
        }
    }
}

macro_rules! topology_client {
    ($(#[$meta:meta])* $name:ident, $opts:ty, $variant:ident) => {
        $(#[$meta])*
        #[derive(Clone)]
        pub struct $name {
            opt: Arc<$opts>,
            core: ClientCore,
        }

        impl $name {
            pub fn new(opt: $opts, executor: Arc<dyn Executor>) -> Self {
                Self {
                    opt: Arc::new(opt),
                    core: ClientCore::new(executor),
                }
            }

            pub fn options(&self) -> &$opts {
                &self.opt
            }

            /// Shallow copy bound to `ctx`.
            pub fn with_context(&self, ctx: Context) -> Self {
                let mut clone = self.clone();
                clone.core.ctx = ctx;
                clone
            }

            pub fn context(&self) -> &Context {
                &self.core.ctx
            }

            pub fn hooks(&self) -> &Hooks {
                &self.core.hooks
            }

            pub fn add_hook(&mut self, hook: Arc<dyn Hook>) {
                self.core.hooks.add_hook(hook);
            }

            pub fn replace_hook(&mut self, hook: Arc<dyn Hook>) {
                self.core.hooks.replace_hook(hook);
            }
        }

        impl Cmdable for $name {
            fn process<'a>(&'a self, cmd: &'a mut Cmd) -> BoxFuture<'a, KvResult<()>> {
                self.core.process(cmd).boxed()
            }

            fn process_pipeline<'a>(&'a self, cmds: &'a mut [Cmd]) -> BoxFuture<'a, KvResult<()>> {
                self.core.process_pipeline(cmds).boxed()
            }
        }

        impl UniversalClient for $name {
            fn context(&self) -> &Context {
                &self.core.ctx
            }

            fn hooks(&self) -> &Hooks {
                &self.core.hooks
            }

            fn into_topology(self: Box<Self>) -> Option<Topology> {
                Some(Topology::$variant(*self))
            }
        }

        impl std::fmt::Debug for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.debug_struct(stringify!($name))
                    .field("options", &self.opt)
                    .field("hooks", &self.core.hooks)
                    .finish()
            }
        }
    };
}

topology_client!(
    /// Client for a single node.
    Client,
    Options,
    Single
);

topology_client!(
    /// Client for a cluster of nodes.
    ClusterClient,
    ClusterOptions,
    Cluster
);

topology_client!(
    /// Client for a consistent-hash ring of independent nodes.
    Ring,
    RingOptions,
    Ring
);

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::memory::MemoryExecutor;
    use std::time::Duration;

    fn client() -> Client {
        Client::new(Options::default(), Arc::new(MemoryExecutor::new()))
    }

    #[tokio::test]
    async fn test_command_helpers() {
        let c = client();
        assert_eq!(c.ping().await.unwrap(), "PONG");
        c.set("k", "v").await.unwrap();
        assert_eq!(c.get("k").await.unwrap().as_deref(), Some("v"));
        assert_eq!(c.exists(&["k", "x"]).await.unwrap(), 1);
        assert_eq!(c.incr("n").await.unwrap(), 1);
        assert_eq!(c.del(&["k", "n"]).await.unwrap(), 2);
        assert_eq!(c.get("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_pipelined_keeps_per_command_errors() {
        let c = client();
        let cmds = c
            .pipelined(vec![
                Cmd::new(["set", "a", "1"]),
                Cmd::new(["nope"]),
                Cmd::new(["get", "a"]),
            ])
            .await
            .unwrap();
        assert!(cmds[0].err().is_none());
        assert!(cmds[1].err().is_some());
        assert_eq!(cmds[2].string_reply().unwrap().as_deref(), Some("1"));
    }

    #[tokio::test]
    async fn test_cancelled_context_short_circuits() {
        let (ctx, cancel) = Context::with_cancel(&Context::background());
        cancel.cancel();
        let c = client().with_context(ctx);
        assert_eq!(c.ping().await, Err(KvError::Context(crate::context::ContextError::Canceled)));
    }

    #[tokio::test]
    async fn test_deadline_interrupts_slow_executor() {
        let exec = MemoryExecutor::new().with_latency(Duration::from_secs(5));
        let ctx = Context::with_timeout(&Context::background(), Duration::from_millis(20));
        let c = Client::new(Options::default(), Arc::new(exec)).with_context(ctx);

        let mut cmds = vec![Cmd::new(["ping"]), Cmd::new(["ping"])];
        let err = c.process_pipeline(&mut cmds).await.unwrap_err();
        assert_eq!(err.to_string(), "context deadline exceeded");
        assert!(cmds.iter().all(|cmd| cmd.err().is_some()));
    }

    #[test]
    fn test_with_context_copies_hooks() {
        let original = client();
        let bound = original.with_context(Context::background());
        assert_eq!(bound.options(), original.options());
        assert!(bound.hooks().is_empty());
    }

    #[test]
    fn test_into_topology() {
        let boxed: Box<dyn UniversalClient> = Box::new(client());
        let topology = boxed.into_topology().unwrap();
        assert_eq!(topology.name(), "single");

        let ring = Ring::new(RingOptions::default(), Arc::new(MemoryExecutor::new()));
        let boxed: Box<dyn UniversalClient> = Box::new(ring);
        assert_eq!(boxed.into_topology().unwrap().name(), "ring");
    }
}
