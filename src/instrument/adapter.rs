//! Topology adapters and the wrapping factory.
//!
//! # Responsibilities
//! - Accept any `UniversalClient` and narrow it to the closed `Topology` set
//! - Read each topology's addresses and database index into a `HookConfig`
//! - Rebind the client to the calling context and register a fresh `TracingHook`
//!
//! # Design Decisions
//! - One adapter per topology, selected by a single match
//! - Rebinding replaces the tracing hook, it never stacks a second one
//! - Failures are returned as `WrapError`; nothing is registered on failure

use std::sync::Arc;

use futures_util::future::BoxFuture;

use crate::context::Context;
use crate::instrument::error::WrapError;
use crate::instrument::hook::{HookConfig, TracingHook, HOOK_KIND};
use crate::kv::client::{Client, ClusterClient, Cmdable, Ring, Topology, UniversalClient};
use crate::kv::command::Cmd;
use crate::kv::error::KvResult;
use crate::kv::hooks::Hooks;
use crate::observability::tracer::Tracer;

/// Per-topology half of rebind-and-hook.
trait Adapter: Sized {
    /// Connection metadata for spans.
    fn hook_config(&self) -> HookConfig;

    fn rebind(&self, ctx: Context) -> Self;

    fn register(&mut self, hook: TracingHook);

    fn rebind_and_hook(&self, ctx: Context, tracer: &Arc<dyn Tracer>) -> (Self, HookConfig) {
        let mut client = self.rebind(ctx);
        let config = client.hook_config();
        client.register(TracingHook::new(config.clone(), tracer.clone()));
        (client, config)
    }
}

impl Adapter for Client {
    fn hook_config(&self) -> HookConfig {
        let opt = self.options();
        HookConfig::new(vec![opt.addr.clone()], opt.db)
    }

    fn rebind(&self, ctx: Context) -> Self {
        self.with_context(ctx)
    }

    fn register(&mut self, hook: TracingHook) {
        self.replace_hook(Arc::new(hook));
    }
}

impl Adapter for ClusterClient {
    fn hook_config(&self) -> HookConfig {
        HookConfig::new(self.options().addrs.clone(), 0)
    }

    fn rebind(&self, ctx: Context) -> Self {
        self.with_context(ctx)
    }

    fn register(&mut self, hook: TracingHook) {
        self.replace_hook(Arc::new(hook));
    }
}

impl Adapter for Ring {
    fn hook_config(&self) -> HookConfig {
        let opt = self.options();
        HookConfig::new(opt.addr_list(), opt.db)
    }

    fn rebind(&self, ctx: Context) -> Self {
        self.with_context(ctx)
    }

    fn register(&mut self, hook: TracingHook) {
        self.replace_hook(Arc::new(hook));
    }
}

fn rebind_and_hook(
    topology: &Topology,
    ctx: Context,
    tracer: &Arc<dyn Tracer>,
) -> (Topology, HookConfig) {
    match topology {
        Topology::Single(c) => {
            let (c, config) = c.rebind_and_hook(ctx, tracer);
            (Topology::Single(c), config)
        }
        Topology::Cluster(c) => {
            let (c, config) = c.rebind_and_hook(ctx, tracer);
            (Topology::Cluster(c), config)
        }
        Topology::Ring(c) => {
            let (c, config) = c.rebind_and_hook(ctx, tracer);
            (Topology::Ring(c), config)
        }
    }
}

/// A client with the tracing hook attached.
///
/// Every key-value operation is delegated to the underlying topology.
#[derive(Clone)]
pub struct WrappedClient {
    topology: Topology,
    config: HookConfig,
    tracer: Arc<dyn Tracer>,
}

impl WrappedClient {
    /// Rebind to `ctx`. The new client carries a new hook instance.
    pub fn with_context(&self, ctx: Context) -> WrappedClient {
        let (topology, config) = rebind_and_hook(&self.topology, ctx, &self.tracer);
        tracing::debug!(
            topology = topology.name(),
            peer_address = %config.peer_address(),
            db = config.database,
            "Rebound key-value client"
        );
        WrappedClient {
            topology,
            config,
            tracer: self.tracer.clone(),
        }
    }

    /// Metadata the current hook stamps on spans.
    pub fn hook_config(&self) -> &HookConfig {
        &self.config
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn context(&self) -> &Context {
        self.topology.context()
    }

    pub fn hooks(&self) -> &Hooks {
        self.topology.hooks()
    }

    /// Number of tracing hooks registered; 1 for any wrapped client.
    pub fn tracing_hooks(&self) -> usize {
        self.hooks().count_kind(HOOK_KIND)
    }

    pub fn into_inner(self) -> Topology {
        self.topology
    }
}

impl Cmdable for WrappedClient {
    fn process<'a>(&'a self, cmd: &'a mut Cmd) -> BoxFuture<'a, KvResult<()>> {
        self.topology.as_cmdable().process(cmd)
    }

    fn process_pipeline<'a>(&'a self, cmds: &'a mut [Cmd]) -> BoxFuture<'a, KvResult<()>> {
        self.topology.as_cmdable().process_pipeline(cmds)
    }
}

impl UniversalClient for WrappedClient {
    fn context(&self) -> &Context {
        self.topology.context()
    }

    fn hooks(&self) -> &Hooks {
        self.topology.hooks()
    }

    fn into_topology(self: Box<Self>) -> Option<Topology> {
        Some(self.topology)
    }
}

impl std::fmt::Debug for WrappedClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WrappedClient")
            .field("topology", &self.topology)
            .field("config", &self.config)
            .finish()
    }
}

/// Wrap `client` so every command it runs is traced through `tracer`.
///
/// Fails with `InvalidArgument` when the context or client is missing and
/// with `UnsupportedTopology` when the client is not one of the three
/// supported kinds.
pub fn wrap_client(
    ctx: Option<&Context>,
    client: Option<Box<dyn UniversalClient>>,
    tracer: Arc<dyn Tracer>,
) -> Result<WrappedClient, WrapError> {
    let ctx = ctx.ok_or(WrapError::InvalidArgument("context is required"))?;
    let client = client.ok_or(WrapError::InvalidArgument("client is required"))?;
    let topology = client.into_topology().ok_or(WrapError::UnsupportedTopology)?;

    let (topology, config) = rebind_and_hook(&topology, ctx.clone(), &tracer);
    tracing::debug!(
        topology = topology.name(),
        peer_address = %config.peer_address(),
        db = config.database,
        "Wrapped key-value client"
    );
    Ok(WrappedClient {
        topology,
        config,
        tracer,
    })
}
