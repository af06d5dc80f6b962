//! Transport seam.
//!
//! An `Executor` sends commands to the store and fills in their replies.
//! Connection management, serialization and retries all live behind it.

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::context::Context;
use crate::kv::command::Cmd;
use crate::kv::error::KvResult;

/// Runs commands against a store.
pub trait Executor: Send + Sync {
    /// Execute one command, storing its reply or error on `cmd`.
    fn exec<'a>(&'a self, ctx: &'a Context, cmd: &'a mut Cmd) -> BoxFuture<'a, KvResult<()>>;

    /// Execute a batch. The default runs the commands one after another.
    fn exec_pipeline<'a>(
        &'a self,
        ctx: &'a Context,
        cmds: &'a mut [Cmd],
    ) -> BoxFuture<'a, KvResult<()>> {
        async move {
            let mut first_err = None;
            for cmd in cmds.iter_mut() {
                if let Err(err) = self.exec(ctx, cmd).await {
                    first_err.get_or_insert(err);
                }
            }
            match first_err {
                Some(err) => Err(err),
                None => Ok(()),
            }
        }
        .boxed()
    }
}
