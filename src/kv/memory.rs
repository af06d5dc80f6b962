//! In-process executor.
//!
//! Understands a handful of string commands against a shared map. Good
//! enough to drive clients in tests and in the demo binary without a server.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;

use crate::context::Context;
use crate::kv::command::{Cmd, Value};
use crate::kv::error::{KvError, KvResult};
use crate::kv::executor::Executor;

/// Executor backed by a `HashMap`. Clones share the same data.
#[derive(Debug, Clone, Default)]
pub struct MemoryExecutor {
    data: Arc<Mutex<HashMap<String, String>>>,
    latency: Option<Duration>,
}

impl MemoryExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Delay every command by `latency` before answering.
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Number of stored keys.
    pub fn len(&self) -> usize {
        self.data.lock().expect("memory executor mutex poisoned").len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn apply(&self, args: &[String]) -> KvResult<Value> {
        let name = args.first().map(|s| s.to_ascii_lowercase()).unwrap_or_default();
        let mut data = self.data.lock().expect("memory executor mutex poisoned");

        match (name.as_str(), args.get(1..).unwrap_or(&[])) {
            ("ping", []) => Ok(Value::Status("PONG".into())),
            ("ping", [msg]) | ("echo", [msg]) => Ok(Value::Str(msg.clone())),
            ("get", [key]) => Ok(data.get(key).cloned().map_or(Value::Nil, Value::Str)),
            ("set", [key, value]) => {
                data.insert(key.clone(), value.clone());
                Ok(Value::Status("OK".into()))
            }
            ("del", keys) if !keys.is_empty() => {
                let removed = keys.iter().filter(|k| data.remove(*k).is_some()).count();
                Ok(Value::Int(removed as i64))
            }
            ("exists", keys) if !keys.is_empty() => {
                let found = keys.iter().filter(|k| data.contains_key(*k)).count();
                Ok(Value::Int(found as i64))
            }
            ("incr", [key]) => {
                let current = match data.get(key) {
                    Some(v) => v.parse::<i64>().map_err(|_| {
                        KvError::Reply("ERR value is not an integer or out of range".into())
                    })?,
                    None => 0,
                };
                let next = current.checked_add(1).ok_or_else(|| {
                    KvError::Reply("ERR increment or decrement would overflow".into())
                })?;
                data.insert(key.clone(), next.to_string());
                Ok(Value::Int(next))
            }
            ("", _) => Err(KvError::Reply("ERR empty command".into())),
            ("ping" | "echo" | "get" | "set" | "del" | "exists" | "incr", _) => Err(KvError::Reply(
                format!("ERR wrong number of arguments for '{}' command", name),
            )),
            _ => Err(KvError::Reply(format!("ERR unknown command '{}'", name))),
        }
    }
}

impl Executor for MemoryExecutor {
    fn exec<'a>(&'a self, _ctx: &'a Context, cmd: &'a mut Cmd) -> BoxFuture<'a, KvResult<()>> {
        async move {
            if let Some(latency) = self.latency {
                tokio::time::sleep(latency).await;
            }
            match self.apply(cmd.args()) {
                Ok(reply) => {
                    cmd.set_reply(reply);
                    Ok(())
                }
                Err(err) => {
                    cmd.set_err(err.clone());
                    Err(err)
                }
            }
        }
        .boxed()
    }
}
