//! kvtrace: run key-value commands through a traced client.
//!
//! Builds a single-node, cluster or ring client over the in-process store,
//! wraps it with the tracing hook and runs each command given on the command
//! line. Spans go to the log through `tracing`, or are printed as JSON with
//! `--dump-spans`.
//!
//! ```text
//! kvtrace "set greeting hello" "get greeting"
//! kvtrace --pipeline --addr 10.0.0.1:6379 --addr 10.0.0.2:6379 "incr hits" "get hits"
//! kvtrace --dump-spans --db 3 "ping"
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use kvtrace::config::{load_config, validate_config, ClientMode, KvTraceConfig, LogFormat};
use kvtrace::kv::{Cmd, Cmdable, MemoryExecutor};
use kvtrace::observability::logging::init_logging;
use kvtrace::observability::{MockTracer, Tracer, TracingTracer};
use kvtrace::{wrap_client, Context};

#[derive(Parser)]
#[command(name = "kvtrace")]
#[command(about = "Run key-value commands through a traced client", long_about = None)]
struct Cli {
    /// TOML configuration file; flags override it.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Node address (repeat for a cluster).
    #[arg(short, long = "addr")]
    addrs: Vec<String>,

    #[arg(short, long, value_enum)]
    mode: Option<ClientMode>,

    /// Logical database index.
    #[arg(long)]
    db: Option<u32>,

    /// Run all commands as one pipeline.
    #[arg(short, long)]
    pipeline: bool,

    /// Cancel the calling context after this many milliseconds.
    #[arg(long)]
    timeout_ms: Option<u64>,

    /// Record spans in memory and print them as JSON when done.
    #[arg(long)]
    dump_spans: bool,

    /// Emit logs as JSON.
    #[arg(long)]
    json: bool,

    /// Commands, one per argument, e.g. "set k v".
    #[arg(required = true)]
    commands: Vec<String>,
}

impl Cli {
    fn apply(&self, config: &mut KvTraceConfig) {
        if !self.addrs.is_empty() {
            config.client.addrs = self.addrs.clone();
        }
        if let Some(mode) = self.mode {
            config.client.mode = mode;
        }
        if self.db.is_some() {
            config.client.db = self.db;
        }
        if self.json {
            config.logging.format = LogFormat::Json;
        }
    }

    fn cmds(&self) -> Vec<Cmd> {
        self.commands
            .iter()
            .map(|line| Cmd::new(line.split_whitespace()))
            .filter(|cmd| !cmd.args().is_empty())
            .collect()
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => KvTraceConfig::default(),
    };
    cli.apply(&mut config);
    if let Err(errors) = validate_config(&config) {
        for err in &errors {
            eprintln!("config: {err}");
        }
        return Err("invalid configuration".into());
    }

    init_logging(&config.logging);
    tracing::info!(
        mode = %config.client.resolved_mode(),
        commands = cli.commands.len(),
        pipeline = cli.pipeline,
        "kvtrace v0.1.0 starting"
    );

    let mock = Arc::new(MockTracer::new());
    let tracer: Arc<dyn Tracer> = if cli.dump_spans {
        mock.clone()
    } else {
        Arc::new(TracingTracer::new())
    };

    let ctx = match cli.timeout_ms {
        Some(ms) => Context::with_timeout(&Context::background(), Duration::from_millis(ms)),
        None => Context::background(),
    };

    let client = config.client.build(Arc::new(MemoryExecutor::new()));
    let client = wrap_client(Some(&ctx), Some(client), tracer)?;

    let cmds = cli.cmds();
    if cli.pipeline {
        let cmds = client.pipelined(cmds).await?;
        for cmd in &cmds {
            print_reply(cmd);
        }
    } else {
        for mut cmd in cmds {
            // Errors are already on the command.
            let _ = client.process(&mut cmd).await;
            print_reply(&cmd);
        }
    }

    if cli.dump_spans {
        let records: Vec<_> = mock.finished_spans().iter().map(|s| s.record()).collect();
        println!("{}", serde_json::to_string_pretty(&records)?);
    }

    Ok(())
}

fn print_reply(cmd: &Cmd) {
    let line = cmd.args().join(" ");
    match (cmd.err(), cmd.reply()) {
        (Some(err), _) => println!("{line} => (error) {err}"),
        (None, Some(reply)) => println!("{line} => {reply}"),
        (None, None) => println!("{line} => (nil)"),
    }
}
