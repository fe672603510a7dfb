use std::{io, path::PathBuf};

use anyhow::Context as _;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use texrender::{ServeMode, Worker, WorkerConfig};

/// Sandboxed render worker. Reads framed requests on stdin, writes framed responses on
/// stdout. Logs go to stderr.
#[derive(Parser, Debug)]
#[command(name = "texrender", version)]
struct Cli {
    /// Worker configuration JSON. Built-in defaults are used when omitted.
    #[arg(long)]
    config: Option<PathBuf>,

    /// Keep serving requests until stdin closes instead of exiting after one.
    #[arg(long)]
    persistent: bool,

    /// Print the effective configuration as JSON and exit without serving.
    #[arg(long)]
    print_config: bool,
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let cfg = match &cli.config {
        Some(path) => WorkerConfig::from_json_file(path)
            .with_context(|| format!("load config '{}'", path.display()))?,
        None => WorkerConfig::default(),
    };

    if cli.print_config {
        println!("{}", serde_json::to_string_pretty(&cfg)?);
        return Ok(());
    }

    init_tracing(&cfg.log_filter)?;

    let mode = if cli.persistent {
        ServeMode::Persistent
    } else {
        ServeMode::SingleShot
    };
    let worker = Worker::new(cfg).context("build worker")?;

    let mut input = io::stdin().lock();
    let output = io::stdout().lock();
    match worker.serve(&mut input, output, mode) {
        Ok(summary) => {
            tracing::info!(?mode, ?summary, "worker finished");
            Ok(())
        }
        Err(err) => {
            tracing::error!(error = %err, protocol = err.is_protocol(), "worker aborted");
            Err(err.into())
        }
    }
}

/// Logs must never touch stdout; it carries response frames.
fn init_tracing(default_filter: &str) -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .with_context(|| format!("invalid log filter '{default_filter}'"))?;
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(true)
        .try_init()
        .map_err(|e| anyhow::anyhow!("install tracing subscriber: {e}"))
}
