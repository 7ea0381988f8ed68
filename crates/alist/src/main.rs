use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use alistfs::{BackendRegistry, Config};

mod cli;

use cli::op::{Op, OpContext};
use cli::ops::Command;

const DEFAULT_LOG_FILTER: &str = "alistfs=info";

#[derive(Parser, Debug)]
#[command(name = "alistfs", version, about = "Work with files on Alist servers")]
struct Args {
    /// Path to config.toml (defaults to the platform config directory)
    #[arg(long, global = true, env = "ALISTFS_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

/// Logs go to stderr so command output on stdout stays clean
fn init_tracing() -> WorkerGuard {
    let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_target(false),
        )
        .init();
    guard
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let _guard = init_tracing();

    let config = Config::load(args.config.as_deref()).context("failed to load configuration")?;

    let cancel = CancellationToken::new();
    let on_signal = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupted, cancelling");
            on_signal.cancel();
        }
    });

    let ctx = OpContext::new(config, BackendRegistry::with_defaults(), cancel);
    let output = args.command.execute(&ctx).await?;
    println!("{output}");
    Ok(())
}
