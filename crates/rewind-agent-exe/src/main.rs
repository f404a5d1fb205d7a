//! Command-line entry point for the rewind memory trainer.
//!
//! Loads one target configuration per file, starts the agent against
//! the Win32 backend, and wires Ctrl-C into cooperative shutdown.

use anyhow::Context;
use clap::Parser;
use rewind_common::{init_logging, Config, LogConfig};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "rewind")]
#[command(about = "Keyboard-driven memory trainer for speedrun practice")]
#[command(version)]
struct Args {
    /// Target configuration files (INI format, one target per file)
    #[arg(required = true)]
    config: Vec<PathBuf>,

    /// Log level: trace, debug, info, warn, error
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Append logs to this file in addition to stderr
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Validate the configuration and exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut log_config = LogConfig::default().with_level(&args.log_level);
    if let Some(path) = &args.log_file {
        log_config = log_config.with_file(&path.to_string_lossy());
    }
    init_logging(&log_config);

    let config = Config::load_files(&args.config).context("failed to load configuration")?;

    if args.check {
        println!("configuration OK: {} target(s)", config.targets.len());
        return Ok(());
    }

    run_agent(config).await
}

#[cfg(windows)]
async fn run_agent(config: Config) -> anyhow::Result<()> {
    use rewind_agent::{Agent, LogNotifier};
    use rewind_common::Error;
    use rewind_core::{LowLevelKeyboardHook, Win32Host};
    use std::sync::Arc;
    use tokio::sync::watch;
    use tracing::info;

    let agent = Agent::new(
        Arc::new(Win32Host),
        Arc::new(LowLevelKeyboardHook),
        Arc::new(LogNotifier),
    );

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!(target: "rewind", "interrupt received, shutting down");
            let _ = shutdown_tx.send(true);
        }
    });

    match agent.run(config, shutdown_rx).await {
        Ok(()) => Ok(()),
        Err(Error::Cancelled) => {
            info!(target: "rewind", "stopped");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(not(windows))]
async fn run_agent(_config: Config) -> anyhow::Result<()> {
    anyhow::bail!("rewind drives Win32 process and keyboard APIs and only runs on Windows")
}
