//! Beacon - Analytics event client
//!
//! # Usage
//!
//! ```bash
//! # Send newline-delimited JSON events from a file
//! beacon --config beacon.toml send --file events.ndjson
//!
//! # Send from stdin
//! echo '{"type":"track","event":"Opened"}' | beacon send
//!
//! # Upload batches left by earlier runs
//! beacon flush
//!
//! # Show cursor, pending batches and identity
//! beacon status --json
//! ```

mod client;
mod cmd;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use beacon_config::{Config, LogFormat};
use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Beacon - Analytics event client
#[derive(Parser, Debug)]
#[command(name = "beacon")]
#[command(version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to configuration file
    #[arg(short, long, global = true, default_value = "beacon.toml")]
    config: PathBuf,

    /// Write key. Overrides config file.
    #[arg(short, long, global = true, env = "BEACON_WRITE_KEY")]
    write_key: Option<String>,

    /// Log level (trace, debug, info, warn, error). Overrides config file.
    #[arg(short, long, global = true)]
    log_level: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send newline-delimited JSON events
    Send(cmd::send::SendArgs),

    /// Upload every stored batch
    Flush(cmd::flush::FlushArgs),

    /// Show local storage and identity state
    Status(cmd::status::StatusArgs),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_config(&cli.config, cli.write_key.as_deref())?;

    let log_filter = config.log.filter_directive(cli.log_level.as_deref());
    init_logging(&log_filter, config.log.format)?;

    match cli.command {
        Command::Send(args) => cmd::send::run(args, config).await,
        Command::Flush(args) => cmd::flush::run(args, config).await,
        Command::Status(args) => cmd::status::run(args, config).await,
    }
}

/// Load configuration: config file if present, then the write key override
fn load_config(path: &Path, write_key: Option<&str>) -> Result<Config> {
    let mut config = if path.exists() {
        Config::from_file(path)
            .with_context(|| format!("failed to load config from {}", path.display()))?
    } else if let Some(key) = write_key {
        Config::for_write_key(key)
    } else {
        bail!(
            "config file {} not found and no write key given",
            path.display()
        );
    };

    if let Some(key) = write_key {
        config.write_key = key.to_string();
    }
    config.validate().context("invalid configuration")?;

    Ok(config)
}

/// Initialize the tracing subscriber for logging
///
/// Logs go to stderr so command output on stdout stays machine-readable.
fn init_logging(directive: &str, format: LogFormat) -> Result<()> {
    let filter = EnvFilter::try_new(directive)
        .or_else(|_| EnvFilter::try_new("info"))
        .map_err(|e| anyhow::anyhow!("invalid log level: {}", e))?;

    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_target(true).with_writer(std::io::stderr))
            .init(),
        LogFormat::Console => registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_thread_ids(false)
                    .with_writer(std::io::stderr),
            )
            .init(),
    }

    Ok(())
}
