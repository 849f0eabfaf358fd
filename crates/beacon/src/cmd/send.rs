//! Send command - Feed newline-delimited JSON events through the client
//!
//! # Usage
//!
//! ```bash
//! beacon send --file events.ndjson
//! cat events.ndjson | beacon send
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use beacon_config::Config;
use beacon_protocol::Event;
use clap::Args;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};

use crate::client::Client;

/// Send command arguments
#[derive(Args, Debug)]
pub struct SendArgs {
    /// Read events from this file instead of stdin
    #[arg(short, long)]
    pub file: Option<PathBuf>,
}

/// Run the send command
pub async fn run(args: SendArgs, config: Config) -> Result<()> {
    let client = Client::new(config)?;
    client.start().await;

    let summary = match &args.file {
        Some(path) => {
            let file = tokio::fs::File::open(path)
                .await
                .with_context(|| format!("failed to open {}", path.display()))?;
            send_lines(&client, BufReader::new(file)).await?
        }
        None => send_lines(&client, BufReader::new(tokio::io::stdin())).await?,
    };

    client.shutdown().await;

    let metrics = client.metrics();
    println!(
        "sent {} events ({} skipped, {} dropped by plugins), {} batches uploaded",
        summary.sent, summary.skipped, summary.dropped, metrics.batches_uploaded
    );
    Ok(())
}

#[derive(Debug, Default)]
struct Summary {
    sent: usize,
    skipped: usize,
    dropped: usize,
}

async fn send_lines<R>(client: &Client, reader: R) -> Result<Summary>
where
    R: AsyncBufRead + Unpin,
{
    let mut lines = reader.lines();
    let mut summary = Summary::default();
    let mut line_no = 0usize;

    while let Some(line) = lines.next_line().await.context("failed to read input")? {
        line_no += 1;
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let event = match Event::from_json(line) {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(line = line_no, error = %e, "skipping malformed event");
                summary.skipped += 1;
                continue;
            }
        };

        match client.process(event).await {
            Some(_) => summary.sent += 1,
            None => summary.dropped += 1,
        }
    }

    Ok(summary)
}
