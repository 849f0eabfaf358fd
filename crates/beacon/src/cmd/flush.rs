//! Flush command - Upload every batch already in local storage

use anyhow::Result;
use beacon_config::Config;
use clap::Args;

use crate::client::Client;

/// Flush command arguments
#[derive(Args, Debug)]
pub struct FlushArgs {}

/// Run the flush command
pub async fn run(_args: FlushArgs, config: Config) -> Result<()> {
    let client = Client::new(config)?;
    client.start().await;

    let before = client.storage().pending_batches()?.len();
    client.flush().await?;
    let after = client.storage().pending_batches()?.len();

    client.shutdown().await;

    let m = client.metrics();
    println!(
        "{} batches pending before, {} after ({} uploaded, {} discarded, {} kept for retry)",
        before, after, m.batches_uploaded, m.batches_discarded, m.batches_retained
    );
    Ok(())
}
