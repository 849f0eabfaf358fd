//! Status command - Show local storage and identity state
//!
//! Nothing is fetched or uploaded. Opening the store may mint an anonymous
//! id or repair the batch cursor, so preferences are synced before exit.

use anyhow::Result;
use beacon_config::Config;
use clap::Args;

use crate::client::Client;

/// Status command arguments
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Output as JSON
    #[arg(long)]
    pub json: bool,
}

/// Run the status command
pub async fn run(args: StatusArgs, config: Config) -> Result<()> {
    let client = Client::new(config)?;
    let status = client.status()?;
    client.persist()?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!("write key:       {}", status.write_key);
    println!("file index:      {}", status.file_index);
    println!("pending batches: {}", status.pending_batches.len());
    for batch in &status.pending_batches {
        println!("  {}", batch);
    }
    println!("anonymous id:    {}", status.anonymous_id);
    println!(
        "user id:         {}",
        status.user_id.as_deref().unwrap_or("-")
    );
    println!("integrations:    {}", status.integrations.join(", "));
    Ok(())
}
