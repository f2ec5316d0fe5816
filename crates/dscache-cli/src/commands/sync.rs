//! Sync command implementation.

use anyhow::Result;
use dscache_core::{Config, Session};
use tracing::info;

/// Fetch the dataset and reconcile the local stores.
pub async fn run(config: Config) -> Result<()> {
    info!(url = %config.source.url, "Starting dataset sync");

    let session = Session::new(config)?;
    let dataset = session.initialize().await?;

    println!("Dataset version {} installed", dataset.version);
    for (name, records) in &dataset.collections {
        println!("  {}: {} records", name, records.len());
    }

    Ok(())
}
