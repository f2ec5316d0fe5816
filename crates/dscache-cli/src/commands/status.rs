//! Status command implementation.

use anyhow::Result;
use dscache_core::{Config, Session};

/// Show the installed version and per-collection key counts without
/// touching the network.
pub async fn run(config: Config) -> Result<()> {
    let session = Session::new(config)?;
    let store = session.open_handle().await?;

    match store.installed_version()? {
        Some(meta) => {
            println!(
                "Installed version: {} (installed at {})",
                meta.version, meta.installed_at
            );
        }
        None => {
            println!("No dataset installed");
            println!("Run: dscache sync --config <path-to-config>");
            return Ok(());
        }
    }

    for name in store.collection_names()? {
        let keys = store.keys(&name)?;
        println!("  {}: {} keys", name, keys.len());
    }

    Ok(())
}
