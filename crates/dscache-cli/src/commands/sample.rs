//! Sample command implementation.

use anyhow::Result;
use dscache_core::{Config, Session};

/// Sample records from a collection.
///
/// Offline mode opens the installed stores without fetching; it requires a
/// previous successful sync.
pub async fn run(config: Config, collection: &str, count: usize, offline: bool) -> Result<()> {
    let session = Session::new(config)?;

    if offline {
        session.open_handle().await?;
    } else {
        session.initialize().await?;
    }

    for _ in 0..count {
        match session.get_from_store(collection)? {
            Some(record) => println!("{}", serde_json::to_string(&record)?),
            None => {
                println!("Collection '{}' is empty", collection);
                break;
            }
        }
    }

    Ok(())
}
