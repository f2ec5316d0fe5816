//! Durable per-collection stores backed by redb.
//!
//! One database file holds one table per dataset collection plus a reserved
//! meta table recording which dataset version is currently installed.
//! Population runs inside a single write transaction, so readers observe
//! either the previous contents or the full new contents, never a partial
//! state. The wipe is table-level deletion inside the owned handle, which
//! replaces the close-then-delete dance a database-file deletion would
//! require.

use crate::config::{KeyPolicy, StoreConfig};
use crate::dataset::{Dataset, Record};
use crate::error::StoreError;
use chrono::{DateTime, Utc};
use redb::{Database, ReadableTable, TableDefinition, TableError, TableHandle};
use serde::{Deserialize, Serialize};
use std::fs;
use tracing::{info, warn};

/// Reserved meta table, excluded from the collection namespace.
const META_TABLE: TableDefinition<'static, &'static str, &'static str> =
    TableDefinition::new("__meta");

/// Sentinel key for the single meta row.
const META_KEY: &str = "installed";

/// The durable record of which dataset version is installed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetaRecord {
    /// Version stamp of the installed dataset
    pub version: String,
    /// When the installation committed
    pub installed_at: DateTime<Utc>,
}

/// Durable, transactional key-value stores, one table per collection.
pub struct CollectionStore {
    db: Database,
    key_policy: KeyPolicy,
}

impl CollectionStore {
    /// Open or create the database file at the configured path.
    pub fn open(config: &StoreConfig) -> Result<Self, StoreError> {
        if let Some(parent) = config.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        // An unreadable existing file is inconclusive, same as any other
        // probe failure: discard it and let reconciliation repopulate the
        // fresh empty database.
        let db = match Database::create(&config.path) {
            Ok(db) => db,
            Err(e) if config.path.exists() => {
                warn!(
                    path = %config.path.display(),
                    error = %e,
                    "Existing database is unreadable, discarding it"
                );
                fs::remove_file(&config.path)?;
                Database::create(&config.path)?
            }
            Err(e) => return Err(e.into()),
        };
        info!(path = %config.path.display(), "Collection store opened");

        Ok(Self {
            db,
            key_policy: config.key_policy,
        })
    }

    /// Create an in-memory store. Test backend; nothing survives drop.
    pub fn open_in_memory(key_policy: KeyPolicy) -> Result<Self, StoreError> {
        let db = Database::builder()
            .create_with_backend(redb::backends::InMemoryBackend::new())?;
        Ok(Self { db, key_policy })
    }

    /// Install a dataset: one table per collection plus the meta record,
    /// committed as a single atomic unit.
    pub fn populate(&self, dataset: &Dataset) -> Result<(), StoreError> {
        let txn = self.db.begin_write()?;
        {
            for (name, records) in &dataset.collections {
                let def = TableDefinition::<u64, &[u8]>::new(name.as_str());
                let mut table = txn.open_table(def)?;
                for (index, record) in records.iter().enumerate() {
                    let key = self.key_for(index, record);
                    let bytes = serde_json::to_vec(record)?;
                    // A colliding key would silently drop the earlier record
                    if table.insert(key, bytes.as_slice())?.is_some() {
                        return Err(StoreError::DuplicateKey {
                            collection: name.clone(),
                            key,
                        });
                    }
                }
            }

            let meta = MetaRecord {
                version: dataset.version.clone(),
                installed_at: Utc::now(),
            };
            let json = serde_json::to_string(&meta)?;
            let mut meta_table = txn.open_table(META_TABLE)?;
            meta_table.insert(META_KEY, json.as_str())?;
        }
        txn.commit()?;

        info!(
            version = %dataset.version,
            collections = dataset.collections.len(),
            records = dataset.record_count(),
            "Collection stores populated"
        );

        Ok(())
    }

    /// Delete every table, meta included, in one transaction.
    pub fn wipe(&self) -> Result<(), StoreError> {
        let txn = self.db.begin_write()?;
        let handles: Vec<_> = txn.list_tables()?.collect();
        let count = handles.len();
        for handle in handles {
            txn.delete_table(handle)?;
        }
        txn.commit()?;

        info!(tables = count, "Collection stores wiped");
        Ok(())
    }

    /// Read one record by key. Absent key or absent collection yields `None`.
    pub fn get(&self, collection: &str, key: u64) -> Result<Option<Record>, StoreError> {
        let txn = self.db.begin_read()?;
        let def = TableDefinition::<u64, &[u8]>::new(collection);
        match txn.open_table(def) {
            Ok(table) => match table.get(key)? {
                Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
                None => Ok(None),
            },
            Err(TableError::TableDoesNotExist(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// All live keys of a collection, in key order. Absent collection
    /// yields an empty list.
    pub fn keys(&self, collection: &str) -> Result<Vec<u64>, StoreError> {
        let txn = self.db.begin_read()?;
        let def = TableDefinition::<u64, &[u8]>::new(collection);
        let table = match txn.open_table(def) {
            Ok(table) => table,
            Err(TableError::TableDoesNotExist(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut keys = Vec::new();
        for entry in table.iter()? {
            let (key, _) = entry?;
            keys.push(key.value());
        }
        Ok(keys)
    }

    /// Names of the installed collection tables, meta excluded.
    pub fn collection_names(&self) -> Result<Vec<String>, StoreError> {
        let txn = self.db.begin_read()?;
        let mut names: Vec<String> = txn
            .list_tables()?
            .map(|handle| handle.name().to_string())
            .filter(|name| name != META_TABLE.name())
            .collect();
        names.sort();
        Ok(names)
    }

    /// The installed meta record, if any.
    pub fn installed_version(&self) -> Result<Option<MetaRecord>, StoreError> {
        let txn = self.db.begin_read()?;
        match txn.open_table(META_TABLE) {
            Ok(table) => match table.get(META_KEY)? {
                Some(guard) => Ok(Some(serde_json::from_str(guard.value())?)),
                None => Ok(None),
            },
            Err(TableError::TableDoesNotExist(_)) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn key_for(&self, index: usize, record: &Record) -> u64 {
        match self.key_policy {
            KeyPolicy::Positional => index as u64,
            KeyPolicy::ExplicitId => record
                .get("id")
                .and_then(serde_json::Value::as_u64)
                .unwrap_or(index as u64),
        }
    }
}

impl std::fmt::Debug for CollectionStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CollectionStore")
            .field("key_policy", &self.key_policy)
            .finish_non_exhaustive()
    }
}
