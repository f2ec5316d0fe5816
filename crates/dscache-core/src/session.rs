//! Session coordination: one fetch, one repopulation, shared handles.
//!
//! The session owns two forward-only memos for the lifetime of the process:
//! the initialized dataset and the open store handle. Concurrent
//! `initialize` callers collapse onto one fetch/populate cycle. A failed
//! initialization clears the memo so the next call retries; a success is
//! permanent for the session's lifetime.

use crate::config::Config;
use crate::dataset::{Dataset, Record};
use crate::error::{Error, Result, StoreError};
use crate::fetch::{DatasetSource, HttpSource};
use crate::reconcile::{self, Outcome};
use crate::sampler::Sampler;
use crate::store::CollectionStore;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info};

/// Session coordinator for the dataset cache.
pub struct Session {
    config: Config,
    source: Arc<dyn DatasetSource>,
    /// Memoized open store handle; set on first open, never replaced
    store: OnceCell<Arc<CollectionStore>>,
    /// Memoized initialization outcome. Holding this lock across the
    /// fetch/populate cycle is what serializes concurrent initializers
    /// and prevents overlapping wipes.
    init: Mutex<Option<Arc<Dataset>>>,
    sampler: Sampler,
}

impl Session {
    /// Create a session fetching over HTTP from the configured source.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let source = Arc::new(HttpSource::new(&config.source)?);
        Ok(Self::assemble(config, source))
    }

    /// Create a session with an injected dataset source.
    pub fn with_source(config: Config, source: Arc<dyn DatasetSource>) -> Result<Self> {
        config.validate()?;
        Ok(Self::assemble(config, source))
    }

    fn assemble(config: Config, source: Arc<dyn DatasetSource>) -> Self {
        Self {
            config,
            source,
            store: OnceCell::new(),
            init: Mutex::new(None),
            sampler: Sampler::new(),
        }
    }

    /// Fetch, reconcile, and install the dataset, memoizing the result.
    ///
    /// Concurrent callers all receive the same resolved dataset; at most
    /// one fetch and one wipe/populate cycle runs per session.
    pub async fn initialize(&self) -> Result<Arc<Dataset>> {
        let mut memo = self.init.lock().await;
        if let Some(dataset) = memo.as_ref() {
            debug!("Initialization already complete, serving memo");
            return Ok(dataset.clone());
        }

        let dataset = Arc::new(self.source.fetch().await?);
        let store = self.open_handle().await?;

        match reconcile::decide(&store, &dataset.version) {
            Outcome::Reuse => {
                info!(version = %dataset.version, "Installed stores are current, reusing");
            }
            Outcome::Repopulate(reason) => {
                info!(
                    version = %dataset.version,
                    reason = ?reason,
                    "Rebuilding collection stores"
                );
                store.wipe().map_err(Error::Wipe)?;
                store.populate(&dataset).map_err(Error::Populate)?;
            }
        }

        *memo = Some(dataset.clone());
        Ok(dataset)
    }

    /// Open (or return the memoized) store handle without fetching.
    pub async fn open_handle(&self) -> Result<Arc<CollectionStore>> {
        let store = self
            .store
            .get_or_try_init(|| async { CollectionStore::open(&self.config.store).map(Arc::new) })
            .await?;
        Ok(store.clone())
    }

    /// Sample one record from the named collection.
    ///
    /// Returns `None` for an empty or absent collection. Errors with
    /// `StoreError::NotOpen` when no handle has been opened this session,
    /// which is a programmer error in the call order.
    pub fn get_from_store(&self, collection: &str) -> Result<Option<Record>> {
        let store = self.store.get().cloned().ok_or(StoreError::NotOpen)?;

        let Some(key) = self.sampler.pick_key(&store, collection)? else {
            return Ok(None);
        };
        Ok(store.get(collection, key)?)
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
