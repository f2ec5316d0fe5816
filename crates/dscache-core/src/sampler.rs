//! Fair, non-repeating random sampling over collection keys.
//!
//! The sampler tracks served keys per collection in memory. Within one
//! cycle (empty used-set to full) every live key is returned at most once;
//! the cycle then restarts automatically. The used-set is never persisted,
//! so fairness does not span process restarts. Collections cycle
//! independently of one another.

use crate::error::StoreError;
use crate::store::CollectionStore;
use parking_lot::Mutex;
use rand::Rng;
use std::collections::{HashMap, HashSet};
use tracing::debug;

/// Per-collection non-repeating key sampler.
#[derive(Debug, Default)]
pub struct Sampler {
    /// Keys already served this cycle, per collection. Only touched inside
    /// non-suspending code, so a plain mutex suffices.
    used: Mutex<HashMap<String, HashSet<u64>>>,
}

impl Sampler {
    /// Create a sampler with empty cycle state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick a key from the named collection that has not been served this
    /// cycle, or `None` if the collection is empty.
    pub fn pick_key(
        &self,
        store: &CollectionStore,
        collection: &str,
    ) -> Result<Option<u64>, StoreError> {
        let live = store.keys(collection)?;
        if live.is_empty() {
            return Ok(None);
        }

        let mut used_map = self.used.lock();
        let used = used_map.entry(collection.to_string()).or_default();

        if used.len() >= live.len() {
            debug!(collection, cycle_len = used.len(), "Sampling cycle complete");
            used.clear();
        }

        let candidates: Vec<u64> = live.iter().copied().filter(|k| !used.contains(k)).collect();

        // Guards the race where keys shrank between the size check and the
        // filter
        if candidates.is_empty() {
            return Ok(None);
        }

        let choice = candidates[rand::rng().random_range(0..candidates.len())];
        used.insert(choice);
        Ok(Some(choice))
    }
}
