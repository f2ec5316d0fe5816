//! Version reconciliation between installed stores and a fetched dataset.
//!
//! Probe failures are inconclusive and resolve to repopulation; rebuilding
//! is always preferred over serving possibly-stale or corrupt data.

use crate::store::CollectionStore;
use tracing::{debug, warn};

/// Reconciliation outcome for an initialization attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Installed stores match the fetched version; keep them
    Reuse,
    /// Installed stores are stale, absent, or unreadable; wipe and rebuild
    Repopulate(Reason),
}

/// Why a repopulation was decided.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reason {
    /// The store holds no collection tables at all
    EmptyStore,
    /// No meta record is installed
    MetaMissing,
    /// The installed version differs from the fetched one
    VersionChanged,
    /// The store could not be probed
    ProbeFailed,
}

/// Decide whether installed stores can serve the fetched dataset version.
pub fn decide(store: &CollectionStore, fetched_version: &str) -> Outcome {
    let names = match store.collection_names() {
        Ok(names) => names,
        Err(e) => {
            warn!(error = %e, "Store probe failed, forcing repopulation");
            return Outcome::Repopulate(Reason::ProbeFailed);
        }
    };

    if names.is_empty() {
        return Outcome::Repopulate(Reason::EmptyStore);
    }

    match store.installed_version() {
        Ok(Some(meta)) if meta.version == fetched_version => {
            debug!(version = %meta.version, "Installed version matches, reusing stores");
            Outcome::Reuse
        }
        Ok(Some(meta)) => {
            debug!(
                installed = %meta.version,
                fetched = %fetched_version,
                "Installed version is stale"
            );
            Outcome::Repopulate(Reason::VersionChanged)
        }
        Ok(None) => Outcome::Repopulate(Reason::MetaMissing),
        Err(e) => {
            warn!(error = %e, "Meta probe failed, forcing repopulation");
            Outcome::Repopulate(Reason::ProbeFailed)
        }
    }
}
