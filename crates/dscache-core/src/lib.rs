//! dscache core - versioned dataset synchronization cache.
//!
//! This library fetches a versioned dataset (named collections of records)
//! from a remote source once per session, persists it into durable
//! per-collection stores, and serves individual records via fair,
//! non-repeating random sampling:
//!
//! - At-most-one network fetch and repopulation under concurrent callers
//! - All-or-nothing reconciliation against the installed version stamp
//! - Per-collection sampling cycles that stay correct as collections change

pub mod config;
pub mod dataset;
pub mod error;
pub mod fetch;
pub mod reconcile;
pub mod sampler;
pub mod session;
pub mod store;

// Re-export commonly used types
pub use config::Config;
pub use dataset::{Dataset, Record};
pub use error::{Error, FetchError, Result, StoreError};
pub use session::Session;
pub use store::CollectionStore;
