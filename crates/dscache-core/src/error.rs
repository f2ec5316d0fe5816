//! Error types for the dscache core library.
//!
//! Uses hierarchical domain-specific errors following the thiserror pattern.

use thiserror::Error;

/// Result type alias for dscache operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type for dscache.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Dataset fetch error
    #[error("Fetch error: {0}")]
    Fetch(#[from] FetchError),

    /// Destructive wipe failed; durable state may be partial until the
    /// next successful initialization repairs it
    #[error("Wipe failed: {0}")]
    Wipe(#[source] StoreError),

    /// Repopulation failed; durable state may be partial until the
    /// next successful initialization repairs it
    #[error("Populate failed: {0}")]
    Populate(#[source] StoreError),

    /// Store-related error
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
}

/// Errors from retrieving and decoding the remote dataset.
#[derive(Error, Debug)]
pub enum FetchError {
    /// The endpoint answered with a non-success status
    #[error("Dataset endpoint returned status {status}")]
    Status { status: u16 },

    /// Transport-level failure (connect, timeout, body read)
    #[error("Transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body is not a valid dataset document
    #[error("Malformed dataset body: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Errors from the durable collection store.
#[derive(Error, Debug)]
pub enum StoreError {
    /// Read attempted before any successful initialization this session
    #[error("Store not open: no successful initialization in this session")]
    NotOpen,

    /// Failed to open or create the database
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    /// Failed to begin a transaction
    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    /// Failed to open a table within a transaction
    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    /// Low-level storage failure during a read or write
    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    /// Failed to commit a transaction
    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    /// Two records resolved to the same key during population
    #[error("Duplicate key {key} in collection '{collection}'")]
    DuplicateKey { collection: String, key: u64 },

    /// Record (de)serialization failure
    #[error("Record serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Filesystem failure while preparing the database location
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
