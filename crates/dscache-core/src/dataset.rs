//! Dataset model for the versioned collection bundle.
//!
//! The wire format is a single JSON object whose top-level keys are
//! collection names (or numeric-string sheet indices) mapping to arrays of
//! record objects, plus a reserved `version` key holding an ISO-8601
//! timestamp string:
//!
//! ```json
//! {"0": [{"id": 1, "text": "..."}], "version": "2024-01-01T00:00:00.000Z"}
//! ```
//!
//! The producer must bump `version` whenever the content changes; version
//! equality is the sole staleness signal.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A single record: an opaque mapping of field name to JSON value.
///
/// Field shape is a contract between producer and consumer; the core does
/// not validate it.
pub type Record = serde_json::Map<String, serde_json::Value>;

/// The versioned bundle of named collections fetched from the server.
///
/// Immutable once fetched; a new instance is produced on every
/// initialization attempt.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct Dataset {
    /// Version stamp set by the producer
    pub version: String,

    /// Collection name to ordered record list
    #[serde(flatten)]
    pub collections: BTreeMap<String, Vec<Record>>,
}

impl Dataset {
    /// Total number of records across all collections.
    pub fn record_count(&self) -> usize {
        self.collections.values().map(Vec::len).sum()
    }

    /// Whether the dataset carries no collections at all.
    pub fn is_empty(&self) -> bool {
        self.collections.is_empty()
    }
}
