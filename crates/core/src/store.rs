//! Store collaborator traits
//!
//! This module defines the seams between the mapping layer and its external
//! collaborators: the document store client itself plus the view-index and
//! declarative query executors. The mapping layer never talks to a network;
//! it only consumes these traits.
//!
//! Thread safety: implementations must be safe to call concurrently from
//! multiple threads (Send + Sync). Calls may block on I/O; timeouts are the
//! collaborator's concern, not the engine's.

use crate::document::{Payload, RawDocument};
use crate::value::Value;
use thiserror::Error;

/// Result type for store collaborator operations
pub type StoreResult<T> = std::result::Result<T, StoreFailure>;

/// Failure classification reported by a [`DocumentStore`].
///
/// These are collaborator-level conditions. The persistence engine maps
/// `KeyExists` and `VersionMismatch` to the unified optimistic-locking
/// failure; `Backend` passes through uninterpreted.
#[derive(Debug, Error)]
pub enum StoreFailure {
    /// The key is absent
    #[error("key not found")]
    NotFound,

    /// Insert found the key already present
    #[error("key already exists")]
    KeyExists,

    /// Conditional write found a different current token
    #[error("version mismatch: expected {expected}, got {actual}")]
    VersionMismatch {
        /// Token the writer carried
        expected: u64,
        /// Token the store currently holds
        actual: u64,
    },

    /// Network or server failure
    #[error("backend failure: {0}")]
    Backend(String),
}

/// Document store client abstraction.
///
/// Required operations of the external key-value document store. Every
/// successful mutation returns a fresh compare-and-swap token; the engine
/// treats tokens as opaque except for equality.
pub trait DocumentStore: Send + Sync {
    /// Read a document. Returns `None` if the key is absent or expired.
    fn get(&self, key: &str) -> StoreResult<Option<(Payload, u64)>>;

    /// Read a document and reset its expiry countdown to `expiry` seconds
    /// as a side effect of the read (touch-on-read).
    fn get_and_touch(&self, key: &str, expiry: u32) -> StoreResult<Option<(Payload, u64)>>;

    /// Create a document. Fails with `KeyExists` if the key is present.
    ///
    /// `expiry` of 0 means "never expires". Returns the assigned token.
    fn insert(&self, key: &str, payload: &Payload, expiry: u32) -> StoreResult<u64>;

    /// Replace an existing document.
    ///
    /// `expected_cas` of 0 replaces unconditionally (the key must still
    /// exist); a non-zero token makes the write conditional and fails with
    /// `VersionMismatch` if the store holds a different token. Fails with
    /// `NotFound` if the key is absent. Returns the new token.
    fn replace(&self, key: &str, payload: &Payload, expected_cas: u64, expiry: u32)
        -> StoreResult<u64>;

    /// Create or overwrite unconditionally. Returns the new token.
    fn upsert(&self, key: &str, payload: &Payload, expiry: u32) -> StoreResult<u64>;

    /// Delete by key. Fails with `NotFound` if the key is absent.
    fn remove(&self, key: &str) -> StoreResult<()>;
}

/// Descriptor for a view-index lookup.
///
/// Interpreted entirely by the executor; the mapping layer only forwards it
/// and consumes the resulting documents in the order they arrive.
#[derive(Debug, Clone)]
pub struct ViewQuery {
    /// Design document (index namespace) name
    pub design_document: String,
    /// View name within the design document
    pub view_name: String,
    /// Descending order by index key
    pub descending: bool,
    /// Optional result cap
    pub limit: Option<usize>,
}

impl ViewQuery {
    /// Create an ascending, uncapped view query
    pub fn from(design_document: impl Into<String>, view_name: impl Into<String>) -> Self {
        Self {
            design_document: design_document.into(),
            view_name: view_name.into(),
            descending: false,
            limit: None,
        }
    }

    /// Request descending index-key order
    pub fn descending(mut self) -> Self {
        self.descending = true;
        self
    }

    /// Cap the number of rows returned
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// View-index query collaborator.
///
/// Returns full documents in the order defined by the descriptor; the
/// mapping layer performs no re-sorting.
pub trait ViewIndexExecutor {
    /// Run the view lookup and return raw documents as stored.
    fn execute(&self, query: &ViewQuery) -> StoreResult<Vec<RawDocument>>;
}

/// Declarative (SQL-like) query collaborator.
///
/// Returns flat projected rows, consumed row-by-row for projection mapping.
pub trait QueryExecutor {
    /// Run the statement with positional parameters.
    fn execute(&self, statement: &str, params: &[Value]) -> StoreResult<Vec<Payload>>;
}
