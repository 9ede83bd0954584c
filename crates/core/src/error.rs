//! Error types for the mapping layer
//!
//! One taxonomy for everything user-visible. The only guarantee callers
//! should rely on is that concurrency failures are a single, distinguishable
//! kind (`OptimisticLocking`) so retry loops can key on it alone.
//! We use `thiserror` for automatic `Display` and `Error` trait
//! implementations.

use thiserror::Error;

/// Result type alias for mapping-layer operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error taxonomy for the mapping layer
#[derive(Debug, Error)]
pub enum Error {
    /// Malformed type declaration, surfaced at resolve time. Fatal: the
    /// declaration itself must be fixed, retrying cannot help.
    #[error("metadata error: {0}")]
    Metadata(String),

    /// Malformed or precision-losing data encountered while converting a
    /// single field or document. Does not abort sibling documents in a
    /// batch being mapped from a query result.
    #[error("conversion error: {0}")]
    Conversion(String),

    /// A document could not be reconstructed into the requested type, e.g.
    /// a missing or unregistered type discriminator.
    #[error("read error: {0}")]
    Read(String),

    /// Unified concurrency failure: version token mismatch on a conditional
    /// write, or duplicate key on insert. Always recoverable by re-reading
    /// and reapplying; never retried internally.
    #[error("optimistic locking failure: {0}")]
    OptimisticLocking(String),

    /// Absent key on a remove or on a versioned write that required the key
    /// to exist. A find on an absent key is NOT an error; it returns `None`.
    #[error("document not found: {key}")]
    NotFound {
        /// The key that was absent
        key: String,
    },

    /// Failure from the store collaborator (network, server). Propagated
    /// unchanged, never interpreted.
    #[error("store error: {0}")]
    Store(String),
}

impl Error {
    /// True for the unified concurrency-failure kind.
    ///
    /// Client retry loops should key on this alone.
    pub fn is_optimistic_locking(&self) -> bool {
        matches!(self, Error::OptimisticLocking(_))
    }

    /// True for an absent-key failure
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound { .. })
    }
}
