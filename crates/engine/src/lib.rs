//! Persistence engine for sediment
//!
//! Binds the mapping layer to a document store:
//! - template: entity-level save/insert/update/find/remove operations
//! - query: view and declarative query result mapping
//! - retry: caller-side read-mutate-save loop for contended writes
//! - memory: in-memory store with full token and expiry semantics

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod memory;
pub mod query;
pub mod retry;
pub mod template;

pub use memory::MemoryStore;
pub use retry::save_with_retry;
pub use template::DocumentTemplate;
