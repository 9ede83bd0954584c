//! Core types and traits for sediment
//!
//! This crate defines the foundational types used throughout the mapping
//! layer:
//! - Value: unified value enum for document payloads
//! - Payload: insertion-ordered key-value map
//! - RawDocument: generic document (id + cas token + payload + expiry)
//! - Error: error type hierarchy
//! - Store traits: DocumentStore, ViewIndexExecutor, QueryExecutor

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod document;
pub mod error;
pub mod store;
pub mod value;

// Re-export commonly used types and traits
pub use document::{Payload, RawDocument};
pub use error::{Error, Result};
pub use store::{
    DocumentStore, QueryExecutor, StoreFailure, StoreResult, ViewIndexExecutor, ViewQuery,
};
pub use value::Value;
