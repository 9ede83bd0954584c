//! End-to-end template behavior over the in-memory store

mod concurrency;
mod expiry;
mod persistence;
mod versioning;
mod views;
