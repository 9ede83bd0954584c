//! In-memory document store
//!
//! A process-local [`DocumentStore`] with full token and expiry semantics:
//! every successful mutation allocates a fresh cas token, conditional
//! replaces compare tokens for equality, and expired documents behave as
//! absent. Intended for tests and embedding; there is no persistence.

use parking_lot::Mutex;
use sediment_core::{DocumentStore, Payload, RawDocument, StoreFailure, StoreResult};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

struct Stored {
    payload: Payload,
    cas: u64,
    expires_at: Option<Instant>,
}

/// Thread-safe in-memory [`DocumentStore`]
pub struct MemoryStore {
    documents: Mutex<HashMap<String, Stored>>,
    // tokens start at 1 so 0 stays "no version observed"
    next_cas: AtomicU64,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryStore {
    /// Empty store
    pub fn new() -> Self {
        Self {
            documents: Mutex::new(HashMap::new()),
            next_cas: AtomicU64::new(1),
        }
    }

    /// Number of live (unexpired) documents
    pub fn len(&self) -> usize {
        let mut docs = self.documents.lock();
        Self::drop_expired(&mut docs);
        docs.len()
    }

    /// True if the store holds no live documents
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Snapshot of all live documents, ordered by key.
    ///
    /// Handy for building view or query executors over the store contents.
    pub fn snapshot(&self) -> Vec<RawDocument> {
        let mut docs = self.documents.lock();
        Self::drop_expired(&mut docs);
        let mut all: Vec<RawDocument> = docs
            .iter()
            .map(|(key, stored)| {
                RawDocument::new(key.clone(), stored.payload.clone()).with_cas(stored.cas)
            })
            .collect();
        all.sort_by(|a, b| a.id.cmp(&b.id));
        all
    }

    fn fresh_cas(&self) -> u64 {
        self.next_cas.fetch_add(1, Ordering::Relaxed)
    }

    fn expires_at(expiry: u32) -> Option<Instant> {
        (expiry != 0).then(|| Instant::now() + Duration::from_secs(u64::from(expiry)))
    }

    fn drop_expired(docs: &mut HashMap<String, Stored>) {
        let now = Instant::now();
        docs.retain(|_, stored| stored.expires_at.map_or(true, |at| at > now));
    }
}

impl DocumentStore for MemoryStore {
    fn get(&self, key: &str) -> StoreResult<Option<(Payload, u64)>> {
        let mut docs = self.documents.lock();
        Self::drop_expired(&mut docs);
        Ok(docs.get(key).map(|s| (s.payload.clone(), s.cas)))
    }

    fn get_and_touch(&self, key: &str, expiry: u32) -> StoreResult<Option<(Payload, u64)>> {
        let mut docs = self.documents.lock();
        Self::drop_expired(&mut docs);
        Ok(docs.get_mut(key).map(|stored| {
            stored.expires_at = Self::expires_at(expiry);
            (stored.payload.clone(), stored.cas)
        }))
    }

    fn insert(&self, key: &str, payload: &Payload, expiry: u32) -> StoreResult<u64> {
        let mut docs = self.documents.lock();
        Self::drop_expired(&mut docs);
        if docs.contains_key(key) {
            return Err(StoreFailure::KeyExists);
        }
        let cas = self.fresh_cas();
        docs.insert(
            key.to_string(),
            Stored {
                payload: payload.clone(),
                cas,
                expires_at: Self::expires_at(expiry),
            },
        );
        Ok(cas)
    }

    fn replace(
        &self,
        key: &str,
        payload: &Payload,
        expected_cas: u64,
        expiry: u32,
    ) -> StoreResult<u64> {
        let mut docs = self.documents.lock();
        Self::drop_expired(&mut docs);
        let stored = docs.get_mut(key).ok_or(StoreFailure::NotFound)?;
        if expected_cas != 0 && stored.cas != expected_cas {
            return Err(StoreFailure::VersionMismatch {
                expected: expected_cas,
                actual: stored.cas,
            });
        }
        stored.payload = payload.clone();
        stored.cas = self.fresh_cas();
        stored.expires_at = Self::expires_at(expiry);
        Ok(stored.cas)
    }

    fn upsert(&self, key: &str, payload: &Payload, expiry: u32) -> StoreResult<u64> {
        let mut docs = self.documents.lock();
        let cas = self.fresh_cas();
        docs.insert(
            key.to_string(),
            Stored {
                payload: payload.clone(),
                cas,
                expires_at: Self::expires_at(expiry),
            },
        );
        Ok(cas)
    }

    fn remove(&self, key: &str) -> StoreResult<()> {
        let mut docs = self.documents.lock();
        Self::drop_expired(&mut docs);
        docs.remove(key).map(|_| ()).ok_or(StoreFailure::NotFound)
    }
}
