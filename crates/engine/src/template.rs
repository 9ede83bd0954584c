//! Persistence template
//!
//! [`DocumentTemplate`] binds a [`DocumentStore`] to a [`MappingConverter`]
//! and exposes the entity-level operations: save, insert, update, find,
//! exists, remove. Concurrency control is optimistic throughout — a write
//! carrying a stale version token fails with `Error::OptimisticLocking`
//! and is never retried internally; callers re-read and reapply (see
//! [`save_with_retry`](crate::save_with_retry)).

use sediment_core::{DocumentStore, Error, RawDocument, Result, StoreFailure};
use sediment_mapping::{resolve, Entity, MappingConverter};
use tracing::debug;
use uuid::Uuid;

/// Entity-level persistence operations over a document store.
///
/// Generic over the store so tests run against
/// [`MemoryStore`](crate::MemoryStore) and production binds a real client.
pub struct DocumentTemplate<S> {
    store: S,
    converter: MappingConverter,
}

impl<S: DocumentStore> DocumentTemplate<S> {
    /// Template with a default-configured converter
    pub fn new(store: S) -> Self {
        Self::with_converter(store, MappingConverter::new())
    }

    /// Template with a custom-configured converter
    pub fn with_converter(store: S, converter: MappingConverter) -> Self {
        Self { store, converter }
    }

    /// The converter, e.g. for registering custom conversions
    pub fn converter(&self) -> &MappingConverter {
        &self.converter
    }

    /// The underlying store
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Persist an entity, creating or overwriting as appropriate.
    ///
    /// An entity without an identity gets a generated one and is created
    /// with insert semantics. A versioned entity carrying a non-zero token
    /// writes conditionally: the write succeeds only against the exact
    /// document revision the token was read from, otherwise
    /// `Error::OptimisticLocking`. A zero token (or an unversioned type)
    /// writes unconditionally.
    ///
    /// On success the entity carries the freshly assigned token.
    pub fn save<T: Entity>(&self, entity: &mut T) -> Result<()> {
        let mapping = resolve::<T>()?;
        let fresh_identity = mapping.id_of(entity).is_none();
        self.ensure_id(&mapping, entity);
        let doc = self.converter.write(entity)?;
        let expiry = doc.expiry.unwrap_or(0);

        let held = mapping.version_of(entity).unwrap_or(0);
        let written = if fresh_identity {
            self.store
                .insert(&doc.id, &doc.payload, expiry)
                .map_err(|f| concurrency_error(&doc.id, f))?
        } else if held != 0 {
            self.store
                .replace(&doc.id, &doc.payload, held, expiry)
                .map_err(|f| concurrency_error(&doc.id, f))?
        } else {
            self.store
                .upsert(&doc.id, &doc.payload, expiry)
                .map_err(|f| concurrency_error(&doc.id, f))?
        };
        debug!(key = %doc.id, cas = written, "saved");
        mapping.assign_version(entity, written);
        Ok(())
    }

    /// Persist a batch with [`save`](Self::save) semantics, stopping at
    /// the first failure.
    pub fn save_all<T: Entity>(&self, entities: &mut [T]) -> Result<()> {
        for entity in entities {
            self.save(entity)?;
        }
        Ok(())
    }

    /// Create a document that must not exist yet.
    ///
    /// An already-present key fails with `Error::OptimisticLocking` and
    /// leaves the entity untouched, version token included.
    pub fn insert<T: Entity>(&self, entity: &mut T) -> Result<()> {
        let mapping = resolve::<T>()?;
        self.ensure_id(&mapping, entity);
        let doc = self.converter.write(entity)?;

        let written = self
            .store
            .insert(&doc.id, &doc.payload, doc.expiry.unwrap_or(0))
            .map_err(|f| concurrency_error(&doc.id, f))?;
        debug!(key = %doc.id, cas = written, "inserted");
        mapping.assign_version(entity, written);
        Ok(())
    }

    /// Overwrite a document that already exists.
    ///
    /// An absent key is a silent no-op: nothing is created and the call
    /// returns `Ok`. A versioned entity writes conditionally as in
    /// [`save`](Self::save).
    pub fn update<T: Entity>(&self, entity: &mut T) -> Result<()> {
        let mapping = resolve::<T>()?;
        let doc = self.converter.write(entity)?;
        let held = mapping.version_of(entity).unwrap_or(0);

        match self
            .store
            .replace(&doc.id, &doc.payload, held, doc.expiry.unwrap_or(0))
        {
            Ok(written) => {
                debug!(key = %doc.id, cas = written, "updated");
                mapping.assign_version(entity, written);
                Ok(())
            }
            Err(StoreFailure::NotFound) => {
                debug!(key = %doc.id, "update of absent key, nothing written");
                Ok(())
            }
            Err(failure) => Err(concurrency_error(&doc.id, failure)),
        }
    }

    /// Look up an entity by key. Absent (or expired) keys are `Ok(None)`.
    ///
    /// For types declaring touch-on-read, the read also resets the expiry
    /// countdown.
    pub fn find_by_id<T: Entity>(&self, id: &str) -> Result<Option<T>> {
        let mapping = resolve::<T>()?;
        let fetched = if mapping.touch_on_read() {
            // validated at resolve time: touch-on-read implies expiry
            let expiry = mapping.expiry().unwrap_or(0);
            self.store.get_and_touch(id, expiry)
        } else {
            self.store.get(id)
        }
        .map_err(store_error)?;

        match fetched {
            Some((payload, cas)) => {
                let doc = RawDocument::new(id, payload).with_cas(cas);
                Ok(Some(self.converter.read(&doc)?))
            }
            None => Ok(None),
        }
    }

    /// True if the key currently holds a live document
    pub fn exists(&self, id: &str) -> Result<bool> {
        Ok(self.store.get(id).map_err(store_error)?.is_some())
    }

    /// Delete the document backing an entity.
    ///
    /// The entity must carry an identity; an absent key is
    /// `Error::NotFound`.
    pub fn remove<T: Entity>(&self, entity: &T) -> Result<()> {
        let mapping = resolve::<T>()?;
        let id = mapping.id_of(entity).ok_or_else(|| {
            Error::Conversion(format!(
                "{} entity has no identity assigned",
                mapping.type_name()
            ))
        })?;
        self.remove_by_id(&id)
    }

    /// Delete by key. An absent key is `Error::NotFound`.
    pub fn remove_by_id(&self, id: &str) -> Result<()> {
        match self.store.remove(id) {
            Ok(()) => {
                debug!(key = %id, "removed");
                Ok(())
            }
            Err(StoreFailure::NotFound) => Err(Error::NotFound { key: id.to_string() }),
            Err(failure) => Err(store_error(failure)),
        }
    }

    fn ensure_id<T: Entity>(
        &self,
        mapping: &sediment_mapping::EntityMapping<T>,
        entity: &mut T,
    ) {
        if mapping.id_of(entity).is_none() {
            let generated = Uuid::new_v4().simple().to_string();
            debug!(key = %generated, "generated identity");
            mapping.assign_id(entity, generated);
        }
    }
}

/// Map a write-path store failure: concurrency conditions unify under
/// `OptimisticLocking`, everything else passes through as a store error.
fn concurrency_error(key: &str, failure: StoreFailure) -> Error {
    match failure {
        StoreFailure::KeyExists => {
            Error::OptimisticLocking(format!("{key}: key already exists"))
        }
        StoreFailure::VersionMismatch { expected, actual } => Error::OptimisticLocking(format!(
            "{key}: held token {expected}, store has {actual}"
        )),
        StoreFailure::NotFound => Error::OptimisticLocking(format!(
            "{key}: document disappeared under a conditional write"
        )),
        StoreFailure::Backend(msg) => Error::Store(msg),
    }
}

pub(crate) fn store_error(failure: StoreFailure) -> Error {
    match failure {
        StoreFailure::Backend(msg) => Error::Store(msg),
        other => Error::Store(other.to_string()),
    }
}
