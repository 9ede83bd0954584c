//! Type metadata: per-type descriptors, declared statically and cached
//!
//! There is no runtime reflection here. Each persistent type declares its
//! mapping once — identity accessor, optional version accessor, field
//! descriptors, expiry policy — through [`Entity::mapping`]. The resolver
//! validates the declaration and caches the result keyed by `TypeId` for
//! the process lifetime; the cache is never invalidated.
//!
//! Embedded (non-root) object types declare a [`Fragment`] instead: same
//! field descriptors, no identity or version, plus a type name used as the
//! discriminator for polymorphic reconstruction.

use crate::convert::MapContext;
use dashmap::DashMap;
use once_cell::sync::Lazy;
use sediment_core::{Error, Result, Value};
use std::any::{Any, TypeId};
use std::sync::Arc;

/// Payload key carrying the concrete type identity of a document or an
/// embedded object, enabling polymorphic reconstruction on read.
pub const TYPE_KEY: &str = "_class";

/// Field write accessor: encode one declared field into a payload value
pub type WriteFn<T> = fn(&T, &MapContext<'_>) -> Result<Value>;
/// Field read accessor: decode one payload value into a declared field
pub type ReadFn<T> = fn(&mut T, &Value, &MapContext<'_>) -> Result<()>;
/// Identity getter; `None` means no identity assigned yet
pub type IdGetFn<T> = fn(&T) -> Option<String>;
/// Identity setter
pub type IdSetFn<T> = fn(&mut T, String);
/// Version token getter (0 = unset)
pub type VersionGetFn<T> = fn(&T) -> u64;
/// Version token setter
pub type VersionSetFn<T> = fn(&mut T, u64);

/// A root persistent type.
///
/// `Default` provides the zero-value instance the structural read path
/// fills in; fields absent from a payload simply keep their default.
pub trait Entity: Default + Send + 'static {
    /// Declare this type's mapping. Called at most once per process; the
    /// validated result is cached by [`resolve`].
    fn mapping() -> MappingBuilder<Self>;
}

/// An embeddable (non-root) type: nested objects, polymorphic variants,
/// and projection row targets.
pub trait Fragment: Default + Send + 'static {
    /// Declare this type's fragment mapping.
    fn fragment() -> FragmentBuilder<Self>;
}

/// One declared field: payload key plus read/write accessors
pub struct FieldMapping<T> {
    /// Payload key the field is stored under
    pub key: String,
    /// Encode accessor
    pub write: WriteFn<T>,
    /// Decode accessor
    pub read: ReadFn<T>,
}

struct VersionAccessor<T> {
    get: VersionGetFn<T>,
    set: VersionSetFn<T>,
}

/// Validated, immutable metadata for a root persistent type.
///
/// Created lazily on first resolve, cached for the process lifetime.
pub struct EntityMapping<T> {
    type_name: String,
    id_get: IdGetFn<T>,
    id_set: IdSetFn<T>,
    version: Option<VersionAccessor<T>>,
    fields: Vec<FieldMapping<T>>,
    expiry: Option<u32>,
    touch_on_read: bool,
}

impl<T> EntityMapping<T> {
    /// Fully-qualified type name, written as the document discriminator
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Current identity of `entity`, if assigned
    pub fn id_of(&self, entity: &T) -> Option<String> {
        (self.id_get)(entity)
    }

    /// Assign an identity to `entity`
    pub fn assign_id(&self, entity: &mut T, id: String) {
        (self.id_set)(entity, id)
    }

    /// True if the type declared a version accessor
    pub fn is_versioned(&self) -> bool {
        self.version.is_some()
    }

    /// Current version token of `entity`, if the type is versioned
    pub fn version_of(&self, entity: &T) -> Option<u64> {
        self.version.as_ref().map(|v| (v.get)(entity))
    }

    /// Assign a version token; no-op for unversioned types
    pub fn assign_version(&self, entity: &mut T, cas: u64) {
        if let Some(v) = &self.version {
            (v.set)(entity, cas)
        }
    }

    /// Declared fields, in declaration order
    pub fn fields(&self) -> &[FieldMapping<T>] {
        &self.fields
    }

    /// Declared expiry in seconds, if any
    pub fn expiry(&self) -> Option<u32> {
        self.expiry
    }

    /// True if reads must reset the expiry countdown
    pub fn touch_on_read(&self) -> bool {
        self.touch_on_read
    }
}

impl<T> std::fmt::Debug for EntityMapping<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntityMapping")
            .field("type_name", &self.type_name)
            .field("versioned", &self.version.is_some())
            .field("fields", &self.fields.iter().map(|m| &m.key).collect::<Vec<_>>())
            .field("expiry", &self.expiry)
            .field("touch_on_read", &self.touch_on_read)
            .finish()
    }
}

/// Validated, immutable metadata for an embeddable type
pub struct FragmentMapping<T> {
    type_name: String,
    fields: Vec<FieldMapping<T>>,
}

impl<T> FragmentMapping<T> {
    /// Type name written as the embedded-object discriminator
    pub fn type_name(&self) -> &str {
        &self.type_name
    }

    /// Declared fields, in declaration order
    pub fn fields(&self) -> &[FieldMapping<T>] {
        &self.fields
    }
}

impl<T> std::fmt::Debug for FragmentMapping<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FragmentMapping")
            .field("type_name", &self.type_name)
            .field("fields", &self.fields.iter().map(|m| &m.key).collect::<Vec<_>>())
            .finish()
    }
}

/// Builder for an [`EntityMapping`] declaration.
///
/// Collects everything the type declares; [`resolve`] validates it. Broken
/// declarations (no identity, duplicate accessors, duplicate keys, expiry
/// misuse) fail at resolve time with `Error::Metadata`, not at use time.
pub struct MappingBuilder<T> {
    type_name: String,
    ids: Vec<(IdGetFn<T>, IdSetFn<T>)>,
    versions: Vec<VersionAccessor<T>>,
    fields: Vec<FieldMapping<T>>,
    expiry: Option<u32>,
    touch_on_read: bool,
}

impl<T> MappingBuilder<T> {
    /// Start a declaration under the given fully-qualified type name
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            ids: Vec::new(),
            versions: Vec::new(),
            fields: Vec::new(),
            expiry: None,
            touch_on_read: false,
        }
    }

    /// Declare the identity accessor. Exactly one declaration is required.
    pub fn id(mut self, get: IdGetFn<T>, set: IdSetFn<T>) -> Self {
        self.ids.push((get, set));
        self
    }

    /// Declare the version-token accessor. At most one declaration.
    pub fn version(mut self, get: VersionGetFn<T>, set: VersionSetFn<T>) -> Self {
        self.versions.push(VersionAccessor { get, set });
        self
    }

    /// Declare a field stored under `key`. Use [`map_field!`] for the
    /// common same-named-struct-field case.
    pub fn field(mut self, key: impl Into<String>, accessors: (WriteFn<T>, ReadFn<T>)) -> Self {
        let (write, read) = accessors;
        self.fields.push(FieldMapping {
            key: key.into(),
            write,
            read,
        });
        self
    }

    /// Documents of this type self-delete `seconds` after the last write
    /// (or touching read).
    pub fn expiry_seconds(mut self, seconds: u32) -> Self {
        self.expiry = Some(seconds);
        self
    }

    /// Reads reset the expiry countdown (requires `expiry_seconds`)
    pub fn touch_on_read(mut self) -> Self {
        self.touch_on_read = true;
        self
    }

    fn build(self) -> Result<EntityMapping<T>> {
        if self.type_name.is_empty() {
            return Err(Error::Metadata("entity declared an empty type name".into()));
        }
        let mut ids = self.ids.into_iter();
        let (id_get, id_set) = match (ids.next(), ids.next()) {
            (Some(pair), None) => pair,
            (None, _) => {
                return Err(Error::Metadata(format!(
                    "{}: no identity accessor declared",
                    self.type_name
                )))
            }
            (Some(_), Some(_)) => {
                return Err(Error::Metadata(format!(
                    "{}: multiple identity accessors declared, exactly one is allowed",
                    self.type_name
                )))
            }
        };
        if self.versions.len() > 1 {
            return Err(Error::Metadata(format!(
                "{}: multiple version accessors declared",
                self.type_name
            )));
        }
        validate_fields(&self.type_name, &self.fields)?;
        if self.expiry == Some(0) {
            return Err(Error::Metadata(format!(
                "{}: expiry of 0 seconds is meaningless, omit it instead",
                self.type_name
            )));
        }
        if self.touch_on_read && self.expiry.is_none() {
            return Err(Error::Metadata(format!(
                "{}: touch-on-read requires a declared expiry",
                self.type_name
            )));
        }
        Ok(EntityMapping {
            type_name: self.type_name,
            id_get,
            id_set,
            version: self.versions.into_iter().next(),
            fields: self.fields,
            expiry: self.expiry,
            touch_on_read: self.touch_on_read,
        })
    }
}

/// Builder for a [`FragmentMapping`] declaration
pub struct FragmentBuilder<T> {
    type_name: String,
    fields: Vec<FieldMapping<T>>,
}

impl<T> FragmentBuilder<T> {
    /// Start a fragment declaration under the given type name
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
            fields: Vec::new(),
        }
    }

    /// Declare a field stored under `key`
    pub fn field(mut self, key: impl Into<String>, accessors: (WriteFn<T>, ReadFn<T>)) -> Self {
        let (write, read) = accessors;
        self.fields.push(FieldMapping {
            key: key.into(),
            write,
            read,
        });
        self
    }

    fn build(self) -> Result<FragmentMapping<T>> {
        if self.type_name.is_empty() {
            return Err(Error::Metadata("fragment declared an empty type name".into()));
        }
        validate_fields(&self.type_name, &self.fields)?;
        Ok(FragmentMapping {
            type_name: self.type_name,
            fields: self.fields,
        })
    }
}

fn validate_fields<T>(type_name: &str, fields: &[FieldMapping<T>]) -> Result<()> {
    for (i, field) in fields.iter().enumerate() {
        if field.key == TYPE_KEY {
            return Err(Error::Metadata(format!(
                "{type_name}: field key {TYPE_KEY:?} collides with the type discriminator"
            )));
        }
        if fields[..i].iter().any(|f| f.key == field.key) {
            return Err(Error::Metadata(format!(
                "{type_name}: duplicate field key {:?}",
                field.key
            )));
        }
    }
    Ok(())
}

// Process-wide metadata caches, keyed by TypeId. Read-mostly: a race to
// resolve the same type computes equal metadata twice and the last writer
// wins harmlessly.
static ENTITY_CACHE: Lazy<DashMap<TypeId, Arc<dyn Any + Send + Sync>>> = Lazy::new(DashMap::new);
static FRAGMENT_CACHE: Lazy<DashMap<TypeId, Arc<dyn Any + Send + Sync>>> = Lazy::new(DashMap::new);

/// Resolve (and cache forever) the validated mapping of an entity type.
///
/// Fails only on a malformed declaration, and fails every time for one: a
/// broken declaration is a programming error, not a transient condition.
pub fn resolve<T: Entity>() -> Result<Arc<EntityMapping<T>>> {
    let key = TypeId::of::<T>();
    if let Some(hit) = ENTITY_CACHE.get(&key) {
        return downcast_cached(hit.value().clone());
    }
    let mapping: Arc<EntityMapping<T>> = Arc::new(T::mapping().build()?);
    ENTITY_CACHE.insert(key, mapping.clone());
    Ok(mapping)
}

/// Resolve (and cache forever) the validated mapping of a fragment type
pub fn resolve_fragment<T: Fragment>() -> Result<Arc<FragmentMapping<T>>> {
    let key = TypeId::of::<T>();
    if let Some(hit) = FRAGMENT_CACHE.get(&key) {
        return downcast_cached(hit.value().clone());
    }
    let mapping: Arc<FragmentMapping<T>> = Arc::new(T::fragment().build()?);
    FRAGMENT_CACHE.insert(key, mapping.clone());
    Ok(mapping)
}

fn downcast_cached<M: Send + Sync + 'static>(entry: Arc<dyn Any + Send + Sync>) -> Result<Arc<M>> {
    entry
        .downcast::<M>()
        .map_err(|_| Error::Metadata("metadata cache entry has the wrong type".into()))
}

/// Declare the read/write accessor pair for a struct field stored under
/// its own name.
///
/// ```ignore
/// MappingBuilder::new("catalog.Beer")
///     .id(|b: &Beer| b.id.clone(), |b, id| b.id = Some(id))
///     .field("name", map_field!(Beer, name))
/// ```
#[macro_export]
macro_rules! map_field {
    ($entity:ty, $field:ident) => {
        (
            (|entity: &$entity, cx: &$crate::MapContext<'_>| cx.encode(&entity.$field))
                as $crate::WriteFn<$entity>,
            (|entity: &mut $entity,
              value: &$crate::Value,
              cx: &$crate::MapContext<'_>| {
                entity.$field = cx.decode(value)?;
                Ok(())
            }) as $crate::ReadFn<$entity>,
        )
    };
}
