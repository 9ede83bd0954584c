//! Structural converter
//!
//! Recursively translates between a domain object graph and the generic
//! document model. Per field: the custom conversion registry is consulted
//! first (by the field's concrete type); otherwise conversion recurses
//! structurally through [`FieldValue`](crate::FieldValue) — primitives pass
//! through, dates use a configurable canonical encoding, enums use their
//! symbolic name, sequences and maps convert element-wise, and embedded
//! objects become nested payloads carrying a `_class` discriminator.
//!
//! Polymorphic reads dispatch on the discriminator through explicitly
//! registered constructors: an unknown discriminator is a hard read error,
//! never a silent fallback.

use crate::conversions::CustomConversions;
use crate::metadata::{resolve, resolve_fragment, Entity, Fragment, TYPE_KEY};
use parking_lot::RwLock;
use sediment_core::{Error, Payload, RawDocument, Result, Value};
use std::any::{Any, TypeId};
use std::collections::HashMap;

/// Canonical encoding for date/time fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateFormat {
    /// Milliseconds since the Unix epoch, stored as `Int`
    #[default]
    EpochMillis,
    /// RFC 3339 / ISO 8601 text, stored as `String`
    Iso8601,
}

type VariantApply = Box<dyn Fn(&Value, &MapContext<'_>) -> Result<Box<dyn Any>> + Send + Sync>;

/// Constructors for polymorphic reads, keyed by (declared field type,
/// discriminator string).
#[derive(Default)]
pub struct VariantConstructors {
    constructors: HashMap<(TypeId, String), VariantApply>,
}

impl VariantConstructors {
    fn register<T, F>(&mut self, discriminator: &str, construct: F)
    where
        T: 'static,
        F: Fn(&Value, &MapContext<'_>) -> Result<T> + Send + Sync + 'static,
    {
        self.constructors.insert(
            (TypeId::of::<T>(), discriminator.to_string()),
            Box::new(move |value, cx| Ok(Box::new(construct(value, cx)?) as Box<dyn Any>)),
        );
    }

    fn construct<T: 'static>(&self, discriminator: &str, value: &Value, cx: &MapContext<'_>) -> Result<T> {
        let apply = self
            .constructors
            .get(&(TypeId::of::<T>(), discriminator.to_string()))
            .ok_or_else(|| {
                Error::Read(format!(
                    "no constructor registered for discriminator {discriminator:?}"
                ))
            })?;
        apply(value, cx)?.downcast::<T>().map(|b| *b).map_err(|_| {
            Error::Read(format!(
                "constructor for {discriminator:?} produced a value of the wrong type"
            ))
        })
    }
}

/// Borrowed view of the converter state, handed to field accessors.
///
/// All structural recursion funnels through [`encode`](Self::encode) and
/// [`decode`](Self::decode) so that the registry is consulted for every
/// nested element, not just top-level fields.
pub struct MapContext<'a> {
    conversions: &'a CustomConversions,
    variants: &'a VariantConstructors,
    date_format: DateFormat,
}

impl<'a> MapContext<'a> {
    pub(crate) fn new(
        conversions: &'a CustomConversions,
        variants: &'a VariantConstructors,
        date_format: DateFormat,
    ) -> Self {
        Self {
            conversions,
            variants,
            date_format,
        }
    }
}

impl MapContext<'_> {
    /// The canonical date encoding in effect
    pub fn date_format(&self) -> DateFormat {
        self.date_format
    }

    /// Encode a field value: registry first, then structural conversion
    pub fn encode<F: crate::FieldValue>(&self, value: &F) -> Result<Value> {
        if let Some(result) = self.conversions.write_field(value as &dyn Any) {
            return result;
        }
        value.to_value(self)
    }

    /// Decode a field value: registry first, then structural conversion
    pub fn decode<F: crate::FieldValue>(&self, value: &Value) -> Result<F> {
        if let Some(result) = self.conversions.read_field::<F>(value) {
            return result;
        }
        F::from_value(value, self)
    }

    /// Encode an embedded object as a nested payload with a `_class`
    /// discriminator identifying its concrete type.
    pub fn encode_fragment<F: Fragment>(&self, fragment: &F) -> Result<Value> {
        let mapping = resolve_fragment::<F>()?;
        let mut payload = Payload::with_capacity(mapping.fields().len() + 1);
        payload.insert(TYPE_KEY, Value::String(mapping.type_name().to_string()));
        for field in mapping.fields() {
            let value = (field.write)(fragment, self)?;
            if !value.is_null() {
                payload.insert(field.key.clone(), value);
            }
        }
        Ok(Value::Object(payload))
    }

    /// Decode an embedded object of a known concrete type.
    ///
    /// Payload entries with no declared field are ignored; declared fields
    /// absent from the payload keep their default.
    pub fn decode_fragment<F: Fragment>(&self, value: &Value) -> Result<F> {
        let payload = value.as_object().ok_or_else(|| {
            Error::Conversion(format!(
                "expected Object for an embedded value, got {}",
                value.type_name()
            ))
        })?;
        self.decode_fragment_payload(payload)
    }

    fn decode_fragment_payload<F: Fragment>(&self, payload: &Payload) -> Result<F> {
        let mapping = resolve_fragment::<F>()?;
        let mut fragment = F::default();
        for field in mapping.fields() {
            if let Some(value) = payload.get(&field.key) {
                (field.read)(&mut fragment, value, self)?;
            }
        }
        Ok(fragment)
    }

    /// Decode an embedded object whose concrete type is determined by its
    /// `_class` discriminator, through the registered constructors.
    ///
    /// `T` is the declared (abstract) field type, typically a boxed trait
    /// object. A missing or unregistered discriminator is `Error::Read`.
    pub fn decode_variant<T: 'static>(&self, value: &Value) -> Result<T> {
        let payload = value.as_object().ok_or_else(|| {
            Error::Read(format!(
                "expected Object for a polymorphic value, got {}",
                value.type_name()
            ))
        })?;
        let discriminator = payload
            .get(TYPE_KEY)
            .and_then(Value::as_str)
            .ok_or_else(|| {
                Error::Read(format!(
                    "polymorphic value carries no {TYPE_KEY:?} discriminator"
                ))
            })?;
        self.variants.construct::<T>(discriminator, value, self)
    }
}

/// The structural converter: entity <-> [`RawDocument`].
///
/// Holds the custom conversion registry, the polymorphic constructor
/// registry, and the date encoding config. Stateless apart from those;
/// safe for concurrent use. Registration uses interior mutability and is
/// visible to operations that start after it completes — registering while
/// a conversion is in flight is caller-synchronized by contract.
pub struct MappingConverter {
    conversions: RwLock<CustomConversions>,
    variants: RwLock<VariantConstructors>,
    date_format: DateFormat,
}

impl Default for MappingConverter {
    fn default() -> Self {
        Self::new()
    }
}

impl MappingConverter {
    /// Converter with the default epoch-millis date encoding
    pub fn new() -> Self {
        Self::with_date_format(DateFormat::default())
    }

    /// Converter with an explicit date encoding
    pub fn with_date_format(date_format: DateFormat) -> Self {
        Self {
            conversions: RwLock::new(CustomConversions::new()),
            variants: RwLock::new(VariantConstructors::default()),
            date_format,
        }
    }

    /// The canonical date encoding in effect
    pub fn date_format(&self) -> DateFormat {
        self.date_format
    }

    /// Replace the whole custom conversion registry
    pub fn set_conversions(&self, conversions: CustomConversions) {
        *self.conversions.write() = conversions;
    }

    /// Register a write-direction field converter
    pub fn register_writer<S, F>(&self, convert: F)
    where
        S: 'static,
        F: Fn(&S) -> Result<Value> + Send + Sync + 'static,
    {
        self.conversions.write().register_writer(convert);
    }

    /// Register a read-direction field converter
    pub fn register_reader<S, F>(&self, convert: F)
    where
        S: 'static,
        F: Fn(&Value) -> Result<S> + Send + Sync + 'static,
    {
        self.conversions.write().register_reader(convert);
    }

    /// Register a whole-document write converter
    pub fn register_document_writer<E, F>(&self, convert: F)
    where
        E: 'static,
        F: Fn(&E) -> Result<RawDocument> + Send + Sync + 'static,
    {
        self.conversions.write().register_document_writer(convert);
    }

    /// Register a whole-document read converter
    pub fn register_document_reader<E, F>(&self, convert: F)
    where
        E: 'static,
        F: Fn(&RawDocument) -> Result<E> + Send + Sync + 'static,
    {
        self.conversions.write().register_document_reader(convert);
    }

    /// Register a polymorphic constructor: documents whose `_class` equals
    /// `discriminator` reconstruct into the declared field type `T`.
    pub fn register_variant<T, F>(&self, discriminator: &str, construct: F)
    where
        T: 'static,
        F: Fn(&Value, &MapContext<'_>) -> Result<T> + Send + Sync + 'static,
    {
        self.variants.write().register(discriminator, construct);
    }

    /// Convert an entity into a generic document.
    ///
    /// A registered whole-document writer for `T` short-circuits the
    /// structural path (its payload is used exclusively; expiry still
    /// follows the type's metadata if the converter left it unset). The
    /// identity never lands in the payload; it rides on the document id.
    pub fn write<T: Entity>(&self, entity: &T) -> Result<RawDocument> {
        let mapping = resolve::<T>()?;
        let conversions = self.conversions.read();
        if let Some(result) = conversions.write_document::<T>(entity) {
            let doc = result?;
            let expiry = doc.expiry.or(mapping.expiry());
            return Ok(doc.with_expiry(expiry));
        }

        let id = mapping.id_of(entity).ok_or_else(|| {
            Error::Conversion(format!(
                "{} entity has no identity assigned",
                mapping.type_name()
            ))
        })?;
        let variants = self.variants.read();
        let cx = MapContext {
            conversions: &conversions,
            variants: &variants,
            date_format: self.date_format,
        };
        let mut payload = Payload::with_capacity(mapping.fields().len() + 1);
        payload.insert(TYPE_KEY, Value::String(mapping.type_name().to_string()));
        for field in mapping.fields() {
            let value = (field.write)(entity, &cx)
                .map_err(|e| annotate(e, mapping.type_name(), &field.key))?;
            // null fields are omitted; they read back as the default
            if !value.is_null() {
                payload.insert(field.key.clone(), value);
            }
        }
        Ok(RawDocument::new(id, payload).with_expiry(mapping.expiry()))
    }

    /// Convert a generic document into an entity.
    ///
    /// A registered whole-document reader for `T` receives the entire
    /// document and its output is returned as-is. The structural path
    /// fills a default instance field by field, then assigns the identity
    /// from the document id and the version token from the cas.
    pub fn read<T: Entity>(&self, doc: &RawDocument) -> Result<T> {
        let mapping = resolve::<T>()?;
        let conversions = self.conversions.read();
        if let Some(result) = conversions.read_document::<T>(doc) {
            return result;
        }

        let variants = self.variants.read();
        let cx = MapContext {
            conversions: &conversions,
            variants: &variants,
            date_format: self.date_format,
        };
        let mut entity = T::default();
        for field in mapping.fields() {
            if let Some(value) = doc.payload.get(&field.key) {
                (field.read)(&mut entity, value, &cx)
                    .map_err(|e| annotate(e, mapping.type_name(), &field.key))?;
            }
        }
        mapping.assign_id(&mut entity, doc.id.clone());
        mapping.assign_version(&mut entity, doc.cas);
        Ok(entity)
    }

    /// Convert a flat projected row into a fragment: direct structural
    /// construction, no identity or version handling.
    pub fn read_projection<F: Fragment>(&self, row: &Payload) -> Result<F> {
        let conversions = self.conversions.read();
        let variants = self.variants.read();
        let cx = MapContext {
            conversions: &conversions,
            variants: &variants,
            date_format: self.date_format,
        };
        cx.decode_fragment_payload(row)
    }
}

fn annotate(err: Error, type_name: &str, key: &str) -> Error {
    match err {
        Error::Conversion(msg) => {
            Error::Conversion(format!("{type_name}.{key}: {msg}"))
        }
        Error::Read(msg) => Error::Read(format!("{type_name}.{key}: {msg}")),
        other => other,
    }
}
