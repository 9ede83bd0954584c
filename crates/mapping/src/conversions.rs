//! Custom conversion registry
//!
//! An ordered set of user-supplied converters consulted before structural
//! conversion, at two granularities:
//!
//! - **field**: one value of some source type <-> one payload [`Value`]
//! - **document**: a whole entity <-> a whole [`RawDocument`], bypassing
//!   field-level logic entirely
//!
//! Converters are plain function values keyed by `TypeId`; the first
//! registered match wins. The registry itself does no locking — callers
//! synchronize registration against in-flight conversions (the converter
//! wraps the registry in a `RwLock`).

use sediment_core::{Error, RawDocument, Result, Value};
use std::any::{Any, TypeId};

type FieldWriteApply = Box<dyn Fn(&dyn Any) -> Result<Value> + Send + Sync>;
type FieldReadApply = Box<dyn Fn(&Value) -> Result<Box<dyn Any>> + Send + Sync>;
type DocWriteApply = Box<dyn Fn(&dyn Any) -> Result<RawDocument> + Send + Sync>;
type DocReadApply = Box<dyn Fn(&RawDocument) -> Result<Box<dyn Any>> + Send + Sync>;

struct FieldWriter {
    source: TypeId,
    source_name: &'static str,
    apply: FieldWriteApply,
}

struct FieldReader {
    target: TypeId,
    target_name: &'static str,
    apply: FieldReadApply,
}

struct DocumentWriter {
    source: TypeId,
    apply: DocWriteApply,
}

struct DocumentReader {
    target: TypeId,
    apply: DocReadApply,
}

/// Ordered registry of custom converters
#[derive(Default)]
pub struct CustomConversions {
    field_writers: Vec<FieldWriter>,
    field_readers: Vec<FieldReader>,
    document_writers: Vec<DocumentWriter>,
    document_readers: Vec<DocumentReader>,
}

impl CustomConversions {
    /// Empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a write-direction field converter for source type `S`
    pub fn register_writer<S, F>(&mut self, convert: F)
    where
        S: 'static,
        F: Fn(&S) -> Result<Value> + Send + Sync + 'static,
    {
        self.field_writers.push(FieldWriter {
            source: TypeId::of::<S>(),
            source_name: std::any::type_name::<S>(),
            apply: Box::new(move |any| match any.downcast_ref::<S>() {
                Some(typed) => convert(typed),
                None => Err(Error::Conversion(format!(
                    "writer for {} applied to a different type",
                    std::any::type_name::<S>()
                ))),
            }),
        });
    }

    /// Register a read-direction field converter producing target type `S`
    pub fn register_reader<S, F>(&mut self, convert: F)
    where
        S: 'static,
        F: Fn(&Value) -> Result<S> + Send + Sync + 'static,
    {
        self.field_readers.push(FieldReader {
            target: TypeId::of::<S>(),
            target_name: std::any::type_name::<S>(),
            apply: Box::new(move |value| Ok(Box::new(convert(value)?) as Box<dyn Any>)),
        });
    }

    /// Register a whole-document write converter for entity type `E`.
    ///
    /// When present, the structural write path for `E` is skipped entirely.
    pub fn register_document_writer<E, F>(&mut self, convert: F)
    where
        E: 'static,
        F: Fn(&E) -> Result<RawDocument> + Send + Sync + 'static,
    {
        self.document_writers.push(DocumentWriter {
            source: TypeId::of::<E>(),
            apply: Box::new(move |any| match any.downcast_ref::<E>() {
                Some(typed) => convert(typed),
                None => Err(Error::Conversion(format!(
                    "document writer for {} applied to a different type",
                    std::any::type_name::<E>()
                ))),
            }),
        });
    }

    /// Register a whole-document read converter producing entity type `E`.
    ///
    /// When present, it receives the entire document and field-level logic
    /// does not run.
    pub fn register_document_reader<E, F>(&mut self, convert: F)
    where
        E: 'static,
        F: Fn(&RawDocument) -> Result<E> + Send + Sync + 'static,
    {
        self.document_readers.push(DocumentReader {
            target: TypeId::of::<E>(),
            apply: Box::new(move |doc| Ok(Box::new(convert(doc)?) as Box<dyn Any>)),
        });
    }

    /// First write-direction match for the concrete type behind `source`
    pub fn write_field(&self, source: &dyn Any) -> Option<Result<Value>> {
        let id = source.type_id();
        let writer = self.field_writers.iter().find(|w| w.source == id)?;
        Some((writer.apply)(source))
    }

    /// First read-direction match producing `S`
    pub fn read_field<S: 'static>(&self, value: &Value) -> Option<Result<S>> {
        let target = TypeId::of::<S>();
        let reader = self.field_readers.iter().find(|r| r.target == target)?;
        Some((reader.apply)(value).and_then(downcast_produced::<S>))
    }

    /// Whole-document write converter for `E`, if registered
    pub fn write_document<E: 'static>(&self, entity: &E) -> Option<Result<RawDocument>> {
        let id = TypeId::of::<E>();
        let writer = self.document_writers.iter().find(|w| w.source == id)?;
        Some((writer.apply)(entity))
    }

    /// Whole-document read converter producing `E`, if registered
    pub fn read_document<E: 'static>(&self, doc: &RawDocument) -> Option<Result<E>> {
        let target = TypeId::of::<E>();
        let reader = self.document_readers.iter().find(|r| r.target == target)?;
        Some((reader.apply)(doc).and_then(downcast_produced::<E>))
    }

    /// True if nothing is registered
    pub fn is_empty(&self) -> bool {
        self.field_writers.is_empty()
            && self.field_readers.is_empty()
            && self.document_writers.is_empty()
            && self.document_readers.is_empty()
    }

    /// Names of registered field writers, in consultation order
    pub fn writer_names(&self) -> Vec<&'static str> {
        self.field_writers.iter().map(|w| w.source_name).collect()
    }

    /// Names of registered field readers, in consultation order
    pub fn reader_names(&self) -> Vec<&'static str> {
        self.field_readers.iter().map(|r| r.target_name).collect()
    }
}

fn downcast_produced<S: 'static>(boxed: Box<dyn Any>) -> Result<S> {
    boxed.downcast::<S>().map(|b| *b).map_err(|_| {
        Error::Conversion(format!(
            "registered converter produced a value of the wrong type, expected {}",
            std::any::type_name::<S>()
        ))
    })
}
