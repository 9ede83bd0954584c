//! Object-document mapping for sediment
//!
//! Translates between domain object graphs and the generic document model
//! without runtime reflection: each persistent type declares its mapping
//! once through [`Entity`] (or [`Fragment`] for embedded types), the
//! declaration is validated and cached forever, and conversion runs
//! through plain function pointers.
//!
//! - metadata: per-type descriptors, builders, and the resolve cache
//! - conversions: ordered registry of user-supplied converters
//! - fields: structural conversion of primitive and container field types
//! - convert: the recursive converter tying it all together

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod conversions;
pub mod convert;
pub mod fields;
pub mod metadata;

pub use conversions::CustomConversions;
pub use convert::{DateFormat, MapContext, MappingConverter, VariantConstructors};
pub use fields::FieldValue;
pub use metadata::{
    resolve, resolve_fragment, Entity, EntityMapping, FieldMapping, Fragment, FragmentBuilder,
    FragmentMapping, IdGetFn, IdSetFn, MappingBuilder, ReadFn, VersionGetFn, VersionSetFn,
    WriteFn, TYPE_KEY,
};

// Macro-generated code refers to these through $crate
#[doc(hidden)]
pub use sediment_core::{Error, Result, Value};
