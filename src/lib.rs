//! sediment — object-document mapping for CAS-capable document stores
//!
//! Translates domain objects to and from generic documents and drives the
//! persistence operations around them: optimistic-concurrency writes,
//! touch-on-read expiry, custom conversions, polymorphic reconstruction,
//! and view/query result mapping.
//!
//! ```no_run
//! use sediment::{map_field, DocumentTemplate, Entity, MappingBuilder, MemoryStore};
//!
//! #[derive(Debug, Default)]
//! struct Beer {
//!     id: Option<String>,
//!     version: u64,
//!     name: String,
//!     active: bool,
//! }
//!
//! impl Entity for Beer {
//!     fn mapping() -> MappingBuilder<Self> {
//!         MappingBuilder::new("catalog.Beer")
//!             .id(|b: &Beer| b.id.clone(), |b, id| b.id = Some(id))
//!             .version(|b: &Beer| b.version, |b, v| b.version = v)
//!             .field("name", map_field!(Beer, name))
//!             .field("is_active", map_field!(Beer, active))
//!     }
//! }
//!
//! # fn main() -> sediment::Result<()> {
//! let template = DocumentTemplate::new(MemoryStore::new());
//! let mut stout = Beer {
//!     id: Some("beers:awesome-stout".into()),
//!     name: "The Awesome Stout".into(),
//!     active: true,
//!     ..Beer::default()
//! };
//! template.save(&mut stout)?;
//! let found: Option<Beer> = template.find_by_id("beers:awesome-stout")?;
//! assert!(found.is_some());
//! # Ok(())
//! # }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub use sediment_core::{
    DocumentStore, Error, Payload, QueryExecutor, RawDocument, Result, StoreFailure,
    StoreResult, Value, ViewIndexExecutor, ViewQuery,
};
pub use sediment_engine::{save_with_retry, DocumentTemplate, MemoryStore};
pub use sediment_mapping::{
    map_enum, map_field, resolve, resolve_fragment, CustomConversions, DateFormat, Entity,
    EntityMapping, FieldMapping, FieldValue, Fragment, FragmentBuilder, FragmentMapping,
    MapContext, MappingBuilder, MappingConverter, VariantConstructors, TYPE_KEY,
};
