//! lmx-marc
//!
//! Directory record -> MARC 21 authority mapping and MARCXML emission.
//!
//! - [`FieldMapping`]: ordered `attribute -> FieldDescriptor` rules
//! - [`Mapper`]: builds [`MappedElement`]s from records or diff entries
//! - [`emit`]: chunks elements into documents and writes them atomically
//!
//! Mapping is pure and deterministic. Only `emit` touches the filesystem.

mod element;
mod emit;
mod error;
mod field;
mod mapper;

pub use element::{DataField, Field, MappedElement, Subfield};
pub use emit::{chunk, chunk_path, emit, emit_with_cancel, to_marcxml, MARC21_SLIM_NS};
pub use error::MappingError;
pub use field::{FieldDescriptor, FieldMapping, FieldRule};
pub use mapper::{
    AssumeKnown, FixedField, IdentifierLookup, Mapper, MapperConfig, DEFAULT_IDENTIFIER_PREFIX,
};
