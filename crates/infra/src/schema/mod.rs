//! Collection schemas and record validation.

pub mod collection;
pub mod field;

pub use collection::{Collection, SYSTEM_FIELDS, SchemaError};
pub use field::{Field, FieldKind};
