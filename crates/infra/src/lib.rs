//! Infrastructure layer: record storage, schemas, migrations, event source.

pub mod migrations;
pub mod record_store;
pub mod schema;

pub use record_store::{
    DynRecordStore, FilterParams, HookedRecordStore, InMemoryRecordStore, RecordQuery, RecordStore,
    SortOrder, StoreError, StoreHooks,
};
pub use schema::{Collection, Field, FieldKind};
