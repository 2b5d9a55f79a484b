//! Record store boundary.
//!
//! The rule engine and migrations talk to storage only through the
//! [`RecordStore`] trait. This workspace ships an in-memory implementation and
//! an event-source wrapper that runs hooks after successful mutations.

pub mod filter;
pub mod hooked;
pub mod in_memory;
pub mod r#trait;

pub use filter::{BoundFilter, Filter, FilterError, FilterParams};
pub use hooked::HookedRecordStore;
pub use in_memory::InMemoryRecordStore;
pub use r#trait::{DynRecordStore, RecordQuery, RecordStore, SortOrder, StoreError, StoreHooks};
