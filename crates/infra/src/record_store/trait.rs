use std::sync::Arc;

use thiserror::Error;

use shopfront_core::{Record, RecordId};
use shopfront_events::{HookError, HookRegistry};

use super::filter::{FilterError, FilterParams};
use crate::schema::{Collection, SchemaError};

/// Record store operation error.
///
/// These are storage-level failures as opposed to domain errors:
///
/// - **CollectionNotFound / RecordNotFound**: lookup failures
/// - **Conflict / CollectionExists / UniqueViolation**: identity or index clashes
/// - **InvalidFilter / Validation**: rejected input
/// - **Storage**: backend failure (lock poisoning, IO)
/// - **Hook**: the mutation committed, but an after-success hook aborted its chain
#[derive(Debug, Error, Clone, PartialEq)]
pub enum StoreError {
    #[error("collection not found: {0}")]
    CollectionNotFound(String),

    #[error("record not found: {collection}/{id}")]
    RecordNotFound { collection: String, id: RecordId },

    #[error("record already exists: {collection}/{id}")]
    Conflict { collection: String, id: RecordId },

    #[error("{collection}.{field}: value must be unique")]
    UniqueViolation { collection: String, field: String },

    #[error("collection already exists: {0}")]
    CollectionExists(String),

    #[error("invalid filter: {0}")]
    InvalidFilter(#[from] FilterError),

    #[error("validation failed: {0}")]
    Validation(#[from] SchemaError),

    #[error("storage failure: {0}")]
    Storage(String),

    #[error("mutation committed but hook chain aborted: {0}")]
    Hook(#[from] HookError),
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            StoreError::CollectionNotFound(_) | StoreError::RecordNotFound { .. }
        )
    }
}

/// Result ordering for list queries.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Oldest first (by `created`, then id).
    #[default]
    CreatedAsc,
    /// Newest first.
    CreatedDesc,
}

/// Filtered, ordered, paginated record listing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RecordQuery {
    pub filter: String,
    pub params: FilterParams,
    pub sort: SortOrder,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl RecordQuery {
    /// Every record in the collection, oldest first.
    pub fn all() -> Self {
        Self::default()
    }

    pub fn filtered(filter: impl Into<String>, params: FilterParams) -> Self {
        Self {
            filter: filter.into(),
            params,
            ..Self::default()
        }
    }

    pub fn newest_first(mut self) -> Self {
        self.sort = SortOrder::CreatedDesc;
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = offset;
        self
    }
}

/// Typed records grouped into named collections.
///
/// This is the only storage surface the rest of the workspace depends on.
/// Implementations must:
///
/// - validate records against the collection schema on save
/// - treat a record with no `created` timestamp as a create, otherwise an update
/// - give read-after-write consistency for sequential calls
/// - evaluate `create_if_absent` atomically (check and insert under one lock
///   or transaction)
pub trait RecordStore: Send + Sync {
    /// Look up a collection by name or id.
    fn find_collection(&self, name_or_id: &str) -> Result<Collection, StoreError>;

    fn list_collections(&self) -> Result<Vec<Collection>, StoreError>;

    /// Create or replace a collection (matched by id). A changed name renames it.
    fn save_collection(&self, collection: Collection) -> Result<(), StoreError>;

    /// Drop a collection and all of its records.
    fn delete_collection(&self, name_or_id: &str) -> Result<(), StoreError>;

    fn find_record_by_id(&self, collection: &str, id: &RecordId) -> Result<Record, StoreError>;

    fn find_records(&self, collection: &str, query: &RecordQuery) -> Result<Vec<Record>, StoreError>;

    /// First record (oldest first) matching `filter`, or `None`.
    fn find_first_by_filter(
        &self,
        collection: &str,
        filter: &str,
        params: &FilterParams,
    ) -> Result<Option<Record>, StoreError> {
        let query = RecordQuery::filtered(filter, params.clone()).limit(1);
        Ok(self.find_records(collection, &query)?.into_iter().next())
    }

    /// Number of records matching `filter`.
    fn count(&self, collection: &str, filter: &str, params: &FilterParams) -> Result<usize, StoreError> {
        let query = RecordQuery::filtered(filter, params.clone());
        Ok(self.find_records(collection, &query)?.len())
    }

    /// Persist a record: create when new, update otherwise. Stamps timestamps on `record`.
    fn save(&self, record: &mut Record) -> Result<(), StoreError>;

    fn delete(&self, record: &Record) -> Result<(), StoreError>;

    /// Create `record` only if no record in its collection matches `filter`.
    ///
    /// Returns `Ok(true)` when the record was created, `Ok(false)` when a
    /// matching record already existed.
    fn create_if_absent(
        &self,
        record: &mut Record,
        filter: &str,
        params: &FilterParams,
    ) -> Result<bool, StoreError>;
}

/// Type-erased store handle passed to hooks.
pub type DynRecordStore = dyn RecordStore;

/// Hook chain keyed on record mutations, run against a [`DynRecordStore`].
pub type StoreHooks = HookRegistry<DynRecordStore>;

impl<S> RecordStore for Arc<S>
where
    S: RecordStore + ?Sized,
{
    fn find_collection(&self, name_or_id: &str) -> Result<Collection, StoreError> {
        (**self).find_collection(name_or_id)
    }

    fn list_collections(&self) -> Result<Vec<Collection>, StoreError> {
        (**self).list_collections()
    }

    fn save_collection(&self, collection: Collection) -> Result<(), StoreError> {
        (**self).save_collection(collection)
    }

    fn delete_collection(&self, name_or_id: &str) -> Result<(), StoreError> {
        (**self).delete_collection(name_or_id)
    }

    fn find_record_by_id(&self, collection: &str, id: &RecordId) -> Result<Record, StoreError> {
        (**self).find_record_by_id(collection, id)
    }

    fn find_records(&self, collection: &str, query: &RecordQuery) -> Result<Vec<Record>, StoreError> {
        (**self).find_records(collection, query)
    }

    fn find_first_by_filter(
        &self,
        collection: &str,
        filter: &str,
        params: &FilterParams,
    ) -> Result<Option<Record>, StoreError> {
        (**self).find_first_by_filter(collection, filter, params)
    }

    fn count(&self, collection: &str, filter: &str, params: &FilterParams) -> Result<usize, StoreError> {
        (**self).count(collection, filter, params)
    }

    fn save(&self, record: &mut Record) -> Result<(), StoreError> {
        (**self).save(record)
    }

    fn delete(&self, record: &Record) -> Result<(), StoreError> {
        (**self).delete(record)
    }

    fn create_if_absent(
        &self,
        record: &mut Record,
        filter: &str,
        params: &FilterParams,
    ) -> Result<bool, StoreError> {
        (**self).create_if_absent(record, filter, params)
    }
}
