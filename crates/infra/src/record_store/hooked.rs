use std::sync::Arc;

use tracing::warn;

use shopfront_core::{Record, RecordId};
use shopfront_events::{EventBus, InMemoryEventBus, RecordEvent};

use super::filter::FilterParams;
use super::r#trait::{RecordQuery, RecordStore, StoreError, StoreHooks};
use crate::schema::Collection;

/// Event source: a record store that runs after-success hooks.
///
/// Every successful record mutation is:
///
/// 1. committed through the inner store
/// 2. published on the change feed, if one is attached (best-effort)
/// 3. dispatched to the hook chain bound to `(kind, collection)`, with this
///    store as the hook's store handle
///
/// Writes made by a hook go through the same path, so they are published and
/// can trigger hooks of their own. A failed mutation never reaches step 2.
pub struct HookedRecordStore<S, B = Arc<InMemoryEventBus<RecordEvent>>> {
    inner: S,
    hooks: Arc<StoreHooks>,
    feed: Option<B>,
}

impl<S> HookedRecordStore<S> {
    pub fn new(inner: S) -> Self {
        Self {
            inner,
            hooks: Arc::new(StoreHooks::new()),
            feed: None,
        }
    }
}

impl<S, B> HookedRecordStore<S, B> {
    pub fn with_feed(inner: S, feed: B) -> Self {
        Self {
            inner,
            hooks: Arc::new(StoreHooks::new()),
            feed: Some(feed),
        }
    }

    /// Hook registry; bind rules here before mutating.
    pub fn hooks(&self) -> &Arc<StoreHooks> {
        &self.hooks
    }

    pub fn inner(&self) -> &S {
        &self.inner
    }

    pub fn feed(&self) -> Option<&B> {
        self.feed.as_ref()
    }
}

impl<S, B> HookedRecordStore<S, B>
where
    S: RecordStore + 'static,
    B: EventBus<RecordEvent> + 'static,
{
    fn after_success(&self, event: RecordEvent) -> Result<(), StoreError> {
        if let Some(feed) = &self.feed {
            if let Err(err) = feed.publish(event.clone()) {
                warn!(
                    event_type = %event.event_type(),
                    record_id = %event.record_id(),
                    error = %err,
                    "change feed publish failed"
                );
            }
        }

        self.hooks.dispatch(self, &event).map(|_| ()).map_err(|err| {
            warn!(
                event_type = %event.event_type(),
                record_id = %event.record_id(),
                error = %err,
                "hook chain aborted after commit"
            );
            StoreError::Hook(err)
        })
    }
}

impl<S, B> core::fmt::Debug for HookedRecordStore<S, B>
where
    S: core::fmt::Debug,
{
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("HookedRecordStore")
            .field("inner", &self.inner)
            .field("hooks", &self.hooks)
            .field("feed", &self.feed.is_some())
            .finish()
    }
}

impl<S, B> RecordStore for HookedRecordStore<S, B>
where
    S: RecordStore + 'static,
    B: EventBus<RecordEvent> + 'static,
{
    fn find_collection(&self, name_or_id: &str) -> Result<Collection, StoreError> {
        self.inner.find_collection(name_or_id)
    }

    fn list_collections(&self) -> Result<Vec<Collection>, StoreError> {
        self.inner.list_collections()
    }

    fn save_collection(&self, collection: Collection) -> Result<(), StoreError> {
        self.inner.save_collection(collection)
    }

    fn delete_collection(&self, name_or_id: &str) -> Result<(), StoreError> {
        self.inner.delete_collection(name_or_id)
    }

    fn find_record_by_id(&self, collection: &str, id: &RecordId) -> Result<Record, StoreError> {
        self.inner.find_record_by_id(collection, id)
    }

    fn find_records(&self, collection: &str, query: &RecordQuery) -> Result<Vec<Record>, StoreError> {
        self.inner.find_records(collection, query)
    }

    fn find_first_by_filter(
        &self,
        collection: &str,
        filter: &str,
        params: &FilterParams,
    ) -> Result<Option<Record>, StoreError> {
        self.inner.find_first_by_filter(collection, filter, params)
    }

    fn count(&self, collection: &str, filter: &str, params: &FilterParams) -> Result<usize, StoreError> {
        self.inner.count(collection, filter, params)
    }

    fn save(&self, record: &mut Record) -> Result<(), StoreError> {
        let created = record.is_new();
        self.inner.save(record)?;

        let event = if created {
            RecordEvent::created(record.clone())
        } else {
            RecordEvent::updated(record.clone())
        };
        self.after_success(event)
    }

    fn delete(&self, record: &Record) -> Result<(), StoreError> {
        self.inner.delete(record)?;
        self.after_success(RecordEvent::deleted(record.clone()))
    }

    fn create_if_absent(
        &self,
        record: &mut Record,
        filter: &str,
        params: &FilterParams,
    ) -> Result<bool, StoreError> {
        if !self.inner.create_if_absent(record, filter, params)? {
            return Ok(false);
        }
        self.after_success(RecordEvent::created(record.clone()))?;
        Ok(true)
    }
}
