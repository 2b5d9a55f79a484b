//! Read-side queries and read-state updates for the notification list.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use shopfront_core::{DomainError, Record, RecordId};
use shopfront_infra::{DynRecordStore, FilterParams, RecordQuery, StoreError};

use crate::notification::{Notification, NotificationKind, READ_FIELD};

const UNREAD_FILTER: &str = "read != true";

#[derive(Debug, Error)]
pub enum InboxError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("malformed notification: {0}")]
    Malformed(#[from] DomainError),
}

/// Per-type tallies for a notification badge.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct NotificationCounts {
    pub new_order: usize,
    pub low_stock: usize,
    pub total: usize,
    pub unread: usize,
}

/// Notification list operations over one store.
///
/// Only `read` is ever written here; `type` and the relation fields belong to
/// the rules that created the notification.
pub struct NotificationInbox<'a> {
    store: &'a DynRecordStore,
    collection: String,
}

impl<'a> NotificationInbox<'a> {
    pub fn new(store: &'a DynRecordStore, collection: impl Into<String>) -> Self {
        Self {
            store,
            collection: collection.into(),
        }
    }

    /// Newest first, at most `limit`.
    pub fn recent(&self, limit: usize) -> Result<Vec<Notification>, InboxError> {
        self.list(RecordQuery::all().newest_first().limit(limit))
    }

    /// Unread only, newest first, at most `limit`.
    pub fn unread(&self, limit: usize) -> Result<Vec<Notification>, InboxError> {
        self.list(
            RecordQuery::filtered(UNREAD_FILTER, FilterParams::new())
                .newest_first()
                .limit(limit),
        )
    }

    pub fn unread_count(&self) -> Result<usize, InboxError> {
        Ok(self.store.count(&self.collection, UNREAD_FILTER, &FilterParams::new())?)
    }

    pub fn count_by_type(&self) -> Result<NotificationCounts, InboxError> {
        let mut counts = NotificationCounts::default();
        for n in self.list(RecordQuery::all())? {
            counts.total += 1;
            if !n.read {
                counts.unread += 1;
            }
            match n.kind {
                NotificationKind::NewOrder => counts.new_order += 1,
                NotificationKind::LowStock => counts.low_stock += 1,
            }
        }
        Ok(counts)
    }

    pub fn mark_read(&self, id: &RecordId) -> Result<Notification, InboxError> {
        let mut record = self.store.find_record_by_id(&self.collection, id)?;
        if !record.get_bool(READ_FIELD) {
            record.set(READ_FIELD, true);
            self.store.save(&mut record)?;
            debug!(notification_id = %id, "notification marked read");
        }
        Ok(Notification::try_from(&record)?)
    }

    /// Mark each id read; stops at the first failure. Returns how many were updated.
    pub fn mark_many_read(&self, ids: &[RecordId]) -> Result<usize, InboxError> {
        for id in ids {
            self.mark_read(id)?;
        }
        Ok(ids.len())
    }

    pub fn delete(&self, id: &RecordId) -> Result<(), InboxError> {
        let record = self.store.find_record_by_id(&self.collection, id)?;
        self.store.delete(&record)?;
        debug!(notification_id = %id, "notification deleted");
        Ok(())
    }

    /// Delete each id; stops at the first failure. Returns how many were deleted.
    pub fn delete_many(&self, ids: &[RecordId]) -> Result<usize, InboxError> {
        for id in ids {
            self.delete(id)?;
        }
        Ok(ids.len())
    }

    /// Whether a `kind` notification about `related` exists.
    pub fn exists(&self, kind: NotificationKind, related: &RecordId) -> Result<bool, InboxError> {
        let filter = format!("type = {{:type}} && {} = {{:related}}", kind.relation_field());
        let params = FilterParams::new()
            .bind("type", kind.as_str())
            .bind("related", related.as_str());
        Ok(self.store.count(&self.collection, &filter, &params)? > 0)
    }

    fn list(&self, query: RecordQuery) -> Result<Vec<Notification>, InboxError> {
        self.store
            .find_records(&self.collection, &query)?
            .iter()
            .map(|r: &Record| Notification::try_from(r).map_err(InboxError::from))
            .collect()
    }
}
