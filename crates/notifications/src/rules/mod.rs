//! Notification rules.
//!
//! A rule is a decision over one committed mutation: given the event and
//! read access to the store, it names at most one notification write. Rules
//! never write themselves; the [`NotificationEngine`](crate::NotificationEngine)
//! applies the write and logs the result.

pub mod low_stock;
pub mod new_order;

use shopfront_core::{Record, RecordId};
use shopfront_events::{MutationKind, RecordEvent};
use shopfront_infra::DynRecordStore;

use crate::notification::NotificationKind;

pub use low_stock::{LowStockAlert, LowStockClear};
pub use new_order::NewOrderNotification;

/// The single side effect a rule may ask for.
#[derive(Debug, Clone, PartialEq)]
pub enum NotificationWrite {
    /// Create a `kind` notification about `related`.
    Create { kind: NotificationKind, related: RecordId },
    /// Delete an existing notification record.
    Delete(Record),
}

/// Result of evaluating a rule.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub write: Option<NotificationWrite>,
    pub continue_chain: bool,
}

impl Outcome {
    /// No side effect; keep the chain going.
    pub fn skip() -> Self {
        Self {
            write: None,
            continue_chain: true,
        }
    }

    pub fn write(write: NotificationWrite) -> Self {
        Self {
            write: Some(write),
            continue_chain: true,
        }
    }
}

pub trait Rule: Send + Sync {
    /// Stable name used in logs and as the hook name.
    fn name(&self) -> &'static str;

    /// Mutation kind and collection this rule is bound to.
    fn trigger(&self) -> (MutationKind, &str);

    fn evaluate(&self, store: &DynRecordStore, event: &RecordEvent) -> Outcome;
}
