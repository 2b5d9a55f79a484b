use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use shopfront_core::{Record, RecordId};

/// Kind of committed mutation that produced an event.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutationKind {
    Create,
    Update,
    Delete,
}

impl MutationKind {
    pub fn as_str(self) -> &'static str {
        match self {
            MutationKind::Create => "create",
            MutationKind::Update => "update",
            MutationKind::Delete => "delete",
        }
    }
}

impl core::fmt::Display for MutationKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record mutation that has already committed.
///
/// Events are facts: hooks see the post-mutation record (for deletes, the
/// record as it was right before removal).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordEvent {
    kind: MutationKind,
    record: Record,
    occurred_at: DateTime<Utc>,
}

impl RecordEvent {
    pub fn new(kind: MutationKind, record: Record, occurred_at: DateTime<Utc>) -> Self {
        Self {
            kind,
            record,
            occurred_at,
        }
    }

    pub fn created(record: Record) -> Self {
        Self::new(MutationKind::Create, record, Utc::now())
    }

    pub fn updated(record: Record) -> Self {
        Self::new(MutationKind::Update, record, Utc::now())
    }

    pub fn deleted(record: Record) -> Self {
        Self::new(MutationKind::Delete, record, Utc::now())
    }

    pub fn kind(&self) -> MutationKind {
        self.kind
    }

    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn into_record(self) -> Record {
        self.record
    }

    pub fn collection(&self) -> &str {
        self.record.collection()
    }

    pub fn record_id(&self) -> &RecordId {
        self.record.id()
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        self.occurred_at
    }

    /// Stable event name, e.g. `"orders.create"`.
    pub fn event_type(&self) -> String {
        format!("{}.{}", self.record.collection(), self.kind)
    }
}
