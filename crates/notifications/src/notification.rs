//! Typed view over records in the notifications collection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;

use shopfront_core::{DomainError, Record, RecordId};
use shopfront_infra::Collection;

pub const TYPE_FIELD: &str = "type";
pub const ORDER_FIELD: &str = "order";
pub const PRODUCT_FIELD: &str = "product";
pub const READ_FIELD: &str = "read";

/// Dedup lookup for the single low-stock notification of a product.
pub const LOW_STOCK_FILTER: &str = "type = 'low_stock' && product = {:product_id}";

/// Placeholder bound into [`LOW_STOCK_FILTER`].
pub const PRODUCT_ID_PARAM: &str = "product_id";

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewOrder,
    LowStock,
}

impl NotificationKind {
    pub const ALL: [NotificationKind; 2] = [NotificationKind::NewOrder, NotificationKind::LowStock];

    pub fn as_str(self) -> &'static str {
        match self {
            NotificationKind::NewOrder => "new_order",
            NotificationKind::LowStock => "low_stock",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == s)
    }

    /// Relation field that points at the record this notification is about.
    pub fn relation_field(self) -> &'static str {
        match self {
            NotificationKind::NewOrder => ORDER_FIELD,
            NotificationKind::LowStock => PRODUCT_FIELD,
        }
    }
}

impl core::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unsaved notification record of `kind` about `related`.
pub fn draft(collection: &Collection, kind: NotificationKind, related: &RecordId) -> Record {
    let mut record = collection.new_record();
    record
        .set(TYPE_FIELD, kind.as_str())
        .set(kind.relation_field(), related.as_str());
    record
}

/// A stored notification.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: RecordId,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<RecordId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product: Option<RecordId>,
    #[serde(default)]
    pub read: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,
}

impl Notification {
    /// Id of the order or product this notification refers to.
    pub fn related(&self) -> Option<&RecordId> {
        match self.kind {
            NotificationKind::NewOrder => self.order.as_ref(),
            NotificationKind::LowStock => self.product.as_ref(),
        }
    }
}

impl TryFrom<&Record> for Notification {
    type Error = DomainError;

    fn try_from(record: &Record) -> Result<Self, Self::Error> {
        let raw = record.get_str(TYPE_FIELD);
        let kind = NotificationKind::parse(raw).ok_or_else(|| {
            DomainError::malformed(format!("notification {}: unknown type '{raw}'", record.id()))
        })?;

        Ok(Self {
            id: record.id().clone(),
            kind,
            order: relation(record, ORDER_FIELD)?,
            product: relation(record, PRODUCT_FIELD)?,
            read: record.get_bool(READ_FIELD),
            created: record.created(),
        })
    }
}

/// Single-valued relation; stored either as a string or a one-element list.
fn relation(record: &Record, field: &str) -> Result<Option<RecordId>, DomainError> {
    let raw = match record.get(field) {
        Some(JsonValue::String(s)) => s.as_str(),
        Some(JsonValue::Array(items)) => items.first().and_then(JsonValue::as_str).unwrap_or_default(),
        _ => "",
    };
    if raw.is_empty() {
        return Ok(None);
    }
    RecordId::parse(raw).map(Some)
}
