//! Generic record: an identified bag of JSON fields belonging to a collection.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};

use crate::id::RecordId;

/// A single persisted (or about-to-be-persisted) entity instance.
///
/// `created`/`updated` are assigned by the store. A record without a
/// `created` timestamp has never been saved, so the next save is a create.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    id: RecordId,
    collection: String,
    #[serde(default)]
    fields: Map<String, JsonValue>,
    #[serde(default)]
    created: Option<DateTime<Utc>>,
    #[serde(default)]
    updated: Option<DateTime<Utc>>,
}

impl Record {
    /// Create a new, unsaved record with a generated id.
    pub fn new(collection: impl Into<String>) -> Self {
        Self::with_id(collection, RecordId::new())
    }

    /// Create a new, unsaved record with an explicit id.
    pub fn with_id(collection: impl Into<String>, id: RecordId) -> Self {
        Self {
            id,
            collection: collection.into(),
            fields: Map::new(),
            created: None,
            updated: None,
        }
    }

    pub fn id(&self) -> &RecordId {
        &self.id
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    /// Move the record to another collection name (used when a collection is renamed).
    pub fn set_collection(&mut self, collection: impl Into<String>) {
        self.collection = collection.into();
    }

    pub fn is_new(&self) -> bool {
        self.created.is_none()
    }

    pub fn created(&self) -> Option<DateTime<Utc>> {
        self.created
    }

    pub fn updated(&self) -> Option<DateTime<Utc>> {
        self.updated
    }

    /// Stamp persistence timestamps. Called by stores on save.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        if self.created.is_none() {
            self.created = Some(now);
        }
        self.updated = Some(now);
    }

    pub fn fields(&self) -> &Map<String, JsonValue> {
        &self.fields
    }

    /// Set a field value (builder-friendly).
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<JsonValue>) -> &mut Self {
        self.fields.insert(name.into(), value.into());
        self
    }

    pub fn remove(&mut self, name: &str) -> Option<JsonValue> {
        self.fields.remove(name)
    }

    /// Raw value of a stored field.
    pub fn get(&self, name: &str) -> Option<&JsonValue> {
        self.fields.get(name)
    }

    /// Value of a field including the system fields `id`, `created`, `updated`.
    pub fn value_of(&self, name: &str) -> Option<JsonValue> {
        match name {
            "id" => Some(JsonValue::String(self.id.to_string())),
            "collection" => Some(JsonValue::String(self.collection.clone())),
            "created" => self.created.map(|t| JsonValue::String(t.to_rfc3339())),
            "updated" => self.updated.map(|t| JsonValue::String(t.to_rfc3339())),
            _ => self.fields.get(name).cloned(),
        }
    }

    /// String accessor. Missing or non-string fields read as `""`.
    pub fn get_str(&self, name: &str) -> &str {
        self.fields.get(name).and_then(JsonValue::as_str).unwrap_or("")
    }

    /// Integer accessor with the platform's lenient casting.
    ///
    /// Floats are truncated, numeric strings parsed, bools map to 0/1;
    /// anything else (including a missing field) reads as 0.
    pub fn get_int(&self, name: &str) -> i64 {
        match self.fields.get(name) {
            Some(JsonValue::Number(n)) => n
                .as_i64()
                .or_else(|| n.as_f64().map(|f| f as i64))
                .unwrap_or(0),
            Some(JsonValue::String(s)) => {
                let s = s.trim();
                s.parse::<i64>()
                    .ok()
                    .or_else(|| s.parse::<f64>().ok().map(|f| f as i64))
                    .unwrap_or(0)
            }
            Some(JsonValue::Bool(b)) => i64::from(*b),
            _ => 0,
        }
    }

    /// Float accessor; same casting rules as [`Record::get_int`].
    pub fn get_float(&self, name: &str) -> f64 {
        match self.fields.get(name) {
            Some(JsonValue::Number(n)) => n.as_f64().unwrap_or(0.0),
            Some(JsonValue::String(s)) => s.trim().parse::<f64>().unwrap_or(0.0),
            Some(JsonValue::Bool(b)) => f64::from(u8::from(*b)),
            _ => 0.0,
        }
    }

    /// Bool accessor. `true`, non-zero numbers and `"true"`/`"1"` read as true.
    pub fn get_bool(&self, name: &str) -> bool {
        match self.fields.get(name) {
            Some(JsonValue::Bool(b)) => *b,
            Some(JsonValue::Number(n)) => n.as_f64().is_some_and(|f| f != 0.0),
            Some(JsonValue::String(s)) => matches!(s.as_str(), "true" | "1"),
            _ => false,
        }
    }
}
