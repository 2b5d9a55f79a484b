use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use thiserror::Error;

use shopfront_core::{CollectionId, Record, RecordId};

use super::field::{Field, FieldKind};

/// Field names owned by the store; never part of a schema.
pub const SYSTEM_FIELDS: [&str; 3] = ["id", "created", "updated"];

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SchemaError {
    #[error("{collection}: unknown field '{field}'")]
    UnknownField { collection: String, field: String },

    #[error("{collection}.{field}: value is required")]
    MissingRequired { collection: String, field: String },

    #[error("{collection}.{field}: {message}")]
    InvalidValue {
        collection: String,
        field: String,
        message: String,
    },

    #[error("{collection}: field '{field}' is reserved")]
    ReservedField { collection: String, field: String },

    #[error("record belongs to '{found}', not '{expected}'")]
    WrongCollection { expected: String, found: String },
}

/// A named grouping of records sharing a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Collection {
    id: CollectionId,
    name: String,
    fields: Vec<Field>,
    #[serde(default)]
    unique: Vec<String>,
    #[serde(default)]
    system: bool,
}

impl Collection {
    pub fn new(id: CollectionId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            fields: Vec::new(),
            unique: Vec::new(),
            system: false,
        }
    }

    /// Store-internal bookkeeping collection (e.g. the migration log).
    pub fn system(id: CollectionId, name: impl Into<String>) -> Self {
        Self {
            system: true,
            ..Self::new(id, name)
        }
    }

    pub fn with_field(mut self, field: Field) -> Self {
        self.add_field(field);
        self
    }

    pub fn id(&self) -> &CollectionId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn rename(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn is_system(&self) -> bool {
        self.system
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Add a field, replacing any existing field with the same name in place.
    pub fn add_field(&mut self, field: Field) {
        match self.fields.iter_mut().find(|f| f.name == field.name) {
            Some(existing) => *existing = field,
            None => self.fields.push(field),
        }
    }

    /// Remove a field by name; returns whether it existed.
    pub fn remove_field(&mut self, name: &str) -> bool {
        let before = self.fields.len();
        self.fields.retain(|f| f.name != name);
        self.unique.retain(|f| f != name);
        self.fields.len() != before
    }

    /// Fields whose non-blank values must be unique across the collection.
    pub fn unique_fields(&self) -> &[String] {
        &self.unique
    }

    pub fn add_unique(&mut self, field: impl Into<String>) {
        let field = field.into();
        if !self.unique.contains(&field) {
            self.unique.push(field);
        }
    }

    pub fn drop_unique(&mut self, field: &str) -> bool {
        let before = self.unique.len();
        self.unique.retain(|f| f != field);
        self.unique.len() != before
    }

    /// Whether `name_or_id` addresses this collection.
    pub fn is(&self, name_or_id: &str) -> bool {
        self.name == name_or_id || self.id.as_str() == name_or_id
    }

    /// A new, unsaved record for this collection.
    pub fn new_record(&self) -> Record {
        Record::new(self.name.clone())
    }

    /// A new, unsaved record with an explicit id.
    pub fn new_record_with_id(&self, id: RecordId) -> Record {
        Record::with_id(self.name.clone(), id)
    }

    /// Validate a record's fields against this schema.
    pub fn validate(&self, record: &Record) -> Result<(), SchemaError> {
        if record.collection() != self.name {
            return Err(SchemaError::WrongCollection {
                expected: self.name.clone(),
                found: record.collection().to_string(),
            });
        }

        for name in record.fields().keys() {
            if SYSTEM_FIELDS.contains(&name.as_str()) {
                return Err(SchemaError::ReservedField {
                    collection: self.name.clone(),
                    field: name.clone(),
                });
            }
            if self.field(name).is_none() {
                return Err(SchemaError::UnknownField {
                    collection: self.name.clone(),
                    field: name.clone(),
                });
            }
        }

        for field in &self.fields {
            let value = record.get(&field.name).unwrap_or(&JsonValue::Null);
            if is_blank(value) {
                if field.required {
                    return Err(SchemaError::MissingRequired {
                        collection: self.name.clone(),
                        field: field.name.clone(),
                    });
                }
                continue;
            }

            check_value(&field.kind, value).map_err(|message| SchemaError::InvalidValue {
                collection: self.name.clone(),
                field: field.name.clone(),
                message,
            })?;
        }

        Ok(())
    }

    /// Drop record fields that are no longer part of the schema.
    pub fn prune(&self, record: &mut Record) {
        let stale: Vec<String> = record
            .fields()
            .keys()
            .filter(|k| self.field(k).is_none())
            .cloned()
            .collect();
        for k in stale {
            record.remove(&k);
        }
    }
}

pub(crate) fn is_blank(value: &JsonValue) -> bool {
    match value {
        JsonValue::Null => true,
        JsonValue::String(s) => s.is_empty(),
        JsonValue::Array(a) => a.is_empty(),
        _ => false,
    }
}

fn check_value(kind: &FieldKind, value: &JsonValue) -> Result<(), String> {
    match kind {
        FieldKind::Text => expect_str(value).map(|_| ()),
        FieldKind::Number { min, only_int } => {
            let n = value.as_f64().ok_or_else(|| "must be a number".to_string())?;
            if *only_int && n.fract() != 0.0 {
                return Err("must be an integer".to_string());
            }
            if let Some(min) = min {
                if n < *min {
                    return Err(format!("must be >= {min}"));
                }
            }
            Ok(())
        }
        FieldKind::Bool => value
            .is_boolean()
            .then_some(())
            .ok_or_else(|| "must be a bool".to_string()),
        FieldKind::Email => {
            let s = expect_str(value)?;
            match s.split_once('@') {
                Some((user, domain)) if !user.is_empty() && domain.contains('.') => Ok(()),
                _ => Err(format!("'{s}' is not a valid email")),
            }
        }
        FieldKind::Url => {
            let s = expect_str(value)?;
            if s.starts_with("http://") || s.starts_with("https://") {
                Ok(())
            } else {
                Err(format!("'{s}' is not a valid url"))
            }
        }
        FieldKind::Date => {
            let s = expect_str(value)?;
            DateTime::parse_from_rfc3339(s)
                .map(|_| ())
                .map_err(|e| format!("'{s}' is not an RFC3339 date: {e}"))
        }
        FieldKind::Json => Ok(()),
        FieldKind::Select { values, max_select } => {
            let picked = expect_strs(value, *max_select)?;
            match picked.iter().find(|p| !values.iter().any(|v| v == *p)) {
                Some(bad) => Err(format!("'{bad}' is not one of {values:?}")),
                None => Ok(()),
            }
        }
        FieldKind::Relation { max_select, .. } | FieldKind::File { max_select } => {
            expect_strs(value, *max_select).map(|_| ())
        }
    }
}

fn expect_str(value: &JsonValue) -> Result<&str, String> {
    value.as_str().ok_or_else(|| "must be a string".to_string())
}

/// A single string, or an array of strings no longer than `max`.
fn expect_strs(value: &JsonValue, max: usize) -> Result<Vec<&str>, String> {
    match value {
        JsonValue::String(s) => Ok(vec![s.as_str()]),
        JsonValue::Array(items) => {
            if items.len() > max.max(1) {
                return Err(format!("at most {max} values allowed"));
            }
            items
                .iter()
                .map(|i| i.as_str().ok_or_else(|| "values must be strings".to_string()))
                .collect()
        }
        _ => Err("must be a string or a list of strings".to_string()),
    }
}
