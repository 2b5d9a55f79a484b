//! Replays a JSON script of record mutations against a store.
//!
//! A script is a JSON array of steps:
//!
//! ```json
//! [
//!   {"op": "create", "collection": "products", "id": "p1", "fields": {"stockQuantity": 50}},
//!   {"op": "update", "collection": "products", "id": "p1", "fields": {"stockQuantity": 8}},
//!   {"op": "delete", "collection": "products", "id": "p1"}
//! ]
//! ```
//!
//! Updates merge `fields` into the stored record; a `null` value clears the field.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value as JsonValue};
use thiserror::Error;
use tracing::debug;

use shopfront_core::{DomainError, Record, RecordId};
use shopfront_infra::{DynRecordStore, StoreError};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepOp {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub op: StepOp,
    pub collection: String,
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub fields: Map<String, JsonValue>,
}

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("invalid script: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("step {step}: {op:?} requires an id")]
    MissingId { step: usize, op: StepOp },

    #[error("step {step}: {source}")]
    InvalidId { step: usize, source: DomainError },

    #[error("step {step}: {source}")]
    Store { step: usize, source: StoreError },
}

/// What a replay did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReplayReport {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
}

pub fn parse_script(json: &str) -> Result<Vec<Step>, ReplayError> {
    Ok(serde_json::from_str(json)?)
}

/// Apply `steps` in order, stopping at the first failure.
pub fn run(store: &DynRecordStore, steps: &[Step]) -> Result<ReplayReport, ReplayError> {
    let mut report = ReplayReport::default();

    for (step, s) in steps.iter().enumerate() {
        let store_err = |source| ReplayError::Store { step, source };

        match s.op {
            StepOp::Create => {
                let mut record = match &s.id {
                    Some(id) => Record::with_id(
                        s.collection.clone(),
                        RecordId::parse(id).map_err(|source| ReplayError::InvalidId { step, source })?,
                    ),
                    None => Record::new(s.collection.clone()),
                };
                merge(&mut record, &s.fields);
                store.save(&mut record).map_err(store_err)?;
                report.created += 1;
            }
            StepOp::Update => {
                let mut record = store.find_record_by_id(&s.collection, &step_id(step, s)?).map_err(store_err)?;
                merge(&mut record, &s.fields);
                store.save(&mut record).map_err(store_err)?;
                report.updated += 1;
            }
            StepOp::Delete => {
                let record = store.find_record_by_id(&s.collection, &step_id(step, s)?).map_err(store_err)?;
                store.delete(&record).map_err(store_err)?;
                report.deleted += 1;
            }
        }

        debug!(step, op = ?s.op, collection = %s.collection, "replayed step");
    }

    Ok(report)
}

fn step_id(step: usize, s: &Step) -> Result<RecordId, ReplayError> {
    let raw = s.id.as_deref().ok_or(ReplayError::MissingId { step, op: s.op })?;
    RecordId::parse(raw).map_err(|source| ReplayError::InvalidId { step, source })
}

fn merge(record: &mut Record, fields: &Map<String, JsonValue>) {
    for (name, value) in fields {
        if value.is_null() {
            record.remove(name);
        } else {
            record.set(name.clone(), value.clone());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopfront_core::CollectionId;
    use shopfront_infra::{Collection, Field, InMemoryRecordStore, RecordStore};

    fn test_store() -> InMemoryRecordStore {
        InMemoryRecordStore::with_collections([Collection::new(
            CollectionId::parse("pbc_products").unwrap(),
            "products",
        )
        .with_field(Field::text("sku"))
        .with_field(Field::count("stockQuantity"))])
        .unwrap()
    }

    #[test]
    fn applies_create_update_delete() {
        let store = test_store();
        let steps = parse_script(
            r#"[
                {"op": "create", "collection": "products", "id": "p1", "fields": {"stockQuantity": 50, "sku": "MUG"}},
                {"op": "update", "collection": "products", "id": "p1", "fields": {"stockQuantity": 8, "sku": null}},
                {"op": "create", "collection": "products", "fields": {"stockQuantity": 1}}
            ]"#,
        )
        .unwrap();

        let report = run(&store, &steps).unwrap();
        assert_eq!(report, ReplayReport { created: 2, updated: 1, deleted: 0 });

        let p1 = store.find_record_by_id("products", &RecordId::parse("p1").unwrap()).unwrap();
        assert_eq!(p1.get_int("stockQuantity"), 8);
        assert!(p1.get("sku").is_none());

        let delete = parse_script(r#"[{"op": "delete", "collection": "products", "id": "p1"}]"#).unwrap();
        assert_eq!(run(&store, &delete).unwrap().deleted, 1);
    }

    #[test]
    fn reports_the_failing_step() {
        let store = test_store();
        let steps = parse_script(
            r#"[
                {"op": "create", "collection": "products", "id": "p1"},
                {"op": "update", "collection": "products", "id": "p9"}
            ]"#,
        )
        .unwrap();

        let err = run(&store, &steps).unwrap_err();
        assert!(matches!(err, ReplayError::Store { step: 1, ref source } if source.is_not_found()));
    }

    #[test]
    fn update_without_id_and_bad_ids_are_rejected() {
        let store = test_store();
        let steps = parse_script(r#"[{"op": "update", "collection": "products"}]"#).unwrap();
        assert!(matches!(run(&store, &steps), Err(ReplayError::MissingId { step: 0, .. })));

        let steps = parse_script(r#"[{"op": "create", "collection": "products", "id": "Not Valid"}]"#).unwrap();
        assert!(matches!(run(&store, &steps), Err(ReplayError::InvalidId { step: 0, .. })));
    }

    #[test]
    fn malformed_scripts_fail_to_parse() {
        assert!(matches!(parse_script(r#"[{"op": "upsert", "collection": "x"}]"#), Err(ReplayError::Parse(_))));
        assert!(parse_script("{}").is_err());
    }
}
