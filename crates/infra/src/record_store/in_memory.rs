use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Duration, Utc};

use shopfront_core::{CollectionId, Record, RecordId};

use super::filter::{BoundFilter, FilterParams};
use super::r#trait::{RecordQuery, RecordStore, SortOrder, StoreError};
use crate::schema::Collection;
use crate::schema::collection::is_blank;

#[derive(Debug, Default)]
struct State {
    collections: Vec<Collection>,
    records: HashMap<CollectionId, BTreeMap<RecordId, Record>>,
    last_stamp: Option<DateTime<Utc>>,
}

impl State {
    fn collection(&self, name_or_id: &str) -> Result<&Collection, StoreError> {
        self.collections
            .iter()
            .find(|c| c.is(name_or_id))
            .ok_or_else(|| StoreError::CollectionNotFound(name_or_id.to_string()))
    }

    /// Wall clock, nudged forward so stamps are strictly increasing.
    fn stamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let next = match self.last_stamp {
            Some(last) if now <= last => last + Duration::microseconds(1),
            _ => now,
        };
        self.last_stamp = Some(next);
        next
    }

    fn records_mut(&mut self, id: &CollectionId) -> &mut BTreeMap<RecordId, Record> {
        self.records.entry(id.clone()).or_default()
    }

    /// Validate and write `record`, as a create or as an update of an existing row.
    fn write_record(&mut self, record: &mut Record, create: bool) -> Result<(), StoreError> {
        let collection = self.collection(record.collection())?.clone();
        collection.validate(record)?;

        let rows = self.records_mut(collection.id());
        let exists = rows.contains_key(record.id());
        if create && (exists || !record.is_new()) {
            return Err(StoreError::Conflict {
                collection: collection.name().to_string(),
                id: record.id().clone(),
            });
        }
        if !create && !exists {
            return Err(StoreError::RecordNotFound {
                collection: collection.name().to_string(),
                id: record.id().clone(),
            });
        }
        check_unique(&collection, record, rows.values())?;

        let now = self.stamp();
        record.touch(now);
        self.records_mut(collection.id()).insert(record.id().clone(), record.clone());
        Ok(())
    }
}

fn check_unique<'a>(
    collection: &Collection,
    record: &Record,
    rows: impl Iterator<Item = &'a Record> + Clone,
) -> Result<(), StoreError> {
    for field in collection.unique_fields() {
        let Some(value) = record.get(field).filter(|v| !is_blank(v)) else {
            continue;
        };
        let taken = rows
            .clone()
            .any(|r| r.id() != record.id() && r.get(field) == Some(value));
        if taken {
            return Err(StoreError::UniqueViolation {
                collection: collection.name().to_string(),
                field: field.clone(),
            });
        }
    }
    Ok(())
}

/// In-memory record store.
///
/// Intended for tests/dev and the replay binary. Every mutation takes the
/// single write lock, which also makes `create_if_absent` atomic.
#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    state: RwLock<State>,
}

impl InMemoryRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with collections (no migration log).
    pub fn with_collections(collections: impl IntoIterator<Item = Collection>) -> Result<Self, StoreError> {
        let store = Self::new();
        for c in collections {
            store.save_collection(c)?;
        }
        Ok(store)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StoreError> {
        self.state
            .read()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StoreError> {
        self.state
            .write()
            .map_err(|_| StoreError::Storage("lock poisoned".to_string()))
    }
}

impl RecordStore for InMemoryRecordStore {
    fn find_collection(&self, name_or_id: &str) -> Result<Collection, StoreError> {
        self.read()?.collection(name_or_id).cloned()
    }

    fn list_collections(&self) -> Result<Vec<Collection>, StoreError> {
        Ok(self.read()?.collections.clone())
    }

    fn save_collection(&self, collection: Collection) -> Result<(), StoreError> {
        let mut state = self.write()?;

        let clash = state
            .collections
            .iter()
            .any(|c| c.name() == collection.name() && c.id() != collection.id());
        if clash {
            return Err(StoreError::CollectionExists(collection.name().to_string()));
        }

        let cid = collection.id().clone();
        let name = collection.name().to_string();

        if let Some(rows) = state.records.get(&cid) {
            for row in rows.values() {
                check_unique(&collection, row, rows.values())?;
            }
        }

        // Existing rows follow renames and lose values for removed fields.
        if let Some(rows) = state.records.get_mut(&cid) {
            for row in rows.values_mut() {
                row.set_collection(name.clone());
                collection.prune(row);
            }
        }

        match state.collections.iter_mut().find(|c| c.id() == &cid) {
            Some(existing) => *existing = collection,
            None => state.collections.push(collection),
        }
        state.records.entry(cid).or_default();

        Ok(())
    }

    fn delete_collection(&self, name_or_id: &str) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let cid = state.collection(name_or_id)?.id().clone();
        state.collections.retain(|c| c.id() != &cid);
        state.records.remove(&cid);
        Ok(())
    }

    fn find_record_by_id(&self, collection: &str, id: &RecordId) -> Result<Record, StoreError> {
        let state = self.read()?;
        let c = state.collection(collection)?;
        state
            .records
            .get(c.id())
            .and_then(|rows| rows.get(id))
            .cloned()
            .ok_or_else(|| StoreError::RecordNotFound {
                collection: c.name().to_string(),
                id: id.clone(),
            })
    }

    fn find_records(&self, collection: &str, query: &RecordQuery) -> Result<Vec<Record>, StoreError> {
        let filter = BoundFilter::compile(&query.filter, &query.params)?;

        let state = self.read()?;
        let c = state.collection(collection)?;

        let mut rows: Vec<Record> = state
            .records
            .get(c.id())
            .map(|rows| rows.values().filter(|r| filter.matches(r)).cloned().collect())
            .unwrap_or_default();

        rows.sort_by(|a, b| {
            (a.created(), a.id()).cmp(&(b.created(), b.id()))
        });
        if query.sort == SortOrder::CreatedDesc {
            rows.reverse();
        }

        Ok(rows
            .into_iter()
            .skip(query.offset)
            .take(query.limit.unwrap_or(usize::MAX))
            .collect())
    }

    fn save(&self, record: &mut Record) -> Result<(), StoreError> {
        let create = record.is_new();
        self.write()?.write_record(record, create)
    }

    fn delete(&self, record: &Record) -> Result<(), StoreError> {
        let mut state = self.write()?;
        let cid = state.collection(record.collection())?.id().clone();

        state
            .records_mut(&cid)
            .remove(record.id())
            .map(|_| ())
            .ok_or_else(|| StoreError::RecordNotFound {
                collection: record.collection().to_string(),
                id: record.id().clone(),
            })
    }

    fn create_if_absent(
        &self,
        record: &mut Record,
        filter: &str,
        params: &FilterParams,
    ) -> Result<bool, StoreError> {
        let filter = BoundFilter::compile(filter, params)?;

        let mut state = self.write()?;
        let cid = state.collection(record.collection())?.id().clone();

        let exists = state
            .records
            .get(&cid)
            .is_some_and(|rows| rows.values().any(|r| filter.matches(r)));
        if exists {
            return Ok(false);
        }

        state.write_record(record, true)?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::thread;

    use super::*;
    use crate::schema::Field;

    fn cid(s: &str) -> CollectionId {
        CollectionId::parse(s).unwrap()
    }

    fn test_store() -> InMemoryRecordStore {
        InMemoryRecordStore::with_collections([
            Collection::new(cid("pbc_products"), "products")
                .with_field(Field::text("name"))
                .with_field(Field::count("stockQuantity"))
                .with_field(Field::count("reorderLevel")),
            Collection::new(cid("pbc_notifications"), "notifications")
                .with_field(Field::select("type", &["new_order", "low_stock"]).required())
                .with_field(Field::relation("product", "products", 1))
                .with_field(Field::relation("order", "orders", 1))
                .with_field(Field::bool("read")),
        ])
        .unwrap()
    }

    fn low_stock(product: &str) -> Record {
        let mut r = Record::new("notifications");
        r.set("type", "low_stock").set("product", product);
        r
    }

    #[test]
    fn save_creates_then_updates() {
        let store = test_store();
        let mut p = Record::with_id("products", RecordId::parse("p1").unwrap());
        p.set("name", "Mug").set("stockQuantity", 50).set("reorderLevel", 10);

        store.save(&mut p).unwrap();
        assert!(!p.is_new());

        p.set("stockQuantity", 8);
        store.save(&mut p).unwrap();

        let loaded = store.find_record_by_id("products", p.id()).unwrap();
        assert_eq!(loaded.get_int("stockQuantity"), 8);
        assert_eq!(loaded.created(), p.created());
    }

    #[test]
    fn creating_an_existing_id_conflicts() {
        let store = test_store();
        let id = RecordId::parse("p1").unwrap();
        store.save(&mut Record::with_id("products", id.clone())).unwrap();

        let err = store.save(&mut Record::with_id("products", id)).unwrap_err();
        assert!(matches!(err, StoreError::Conflict { .. }));
    }

    #[test]
    fn updating_a_missing_record_is_not_found() {
        let store = test_store();
        let mut p = Record::new("products");
        store.save(&mut p).unwrap();
        store.delete(&p).unwrap();

        let err = store.save(&mut p).unwrap_err();
        assert!(err.is_not_found());
        assert!(store.delete(&p).unwrap_err().is_not_found());
    }

    #[test]
    fn unknown_collection_and_invalid_record_are_rejected() {
        let store = test_store();
        assert!(matches!(
            store.save(&mut Record::new("coupons")),
            Err(StoreError::CollectionNotFound(_))
        ));

        let mut bad = Record::new("notifications");
        bad.set("type", "price_drop");
        assert!(matches!(store.save(&mut bad), Err(StoreError::Validation(_))));
    }

    #[test]
    fn find_first_and_listing_respect_filter_and_order() {
        let store = test_store();
        let mut a = low_stock("p1");
        let mut b = low_stock("p2");
        let mut c = low_stock("p1");
        store.save(&mut a).unwrap();
        store.save(&mut b).unwrap();
        store.save(&mut c).unwrap();

        let params = FilterParams::new().bind("product_id", "p1");
        let first = store
            .find_first_by_filter("notifications", "type = 'low_stock' && product = {:product_id}", &params)
            .unwrap()
            .unwrap();
        assert_eq!(first.id(), a.id());

        let newest = store
            .find_records("notifications", &RecordQuery::all().newest_first().limit(2))
            .unwrap();
        assert_eq!(
            newest.iter().map(|r| r.id().clone()).collect::<Vec<_>>(),
            vec![c.id().clone(), b.id().clone()]
        );

        assert_eq!(store.count("notifications", "product = 'p2'", &FilterParams::new()).unwrap(), 1);
        assert!(store
            .find_first_by_filter("notifications", "product = 'p9'", &FilterParams::new())
            .unwrap()
            .is_none());
    }

    #[test]
    fn create_if_absent_only_creates_once() {
        let store = test_store();
        let filter = "type = 'low_stock' && product = {:product_id}";
        let params = FilterParams::new().bind("product_id", "p1");

        assert!(store.create_if_absent(&mut low_stock("p1"), filter, &params).unwrap());
        assert!(!store.create_if_absent(&mut low_stock("p1"), filter, &params).unwrap());
        assert_eq!(store.count("notifications", filter, &params).unwrap(), 1);
    }

    #[test]
    fn create_if_absent_is_atomic_under_contention() {
        let store = Arc::new(test_store());
        let filter = "type = 'low_stock' && product = {:product_id}";

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                thread::spawn(move || {
                    let params = FilterParams::new().bind("product_id", "p1");
                    store.create_if_absent(&mut low_stock("p1"), filter, &params).unwrap()
                })
            })
            .collect();

        let created = handles.into_iter().map(|h| h.join().unwrap()).filter(|c| *c).count();
        assert_eq!(created, 1);
    }

    #[test]
    fn renaming_a_collection_moves_records_and_prunes_removed_fields() {
        let store = test_store();
        let mut p = Record::new("products");
        p.set("name", "Mug").set("stockQuantity", 3);
        store.save(&mut p).unwrap();

        let mut c = store.find_collection("pbc_products").unwrap();
        c.rename("items");
        c.remove_field("name");
        store.save_collection(c).unwrap();

        assert!(matches!(store.find_collection("products"), Err(StoreError::CollectionNotFound(_))));
        let moved = store.find_record_by_id("items", p.id()).unwrap();
        assert_eq!(moved.collection(), "items");
        assert!(moved.get("name").is_none());
        assert_eq!(moved.get_int("stockQuantity"), 3);
    }

    #[test]
    fn collection_names_are_unique_and_deletable() {
        let store = test_store();
        let dup = Collection::new(cid("pbc_other"), "products");
        assert!(matches!(store.save_collection(dup), Err(StoreError::CollectionExists(_))));

        store.delete_collection("notifications").unwrap();
        assert!(store.find_collection("pbc_notifications").is_err());
        assert_eq!(store.list_collections().unwrap().len(), 1);
    }

    #[test]
    fn unique_fields_reject_duplicates_but_allow_blanks() {
        let store = test_store();
        let mut c = store.find_collection("products").unwrap();
        c.add_unique("name");
        store.save_collection(c).unwrap();

        let mut a = Record::new("products");
        a.set("name", "mug");
        store.save(&mut a).unwrap();
        store.save(&mut a).unwrap();

        let mut b = Record::new("products");
        b.set("name", "mug");
        assert!(matches!(store.save(&mut b), Err(StoreError::UniqueViolation { .. })));

        store.save(&mut Record::new("products")).unwrap();
        store.save(&mut Record::new("products")).unwrap();
    }
}
