//! Versioned schema changes.
//!
//! A [`Migration`] is an ordered list of [`SchemaChange`]s with an inverse.
//! The [`Migrator`] applies pending migrations in id order and keeps the
//! applied set in the `_migrations` system collection, so a store can be
//! brought up to date repeatedly without re-running anything.

pub mod catalog;

use chrono::{SecondsFormat, Utc};
use thiserror::Error;
use tracing::{info, warn};

use shopfront_core::{CollectionId, DomainError, Record};

use crate::record_store::{DynRecordStore, RecordQuery, StoreError};
use crate::schema::{Collection, Field, SchemaError};

pub use catalog::all;

/// Name of the collection holding the applied-migration log.
pub const MIGRATIONS_COLLECTION: &str = "_migrations";

const MIGRATIONS_COLLECTION_ID: &str = "_pbc_migrations";

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("migration {id} failed: {source}")]
    Failed { id: String, source: StoreError },

    #[error("migration history unavailable: {0}")]
    History(#[from] StoreError),

    #[error("invalid migration definition: {0}")]
    Definition(#[from] DomainError),
}

/// One structural change to the store's collections.
#[derive(Debug, Clone, PartialEq)]
pub enum SchemaChange {
    CreateCollection(Collection),
    DropCollection(String),
    RenameCollection { from: String, to: String },
    /// Add a field, or replace the field with the same name.
    AddField { collection: String, field: Field },
    RemoveField { collection: String, field: String },
    /// Rename a field, carrying existing values over.
    RenameField { collection: String, from: String, to: String },
    AddUniqueIndex { collection: String, field: String },
    DropUniqueIndex { collection: String, field: String },
}

impl SchemaChange {
    pub fn add_field(collection: impl Into<String>, field: Field) -> Self {
        Self::AddField {
            collection: collection.into(),
            field,
        }
    }

    pub fn remove_field(collection: impl Into<String>, field: impl Into<String>) -> Self {
        Self::RemoveField {
            collection: collection.into(),
            field: field.into(),
        }
    }

    pub fn rename_collection(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::RenameCollection {
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn rename_field(collection: impl Into<String>, from: impl Into<String>, to: impl Into<String>) -> Self {
        Self::RenameField {
            collection: collection.into(),
            from: from.into(),
            to: to.into(),
        }
    }

    pub fn apply(&self, store: &DynRecordStore) -> Result<(), StoreError> {
        match self {
            SchemaChange::CreateCollection(c) => store.save_collection(c.clone()),
            SchemaChange::DropCollection(name) => store.delete_collection(name),
            SchemaChange::RenameCollection { from, to } => {
                let mut c = store.find_collection(from)?;
                c.rename(to.clone());
                store.save_collection(c)
            }
            SchemaChange::AddField { collection, field } => {
                let mut c = store.find_collection(collection)?;
                c.add_field(field.clone());
                store.save_collection(c)
            }
            SchemaChange::RemoveField { collection, field } => {
                let mut c = store.find_collection(collection)?;
                if !c.remove_field(field) {
                    return Err(unknown_field(&c, field));
                }
                store.save_collection(c)
            }
            SchemaChange::RenameField { collection, from, to } => rename_field(store, collection, from, to),
            SchemaChange::AddUniqueIndex { collection, field } => {
                let mut c = store.find_collection(collection)?;
                if c.field(field).is_none() {
                    return Err(unknown_field(&c, field));
                }
                c.add_unique(field.clone());
                store.save_collection(c)
            }
            SchemaChange::DropUniqueIndex { collection, field } => {
                let mut c = store.find_collection(collection)?;
                c.drop_unique(field);
                store.save_collection(c)
            }
        }
    }
}

fn unknown_field(c: &Collection, field: &str) -> StoreError {
    StoreError::Validation(SchemaError::UnknownField {
        collection: c.name().to_string(),
        field: field.to_string(),
    })
}

/// Add `to` next to `from`, move every stored value across, then drop `from`.
fn rename_field(store: &DynRecordStore, collection: &str, from: &str, to: &str) -> Result<(), StoreError> {
    let mut c = store.find_collection(collection)?;
    let mut field = c.field(from).cloned().ok_or_else(|| unknown_field(&c, from))?;
    field.name = to.to_string();
    c.add_field(field);
    store.save_collection(c.clone())?;

    for mut record in store.find_records(c.name(), &RecordQuery::all())? {
        if let Some(value) = record.remove(from) {
            record.set(to, value);
            store.save(&mut record)?;
        }
    }

    c.remove_field(from);
    store.save_collection(c)
}

/// A named, reversible group of schema changes.
#[derive(Debug, Clone, PartialEq)]
pub struct Migration {
    id: String,
    description: String,
    up: Vec<SchemaChange>,
    down: Vec<SchemaChange>,
}

impl Migration {
    /// `id` orders migrations; by convention `<unix-seconds>_<summary>`.
    pub fn new(id: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            description: description.into(),
            up: Vec::new(),
            down: Vec::new(),
        }
    }

    pub fn up(mut self, change: SchemaChange) -> Self {
        self.up.push(change);
        self
    }

    pub fn down(mut self, change: SchemaChange) -> Self {
        self.down.push(change);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn up_changes(&self) -> &[SchemaChange] {
        &self.up
    }

    pub fn down_changes(&self) -> &[SchemaChange] {
        &self.down
    }
}

/// Applies and reverts a fixed set of migrations against a store.
#[derive(Debug, Clone)]
pub struct Migrator {
    migrations: Vec<Migration>,
}

impl Migrator {
    pub fn new(mut migrations: Vec<Migration>) -> Self {
        migrations.sort_by(|a, b| a.id.cmp(&b.id));
        Self { migrations }
    }

    pub fn migrations(&self) -> &[Migration] {
        &self.migrations
    }

    /// Applied migration ids, oldest first. Ids unknown to this migrator are included.
    pub fn applied(&self, store: &DynRecordStore) -> Result<Vec<String>, MigrationError> {
        Ok(self
            .history(store)?
            .into_iter()
            .map(|r| r.get_str("file").to_string())
            .collect())
    }

    pub fn pending(&self, store: &DynRecordStore) -> Result<Vec<&Migration>, MigrationError> {
        let applied = self.applied(store)?;
        Ok(self
            .migrations
            .iter()
            .filter(|m| !applied.iter().any(|a| a == &m.id))
            .collect())
    }

    /// Apply every pending migration in id order; returns the applied ids.
    pub fn apply_pending(&self, store: &DynRecordStore) -> Result<Vec<String>, MigrationError> {
        self.ensure_log(store)?;

        let mut done = Vec::new();
        for m in self.pending(store)? {
            run(store, &m.id, &m.up)?;

            let mut entry = Record::new(MIGRATIONS_COLLECTION);
            entry
                .set("file", m.id.clone())
                .set("applied", Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true));
            store.save(&mut entry)?;

            info!(migration = %m.id, description = %m.description, "applied migration");
            done.push(m.id.clone());
        }

        Ok(done)
    }

    /// Revert the last `n` applied migrations, newest first; returns the reverted ids.
    pub fn revert_last(&self, store: &DynRecordStore, n: usize) -> Result<Vec<String>, MigrationError> {
        self.ensure_log(store)?;

        let mut history: Vec<(Record, &Migration)> = self
            .history(store)?
            .into_iter()
            .filter_map(|r| {
                let m = self.migrations.iter().find(|m| m.id == r.get_str("file"));
                if m.is_none() {
                    warn!(migration = %r.get_str("file"), "skipping unknown applied migration");
                }
                m.map(|m| (r, m))
            })
            .collect();
        history.reverse();

        let mut done = Vec::new();
        for (entry, m) in history.into_iter().take(n) {
            run(store, &m.id, &m.down)?;
            store.delete(&entry)?;

            info!(migration = %m.id, "reverted migration");
            done.push(m.id.clone());
        }

        Ok(done)
    }

    fn ensure_log(&self, store: &DynRecordStore) -> Result<(), MigrationError> {
        match store.find_collection(MIGRATIONS_COLLECTION) {
            Ok(_) => Ok(()),
            Err(StoreError::CollectionNotFound(_)) => {
                let log = Collection::system(CollectionId::parse(MIGRATIONS_COLLECTION_ID)?, MIGRATIONS_COLLECTION)
                    .with_field(Field::text("file").required())
                    .with_field(Field::date("applied").required());
                store.save_collection(log)?;
                Ok(())
            }
            Err(err) => Err(err.into()),
        }
    }

    fn history(&self, store: &DynRecordStore) -> Result<Vec<Record>, MigrationError> {
        let mut rows = match store.find_records(MIGRATIONS_COLLECTION, &RecordQuery::all()) {
            Ok(rows) => rows,
            Err(StoreError::CollectionNotFound(_)) => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        rows.sort_by(|a, b| {
            (a.get_str("applied"), a.get_str("file")).cmp(&(b.get_str("applied"), b.get_str("file")))
        });
        Ok(rows)
    }
}

fn run(store: &DynRecordStore, id: &str, changes: &[SchemaChange]) -> Result<(), MigrationError> {
    for change in changes {
        change.apply(store).map_err(|source| {
            warn!(migration = %id, error = %source, "migration step failed");
            MigrationError::Failed {
                id: id.to_string(),
                source,
            }
        })?;
    }
    Ok(())
}
