//! In-memory storefront wiring: store, migrations, notification hooks, change feed.

use std::sync::Arc;

use thiserror::Error;
use tracing::info;

use shopfront_core::DomainError;
use shopfront_events::{EventBus, InMemoryEventBus, RecordEvent, Subscription};
use shopfront_infra::migrations::{self, MigrationError, Migrator};
use shopfront_infra::{HookedRecordStore, InMemoryRecordStore};
use shopfront_notifications::{NotificationConfig, NotificationEngine, NotificationInbox};

pub type Feed = Arc<InMemoryEventBus<RecordEvent>>;
pub type StorefrontStore = HookedRecordStore<InMemoryRecordStore, Feed>;

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("invalid migration set: {0}")]
    Definition(#[from] DomainError),

    #[error(transparent)]
    Migration(#[from] MigrationError),
}

/// A migrated store with the notification rules attached.
pub struct Storefront {
    store: Arc<StorefrontStore>,
    engine: Arc<NotificationEngine>,
    feed: Feed,
    config: NotificationConfig,
}

impl Storefront {
    pub fn build(config: NotificationConfig) -> Result<Self, BootstrapError> {
        let feed: Feed = Arc::new(InMemoryEventBus::new());
        let store = Arc::new(HookedRecordStore::with_feed(InMemoryRecordStore::new(), feed.clone()));

        // Schema setup bypasses hooks and the feed.
        let applied = Migrator::new(migrations::all()?).apply_pending(store.inner())?;
        info!(count = applied.len(), "migrations applied");

        let engine = Arc::new(NotificationEngine::new(config.clone()));
        engine.register(store.hooks());

        Ok(Self {
            store,
            engine,
            feed,
            config,
        })
    }

    pub fn store(&self) -> &Arc<StorefrontStore> {
        &self.store
    }

    pub fn engine(&self) -> &Arc<NotificationEngine> {
        &self.engine
    }

    /// Committed mutations from now on, including notification writes.
    pub fn subscribe(&self) -> Subscription<RecordEvent> {
        self.feed.subscribe()
    }

    pub fn inbox(&self) -> NotificationInbox<'_> {
        NotificationInbox::new(self.store.as_ref(), self.config.notifications_collection.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopfront_infra::RecordStore;

    #[test]
    fn build_migrates_and_registers_rules() {
        let app = Storefront::build(NotificationConfig::default()).unwrap();

        assert!(app.store().find_collection("notifications").is_ok());
        assert!(app.store().find_collection("_migrations").is_ok());
        assert_eq!(app.engine().rules().count(), 3);
        assert_eq!(app.inbox().unread_count().unwrap(), 0);
    }

    #[test]
    fn migration_writes_are_not_on_the_feed() {
        let app = Storefront::build(NotificationConfig::default()).unwrap();
        let feed = app.subscribe();
        assert!(feed.drain().is_empty());
    }
}
