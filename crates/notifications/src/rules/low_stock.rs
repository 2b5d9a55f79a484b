use tracing::{debug, info, warn};

use shopfront_core::{Record, RecordId};
use shopfront_events::{MutationKind, RecordEvent};
use shopfront_infra::{DynRecordStore, FilterParams, StoreError};

use super::{NotificationWrite, Outcome, Rule};
use crate::notification::{LOW_STOCK_FILTER, NotificationKind, PRODUCT_ID_PARAM};
use crate::stock::StockLevel;

/// Current low-stock notification for `product`, if any.
pub fn find_low_stock_notification(
    store: &DynRecordStore,
    notifications: &str,
    product: &RecordId,
) -> Result<Option<Record>, StoreError> {
    let params = FilterParams::new().bind(PRODUCT_ID_PARAM, product.as_str());
    store.find_first_by_filter(notifications, LOW_STOCK_FILTER, &params)
}

/// Raise a `low_stock` notification when an updated product enters the low band.
#[derive(Debug, Clone)]
pub struct LowStockAlert {
    products: String,
    notifications: String,
}

impl LowStockAlert {
    pub fn new(products: impl Into<String>, notifications: impl Into<String>) -> Self {
        Self {
            products: products.into(),
            notifications: notifications.into(),
        }
    }
}

impl Rule for LowStockAlert {
    fn name(&self) -> &'static str {
        "low_stock_alert"
    }

    fn trigger(&self) -> (MutationKind, &str) {
        (MutationKind::Update, self.products.as_str())
    }

    fn evaluate(&self, store: &DynRecordStore, event: &RecordEvent) -> Outcome {
        let level = StockLevel::of(event.record());
        if !level.is_low() {
            return Outcome::skip();
        }

        let product_id = event.record_id();
        match find_low_stock_notification(store, &self.notifications, product_id) {
            Ok(Some(existing)) => {
                info!(
                    product_id = %product_id,
                    notification_id = %existing.id(),
                    "low stock notification already exists"
                );
                Outcome::skip()
            }
            Ok(None) => {
                info!(
                    product_id = %product_id,
                    stock = level.stock,
                    reorder_level = level.reorder_level,
                    "creating low stock notification"
                );
                Outcome::write(NotificationWrite::Create {
                    kind: NotificationKind::LowStock,
                    related: product_id.clone(),
                })
            }
            Err(e) => {
                warn!(product_id = %product_id, error = %e, "low stock notification lookup failed");
                Outcome::skip()
            }
        }
    }
}

/// Remove the product's `low_stock` notification once stock rises above the reorder level.
#[derive(Debug, Clone)]
pub struct LowStockClear {
    products: String,
    notifications: String,
}

impl LowStockClear {
    pub fn new(products: impl Into<String>, notifications: impl Into<String>) -> Self {
        Self {
            products: products.into(),
            notifications: notifications.into(),
        }
    }
}

impl Rule for LowStockClear {
    fn name(&self) -> &'static str {
        "low_stock_clear"
    }

    fn trigger(&self) -> (MutationKind, &str) {
        (MutationKind::Update, self.products.as_str())
    }

    fn evaluate(&self, store: &DynRecordStore, event: &RecordEvent) -> Outcome {
        let level = StockLevel::of(event.record());
        if !level.is_above_reorder_level() {
            return Outcome::skip();
        }

        let product_id = event.record_id();
        match find_low_stock_notification(store, &self.notifications, product_id) {
            Ok(Some(existing)) => {
                info!(
                    product_id = %product_id,
                    stock = level.stock,
                    notification_id = %existing.id(),
                    "removing low stock notification"
                );
                Outcome::write(NotificationWrite::Delete(existing))
            }
            Ok(None) => Outcome::skip(),
            Err(e) => {
                debug!(product_id = %product_id, error = %e, "low stock notification lookup failed");
                Outcome::skip()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shopfront_core::CollectionId;
    use shopfront_infra::{Collection, Field, InMemoryRecordStore, RecordStore};

    fn test_store() -> InMemoryRecordStore {
        InMemoryRecordStore::with_collections([
            Collection::new(CollectionId::parse("pbc_products").unwrap(), "products")
                .with_field(Field::count("stockQuantity"))
                .with_field(Field::count("reorderLevel")),
            Collection::new(CollectionId::parse("pbc_notifications").unwrap(), "notifications")
                .with_field(Field::select("type", &["new_order", "low_stock"]).required())
                .with_field(Field::relation("order", "orders", 1))
                .with_field(Field::relation("product", "products", 1))
                .with_field(Field::bool("read")),
        ])
        .unwrap()
    }

    fn product(stock: i64, reorder: i64) -> Record {
        let mut p = Record::with_id("products", RecordId::parse("p1").unwrap());
        p.set("stockQuantity", stock).set("reorderLevel", reorder);
        p
    }

    fn existing_alert(store: &InMemoryRecordStore) -> Record {
        let mut n = Record::new("notifications");
        n.set("type", "low_stock").set("product", "p1");
        store.save(&mut n).unwrap();
        n
    }

    fn alert() -> LowStockAlert {
        LowStockAlert::new("products", "notifications")
    }

    fn clear() -> LowStockClear {
        LowStockClear::new("products", "notifications")
    }

    #[test]
    fn alert_asks_for_a_notification_in_the_low_band() {
        let store = test_store();
        let outcome = alert().evaluate(&store, &RecordEvent::updated(product(8, 10)));

        assert_eq!(
            outcome.write,
            Some(NotificationWrite::Create {
                kind: NotificationKind::LowStock,
                related: RecordId::parse("p1").unwrap(),
            })
        );
    }

    #[test]
    fn alert_skips_when_one_already_exists() {
        let store = test_store();
        existing_alert(&store);

        let outcome = alert().evaluate(&store, &RecordEvent::updated(product(5, 10)));
        assert_eq!(outcome, Outcome::skip());
    }

    #[test]
    fn alert_ignores_healthy_and_depleted_stock() {
        let store = test_store();
        for (stock, reorder) in [(50, 10), (11, 10), (0, 10), (0, 0)] {
            let outcome = alert().evaluate(&store, &RecordEvent::updated(product(stock, reorder)));
            assert_eq!(outcome, Outcome::skip(), "stock {stock} reorder {reorder}");
        }
    }

    #[test]
    fn alert_lookup_failure_is_a_no_op() {
        let store = InMemoryRecordStore::new();
        let outcome = alert().evaluate(&store, &RecordEvent::updated(product(3, 10)));
        assert_eq!(outcome, Outcome::skip());
    }

    #[test]
    fn clear_deletes_the_existing_notification_above_the_reorder_level() {
        let store = test_store();
        let existing = existing_alert(&store);

        let outcome = clear().evaluate(&store, &RecordEvent::updated(product(20, 10)));
        assert_eq!(outcome.write, Some(NotificationWrite::Delete(existing)));
    }

    #[test]
    fn clear_is_a_no_op_at_or_below_the_reorder_level_or_without_a_notification() {
        let store = test_store();
        assert_eq!(
            clear().evaluate(&store, &RecordEvent::updated(product(20, 10))),
            Outcome::skip()
        );

        existing_alert(&store);
        for (stock, reorder) in [(10, 10), (0, 10), (4, 10)] {
            let outcome = clear().evaluate(&store, &RecordEvent::updated(product(stock, reorder)));
            assert_eq!(outcome, Outcome::skip());
        }
    }

    #[test]
    fn lookup_only_matches_the_same_product() {
        let store = test_store();
        existing_alert(&store);

        let other = RecordId::parse("p2").unwrap();
        assert!(find_low_stock_notification(&store, "notifications", &other).unwrap().is_none());
    }
}
