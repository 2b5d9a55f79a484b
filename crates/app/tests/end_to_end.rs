use serde_json::Value;

use shopfront_app::{Storefront, replay};
use shopfront_core::{Record, RecordId};
use shopfront_events::RecordEvent;
use shopfront_infra::{FilterParams, RecordStore};
use shopfront_notifications::{LowStockGuard, NotificationConfig, NotificationKind};

const STOCK_CYCLE: &str = include_str!("fixtures/stock_cycle.json");

fn id(s: &str) -> RecordId {
    RecordId::parse(s).unwrap()
}

fn storefront(guard: LowStockGuard) -> Storefront {
    Storefront::build(NotificationConfig::default().with_low_stock_guard(guard)).unwrap()
}

fn create_product(app: &Storefront, product_id: &str, stock: i64, reorder: i64) {
    let mut p = Record::with_id("products", id(product_id));
    p.set("name", product_id)
        .set("stockQuantity", stock)
        .set("reorderLevel", reorder)
        .set("cost", 4)
        .set("profit", 6)
        .set("price", 10);
    app.store().save(&mut p).unwrap();
}

fn set_stock(app: &Storefront, product_id: &str, stock: i64) {
    let mut p = app.store().find_record_by_id("products", &id(product_id)).unwrap();
    p.set("stockQuantity", stock);
    app.store().save(&mut p).unwrap();
}

fn low_stock_count(app: &Storefront, product_id: &str) -> usize {
    app.store()
        .count(
            "notifications",
            "type = 'low_stock' && product = {:p}",
            &FilterParams::new().bind("p", product_id),
        )
        .unwrap()
}

fn event_types(events: &[RecordEvent]) -> Vec<String> {
    events.iter().map(RecordEvent::event_type).collect()
}

#[test]
fn stock_cycle_keeps_at_most_one_low_stock_notification() {
    for guard in [LowStockGuard::Atomic, LowStockGuard::CheckThenAct] {
        let app = storefront(guard);
        create_product(&app, "p1", 50, 10);
        assert_eq!(low_stock_count(&app, "p1"), 0, "{guard:?}: create never alerts");

        for (stock, expected) in [(8, 1), (5, 1), (20, 0), (0, 0), (3, 1)] {
            set_stock(&app, "p1", stock);
            assert_eq!(low_stock_count(&app, "p1"), expected, "{guard:?}: stock {stock}");
        }
    }
}

#[test]
fn new_order_gets_exactly_one_notification() {
    let app = storefront(LowStockGuard::default());
    let mut order = Record::with_id("orders", id("abc123"));
    order.set("status", "pending");
    app.store().save(&mut order).unwrap();

    let recent = app.inbox().recent(10).unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].kind, NotificationKind::NewOrder);
    assert_eq!(recent[0].order.as_ref(), Some(&id("abc123")));
    assert!(recent[0].product.is_none());
    assert!(!recent[0].read);

    // Updating the order is not a trigger.
    order.set("status", "confirmed");
    app.store().save(&mut order).unwrap();
    assert_eq!(app.inbox().recent(10).unwrap().len(), 1);
}

#[test]
fn feed_carries_the_mutation_before_its_notification() {
    let app = storefront(LowStockGuard::default());
    create_product(&app, "p1", 50, 10);

    let feed = app.subscribe();
    set_stock(&app, "p1", 8);
    set_stock(&app, "p1", 20);

    assert_eq!(
        event_types(&feed.drain()),
        vec![
            "products.update",
            "notifications.create",
            "products.update",
            "notifications.delete",
        ]
    );
}

#[test]
fn replayed_script_leaves_only_the_order_notification() {
    let app = storefront(LowStockGuard::default());
    let feed = app.subscribe();

    let report = replay::run(app.store().as_ref(), &replay::parse_script(STOCK_CYCLE).unwrap()).unwrap();
    assert_eq!((report.created, report.updated, report.deleted), (2, 4, 0));

    let written: Vec<(String, Value)> = feed
        .drain()
        .into_iter()
        .filter(|e| e.collection() == "notifications")
        .map(|e| (e.event_type(), e.record().get("type").cloned().unwrap_or(Value::Null)))
        .collect();
    assert_eq!(
        written,
        vec![
            ("notifications.create".to_string(), Value::from("low_stock")),
            ("notifications.create".to_string(), Value::from("new_order")),
            ("notifications.delete".to_string(), Value::from("low_stock")),
        ]
    );

    let counts = app.inbox().count_by_type().unwrap();
    assert_eq!((counts.new_order, counts.low_stock, counts.unread), (1, 0, 1));
}

#[test]
fn notification_failures_never_fail_the_mutation() {
    let app = storefront(LowStockGuard::default());
    create_product(&app, "p1", 50, 10);

    // Without the notifications collection every rule write fails.
    let notifications = app.store().find_collection("notifications").unwrap();
    app.store().delete_collection(notifications.name()).unwrap();

    set_stock(&app, "p1", 4);
    let mut order = Record::with_id("orders", id("o1"));
    app.store().save(&mut order).unwrap();

    assert_eq!(
        app.store().find_record_by_id("products", &id("p1")).unwrap().get_int("stockQuantity"),
        4
    );
    assert!(app.store().find_record_by_id("orders", &id("o1")).is_ok());
}

#[test]
fn unique_slugs_are_enforced_after_migration() {
    let app = storefront(LowStockGuard::default());
    let mut a = Record::with_id("products", id("a"));
    a.set("slug", "mug").set("cost", 1).set("profit", 1).set("price", 2);
    app.store().save(&mut a).unwrap();

    let mut b = Record::with_id("products", id("b"));
    b.set("slug", "mug").set("cost", 1).set("profit", 1).set("price", 2);
    let err = app.store().save(&mut b).unwrap_err();
    assert!(matches!(err, shopfront_infra::StoreError::UniqueViolation { .. }));
}
