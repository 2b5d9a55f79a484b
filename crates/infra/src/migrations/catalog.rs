//! The storefront's migration set.

use shopfront_core::{CollectionId, DomainError};

use super::{Migration, SchemaChange};
use crate::schema::{Collection, Field};

pub const PRODUCTS_ID: &str = "pbc_4092854851";
pub const CUSTOMERS_ID: &str = "pbc_3527180448";
pub const ORDERS_ID: &str = "pbc_35271804482";
pub const ORDER_ITEMS_ID: &str = "pbc_2456927940";
pub const CARTS_ID: &str = "pbc_4021020699";
pub const FILTERS_ID: &str = "pbc_666328852";
pub const STORES_ID: &str = "pbc_3800236418";
pub const CATEGORIES_ID: &str = "pbc_3292755704";
pub const NOTIFICATIONS_ID: &str = "pbc_2301922722";

const ORDER_STATUSES: &[&str] = &["pending", "confirmed", "preparing", "shipped", "delivered", "cancelled"];
const PAYMENT_STATUSES: &[&str] = &["pending", "cod-confirmed", "paid", "failed"];
const FULFILLMENT_STATUSES: &[&str] = &["pending", "processing", "shipped", "delivered", "cancelled"];

/// Every migration the storefront ships, unordered.
pub fn all() -> Result<Vec<Migration>, DomainError> {
    Ok(vec![
        storefront_baseline()?,
        created_products()?,
        add(
            "1755456612_updated_products",
            "add product image",
            PRODUCTS_ID,
            [Field::file("image", 1)],
        ),
        updated_carts(),
        Migration::new("1755713389_updated_filers", "rename filers to filters")
            .up(SchemaChange::rename_collection(FILTERS_ID, "filters"))
            .down(SchemaChange::rename_collection(FILTERS_ID, "filers")),
        add(
            "1755799524_updated_stores",
            "add store contact and profile fields",
            STORES_ID,
            [
                Field::text("address"),
                Field::text("phone"),
                Field::email("email"),
                Field::url("website"),
                Field::text("aboutUs"),
                Field::json("socialLinks"),
                Field::json("businessHours"),
            ],
        ),
        Migration::new("1755964156_updated_orders", "rename legacy orders to customers")
            .up(SchemaChange::rename_collection(CUSTOMERS_ID, "customers"))
            .down(SchemaChange::rename_collection(CUSTOMERS_ID, "orders")),
        created_orders()?,
        add(
            "1755968414_updated_stores",
            "add store payment method",
            STORES_ID,
            [Field::text("paymentMethod")],
        ),
        Migration::new("1755969306_updated_order_items", "link order items to products")
            .up(SchemaChange::remove_field(ORDER_ITEMS_ID, "productName"))
            .up(SchemaChange::remove_field(ORDER_ITEMS_ID, "productImage"))
            .up(SchemaChange::rename_field(ORDER_ITEMS_ID, "productId", "products"))
            .down(SchemaChange::add_field(ORDER_ITEMS_ID, Field::text("productName")))
            .down(SchemaChange::add_field(ORDER_ITEMS_ID, Field::file("productImage", 1)))
            .down(SchemaChange::rename_field(ORDER_ITEMS_ID, "products", "productId")),
        add(
            "1756317433_updated_stores",
            "add store hero background",
            STORES_ID,
            [Field::file("heroBackground", 1)],
        ),
        Migration::new("1756324755_updated_products", "unique product slugs")
            .up(SchemaChange::AddUniqueIndex {
                collection: PRODUCTS_ID.into(),
                field: "slug".into(),
            })
            .down(SchemaChange::DropUniqueIndex {
                collection: PRODUCTS_ID.into(),
                field: "slug".into(),
            }),
        add(
            "1756554241_updated_stores",
            "toggle for the storefront cart",
            STORES_ID,
            [Field::bool("is_cart_enabled")],
        ),
        add(
            "1756755144_updated_stores",
            "add category images to stores",
            STORES_ID,
            [Field::file("categoryImages", 99)],
        ),
        Migration::new("1756756201_updated_categories", "drop category image json")
            .up(SchemaChange::remove_field(CATEGORIES_ID, "image"))
            .down(SchemaChange::add_field(CATEGORIES_ID, Field::json("image"))),
        add(
            "1756837686_updated_products",
            "add product variants",
            PRODUCTS_ID,
            [Field::json("variants")],
        ),
        add(
            "1756840031_updated_carts",
            "add selected variant to cart lines",
            CARTS_ID,
            [
                Field::json("selected_variants"),
                Field::number("variantPrice"),
                Field::text("variantSku"),
            ],
        ),
        created_notifications()?,
        add(
            "1756926127_updated_notifications",
            "track notification read state",
            NOTIFICATIONS_ID,
            [Field::bool("read")],
        ),
    ])
}

/// Migration that only adds fields; reverting removes them.
fn add<const N: usize>(id: &str, description: &str, collection: &str, fields: [Field; N]) -> Migration {
    let mut m = Migration::new(id, description);
    for field in fields {
        let name = field.name.clone();
        m = m
            .up(SchemaChange::add_field(collection, field))
            .down(SchemaChange::remove_field(collection, name));
    }
    m
}

fn create(id: &str, description: &str, collection: Collection) -> Migration {
    let name = collection.id().to_string();
    Migration::new(id, description)
        .up(SchemaChange::CreateCollection(collection))
        .down(SchemaChange::DropCollection(name))
}

/// Collections that predate versioned migrations.
fn storefront_baseline() -> Result<Migration, DomainError> {
    let customers = Collection::new(CollectionId::parse(CUSTOMERS_ID)?, "orders")
        .with_field(Field::text("name"))
        .with_field(Field::email("email"))
        .with_field(Field::text("phone"));

    let carts = Collection::new(CollectionId::parse(CARTS_ID)?, "carts")
        .with_field(Field::text("productId"))
        .with_field(Field::count("quantity"));

    let filters = Collection::new(CollectionId::parse(FILTERS_ID)?, "filers").with_field(Field::text("name"));

    let stores = Collection::new(CollectionId::parse(STORES_ID)?, "stores")
        .with_field(Field::text("name").required())
        .with_field(Field::text("description"))
        .with_field(Field::file("logo", 1));

    let order_items = Collection::new(CollectionId::parse(ORDER_ITEMS_ID)?, "order_items")
        .with_field(Field::relation("order", ORDERS_ID, 1))
        .with_field(Field::relation("productId", PRODUCTS_ID, 999))
        .with_field(Field::count("quantity"))
        .with_field(Field::amount("price"))
        .with_field(Field::text("productName"))
        .with_field(Field::file("productImage", 1));

    let categories = Collection::new(CollectionId::parse(CATEGORIES_ID)?, "categories")
        .with_field(Field::text("name").required())
        .with_field(Field::text("slug"))
        .with_field(Field::json("image"));

    let mut m = Migration::new("1755452000_created_storefront", "baseline storefront collections");
    for c in [customers, carts, filters, stores, order_items, categories] {
        let id = c.id().to_string();
        m = m
            .up(SchemaChange::CreateCollection(c))
            .down(SchemaChange::DropCollection(id));
    }
    Ok(m)
}

/// `name`, `slug` and `description` predate the tracked history; they are
/// created here with the rest of the product so the later slug index applies.
fn created_products() -> Result<Migration, DomainError> {
    let products = Collection::new(CollectionId::parse(PRODUCTS_ID)?, "products")
        .with_field(Field::text("name"))
        .with_field(Field::text("slug"))
        .with_field(Field::text("description"))
        .with_field(Field::text("sku"))
        .with_field(Field::count("stockQuantity"))
        .with_field(Field::count("reorderLevel"))
        .with_field(Field::number("cost").required())
        .with_field(Field::amount("profit").required())
        .with_field(Field::number("price").required())
        .with_field(Field::bool("isActive"));

    Ok(create("1755452846_created_products", "create products", products))
}

fn updated_carts() -> Migration {
    Migration::new("1755712155_updated_carts", "relate cart lines to products")
        .up(SchemaChange::add_field(CARTS_ID, Field::relation("productId", PRODUCTS_ID, 999)))
        .up(SchemaChange::add_field(CARTS_ID, Field::amount("price")))
        .up(SchemaChange::add_field(CARTS_ID, Field::bool("inStock")))
        .down(SchemaChange::add_field(CARTS_ID, Field::text("productId")))
        .down(SchemaChange::remove_field(CARTS_ID, "price"))
        .down(SchemaChange::remove_field(CARTS_ID, "inStock"))
}

fn created_orders() -> Result<Migration, DomainError> {
    let orders = Collection::new(CollectionId::parse(ORDERS_ID)?, "orders")
        .with_field(Field::relation("customerId", CUSTOMERS_ID, 999))
        .with_field(Field::select("status", ORDER_STATUSES))
        .with_field(Field::select("paymentStatus", PAYMENT_STATUSES))
        .with_field(Field::select("fulfillmentStatus", FULFILLMENT_STATUSES))
        .with_field(Field::amount("subtotal"))
        .with_field(Field::amount("shipping"))
        .with_field(Field::amount("total"))
        .with_field(Field::json("shippingAddress"))
        .with_field(Field::json("customerInfo"))
        .with_field(Field::date("estimatedDelivery"))
        .with_field(Field::text("notes"))
        .with_field(Field::text("internalNotes"))
        .with_field(Field::text("trackingNumber"));

    Ok(create("1755964547_created_orders", "create orders", orders))
}

fn created_notifications() -> Result<Migration, DomainError> {
    let notifications = Collection::new(CollectionId::parse(NOTIFICATIONS_ID)?, "notifications")
        .with_field(Field::select("type", &["new_order", "low_stock"]).required())
        .with_field(Field::relation("order", ORDERS_ID, 1))
        .with_field(Field::relation("product", PRODUCTS_ID, 1));

    Ok(create("1756900000_created_notifications", "create notifications", notifications))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::migrations::Migrator;
    use crate::record_store::{InMemoryRecordStore, RecordStore};
    use shopfront_core::Record;

    fn migrated() -> (InMemoryRecordStore, Migrator) {
        let store = InMemoryRecordStore::new();
        let migrator = Migrator::new(all().unwrap());
        migrator.apply_pending(&store).unwrap();
        (store, migrator)
    }

    #[test]
    fn ids_are_unique() {
        let mut ids: Vec<String> = all().unwrap().iter().map(|m| m.id().to_string()).collect();
        let n = ids.len();
        ids.sort();
        ids.dedup();
        assert_eq!(ids.len(), n);
    }

    #[test]
    fn fresh_store_ends_with_the_storefront_schema() {
        let (store, _) = migrated();

        let names: Vec<String> = store
            .list_collections()
            .unwrap()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        for expected in [
            "products", "orders", "customers", "order_items", "carts", "filters", "stores", "categories",
            "notifications",
        ] {
            assert!(names.iter().any(|n| n == expected), "missing {expected}");
        }

        assert_eq!(store.find_collection("orders").unwrap().id().as_str(), ORDERS_ID);
        assert_eq!(store.find_collection("customers").unwrap().id().as_str(), CUSTOMERS_ID);

        let notifications = store.find_collection("notifications").unwrap();
        assert!(notifications.field("read").is_some());
        assert!(notifications.field("type").unwrap().required);

        let products = store.find_collection("products").unwrap();
        assert_eq!(products.unique_fields(), ["slug".to_string()]);
        assert!(products.field("variants").is_some());

        let items = store.find_collection("order_items").unwrap();
        assert!(items.field("products").is_some());
        assert!(items.field("productName").is_none());
    }

    #[test]
    fn created_products_carries_the_untracked_catalogue_fields() {
        let store = InMemoryRecordStore::new();
        let migrator = Migrator::new(vec![created_products().unwrap()]);
        migrator.apply_pending(&store).unwrap();

        let products = store.find_collection("products").unwrap();
        for name in ["name", "slug", "description", "sku", "stockQuantity", "reorderLevel"] {
            assert!(products.field(name).is_some(), "missing {name}");
        }
        assert!(products.unique_fields().is_empty());
    }

    #[test]
    fn migrated_schema_accepts_storefront_records() {
        let (store, _) = migrated();

        let mut product = Record::new("products");
        product
            .set("slug", "mug")
            .set("stockQuantity", 50)
            .set("reorderLevel", 10)
            .set("cost", 2.0)
            .set("profit", 1.5)
            .set("price", 3.5);
        store.save(&mut product).unwrap();

        let mut order = Record::new("orders");
        order.set("status", "pending").set("total", 3.5);
        store.save(&mut order).unwrap();

        let mut n = Record::new("notifications");
        n.set("type", "new_order").set("order", order.id().as_str()).set("read", false);
        store.save(&mut n).unwrap();
    }

    #[test]
    fn everything_reverts_back_to_an_empty_store() {
        let (store, migrator) = migrated();
        let total = migrator.migrations().len();

        assert_eq!(migrator.revert_last(&store, total).unwrap().len(), total);
        let left: Vec<String> = store
            .list_collections()
            .unwrap()
            .iter()
            .map(|c| c.name().to_string())
            .collect();
        assert_eq!(left, vec!["_migrations".to_string()]);
    }
}
