//! Notification side effects for storefront record changes.
//!
//! Three rules react to committed mutations:
//!
//! - a created order gets a `new_order` notification
//! - an updated product entering the low-stock band gets one `low_stock` notification
//! - an updated product rising above its reorder level loses that notification
//!
//! Rules decide; [`NotificationEngine`] performs the write best-effort and
//! plugs the rules into the store's hook chain.

pub mod config;
pub mod engine;
pub mod inbox;
pub mod notification;
pub mod rules;
pub mod stock;

pub use config::{LowStockGuard, NotificationConfig, UnknownGuard};
pub use engine::NotificationEngine;
pub use inbox::{InboxError, NotificationCounts, NotificationInbox};
pub use notification::{Notification, NotificationKind};
pub use rules::{NotificationWrite, Outcome, Rule};
pub use stock::{StockBand, StockLevel};
