use tracing::info;

use shopfront_events::{MutationKind, RecordEvent};
use shopfront_infra::DynRecordStore;

use super::{NotificationWrite, Outcome, Rule};
use crate::notification::NotificationKind;

/// Every created order gets a `new_order` notification.
///
/// There is no dedup check: a re-delivered create event yields a second
/// notification.
#[derive(Debug, Clone)]
pub struct NewOrderNotification {
    orders: String,
}

impl NewOrderNotification {
    pub fn new(orders: impl Into<String>) -> Self {
        Self { orders: orders.into() }
    }
}

impl Rule for NewOrderNotification {
    fn name(&self) -> &'static str {
        "new_order_notification"
    }

    fn trigger(&self) -> (MutationKind, &str) {
        (MutationKind::Create, self.orders.as_str())
    }

    fn evaluate(&self, _store: &DynRecordStore, event: &RecordEvent) -> Outcome {
        let order_id = event.record_id();
        info!(order_id = %order_id, "creating new order notification");

        Outcome::write(NotificationWrite::Create {
            kind: NotificationKind::NewOrder,
            related: order_id.clone(),
        })
    }
}
