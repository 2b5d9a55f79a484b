//! Applies rule outcomes and adapts rules to the hook chain.

use std::sync::Arc;

use tracing::{error, info, warn};

use shopfront_core::RecordId;
use shopfront_events::{Continuation, HookError, RecordEvent, RecordHook};
use shopfront_infra::{DynRecordStore, FilterParams, StoreHooks};

use crate::config::{LowStockGuard, NotificationConfig};
use crate::notification::{self, LOW_STOCK_FILTER, NotificationKind, PRODUCT_ID_PARAM};
use crate::rules::{LowStockAlert, LowStockClear, NewOrderNotification, NotificationWrite, Rule};

/// Runs notification rules for committed mutations.
///
/// Writes are best-effort: every failure is logged and swallowed, so a
/// notification problem never fails the order or product mutation that
/// triggered it.
pub struct NotificationEngine {
    config: NotificationConfig,
    rules: Vec<Box<dyn Rule>>,
}

impl core::fmt::Debug for NotificationEngine {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("NotificationEngine")
            .field("config", &self.config)
            .field("rules", &self.rules.iter().map(|r| r.name()).collect::<Vec<_>>())
            .finish()
    }
}

impl NotificationEngine {
    /// Engine with the storefront rules: new order, low-stock alert, low-stock clear.
    pub fn new(config: NotificationConfig) -> Self {
        let rules: Vec<Box<dyn Rule>> = vec![
            Box::new(NewOrderNotification::new(config.orders_collection.clone())),
            Box::new(LowStockAlert::new(
                config.products_collection.clone(),
                config.notifications_collection.clone(),
            )),
            Box::new(LowStockClear::new(
                config.products_collection.clone(),
                config.notifications_collection.clone(),
            )),
        ];
        Self::with_rules(config, rules)
    }

    pub fn with_rules(config: NotificationConfig, rules: Vec<Box<dyn Rule>>) -> Self {
        Self { config, rules }
    }

    pub fn config(&self) -> &NotificationConfig {
        &self.config
    }

    pub fn rules(&self) -> impl Iterator<Item = &dyn Rule> {
        self.rules.iter().map(|r| r.as_ref())
    }

    /// Bind every rule to its trigger, preserving rule order.
    pub fn register(self: &Arc<Self>, hooks: &StoreHooks) {
        for index in 0..self.rules.len() {
            let rule = &self.rules[index];
            let (kind, collection) = rule.trigger();
            let hook = Arc::new(RuleHook {
                engine: Arc::clone(self),
                index,
            });
            match hooks.bind(kind, collection, hook) {
                Ok(()) => {
                    info!(rule = rule.name(), trigger = %kind, collection, "notification rule registered")
                }
                Err(err) => {
                    error!(rule = rule.name(), trigger = %kind, collection, error = %err, "notification rule not registered")
                }
            }
        }
    }

    /// Evaluate every rule bound to the event's trigger, applying each write in turn.
    pub fn handle(&self, store: &DynRecordStore, event: &RecordEvent) -> Continuation {
        for index in 0..self.rules.len() {
            let (kind, collection) = self.rules[index].trigger();
            if kind != event.kind() || collection != event.collection() {
                continue;
            }
            if self.run_rule(index, store, event) == Continuation::Stop {
                return Continuation::Stop;
            }
        }
        Continuation::Next
    }

    fn run_rule(&self, index: usize, store: &DynRecordStore, event: &RecordEvent) -> Continuation {
        let Some(rule) = self.rules.get(index) else {
            return Continuation::Next;
        };

        let outcome = rule.evaluate(store, event);
        if let Some(write) = outcome.write {
            self.apply(store, write);
        }

        if outcome.continue_chain {
            Continuation::Next
        } else {
            Continuation::Stop
        }
    }

    /// Perform one write, logging instead of failing.
    pub fn apply(&self, store: &DynRecordStore, write: NotificationWrite) {
        match write {
            NotificationWrite::Create { kind, related } => self.create(store, kind, &related),
            NotificationWrite::Delete(existing) => match store.delete(&existing) {
                Ok(()) => info!(notification_id = %existing.id(), "low stock notification removed"),
                Err(e) => error!(
                    notification_id = %existing.id(),
                    error = %e,
                    "failed to remove low stock notification"
                ),
            },
        }
    }

    fn create(&self, store: &DynRecordStore, kind: NotificationKind, related: &RecordId) {
        let collection = match store.find_collection(&self.config.notifications_collection) {
            Ok(c) => c,
            Err(e) => {
                error!(
                    collection = %self.config.notifications_collection,
                    kind = %kind,
                    related_id = %related,
                    error = %e,
                    "notifications collection unavailable"
                );
                return;
            }
        };

        let mut record = notification::draft(&collection, kind, related);
        let result = match (kind, self.config.low_stock_guard) {
            (NotificationKind::LowStock, LowStockGuard::Atomic) => {
                let params = FilterParams::new().bind(PRODUCT_ID_PARAM, related.as_str());
                store.create_if_absent(&mut record, LOW_STOCK_FILTER, &params)
            }
            _ => store.save(&mut record).map(|()| true),
        };

        match (kind, result) {
            (NotificationKind::NewOrder, Ok(_)) => info!(
                order_id = %related,
                notification_id = %record.id(),
                "new order notification created"
            ),
            (NotificationKind::NewOrder, Err(e)) => error!(
                order_id = %related,
                error = %e,
                "failed to create new order notification"
            ),
            (NotificationKind::LowStock, Ok(true)) => info!(
                product_id = %related,
                notification_id = %record.id(),
                "low stock notification created"
            ),
            (NotificationKind::LowStock, Ok(false)) => warn!(
                product_id = %related,
                "low stock notification already exists"
            ),
            (NotificationKind::LowStock, Err(e)) => error!(
                product_id = %related,
                error = %e,
                "failed to create low stock notification"
            ),
        }
    }
}

/// One engine rule bound into the hook chain.
struct RuleHook {
    engine: Arc<NotificationEngine>,
    index: usize,
}

impl RecordHook<DynRecordStore> for RuleHook {
    fn name(&self) -> &str {
        self.engine.rules.get(self.index).map(|r| r.name()).unwrap_or("notification_rule")
    }

    fn handle(&self, store: &DynRecordStore, event: &RecordEvent) -> Result<Continuation, HookError> {
        Ok(self.engine.run_rule(self.index, store, event))
    }
}
