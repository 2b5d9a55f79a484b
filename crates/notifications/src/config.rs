use core::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// How the low-stock rule performs its create.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LowStockGuard {
    /// Conditional create evaluated atomically by the store. Concurrent
    /// updates of one product still leave at most one notification.
    #[default]
    Atomic,
    /// Lookup, then plain create. Two racing updates can both create.
    CheckThenAct,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("unknown low stock guard '{0}' (expected 'atomic' or 'check_then_act')")]
pub struct UnknownGuard(pub String);

impl LowStockGuard {
    pub fn as_str(self) -> &'static str {
        match self {
            LowStockGuard::Atomic => "atomic",
            LowStockGuard::CheckThenAct => "check_then_act",
        }
    }
}

impl FromStr for LowStockGuard {
    type Err = UnknownGuard;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "atomic" => Ok(LowStockGuard::Atomic),
            "check_then_act" | "check-then-act" => Ok(LowStockGuard::CheckThenAct),
            _ => Err(UnknownGuard(s.to_string())),
        }
    }
}

/// Collections the rules watch and write to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationConfig {
    pub notifications_collection: String,
    pub orders_collection: String,
    pub products_collection: String,
    pub low_stock_guard: LowStockGuard,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            notifications_collection: "notifications".to_string(),
            orders_collection: "orders".to_string(),
            products_collection: "products".to_string(),
            low_stock_guard: LowStockGuard::default(),
        }
    }
}

impl NotificationConfig {
    pub fn with_low_stock_guard(mut self, guard: LowStockGuard) -> Self {
        self.low_stock_guard = guard;
        self
    }
}
