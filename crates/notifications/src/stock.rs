use serde::{Deserialize, Serialize};

use shopfront_core::Record;

pub const STOCK_FIELD: &str = "stockQuantity";
pub const REORDER_LEVEL_FIELD: &str = "reorderLevel";

/// Where a product's stock sits relative to its reorder level.
///
/// The bands partition every `(stock, reorder_level)` pair:
///
/// - `Healthy`: `stock > reorder_level`
/// - `Low`: `0 < stock <= reorder_level`
/// - `Depleted`: `stock <= 0` and `stock <= reorder_level`
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockBand {
    Depleted,
    Low,
    Healthy,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockLevel {
    pub stock: i64,
    pub reorder_level: i64,
}

impl StockLevel {
    pub fn new(stock: i64, reorder_level: i64) -> Self {
        Self { stock, reorder_level }
    }

    /// Read `stockQuantity`/`reorderLevel`; missing or non-numeric values count as 0.
    pub fn of(product: &Record) -> Self {
        Self::new(product.get_int(STOCK_FIELD), product.get_int(REORDER_LEVEL_FIELD))
    }

    pub fn band(&self) -> StockBand {
        if self.stock > self.reorder_level {
            StockBand::Healthy
        } else if self.stock > 0 {
            StockBand::Low
        } else {
            StockBand::Depleted
        }
    }

    pub fn is_low(&self) -> bool {
        self.band() == StockBand::Low
    }

    pub fn is_above_reorder_level(&self) -> bool {
        self.band() == StockBand::Healthy
    }
}
