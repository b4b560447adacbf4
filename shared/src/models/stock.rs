//! Stock Models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Consumable stock unit (materia prima)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockItem {
    pub id: u64,
    pub name: String,
    pub unit: String,
    pub level: Decimal,
    pub min_level: Decimal,
}

impl StockItem {
    pub fn is_low(&self) -> bool {
        self.level <= self.min_level
    }
}

/// Create stock item payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockItemCreate {
    pub name: String,
    pub unit: String,
    pub level: Decimal,
    pub min_level: Decimal,
}

/// Immutable stock movement record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: u64,
    pub stock_item_id: u64,
    /// Negative for sales
    pub delta: Decimal,
    pub previous_level: Decimal,
    pub new_level: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_order_id: Option<u64>,
    pub timestamp: i64,
}
