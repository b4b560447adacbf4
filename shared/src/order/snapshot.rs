//! Order snapshot and read-side projections

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::types::{Order, OrderItem};

/// One order plus all of its lines, billing and decomposition
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderSnapshot {
    pub order: Order,
    pub items: Vec<OrderItem>,
}

impl OrderSnapshot {
    pub fn new(order: Order) -> Self {
        Self {
            order,
            items: Vec::new(),
        }
    }

    pub fn id(&self) -> u64 {
        self.order.id
    }

    pub fn item(&self, item_id: u64) -> Option<&OrderItem> {
        self.items.iter().find(|i| i.id == item_id)
    }

    pub fn billing_lines(&self) -> impl Iterator<Item = &OrderItem> {
        self.items.iter().filter(|i| i.is_billing())
    }

    /// Kitchen sub-items expanded from a combo billing line
    pub fn decomposition_of(&self, parent_item_id: u64) -> impl Iterator<Item = &OrderItem> {
        self.items
            .iter()
            .filter(move |i| i.parent_item_id() == Some(parent_item_id))
    }
}

/// One billing line of the tax breakdown (desglose de IVA)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxLine {
    pub item_id: u64,
    pub name: String,
    pub quantity: u32,
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub line_total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxSummary {
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub tip: Decimal,
    pub total: Decimal,
    pub line_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaxBreakdown {
    pub order_id: u64,
    pub lines: Vec<TaxLine>,
    pub summary: TaxSummary,
}
