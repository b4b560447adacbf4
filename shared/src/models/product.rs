//! Product and Combo Models

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Product entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: u64,
    pub name: String,
    pub price: Decimal,
    pub available: bool,
    /// Consumable stock unit sold 1:1 with this product (bottled drinks...).
    /// Prepared food carries none and is never auto-deducted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stock_item_id: Option<u64>,
}

/// Create product payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductCreate {
    pub name: String,
    pub price: Decimal,
    #[serde(default)]
    pub stock_item_id: Option<u64>,
}

/// Update product payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub available: Option<bool>,
    pub stock_item_id: Option<Option<u64>>,
}

/// One (product, quantity) entry of a combo
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComboComponent {
    pub product_id: u64,
    pub quantity: u32,
}

/// Combo entity (fixed-price bundle)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Combo {
    pub id: u64,
    pub name: String,
    pub price: Decimal,
    pub active: bool,
    pub components: Vec<ComboComponent>,
}

/// Create combo payload
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComboCreate {
    pub name: String,
    pub price: Decimal,
    pub components: Vec<ComboComponent>,
}

/// Update combo payload
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComboUpdate {
    pub name: Option<String>,
    pub price: Option<Decimal>,
    pub components: Option<Vec<ComboComponent>>,
}
