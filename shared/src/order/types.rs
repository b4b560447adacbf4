//! Order and order item types

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::state::OrderState;

/// 付款方式: prepaid orders go to the kitchen after payment,
/// pay-later orders are fired first and settled at the end.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMode {
    Prepaid,
    PayLater,
}

impl PaymentMode {
    /// Initial state for a freshly created order
    pub fn initial_state(&self) -> OrderState {
        match self {
            PaymentMode::Prepaid => OrderState::PendingPayment,
            PaymentMode::PayLater => OrderState::InTable,
        }
    }
}

/// Receipt type requested at settlement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReceiptType {
    #[default]
    Ticket,
    Invoice,
}

impl ReceiptType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ReceiptType::Ticket => "ticket",
            ReceiptType::Invoice => "invoice",
        }
    }
}

/// What a line bills for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ItemRef {
    Product { product_id: u64 },
    Combo { combo_id: u64 },
}

impl ItemRef {
    pub fn product_id(&self) -> Option<u64> {
        match self {
            ItemRef::Product { product_id } => Some(*product_id),
            ItemRef::Combo { .. } => None,
        }
    }

    pub fn combo_id(&self) -> Option<u64> {
        match self {
            ItemRef::Combo { combo_id } => Some(*combo_id),
            ItemRef::Product { .. } => None,
        }
    }
}

/// Billing line or zero-priced kitchen sub-item expanded from a combo line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "line", rename_all = "snake_case")]
pub enum LineKind {
    Billing,
    Decomposition { parent_item_id: u64 },
}

/// Order item (订单明细)
///
/// Decomposition lines keep `unit_price` as the catalog price for kitchen
/// display; their `subtotal`, `tax_amount` and `line_total` stay zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: u64,
    pub order_id: u64,
    pub item_ref: ItemRef,
    pub kind: LineKind,
    pub name: String,
    pub quantity: u32,
    /// Snapshotted at add time
    pub unit_price: Decimal,
    pub subtotal: Decimal,
    pub tax_rate: Decimal,
    pub tax_amount: Decimal,
    pub line_total: Decimal,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl OrderItem {
    pub fn is_billing(&self) -> bool {
        self.kind == LineKind::Billing
    }

    pub fn parent_item_id(&self) -> Option<u64> {
        match self.kind {
            LineKind::Decomposition { parent_item_id } => Some(parent_item_id),
            LineKind::Billing => None,
        }
    }
}

/// Customer data denormalized onto the order for invoicing
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CustomerSnapshot {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<u64>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document_number: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nrc: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

/// Fiscal document linkage, set at most once
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceLink {
    /// Correlation id returned by the document generator
    pub document_id: String,
    pub sequence_number: u64,
    pub receipt_type: ReceiptType,
    pub payload: serde_json::Value,
    pub generated_at: i64,
}

/// Order header (订单)
///
/// Money fields are only written by recomputation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub table_id: Option<u64>,
    pub operator: String,
    pub state: OrderState,
    pub payment_mode: PaymentMode,
    #[serde(default)]
    pub receipt_type: ReceiptType,
    #[serde(default)]
    pub tax_exempt: bool,
    pub subtotal: Decimal,
    pub tax: Decimal,
    pub tip: Decimal,
    pub total: Decimal,
    /// Linked customer (credit sales)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_id: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer: Option<CustomerSnapshot>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub invoice: Option<InvoiceLink>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub customer_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub created_at: i64,
    pub updated_at: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paid_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kitchen_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ready_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub served_at: Option<i64>,
}

impl Order {
    /// A freshly opened order with zeroed totals
    pub fn new(id: u64, input: &CreateOrder, now: i64) -> Self {
        Self {
            id,
            table_id: input.table_id,
            operator: input.operator.clone(),
            state: input.payment_mode.initial_state(),
            payment_mode: input.payment_mode,
            receipt_type: ReceiptType::Ticket,
            tax_exempt: false,
            subtotal: Decimal::ZERO,
            tax: Decimal::ZERO,
            tip: Decimal::ZERO,
            total: Decimal::ZERO,
            customer_id: None,
            customer: None,
            invoice: None,
            customer_name: input.customer_name.clone(),
            note: input.note.clone(),
            created_at: now,
            updated_at: now,
            paid_at: None,
            kitchen_at: None,
            ready_at: None,
            served_at: None,
        }
    }

    /// Payment has been recorded (paid_at set)
    pub fn is_paid(&self) -> bool {
        self.paid_at.is_some()
    }

    /// Items may change only before payment on active orders
    pub fn items_editable(&self) -> bool {
        !self.is_paid() && self.state.is_active()
    }
}

/// Item reference as sent by the request layer
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ItemInput {
    #[serde(default)]
    pub product_id: Option<u64>,
    #[serde(default)]
    pub combo_id: Option<u64>,
    pub quantity: u32,
    #[serde(default)]
    pub note: Option<String>,
}

impl ItemInput {
    pub fn product(product_id: u64, quantity: u32) -> Self {
        Self {
            product_id: Some(product_id),
            quantity,
            ..Default::default()
        }
    }

    pub fn combo(combo_id: u64, quantity: u32) -> Self {
        Self {
            combo_id: Some(combo_id),
            quantity,
            ..Default::default()
        }
    }
}

/// Create order request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreateOrder {
    #[serde(default)]
    pub table_id: Option<u64>,
    pub operator: String,
    pub payment_mode: PaymentMode,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub note: Option<String>,
    pub items: Vec<ItemInput>,
}

/// Settle payment request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settlement {
    #[serde(default)]
    pub receipt_type: ReceiptType,
    #[serde(default)]
    pub tip: Decimal,
    /// `false` marks the order tax-exempt
    #[serde(default = "default_apply_tax")]
    pub apply_tax: bool,
}

fn default_apply_tax() -> bool {
    true
}

impl Default for Settlement {
    fn default() -> Self {
        Self {
            receipt_type: ReceiptType::Ticket,
            tip: Decimal::ZERO,
            apply_tax: true,
        }
    }
}
