//! Order aggregate - line item mutations on an [`OrderSnapshot`]
//!
//! Pure functions: the caller resolves catalog rows and allocates ids,
//! these functions only reshape the lines. Totals are recomputed by
//! [`super::money::recalculate_totals`] afterwards.
//!
//! # Combo lines
//!
//! ```text
//! Combo "Desayuno" × 2            billing        price 5.50 × 2
//!   ├─ Pupusa queso × 6           decomposition  parent = billing id
//!   ├─ Horchata × 2               decomposition
//!   └─ Curtido × 2                decomposition
//! ```
//!
//! Decomposition quantities are `component_qty × q` and are rescaled by
//! `q1 / q0` when the billing line changes.

use rust_decimal::Decimal;
use shared::models::{Combo, Product};
use shared::order::{ItemRef, LineKind, Order, OrderItem, OrderSnapshot};

use super::error::{Conflict, Entity, OrderError, OrderResult};
use super::money::validate_quantity;

/// Catalog row an item input resolved to
#[derive(Debug, Clone)]
pub enum ResolvedItem {
    Product(Product),
    Combo {
        combo: Combo,
        /// (product, component quantity per combo)
        components: Vec<(Product, u32)>,
    },
}

impl ResolvedItem {
    fn item_ref(&self) -> ItemRef {
        match self {
            ResolvedItem::Product(p) => ItemRef::Product { product_id: p.id },
            ResolvedItem::Combo { combo, .. } => ItemRef::Combo { combo_id: combo.id },
        }
    }

    fn name(&self) -> &str {
        match self {
            ResolvedItem::Product(p) => &p.name,
            ResolvedItem::Combo { combo, .. } => &combo.name,
        }
    }

    fn unit_price(&self) -> Decimal {
        match self {
            ResolvedItem::Product(p) => p.price,
            ResolvedItem::Combo { combo, .. } => combo.price,
        }
    }
}

/// Items may only change on unpaid, active orders
pub fn ensure_items_editable(order: &Order) -> OrderResult<()> {
    if order.state.is_terminal() {
        return Err(Conflict::Inactive { state: order.state }.into());
    }
    if !order.items_editable() {
        return Err(Conflict::ItemsFrozen { state: order.state }.into());
    }
    Ok(())
}

fn blank_line(id: u64, order_id: u64, item_ref: ItemRef, kind: LineKind) -> OrderItem {
    OrderItem {
        id,
        order_id,
        item_ref,
        kind,
        name: String::new(),
        quantity: 0,
        unit_price: Decimal::ZERO,
        subtotal: Decimal::ZERO,
        tax_rate: Decimal::ZERO,
        tax_amount: Decimal::ZERO,
        line_total: Decimal::ZERO,
        note: None,
    }
}

/// Append a billing line (plus decomposition lines for a combo)
///
/// Returns the id of the billing line.
pub fn add_line<F>(
    snapshot: &mut OrderSnapshot,
    resolved: &ResolvedItem,
    quantity: u32,
    note: Option<String>,
    mut next_id: F,
) -> OrderResult<u64>
where
    F: FnMut() -> OrderResult<u64>,
{
    validate_quantity(quantity)?;
    let order_id = snapshot.id();

    let billing_id = next_id()?;
    let mut billing = blank_line(billing_id, order_id, resolved.item_ref(), LineKind::Billing);
    billing.name = resolved.name().to_string();
    billing.quantity = quantity;
    billing.unit_price = resolved.unit_price();
    billing.note = note;

    let mut lines = vec![billing];

    if let ResolvedItem::Combo { components, .. } = resolved {
        for (product, per_combo) in components {
            let child_qty = scale(*per_combo, quantity)?;
            let mut child = blank_line(
                next_id()?,
                order_id,
                ItemRef::Product {
                    product_id: product.id,
                },
                LineKind::Decomposition {
                    parent_item_id: billing_id,
                },
            );
            child.name = product.name.clone();
            child.quantity = child_qty;
            // 仅供厨房显示
            child.unit_price = product.price;
            lines.push(child);
        }
    }

    snapshot.items.extend(lines);
    Ok(billing_id)
}

fn scale(per_combo: u32, quantity: u32) -> OrderResult<u32> {
    let total = u64::from(per_combo) * u64::from(quantity);
    u32::try_from(total).map_err(|_| {
        OrderError::validation(format!(
            "component quantity overflow: {} × {}",
            per_combo, quantity
        ))
    })
}

fn billing_line_index(snapshot: &OrderSnapshot, item_id: u64) -> OrderResult<usize> {
    let index = snapshot
        .items
        .iter()
        .position(|i| i.id == item_id)
        .ok_or(OrderError::not_found(Entity::OrderItem, item_id))?;
    if !snapshot.items[index].is_billing() {
        return Err(Conflict::DecompositionLine { item_id }.into());
    }
    Ok(index)
}

/// Change a billing line's quantity, rescaling its decomposition lines
///
/// Returns the previous quantity.
pub fn change_quantity(
    snapshot: &mut OrderSnapshot,
    item_id: u64,
    quantity: u32,
) -> OrderResult<u32> {
    validate_quantity(quantity)?;
    let index = billing_line_index(snapshot, item_id)?;
    let previous = snapshot.items[index].quantity;
    if previous == quantity {
        return Ok(previous);
    }

    // Compute every child first so a bad ratio leaves the snapshot untouched
    let mut rescaled = Vec::new();
    for child in snapshot.decomposition_of(item_id) {
        let numerator = u64::from(child.quantity) * u64::from(quantity);
        let denominator = u64::from(previous);
        if denominator == 0 || numerator % denominator != 0 {
            return Err(OrderError::validation(format!(
                "decomposition line {} cannot be rescaled exactly from {} to {}",
                child.id, previous, quantity
            )));
        }
        let new_qty = u32::try_from(numerator / denominator).map_err(|_| {
            OrderError::validation(format!("decomposition line {} overflows", child.id))
        })?;
        rescaled.push((child.id, new_qty));
    }

    snapshot.items[index].quantity = quantity;
    for (child_id, new_qty) in rescaled {
        if let Some(child) = snapshot.items.iter_mut().find(|i| i.id == child_id) {
            child.quantity = new_qty;
        }
    }
    Ok(previous)
}

/// Remove a billing line and all of its decomposition lines
pub fn remove_line(snapshot: &mut OrderSnapshot, item_id: u64) -> OrderResult<OrderItem> {
    let index = billing_line_index(snapshot, item_id)?;
    let removed = snapshot.items.remove(index);
    snapshot
        .items
        .retain(|i| i.parent_item_id() != Some(item_id));
    Ok(removed)
}
