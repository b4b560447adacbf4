//! Read side: role queues, listings and tax breakdown

use shared::order::{
    OrderSnapshot, OrderState, PaymentMode, TaxBreakdown, TaxLine, TaxSummary,
};

use super::error::{Entity, OrderError, OrderResult};
use crate::ledger::LedgerStore;

/// Orders the kitchen has to work on
///
/// Paid (not yet fired) first, then dine-in, then in preparation; oldest
/// first inside each group.
pub fn kitchen_queue(store: &LedgerStore) -> OrderResult<Vec<OrderSnapshot>> {
    fn rank(state: OrderState) -> u8 {
        match state {
            OrderState::Paid => 0,
            OrderState::InTable => 1,
            _ => 2,
        }
    }
    let mut orders = store.snapshots_where(|o| {
        matches!(
            o.state,
            OrderState::Paid | OrderState::InTable | OrderState::InKitchen
        )
    })?;
    orders.sort_by_key(|s| (rank(s.order.state), s.order.created_at, s.id()));
    Ok(orders)
}

/// Orders waiting at the cash desk: prepaid pending payment and served
/// pay-later orders. Served first.
pub fn cashier_queue(store: &LedgerStore) -> OrderResult<Vec<OrderSnapshot>> {
    let mut orders = store.snapshots_where(|o| {
        o.state == OrderState::PendingPayment
            || (o.state == OrderState::Served && o.payment_mode == PaymentMode::PayLater)
    })?;
    orders.sort_by_key(|s| {
        (
            s.order.state != OrderState::Served,
            s.order.created_at,
            s.id(),
        )
    });
    Ok(orders)
}

/// Ready orders waiting for a waiter, in the order they became ready
pub fn ready_for_service(store: &LedgerStore) -> OrderResult<Vec<OrderSnapshot>> {
    let mut orders = store.snapshots_where(|o| o.state == OrderState::Ready)?;
    orders.sort_by_key(|s| (s.order.ready_at.unwrap_or(s.order.updated_at), s.id()));
    Ok(orders)
}

/// Orders in the given states; everything not closed/cancelled by default
pub fn list_orders(
    store: &LedgerStore,
    states: Option<&[OrderState]>,
) -> OrderResult<Vec<OrderSnapshot>> {
    let mut orders = store.snapshots_where(|o| match states {
        Some(states) => states.contains(&o.state),
        None => !o.state.is_terminal(),
    })?;
    orders.sort_by_key(|s| (s.order.created_at, s.id()));
    Ok(orders)
}

/// 单个订单的 IVA 明细 (仅计费行)
pub fn tax_breakdown(store: &LedgerStore, order_id: u64) -> OrderResult<TaxBreakdown> {
    let snapshot = store
        .load_snapshot(order_id)?
        .ok_or(OrderError::not_found(Entity::Order, order_id))?;
    Ok(breakdown_of(&snapshot))
}

pub(crate) fn breakdown_of(snapshot: &OrderSnapshot) -> TaxBreakdown {
    let lines: Vec<TaxLine> = snapshot
        .billing_lines()
        .map(|i| TaxLine {
            item_id: i.id,
            name: i.name.clone(),
            quantity: i.quantity,
            unit_price: i.unit_price,
            subtotal: i.subtotal,
            tax_rate: i.tax_rate,
            tax_amount: i.tax_amount,
            line_total: i.line_total,
        })
        .collect();
    let order = &snapshot.order;
    TaxBreakdown {
        order_id: order.id,
        summary: TaxSummary {
            subtotal: order.subtotal,
            tax: order.tax,
            tip: order.tip,
            total: order.total,
            line_count: lines.len(),
        },
        lines,
    }
}
