//! Stock & Credit Guard
//!
//! Both checks run inside the caller's write transaction, next to the order
//! state write that triggers them. redb admits a single writer at a time, so
//! the levels and utilization read here cannot change before commit.

use redb::WriteTransaction;
use rust_decimal::Decimal;
use shared::message::OrderNotice;
use shared::models::{CreditSummary, Customer, StockItem, StockMovement};
use shared::error::ErrorCode;
use shared::order::{OrderSnapshot, OrderState};
use std::collections::BTreeMap;

use super::error::{Conflict, Entity, OrderError, OrderResult};
use super::money::{money_eq, validate_credit_amount};
use crate::ledger::{LedgerStore, seq};

// ========== Stock ==========

/// Decrement stock for every stock-linked product line of a paid order
///
/// Runs at most once per order: the `stock_applied` marker is checked and
/// written in the same transaction. Returns `low_stock` notices for units
/// that ended at or below their minimum.
pub fn apply_stock(
    store: &LedgerStore,
    txn: &WriteTransaction,
    snapshot: &OrderSnapshot,
    allow_negative: bool,
    now: i64,
) -> OrderResult<Vec<OrderNotice>> {
    let order_id = snapshot.id();
    if store.is_stock_applied_txn(txn, order_id)? {
        tracing::warn!(order_id, "Stock already applied, skipping");
        return Ok(vec![]);
    }

    // Running levels, one entry per touched unit
    let mut units: BTreeMap<u64, StockItem> = BTreeMap::new();
    let mut movements = Vec::new();

    // 组合的计费行没有商品；由其拆分行扣减
    for line in &snapshot.items {
        let Some(product_id) = line.item_ref.product_id() else {
            continue;
        };
        let Some(product) = store.get_product_txn(txn, product_id)? else {
            tracing::warn!(order_id, product_id, "Product missing at stock time, skipping");
            continue;
        };
        let Some(stock_item_id) = product.stock_item_id else {
            continue;
        };

        if !units.contains_key(&stock_item_id) {
            let unit = store
                .get_stock_item_txn(txn, stock_item_id)?
                .ok_or(OrderError::not_found(Entity::StockItem, stock_item_id))?;
            units.insert(stock_item_id, unit);
        }
        let Some(unit) = units.get_mut(&stock_item_id) else {
            continue;
        };

        let requested = Decimal::from(line.quantity);
        let previous_level = unit.level;
        let new_level = previous_level - requested;
        if new_level < Decimal::ZERO && !allow_negative {
            return Err(OrderError::InsufficientStock {
                stock_item_id,
                available: previous_level.max(Decimal::ZERO),
                requested,
            });
        }
        unit.level = new_level;

        movements.push(StockMovement {
            id: store.next_id(txn, seq::STOCK_MOVEMENT)?,
            stock_item_id,
            delta: -requested,
            previous_level,
            new_level,
            reference_order_id: Some(order_id),
            timestamp: now,
        });
    }

    for movement in &movements {
        store.append_movement(txn, movement)?;
    }

    let mut notices = Vec::new();
    for unit in units.values() {
        store.put_stock_item(txn, unit)?;
        if unit.is_low() {
            tracing::warn!(
                stock_item_id = unit.id,
                level = %unit.level,
                min_level = %unit.min_level,
                "Stock at or below minimum"
            );
            notices.push(OrderNotice::LowStock {
                stock_item_id: unit.id,
                name: unit.name.clone(),
                level: unit.level,
                min_level: unit.min_level,
            });
        }
    }

    store.mark_stock_applied(txn, order_id)?;
    tracing::debug!(order_id, movements = movements.len(), "Stock applied");
    Ok(notices)
}

// ========== Credit ==========

/// Sum of totals of the customer's orders currently in `credit`
pub fn utilization(
    store: &LedgerStore,
    txn: &WriteTransaction,
    customer_id: u64,
) -> OrderResult<Decimal> {
    let mut utilized = Decimal::ZERO;
    for order_id in store.customer_order_ids_txn(txn, customer_id)? {
        if let Some(order) = store.load_order_txn(txn, order_id)?
            && order.state == OrderState::Credit
        {
            utilized += order.total;
        }
    }
    Ok(utilized)
}

fn active_customer(
    store: &LedgerStore,
    txn: &WriteTransaction,
    customer_id: u64,
) -> OrderResult<Customer> {
    match store.get_customer_txn(txn, customer_id)? {
        Some(customer) if customer.active => Ok(customer),
        _ => Err(OrderError::not_found(Entity::Customer, customer_id)),
    }
}

/// Admit a credit sale for `snapshot`
///
/// On success the customer is linked and snapshotted onto the order; the
/// caller moves the order into `credit` and stores it in the same
/// transaction.
pub fn admit_credit(
    store: &LedgerStore,
    txn: &WriteTransaction,
    snapshot: &mut OrderSnapshot,
    customer_id: u64,
    amount: Decimal,
) -> OrderResult<Customer> {
    validate_credit_amount(amount)?;

    let customer = active_customer(store, txn, customer_id)?;
    let ceiling = customer.credit_limit;
    if ceiling <= Decimal::ZERO {
        return Err(OrderError::InsufficientCredit {
            customer_id,
            available: Decimal::ZERO,
            requested: amount,
        });
    }

    let order = &snapshot.order;
    if !order.state.is_active() {
        return Err(Conflict::Inactive { state: order.state }.into());
    }
    if order.is_paid() {
        return Err(Conflict::AlreadyPaid.into());
    }
    if !money_eq(amount, order.total) {
        return Err(OrderError::invalid(
            ErrorCode::CreditAmountMismatch,
            format!(
                "credit amount {} does not match order total {}",
                amount, order.total
            ),
        ));
    }

    let utilized = utilization(store, txn, customer_id)?;
    let available = (ceiling - utilized).max(Decimal::ZERO);
    if utilized + amount > ceiling {
        tracing::warn!(
            customer_id,
            order_id = order.id,
            %available,
            requested = %amount,
            "Credit admission rejected"
        );
        return Err(OrderError::InsufficientCredit {
            customer_id,
            available,
            requested: amount,
        });
    }

    snapshot.order.customer_id = Some(customer_id);
    snapshot.order.customer = Some(customer.snapshot());
    Ok(customer)
}

/// Ceiling, utilization and available credit of a customer
pub fn credit_summary(store: &LedgerStore, customer_id: u64) -> OrderResult<CreditSummary> {
    let customer = store
        .get_customer(customer_id)?
        .ok_or(OrderError::not_found(Entity::Customer, customer_id))?;
    let utilized: Decimal = store
        .customer_orders(customer_id)?
        .iter()
        .filter(|o| o.state == OrderState::Credit)
        .map(|o| o.total)
        .sum();
    Ok(CreditSummary {
        customer_id,
        ceiling: customer.credit_limit,
        utilized,
        available: (customer.credit_limit - utilized).max(Decimal::ZERO),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use shared::models::Product;
    use shared::order::{CreateOrder, ItemRef, LineKind, Order, OrderItem, PaymentMode};

    fn seed_product(store: &LedgerStore, txn: &WriteTransaction, stock: Option<u64>) -> u64 {
        let id = store.next_id(txn, seq::PRODUCT).unwrap();
        store
            .put_product(
                txn,
                &Product {
                    id,
                    name: format!("Soda {}", id),
                    price: dec!(1.00),
                    available: true,
                    stock_item_id: stock,
                },
            )
            .unwrap();
        id
    }

    fn seed_stock(store: &LedgerStore, txn: &WriteTransaction, level: Decimal) -> u64 {
        let id = store.next_id(txn, seq::STOCK_ITEM).unwrap();
        store
            .put_stock_item(
                txn,
                &StockItem {
                    id,
                    name: "Botella".into(),
                    unit: "ud".into(),
                    level,
                    min_level: dec!(2),
                },
            )
            .unwrap();
        id
    }

    fn snapshot_with_lines(lines: &[(u64, u32)]) -> OrderSnapshot {
        let input = CreateOrder {
            table_id: None,
            operator: "op".into(),
            payment_mode: PaymentMode::Prepaid,
            customer_name: None,
            note: None,
            items: vec![],
        };
        let mut s = OrderSnapshot::new(Order::new(1, &input, 0));
        for (n, (product_id, quantity)) in lines.iter().enumerate() {
            s.items.push(OrderItem {
                id: n as u64 + 1,
                order_id: 1,
                item_ref: ItemRef::Product {
                    product_id: *product_id,
                },
                kind: LineKind::Billing,
                name: "x".into(),
                quantity: *quantity,
                unit_price: dec!(1.00),
                subtotal: Decimal::ZERO,
                tax_rate: Decimal::ZERO,
                tax_amount: Decimal::ZERO,
                line_total: Decimal::ZERO,
                note: None,
            });
        }
        s
    }

    #[test]
    fn test_stock_decrements_once() {
        let store = LedgerStore::open_in_memory().unwrap();
        let txn = store.begin_write().unwrap();
        let unit = seed_stock(&store, &txn, dec!(10));
        let linked = seed_product(&store, &txn, Some(unit));
        let unlinked = seed_product(&store, &txn, None);
        let s = snapshot_with_lines(&[(linked, 3), (unlinked, 5)]);

        apply_stock(&store, &txn, &s, false, 1).unwrap();
        apply_stock(&store, &txn, &s, false, 2).unwrap();
        txn.commit().unwrap();

        assert_eq!(store.get_stock_item(unit).unwrap().unwrap().level, dec!(7));
        let movements = store.movements_for(unit).unwrap();
        assert_eq!(movements.len(), 1);
        assert_eq!(movements[0].previous_level, dec!(10));
        assert_eq!(movements[0].new_level, dec!(7));
        assert_eq!(movements[0].delta, dec!(-3));
        assert_eq!(movements[0].reference_order_id, Some(1));
    }

    #[test]
    fn test_insufficient_stock_is_rejected() {
        let store = LedgerStore::open_in_memory().unwrap();
        let txn = store.begin_write().unwrap();
        let unit = seed_stock(&store, &txn, dec!(2));
        let linked = seed_product(&store, &txn, Some(unit));
        let s = snapshot_with_lines(&[(linked, 1), (linked, 2)]);

        let err = apply_stock(&store, &txn, &s, false, 1).unwrap_err();
        match err {
            OrderError::InsufficientStock {
                available,
                requested,
                ..
            } => {
                assert_eq!(available, dec!(1));
                assert_eq!(requested, dec!(2));
            }
            other => panic!("unexpected error: {other:?}"),
        }

        // Negative stock allowed by configuration
        let notices = apply_stock(&store, &txn, &s, true, 1).unwrap();
        assert_eq!(notices.len(), 1);
        assert!(matches!(notices[0], OrderNotice::LowStock { .. }));
    }

    fn seed_customer(store: &LedgerStore, txn: &WriteTransaction, limit: Decimal) -> u64 {
        let id = store.next_id(txn, seq::CUSTOMER).unwrap();
        store
            .put_customer(
                txn,
                &Customer {
                    id,
                    name: "Comedor Central".into(),
                    document_type: None,
                    document_number: None,
                    nrc: None,
                    address: None,
                    phone: None,
                    email: None,
                    credit_limit: limit,
                    active: true,
                },
            )
            .unwrap();
        id
    }

    #[test]
    fn test_credit_admission_checks() {
        let store = LedgerStore::open_in_memory().unwrap();
        let txn = store.begin_write().unwrap();
        let customer = seed_customer(&store, &txn, dec!(20.00));

        let mut s = snapshot_with_lines(&[]);
        s.order.total = dec!(15.00);

        // Mismatched amount
        let err = admit_credit(&store, &txn, &mut s, customer, dec!(14.00)).unwrap_err();
        assert_eq!(err.code(), ErrorCode::CreditAmountMismatch);

        // Within tolerance
        admit_credit(&store, &txn, &mut s, customer, dec!(15.01)).unwrap();
        assert_eq!(s.order.customer_id, Some(customer));
        s.order.state = OrderState::Credit;
        store.store_snapshot(&txn, &s).unwrap();
        assert_eq!(utilization(&store, &txn, customer).unwrap(), dec!(15.00));

        let mut second = snapshot_with_lines(&[]);
        second.order.id = 2;
        second.order.total = dec!(6.00);
        match admit_credit(&store, &txn, &mut second, customer, dec!(6.00)).unwrap_err() {
            OrderError::InsufficientCredit { available, .. } => {
                assert_eq!(available, dec!(5.00))
            }
            other => panic!("unexpected error: {other:?}"),
        }
        txn.commit().unwrap();

        let summary = credit_summary(&store, customer).unwrap();
        assert_eq!(summary.utilized, dec!(15.00));
        assert_eq!(summary.available, dec!(5.00));
    }

    #[test]
    fn test_zero_ceiling_and_unknown_customer() {
        let store = LedgerStore::open_in_memory().unwrap();
        let txn = store.begin_write().unwrap();
        let customer = seed_customer(&store, &txn, Decimal::ZERO);
        let mut s = snapshot_with_lines(&[]);
        s.order.total = dec!(1.00);

        assert!(matches!(
            admit_credit(&store, &txn, &mut s, customer, dec!(1.00)),
            Err(OrderError::InsufficientCredit { available, .. }) if available.is_zero()
        ));
        assert!(matches!(
            admit_credit(&store, &txn, &mut s, 999, dec!(1.00)),
            Err(OrderError::NotFound {
                entity: Entity::Customer,
                ..
            })
        ));
    }
}
