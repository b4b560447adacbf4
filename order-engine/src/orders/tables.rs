//! Table Occupancy Tracker
//!
//! A table is occupied iff at least one order referencing it is active
//! (not closed, cancelled or credit). The count and the table write happen
//! in the same write transaction as the order change.

use redb::WriteTransaction;
use shared::models::{DiningTable, TableState};

use super::error::{Entity, OrderError, OrderResult};
use crate::ledger::LedgerStore;

/// Table must exist before an order may reference it
pub fn require_table(
    store: &LedgerStore,
    txn: &WriteTransaction,
    table_id: u64,
) -> OrderResult<DiningTable> {
    store
        .get_table_txn(txn, table_id)?
        .ok_or(OrderError::not_found(Entity::Table, table_id))
}

/// Re-derive the table state from its orders
///
/// Must run after the triggering order has been stored in `txn`.
pub fn rederive(
    store: &LedgerStore,
    txn: &WriteTransaction,
    table_id: u64,
) -> OrderResult<TableState> {
    let mut table = require_table(store, txn, table_id)?;

    let mut active = 0usize;
    for order_id in store.table_order_ids_txn(txn, table_id)? {
        if let Some(order) = store.load_order_txn(txn, order_id)?
            && order.state.is_active()
        {
            active += 1;
        }
    }

    let derived = if active > 0 {
        TableState::Occupied
    } else {
        TableState::Free
    };
    if table.state != derived {
        tracing::info!(table_id, state = ?derived, active_orders = active, "Table state changed");
        table.state = derived;
        store.put_table(txn, &table)?;
    }
    Ok(derived)
}
