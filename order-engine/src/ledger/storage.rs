//! redb-based ledger store
//!
//! # Tables
//!
//! | Table | Key | Value | Purpose |
//! |-------|-----|-------|---------|
//! | `orders` | `order_id` | `Order` | Order headers |
//! | `order_items` | `(order_id, item_id)` | `OrderItem` | Billing + decomposition lines |
//! | `tables` | `table_id` | `DiningTable` | Dining tables and derived occupancy |
//! | `table_orders` | `(table_id, order_id)` | `()` | Orders that referenced a table |
//! | `products` | `product_id` | `Product` | Catalog products |
//! | `combos` | `combo_id` | `Combo` | Catalog combos with components |
//! | `stock_items` | `stock_item_id` | `StockItem` | Consumable stock units |
//! | `stock_movements` | `(stock_item_id, movement_id)` | `StockMovement` | Append-only stock ledger |
//! | `stock_applied` | `order_id` | `()` | Exactly-once stock decrement marker |
//! | `customers` | `customer_id` | `Customer` | Customers with credit ceiling |
//! | `customer_orders` | `(customer_id, order_id)` | `()` | Orders linked to a customer |
//! | `sequences` | `name` | `u64` | Id and document sequence counters |
//!
//! # Isolation
//!
//! redb allows exactly one write transaction at a time; `begin_write` blocks
//! until the previous writer commits or aborts. Every read-validate-write
//! cycle of the order service runs inside one write transaction, so table
//! occupancy and credit utilization are never checked against stale data.

use redb::{
    Database, ReadTransaction, ReadableDatabase, ReadableTable, TableDefinition, WriteTransaction,
};
use serde::Serialize;
use serde::de::DeserializeOwned;
use shared::models::{Combo, Customer, DiningTable, Product, StockItem, StockMovement};
use shared::order::{Order, OrderItem, OrderSnapshot};
use std::path::Path;
use std::sync::Arc;
use thiserror::Error;

const ORDERS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("orders");

const ORDER_ITEMS_TABLE: TableDefinition<(u64, u64), &[u8]> = TableDefinition::new("order_items");

const TABLES_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("tables");

const TABLE_ORDERS_TABLE: TableDefinition<(u64, u64), ()> = TableDefinition::new("table_orders");

const PRODUCTS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("products");

const COMBOS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("combos");

const STOCK_ITEMS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("stock_items");

const STOCK_MOVEMENTS_TABLE: TableDefinition<(u64, u64), &[u8]> =
    TableDefinition::new("stock_movements");

/// 库存已扣减标记 (每个订单只扣一次)
const STOCK_APPLIED_TABLE: TableDefinition<u64, ()> = TableDefinition::new("stock_applied");

const CUSTOMERS_TABLE: TableDefinition<u64, &[u8]> = TableDefinition::new("customers");

const CUSTOMER_ORDERS_TABLE: TableDefinition<(u64, u64), ()> =
    TableDefinition::new("customer_orders");

const SEQUENCE_TABLE: TableDefinition<&str, u64> = TableDefinition::new("sequences");

/// Sequence names
pub mod seq {
    pub const ORDER: &str = "order";
    pub const ORDER_ITEM: &str = "order_item";
    pub const TABLE: &str = "table";
    pub const PRODUCT: &str = "product";
    pub const COMBO: &str = "combo";
    pub const STOCK_ITEM: &str = "stock_item";
    pub const STOCK_MOVEMENT: &str = "stock_movement";
    pub const CUSTOMER: &str = "customer";
    pub const DOC_TICKET: &str = "doc_ticket";
    pub const DOC_INVOICE: &str = "doc_invoice";
}

/// Storage errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Database error: {0}")]
    Database(#[from] redb::DatabaseError),

    #[error("Transaction error: {0}")]
    Transaction(#[from] redb::TransactionError),

    #[error("Table error: {0}")]
    Table(#[from] redb::TableError),

    #[error("Storage error: {0}")]
    Storage(#[from] redb::StorageError),

    #[error("Commit error: {0}")]
    Commit(#[from] redb::CommitError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    /// The transaction could not be started; retrying may succeed.
    pub fn is_contention(&self) -> bool {
        matches!(self, StorageError::Transaction(_))
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

// ========== Row helpers ==========

fn read_row<T, V>(table: &T, key: u64) -> StorageResult<Option<V>>
where
    T: ReadableTable<u64, &'static [u8]>,
    V: DeserializeOwned,
{
    match table.get(key)? {
        Some(guard) => Ok(Some(serde_json::from_slice(guard.value())?)),
        None => Ok(None),
    }
}

fn read_all<T, V>(table: &T) -> StorageResult<Vec<V>>
where
    T: ReadableTable<u64, &'static [u8]>,
    V: DeserializeOwned,
{
    let mut rows = Vec::new();
    for entry in table.iter()? {
        let (_key, value) = entry?;
        rows.push(serde_json::from_slice(value.value())?);
    }
    Ok(rows)
}

/// Rows keyed by `(parent, child)` for one parent, in child order
fn read_children<T, V>(table: &T, parent: u64) -> StorageResult<Vec<V>>
where
    T: ReadableTable<(u64, u64), &'static [u8]>,
    V: DeserializeOwned,
{
    let mut rows = Vec::new();
    for entry in table.range((parent, 0u64)..=(parent, u64::MAX))? {
        let (_key, value) = entry?;
        rows.push(serde_json::from_slice(value.value())?);
    }
    Ok(rows)
}

fn index_children<T>(table: &T, parent: u64) -> StorageResult<Vec<u64>>
where
    T: ReadableTable<(u64, u64), ()>,
{
    let mut ids = Vec::new();
    for entry in table.range((parent, 0u64)..=(parent, u64::MAX))? {
        let (key, _) = entry?;
        ids.push(key.value().1);
    }
    Ok(ids)
}

fn write_row<V: Serialize>(
    txn: &WriteTransaction,
    def: TableDefinition<'static, u64, &'static [u8]>,
    key: u64,
    row: &V,
) -> StorageResult<()> {
    let mut table = txn.open_table(def)?;
    let value = serde_json::to_vec(row)?;
    table.insert(key, value.as_slice())?;
    Ok(())
}

/// Ledger store backed by redb
#[derive(Clone)]
pub struct LedgerStore {
    db: Arc<Database>,
}

impl std::fmt::Debug for LedgerStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LedgerStore").finish_non_exhaustive()
    }
}

impl LedgerStore {
    /// Open or create the ledger at the given path
    ///
    /// redb commits with `Durability::Immediate`: once `commit()` returns the
    /// data is on disk, and the copy-on-write file is always consistent.
    pub fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let db = Database::create(path)?;
        Self::init(db)
    }

    /// Open an in-memory ledger (for testing)
    #[cfg(test)]
    pub fn open_in_memory() -> StorageResult<Self> {
        let db = Database::builder().create_with_backend(redb::backends::InMemoryBackend::new())?;
        Self::init(db)
    }

    fn init(db: Database) -> StorageResult<Self> {
        let write_txn = db.begin_write()?;
        {
            // Create all tables if they don't exist
            let _ = write_txn.open_table(ORDERS_TABLE)?;
            let _ = write_txn.open_table(ORDER_ITEMS_TABLE)?;
            let _ = write_txn.open_table(TABLES_TABLE)?;
            let _ = write_txn.open_table(TABLE_ORDERS_TABLE)?;
            let _ = write_txn.open_table(PRODUCTS_TABLE)?;
            let _ = write_txn.open_table(COMBOS_TABLE)?;
            let _ = write_txn.open_table(STOCK_ITEMS_TABLE)?;
            let _ = write_txn.open_table(STOCK_MOVEMENTS_TABLE)?;
            let _ = write_txn.open_table(STOCK_APPLIED_TABLE)?;
            let _ = write_txn.open_table(CUSTOMERS_TABLE)?;
            let _ = write_txn.open_table(CUSTOMER_ORDERS_TABLE)?;
            let _ = write_txn.open_table(SEQUENCE_TABLE)?;
        }
        write_txn.commit()?;

        Ok(Self { db: Arc::new(db) })
    }

    /// Begin a write transaction (blocks while another writer is active)
    pub fn begin_write(&self) -> StorageResult<WriteTransaction> {
        Ok(self.db.begin_write()?)
    }

    pub fn begin_read(&self) -> StorageResult<ReadTransaction> {
        Ok(self.db.begin_read()?)
    }

    // ========== Sequence Operations ==========

    /// Increment and return the named sequence (within transaction)
    pub fn next_id(&self, txn: &WriteTransaction, name: &str) -> StorageResult<u64> {
        let mut table = txn.open_table(SEQUENCE_TABLE)?;
        let current = table.get(name)?.map(|guard| guard.value()).unwrap_or(0);
        let next = current + 1;
        table.insert(name, next)?;
        Ok(next)
    }

    /// Increment the named sequence in its own committed transaction
    pub fn next_id_committed(&self, name: &str) -> StorageResult<u64> {
        let txn = self.db.begin_write()?;
        let next = self.next_id(&txn, name)?;
        txn.commit()?;
        Ok(next)
    }

    /// Current value of the named sequence (read-only)
    pub fn current_sequence(&self, name: &str) -> StorageResult<u64> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(SEQUENCE_TABLE)?;
        Ok(table.get(name)?.map(|guard| guard.value()).unwrap_or(0))
    }

    // ========== Order Operations ==========

    /// Persist an order header plus its full set of lines
    ///
    /// Existing lines of the order are replaced, so removed lines disappear.
    /// Table and customer links are indexed on the way.
    pub fn store_snapshot(
        &self,
        txn: &WriteTransaction,
        snapshot: &OrderSnapshot,
    ) -> StorageResult<()> {
        let order = &snapshot.order;
        write_row(txn, ORDERS_TABLE, order.id, order)?;

        {
            let mut items = txn.open_table(ORDER_ITEMS_TABLE)?;
            let mut stale = Vec::new();
            for entry in items.range((order.id, 0u64)..=(order.id, u64::MAX))? {
                let (key, _) = entry?;
                stale.push(key.value());
            }
            for key in stale {
                items.remove(key)?;
            }
            for item in &snapshot.items {
                let value = serde_json::to_vec(item)?;
                items.insert((order.id, item.id), value.as_slice())?;
            }
        }

        if let Some(table_id) = order.table_id {
            let mut index = txn.open_table(TABLE_ORDERS_TABLE)?;
            index.insert((table_id, order.id), ())?;
        }
        if let Some(customer_id) = order.customer_id {
            let mut index = txn.open_table(CUSTOMER_ORDERS_TABLE)?;
            index.insert((customer_id, order.id), ())?;
        }
        Ok(())
    }

    /// Get a snapshot by order ID
    pub fn load_snapshot(&self, order_id: u64) -> StorageResult<Option<OrderSnapshot>> {
        let read_txn = self.db.begin_read()?;
        let orders = read_txn.open_table(ORDERS_TABLE)?;
        let Some(order) = read_row::<_, Order>(&orders, order_id)? else {
            return Ok(None);
        };
        let items = read_txn.open_table(ORDER_ITEMS_TABLE)?;
        let items = read_children(&items, order_id)?;
        Ok(Some(OrderSnapshot { order, items }))
    }

    /// Get a snapshot by order ID (within transaction)
    pub fn load_snapshot_txn(
        &self,
        txn: &WriteTransaction,
        order_id: u64,
    ) -> StorageResult<Option<OrderSnapshot>> {
        let Some(order) = self.load_order_txn(txn, order_id)? else {
            return Ok(None);
        };
        let items = txn.open_table(ORDER_ITEMS_TABLE)?;
        let items = read_children(&items, order_id)?;
        Ok(Some(OrderSnapshot { order, items }))
    }

    /// Order header only (within transaction)
    pub fn load_order_txn(
        &self,
        txn: &WriteTransaction,
        order_id: u64,
    ) -> StorageResult<Option<Order>> {
        let orders = txn.open_table(ORDERS_TABLE)?;
        read_row(&orders, order_id)
    }

    /// All order headers
    pub fn all_orders(&self) -> StorageResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let orders = read_txn.open_table(ORDERS_TABLE)?;
        read_all(&orders)
    }

    /// All snapshots whose header matches the filter, read in one transaction
    pub fn snapshots_where(
        &self,
        mut filter: impl FnMut(&Order) -> bool,
    ) -> StorageResult<Vec<OrderSnapshot>> {
        let read_txn = self.db.begin_read()?;
        let orders = read_txn.open_table(ORDERS_TABLE)?;
        let items = read_txn.open_table(ORDER_ITEMS_TABLE)?;

        let mut snapshots = Vec::new();
        for order in read_all::<_, Order>(&orders)? {
            if filter(&order) {
                let lines = read_children(&items, order.id)?;
                snapshots.push(OrderSnapshot {
                    order,
                    items: lines,
                });
            }
        }
        Ok(snapshots)
    }

    // ========== Dining Tables ==========

    pub fn put_table(&self, txn: &WriteTransaction, table: &DiningTable) -> StorageResult<()> {
        write_row(txn, TABLES_TABLE, table.id, table)
    }

    pub fn get_table(&self, table_id: u64) -> StorageResult<Option<DiningTable>> {
        let read_txn = self.db.begin_read()?;
        let tables = read_txn.open_table(TABLES_TABLE)?;
        read_row(&tables, table_id)
    }

    pub fn get_table_txn(
        &self,
        txn: &WriteTransaction,
        table_id: u64,
    ) -> StorageResult<Option<DiningTable>> {
        let tables = txn.open_table(TABLES_TABLE)?;
        read_row(&tables, table_id)
    }

    pub fn list_tables(&self) -> StorageResult<Vec<DiningTable>> {
        let read_txn = self.db.begin_read()?;
        let tables = read_txn.open_table(TABLES_TABLE)?;
        read_all(&tables)
    }

    /// Every order that ever referenced the table (within transaction)
    pub fn table_order_ids_txn(
        &self,
        txn: &WriteTransaction,
        table_id: u64,
    ) -> StorageResult<Vec<u64>> {
        let index = txn.open_table(TABLE_ORDERS_TABLE)?;
        index_children(&index, table_id)
    }

    // ========== Catalog ==========

    pub fn put_product(&self, txn: &WriteTransaction, product: &Product) -> StorageResult<()> {
        write_row(txn, PRODUCTS_TABLE, product.id, product)
    }

    pub fn get_product(&self, product_id: u64) -> StorageResult<Option<Product>> {
        let read_txn = self.db.begin_read()?;
        let products = read_txn.open_table(PRODUCTS_TABLE)?;
        read_row(&products, product_id)
    }

    pub fn get_product_txn(
        &self,
        txn: &WriteTransaction,
        product_id: u64,
    ) -> StorageResult<Option<Product>> {
        let products = txn.open_table(PRODUCTS_TABLE)?;
        read_row(&products, product_id)
    }

    pub fn list_products(&self) -> StorageResult<Vec<Product>> {
        let read_txn = self.db.begin_read()?;
        let products = read_txn.open_table(PRODUCTS_TABLE)?;
        read_all(&products)
    }

    pub fn put_combo(&self, txn: &WriteTransaction, combo: &Combo) -> StorageResult<()> {
        write_row(txn, COMBOS_TABLE, combo.id, combo)
    }

    pub fn get_combo(&self, combo_id: u64) -> StorageResult<Option<Combo>> {
        let read_txn = self.db.begin_read()?;
        let combos = read_txn.open_table(COMBOS_TABLE)?;
        read_row(&combos, combo_id)
    }

    pub fn get_combo_txn(
        &self,
        txn: &WriteTransaction,
        combo_id: u64,
    ) -> StorageResult<Option<Combo>> {
        let combos = txn.open_table(COMBOS_TABLE)?;
        read_row(&combos, combo_id)
    }

    pub fn list_combos(&self) -> StorageResult<Vec<Combo>> {
        let read_txn = self.db.begin_read()?;
        let combos = read_txn.open_table(COMBOS_TABLE)?;
        read_all(&combos)
    }

    // ========== Stock ==========

    pub fn put_stock_item(&self, txn: &WriteTransaction, item: &StockItem) -> StorageResult<()> {
        write_row(txn, STOCK_ITEMS_TABLE, item.id, item)
    }

    pub fn get_stock_item(&self, stock_item_id: u64) -> StorageResult<Option<StockItem>> {
        let read_txn = self.db.begin_read()?;
        let stock = read_txn.open_table(STOCK_ITEMS_TABLE)?;
        read_row(&stock, stock_item_id)
    }

    pub fn get_stock_item_txn(
        &self,
        txn: &WriteTransaction,
        stock_item_id: u64,
    ) -> StorageResult<Option<StockItem>> {
        let stock = txn.open_table(STOCK_ITEMS_TABLE)?;
        read_row(&stock, stock_item_id)
    }

    pub fn append_movement(
        &self,
        txn: &WriteTransaction,
        movement: &StockMovement,
    ) -> StorageResult<()> {
        let mut table = txn.open_table(STOCK_MOVEMENTS_TABLE)?;
        let value = serde_json::to_vec(movement)?;
        table.insert((movement.stock_item_id, movement.id), value.as_slice())?;
        Ok(())
    }

    /// Movement ledger of one stock unit, oldest first
    pub fn movements_for(&self, stock_item_id: u64) -> StorageResult<Vec<StockMovement>> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(STOCK_MOVEMENTS_TABLE)?;
        read_children(&table, stock_item_id)
    }

    pub fn is_stock_applied_txn(
        &self,
        txn: &WriteTransaction,
        order_id: u64,
    ) -> StorageResult<bool> {
        let table = txn.open_table(STOCK_APPLIED_TABLE)?;
        Ok(table.get(order_id)?.is_some())
    }

    pub fn mark_stock_applied(&self, txn: &WriteTransaction, order_id: u64) -> StorageResult<()> {
        let mut table = txn.open_table(STOCK_APPLIED_TABLE)?;
        table.insert(order_id, ())?;
        Ok(())
    }

    // ========== Customers ==========

    pub fn put_customer(&self, txn: &WriteTransaction, customer: &Customer) -> StorageResult<()> {
        write_row(txn, CUSTOMERS_TABLE, customer.id, customer)
    }

    pub fn get_customer(&self, customer_id: u64) -> StorageResult<Option<Customer>> {
        let read_txn = self.db.begin_read()?;
        let customers = read_txn.open_table(CUSTOMERS_TABLE)?;
        read_row(&customers, customer_id)
    }

    pub fn get_customer_txn(
        &self,
        txn: &WriteTransaction,
        customer_id: u64,
    ) -> StorageResult<Option<Customer>> {
        let customers = txn.open_table(CUSTOMERS_TABLE)?;
        read_row(&customers, customer_id)
    }

    /// Orders linked to a customer (within transaction)
    pub fn customer_order_ids_txn(
        &self,
        txn: &WriteTransaction,
        customer_id: u64,
    ) -> StorageResult<Vec<u64>> {
        let index = txn.open_table(CUSTOMER_ORDERS_TABLE)?;
        index_children(&index, customer_id)
    }

    /// Headers of every order linked to a customer (read-only)
    pub fn customer_orders(&self, customer_id: u64) -> StorageResult<Vec<Order>> {
        let read_txn = self.db.begin_read()?;
        let index = read_txn.open_table(CUSTOMER_ORDERS_TABLE)?;
        let orders = read_txn.open_table(ORDERS_TABLE)?;
        let mut result = Vec::new();
        for order_id in index_children(&index, customer_id)? {
            if let Some(order) = read_row(&orders, order_id)? {
                result.push(order);
            }
        }
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;
    use shared::models::TableState;
    use shared::order::{CreateOrder, ItemRef, LineKind, PaymentMode};

    fn create_test_snapshot(store: &LedgerStore, txn: &WriteTransaction) -> OrderSnapshot {
        let id = store.next_id(txn, seq::ORDER).unwrap();
        let input = CreateOrder {
            table_id: Some(1),
            operator: "test_op".to_string(),
            payment_mode: PaymentMode::PayLater,
            customer_name: None,
            note: None,
            items: vec![],
        };
        let mut snapshot = OrderSnapshot::new(Order::new(id, &input, shared::util::now_millis()));
        for n in 0..3u64 {
            snapshot.items.push(OrderItem {
                id: store.next_id(txn, seq::ORDER_ITEM).unwrap(),
                order_id: id,
                item_ref: ItemRef::Product { product_id: n + 1 },
                kind: LineKind::Billing,
                name: format!("Item {}", n),
                quantity: 1,
                unit_price: Decimal::ONE,
                subtotal: Decimal::ONE,
                tax_rate: Decimal::ZERO,
                tax_amount: Decimal::ZERO,
                line_total: Decimal::ONE,
                note: None,
            });
        }
        snapshot
    }

    #[test]
    fn test_sequences_are_independent() {
        let store = LedgerStore::open_in_memory().unwrap();
        let txn = store.begin_write().unwrap();
        assert_eq!(store.next_id(&txn, seq::ORDER).unwrap(), 1);
        assert_eq!(store.next_id(&txn, seq::ORDER).unwrap(), 2);
        assert_eq!(store.next_id(&txn, seq::PRODUCT).unwrap(), 1);
        txn.commit().unwrap();

        assert_eq!(store.current_sequence(seq::ORDER).unwrap(), 2);
        assert_eq!(store.next_id_committed(seq::DOC_TICKET).unwrap(), 1);
        assert_eq!(store.next_id_committed(seq::DOC_TICKET).unwrap(), 2);
    }

    #[test]
    fn test_store_and_load_snapshot() {
        let store = LedgerStore::open_in_memory().unwrap();
        let txn = store.begin_write().unwrap();
        let snapshot = create_test_snapshot(&store, &txn);
        store.store_snapshot(&txn, &snapshot).unwrap();
        txn.commit().unwrap();

        let loaded = store.load_snapshot(snapshot.id()).unwrap().unwrap();
        assert_eq!(loaded, snapshot);
        assert!(store.load_snapshot(999).unwrap().is_none());
    }

    #[test]
    fn test_store_snapshot_replaces_removed_lines() {
        let store = LedgerStore::open_in_memory().unwrap();
        let txn = store.begin_write().unwrap();
        let mut snapshot = create_test_snapshot(&store, &txn);
        store.store_snapshot(&txn, &snapshot).unwrap();
        txn.commit().unwrap();

        snapshot.items.remove(1);
        let txn = store.begin_write().unwrap();
        store.store_snapshot(&txn, &snapshot).unwrap();
        txn.commit().unwrap();

        let loaded = store.load_snapshot(snapshot.id()).unwrap().unwrap();
        assert_eq!(loaded.items.len(), 2);
        assert_eq!(loaded.items, snapshot.items);
    }

    #[test]
    fn test_table_index_follows_snapshot() {
        let store = LedgerStore::open_in_memory().unwrap();
        let txn = store.begin_write().unwrap();
        store
            .put_table(
                &txn,
                &DiningTable {
                    id: 1,
                    name: "Mesa 1".into(),
                    capacity: 4,
                    state: TableState::Free,
                },
            )
            .unwrap();
        let snapshot = create_test_snapshot(&store, &txn);
        store.store_snapshot(&txn, &snapshot).unwrap();
        assert_eq!(
            store.table_order_ids_txn(&txn, 1).unwrap(),
            vec![snapshot.id()]
        );
        assert!(store.table_order_ids_txn(&txn, 2).unwrap().is_empty());
        txn.commit().unwrap();

        assert_eq!(store.list_tables().unwrap().len(), 1);
    }

    #[test]
    fn test_uncommitted_write_is_discarded() {
        let store = LedgerStore::open_in_memory().unwrap();
        let txn = store.begin_write().unwrap();
        let snapshot = create_test_snapshot(&store, &txn);
        store.store_snapshot(&txn, &snapshot).unwrap();
        drop(txn);

        assert!(store.load_snapshot(snapshot.id()).unwrap().is_none());
        assert_eq!(store.current_sequence(seq::ORDER).unwrap(), 0);
    }

    #[test]
    fn test_stock_applied_marker() {
        let store = LedgerStore::open_in_memory().unwrap();
        let txn = store.begin_write().unwrap();
        assert!(!store.is_stock_applied_txn(&txn, 7).unwrap());
        store.mark_stock_applied(&txn, 7).unwrap();
        assert!(store.is_stock_applied_txn(&txn, 7).unwrap());
        txn.commit().unwrap();
    }
}
