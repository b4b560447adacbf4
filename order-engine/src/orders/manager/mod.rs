//! OrderService - orchestration of every order command
//!
//! # Command Flow
//!
//! ```text
//! command(args)
//!     ├─ 1. Validate input (before any transaction)
//!     ├─ 2. Begin write transaction (single writer)
//!     ├─ 3. Load snapshot, check state policy
//!     ├─ 4. Mutate aggregate + recalculate totals
//!     ├─ 5. Side effects: stock, credit, table occupancy
//!     ├─ 6. Persist snapshot
//!     ├─ 7. Commit (dropping the txn on error rolls everything back)
//!     ├─ 8. Publish notices (after commit, never fails the command)
//!     └─ 9. Return the updated snapshot
//! ```

mod error;
pub use error::*;

use redb::WriteTransaction;
use rust_decimal::Decimal;
use shared::error::ErrorCode;
use shared::message::{ItemChange, NotificationEvent, OrderNotice};
use shared::models::{CreditSummary, DiningTable, StockMovement};
use shared::order::{
    CreateOrder, CustomerSnapshot, InvoiceLink, ItemInput, Order, OrderSnapshot, OrderState,
    ReceiptType, Settlement, TaxBreakdown,
};
use std::sync::Arc;

use super::aggregate::{self, ResolvedItem};
use super::money::{recalculate_totals, validate_tip};
use super::{guard, queries, state_machine, tables};
use crate::ledger::{LedgerStore, StorageError, seq};
use crate::notify::EventSink;

/// Behaviour switches of the service
#[derive(Debug, Clone, Default)]
pub struct ServiceSettings {
    /// Let stock go below zero instead of rejecting the payment
    pub allow_negative_stock: bool,
}

/// Result of preparing a document issue
#[derive(Debug, Clone)]
pub enum DocumentPlan {
    /// A document was already issued; never regenerate
    Existing(InvoiceLink),
    /// Order is eligible; generate for this snapshot
    Issue(OrderSnapshot),
}

/// Order Service facade
///
/// Synchronous: every command is one redb write transaction. Async callers
/// run it on blocking threads.
#[derive(Clone)]
pub struct OrderService {
    store: LedgerStore,
    events: Arc<dyn EventSink>,
    settings: ServiceSettings,
}

impl std::fmt::Debug for OrderService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OrderService")
            .field("store", &self.store)
            .field("events", &"<EventSink>")
            .field("settings", &self.settings)
            .finish()
    }
}

impl OrderService {
    pub fn new(store: LedgerStore, events: Arc<dyn EventSink>, settings: ServiceSettings) -> Self {
        Self {
            store,
            events,
            settings,
        }
    }

    /// Get the underlying store
    pub fn store(&self) -> &LedgerStore {
        &self.store
    }

    // ========== Command plumbing ==========

    /// Run `f` inside one write transaction; publish its notices after commit
    fn execute<T>(
        &self,
        f: impl FnOnce(&WriteTransaction, &mut Vec<OrderNotice>) -> ManagerResult<T>,
    ) -> ManagerResult<T> {
        let txn = self.store.begin_write()?;
        let mut notices = Vec::new();
        // 出错时 txn 被丢弃 = 回滚
        let value = f(&txn, &mut notices)?;
        txn.commit().map_err(StorageError::from)?;
        self.publish(notices);
        Ok(value)
    }

    fn publish(&self, notices: Vec<OrderNotice>) {
        let timestamp = shared::util::now_millis();
        for notice in notices {
            tracing::debug!(kind = notice.kind(), order_id = ?notice.order_id(), "Publishing notice");
            self.events.publish(NotificationEvent::new(notice, timestamp));
        }
    }

    fn load(&self, txn: &WriteTransaction, order_id: u64) -> ManagerResult<OrderSnapshot> {
        self.store
            .load_snapshot_txn(txn, order_id)?
            .ok_or(OrderError::not_found(Entity::Order, order_id))
    }

    /// Store the snapshot and re-derive the occupancy of its table
    fn persist(&self, txn: &WriteTransaction, snapshot: &OrderSnapshot) -> ManagerResult<()> {
        self.store.store_snapshot(txn, snapshot)?;
        if let Some(table_id) = snapshot.order.table_id {
            tables::rederive(&self.store, txn, table_id)?;
        }
        Ok(())
    }

    fn resolve_item(&self, txn: &WriteTransaction, input: &ItemInput) -> ManagerResult<ResolvedItem> {
        match (input.product_id, input.combo_id) {
            (Some(product_id), None) => {
                let product = self
                    .store
                    .get_product_txn(txn, product_id)?
                    .ok_or(OrderError::not_found(Entity::Product, product_id))?;
                if !product.available {
                    return Err(Conflict::Unavailable {
                        entity: Entity::Product,
                        id: product_id,
                    }
                    .into());
                }
                Ok(ResolvedItem::Product(product))
            }
            (None, Some(combo_id)) => {
                let combo = self
                    .store
                    .get_combo_txn(txn, combo_id)?
                    .ok_or(OrderError::not_found(Entity::Combo, combo_id))?;
                if !combo.active {
                    return Err(Conflict::Unavailable {
                        entity: Entity::Combo,
                        id: combo_id,
                    }
                    .into());
                }
                let mut components = Vec::with_capacity(combo.components.len());
                for component in &combo.components {
                    let product = self
                        .store
                        .get_product_txn(txn, component.product_id)?
                        .ok_or(OrderError::not_found(Entity::Product, component.product_id))?;
                    if !product.available {
                        return Err(Conflict::Unavailable {
                            entity: Entity::Product,
                            id: product.id,
                        }
                        .into());
                    }
                    components.push((product, component.quantity));
                }
                Ok(ResolvedItem::Combo { combo, components })
            }
            _ => Err(OrderError::validation(
                "item must reference exactly one of product_id or combo_id",
            )),
        }
    }

    /// Enter `to`, running the side effects of entering `paid`
    fn advance(
        &self,
        txn: &WriteTransaction,
        snapshot: &mut OrderSnapshot,
        to: OrderState,
        now: i64,
        notices: &mut Vec<OrderNotice>,
    ) -> ManagerResult<()> {
        enter_with_notice(&mut snapshot.order, to, now, notices);

        if to == OrderState::Paid {
            let low_stock = guard::apply_stock(
                &self.store,
                txn,
                snapshot,
                self.settings.allow_negative_stock,
                now,
            )?;
            notices.extend(low_stock);

            if let Some(next) = state_machine::follow_on(&snapshot.order) {
                enter_with_notice(&mut snapshot.order, next, now, notices);
            }
        }
        Ok(())
    }

    // ========== Order commands ==========

    /// Open a new order with its initial items
    pub fn create_order(&self, input: CreateOrder) -> ManagerResult<OrderSnapshot> {
        if input.operator.trim().is_empty() {
            return Err(OrderError::invalid(
                ErrorCode::RequiredField,
                "operator is required",
            ));
        }
        if input.items.is_empty() {
            return Err(OrderError::invalid(
                ErrorCode::OrderEmpty,
                "order must contain at least one item",
            ));
        }

        let snapshot = self.execute(|txn, notices| {
            if let Some(table_id) = input.table_id {
                tables::require_table(&self.store, txn, table_id)?;
            }

            let now = shared::util::now_millis();
            let order_id = self.store.next_id(txn, seq::ORDER)?;
            let mut snapshot = OrderSnapshot::new(Order::new(order_id, &input, now));

            for item in &input.items {
                let resolved = self.resolve_item(txn, item)?;
                aggregate::add_line(
                    &mut snapshot,
                    &resolved,
                    item.quantity,
                    item.note.clone(),
                    || Ok(self.store.next_id(txn, seq::ORDER_ITEM)?),
                )?;
            }
            recalculate_totals(&mut snapshot);
            self.persist(txn, &snapshot)?;

            let order = &snapshot.order;
            notices.push(OrderNotice::NewOrder {
                order_id: order.id,
                table_id: order.table_id,
                payment_mode: order.payment_mode,
                state: order.state,
                total: order.total,
                item_count: snapshot.billing_lines().count(),
            });
            Ok(snapshot)
        })?;

        tracing::info!(
            order_id = snapshot.id(),
            table_id = ?snapshot.order.table_id,
            state = %snapshot.order.state,
            total = %snapshot.order.total,
            "Order created"
        );
        Ok(snapshot)
    }

    /// Add one item (product or combo) to an unpaid order
    pub fn add_item(&self, order_id: u64, input: ItemInput) -> ManagerResult<OrderSnapshot> {
        let (snapshot, item_id) = self.execute(|txn, notices| {
            let mut snapshot = self.load(txn, order_id)?;
            aggregate::ensure_items_editable(&snapshot.order)?;

            let resolved = self.resolve_item(txn, &input)?;
            let item_id = aggregate::add_line(
                &mut snapshot,
                &resolved,
                input.quantity,
                input.note.clone(),
                || Ok(self.store.next_id(txn, seq::ORDER_ITEM)?),
            )?;
            recalculate_totals(&mut snapshot);
            snapshot.order.updated_at = shared::util::now_millis();
            self.store.store_snapshot(txn, &snapshot)?;

            notices.push(OrderNotice::ItemChanged {
                order_id,
                change: ItemChange::Added,
                item_id: Some(item_id),
            });
            Ok((snapshot, item_id))
        })?;

        tracing::info!(order_id, item_id, total = %snapshot.order.total, "Item added");
        Ok(snapshot)
    }

    /// Remove a billing line and its decomposition lines
    pub fn remove_item(&self, order_id: u64, item_id: u64) -> ManagerResult<OrderSnapshot> {
        let snapshot = self.execute(|txn, notices| {
            let mut snapshot = self.load(txn, order_id)?;
            aggregate::ensure_items_editable(&snapshot.order)?;

            aggregate::remove_line(&mut snapshot, item_id)?;
            recalculate_totals(&mut snapshot);
            snapshot.order.updated_at = shared::util::now_millis();
            self.store.store_snapshot(txn, &snapshot)?;

            notices.push(OrderNotice::ItemChanged {
                order_id,
                change: ItemChange::Removed,
                item_id: Some(item_id),
            });
            Ok(snapshot)
        })?;

        tracing::info!(order_id, item_id, total = %snapshot.order.total, "Item removed");
        Ok(snapshot)
    }

    /// Change a billing line's quantity (combo children rescale with it)
    pub fn change_item_quantity(
        &self,
        order_id: u64,
        item_id: u64,
        quantity: u32,
    ) -> ManagerResult<OrderSnapshot> {
        let (snapshot, previous) = self.execute(|txn, notices| {
            let mut snapshot = self.load(txn, order_id)?;
            aggregate::ensure_items_editable(&snapshot.order)?;

            let previous = aggregate::change_quantity(&mut snapshot, item_id, quantity)?;
            recalculate_totals(&mut snapshot);
            snapshot.order.updated_at = shared::util::now_millis();
            self.store.store_snapshot(txn, &snapshot)?;

            notices.push(OrderNotice::ItemChanged {
                order_id,
                change: ItemChange::QuantityChanged,
                item_id: Some(item_id),
            });
            Ok((snapshot, previous))
        })?;

        tracing::info!(order_id, item_id, previous, quantity, "Item quantity changed");
        Ok(snapshot)
    }

    /// Explicit state transition requested by staff
    pub fn transition(&self, order_id: u64, to: OrderState) -> ManagerResult<OrderSnapshot> {
        let (snapshot, from) = self.execute(|txn, notices| {
            let mut snapshot = self.load(txn, order_id)?;
            let from = snapshot.order.state;
            state_machine::validate_transition(&snapshot.order, to)?;

            let now = shared::util::now_millis();
            self.advance(txn, &mut snapshot, to, now, notices)?;
            self.persist(txn, &snapshot)?;
            Ok((snapshot, from))
        })?;

        tracing::info!(
            order_id,
            from = %from,
            to = %snapshot.order.state,
            "Order state changed"
        );
        Ok(snapshot)
    }

    /// Transition with the target given by name (request layer input)
    pub fn transition_named(&self, order_id: u64, target: &str) -> ManagerResult<OrderSnapshot> {
        let to = state_machine::parse_target(target)?;
        self.transition(order_id, to)
    }

    /// Settle payment: receipt type, tip and tax, then enter `paid`
    pub fn settle_payment(
        &self,
        order_id: u64,
        settlement: Settlement,
    ) -> ManagerResult<OrderSnapshot> {
        validate_tip(settlement.tip)?;

        let snapshot = self.execute(|txn, notices| {
            let mut snapshot = self.load(txn, order_id)?;
            state_machine::validate_transition(&snapshot.order, OrderState::Paid)?;

            let order = &mut snapshot.order;
            order.receipt_type = settlement.receipt_type;
            order.tip = settlement.tip;
            order.tax_exempt = !settlement.apply_tax;
            recalculate_totals(&mut snapshot);

            let now = shared::util::now_millis();
            self.advance(txn, &mut snapshot, OrderState::Paid, now, notices)?;
            self.persist(txn, &snapshot)?;
            Ok(snapshot)
        })?;

        tracing::info!(
            order_id,
            receipt_type = snapshot.order.receipt_type.as_str(),
            tip = %snapshot.order.tip,
            total = %snapshot.order.total,
            state = %snapshot.order.state,
            "Payment settled"
        );
        Ok(snapshot)
    }

    /// Post-payment adjustment of receipt type and tip
    ///
    /// Items stay frozen; rejected once a fiscal document exists.
    pub fn adjust_payment_metadata(
        &self,
        order_id: u64,
        receipt_type: Option<ReceiptType>,
        tip: Option<Decimal>,
    ) -> ManagerResult<OrderSnapshot> {
        if let Some(tip) = tip {
            validate_tip(tip)?;
        }

        let snapshot = self.execute(|txn, notices| {
            let mut snapshot = self.load(txn, order_id)?;
            let order = &mut snapshot.order;
            if order.state == OrderState::Cancelled {
                return Err(Conflict::Inactive { state: order.state }.into());
            }
            if !order.is_paid() {
                return Err(Conflict::NotPaid { state: order.state }.into());
            }
            if order.invoice.is_some() {
                return Err(Conflict::DocumentIssued.into());
            }

            if let Some(receipt_type) = receipt_type {
                order.receipt_type = receipt_type;
            }
            if let Some(tip) = tip {
                order.tip = tip;
            }
            order.updated_at = shared::util::now_millis();
            recalculate_totals(&mut snapshot);
            self.store.store_snapshot(txn, &snapshot)?;

            notices.push(OrderNotice::ItemChanged {
                order_id,
                change: ItemChange::PaymentAdjusted,
                item_id: None,
            });
            Ok(snapshot)
        })?;

        tracing::info!(
            order_id,
            receipt_type = snapshot.order.receipt_type.as_str(),
            tip = %snapshot.order.tip,
            total = %snapshot.order.total,
            "Payment metadata adjusted"
        );
        Ok(snapshot)
    }

    /// Denormalize customer data onto the order for invoicing
    pub fn attach_customer(
        &self,
        order_id: u64,
        customer: CustomerSnapshot,
    ) -> ManagerResult<OrderSnapshot> {
        if customer.name.trim().is_empty() {
            return Err(OrderError::invalid(
                ErrorCode::RequiredField,
                "customer name is required",
            ));
        }

        let snapshot = self.execute(|txn, _notices| {
            let mut snapshot = self.load(txn, order_id)?;
            let order = &mut snapshot.order;
            if order.state == OrderState::Cancelled {
                return Err(Conflict::Inactive { state: order.state }.into());
            }
            if order.invoice.is_some() {
                return Err(Conflict::DocumentIssued.into());
            }
            if order.state == OrderState::Credit && customer.customer_id != order.customer_id {
                return Err(OrderError::validation(
                    "customer of a credit sale cannot change",
                ));
            }
            if let Some(customer_id) = customer.customer_id {
                self.store
                    .get_customer_txn(txn, customer_id)?
                    .ok_or(OrderError::not_found(Entity::Customer, customer_id))?;
                order.customer_id = Some(customer_id);
            }
            order.customer = Some(customer);
            order.updated_at = shared::util::now_millis();
            self.store.store_snapshot(txn, &snapshot)?;
            Ok(snapshot)
        })?;

        tracing::info!(order_id, customer_id = ?snapshot.order.customer_id, "Customer attached");
        Ok(snapshot)
    }

    // ========== Credit ==========

    /// Settle the order against the customer's credit ceiling
    pub fn register_credit_sale(
        &self,
        order_id: u64,
        customer_id: u64,
        amount: Decimal,
    ) -> ManagerResult<OrderSnapshot> {
        let snapshot = self.execute(|txn, notices| {
            let mut snapshot = self.load(txn, order_id)?;
            guard::admit_credit(&self.store, txn, &mut snapshot, customer_id, amount)?;

            let now = shared::util::now_millis();
            enter_with_notice(&mut snapshot.order, OrderState::Credit, now, notices);
            self.persist(txn, &snapshot)?;
            Ok(snapshot)
        })?;

        tracing::info!(
            order_id,
            customer_id,
            amount = %amount,
            "Credit sale registered"
        );
        Ok(snapshot)
    }

    pub fn credit_summary(&self, customer_id: u64) -> ManagerResult<CreditSummary> {
        guard::credit_summary(&self.store, customer_id)
    }

    pub fn stock_movements(&self, stock_item_id: u64) -> ManagerResult<Vec<StockMovement>> {
        self.store
            .get_stock_item(stock_item_id)?
            .ok_or(OrderError::not_found(Entity::StockItem, stock_item_id))?;
        Ok(self.store.movements_for(stock_item_id)?)
    }

    // ========== Documents ==========

    /// Check eligibility for a fiscal document
    pub fn prepare_document(&self, order_id: u64) -> ManagerResult<DocumentPlan> {
        let snapshot = self.get_order(order_id)?;
        let order = &snapshot.order;
        if let Some(link) = &order.invoice {
            return Ok(DocumentPlan::Existing(link.clone()));
        }
        if order.state == OrderState::Cancelled {
            return Err(Conflict::Inactive { state: order.state }.into());
        }
        if !order.is_paid() && order.state != OrderState::Credit {
            return Err(Conflict::NotPaid { state: order.state }.into());
        }
        Ok(DocumentPlan::Issue(snapshot))
    }

    /// Store the document link; the first writer wins
    ///
    /// `prepared` is the order the document was generated from. If its
    /// billed fields changed since, the link is refused with
    /// [`Conflict::DocumentStale`] and nothing is stored.
    ///
    /// Returns the stored link and whether this call stored it.
    pub fn record_document(
        &self,
        order_id: u64,
        prepared: &Order,
        link: InvoiceLink,
    ) -> ManagerResult<(InvoiceLink, bool)> {
        let (stored, created) = self.execute(|txn, notices| {
            let mut snapshot = self.load(txn, order_id)?;
            if let Some(existing) = snapshot.order.invoice.clone() {
                return Ok((existing, false));
            }
            if !same_document_basis(&snapshot.order, prepared) {
                tracing::warn!(
                    order_id,
                    prepared_total = %prepared.total,
                    total = %snapshot.order.total,
                    "Order changed during document generation, link refused"
                );
                return Err(Conflict::DocumentStale.into());
            }
            snapshot.order.invoice = Some(link.clone());
            snapshot.order.updated_at = shared::util::now_millis();
            self.store.store_snapshot(txn, &snapshot)?;

            notices.push(OrderNotice::ItemChanged {
                order_id,
                change: ItemChange::DocumentIssued,
                item_id: None,
            });
            Ok((link, true))
        })?;

        if created {
            tracing::info!(
                order_id,
                document_id = %stored.document_id,
                sequence_number = stored.sequence_number,
                "Document recorded"
            );
        } else {
            tracing::warn!(order_id, document_id = %stored.document_id, "Document already recorded, keeping first");
        }
        Ok((stored, created))
    }

    // ========== Queries ==========

    pub fn get_order(&self, order_id: u64) -> ManagerResult<OrderSnapshot> {
        self.store
            .load_snapshot(order_id)?
            .ok_or(OrderError::not_found(Entity::Order, order_id))
    }

    pub fn list_orders(&self, states: Option<&[OrderState]>) -> ManagerResult<Vec<OrderSnapshot>> {
        queries::list_orders(&self.store, states)
    }

    pub fn kitchen_queue(&self) -> ManagerResult<Vec<OrderSnapshot>> {
        queries::kitchen_queue(&self.store)
    }

    pub fn cashier_queue(&self) -> ManagerResult<Vec<OrderSnapshot>> {
        queries::cashier_queue(&self.store)
    }

    pub fn ready_for_service(&self) -> ManagerResult<Vec<OrderSnapshot>> {
        queries::ready_for_service(&self.store)
    }

    pub fn tax_breakdown(&self, order_id: u64) -> ManagerResult<TaxBreakdown> {
        queries::tax_breakdown(&self.store, order_id)
    }

    pub fn list_tables(&self) -> ManagerResult<Vec<DiningTable>> {
        Ok(self.store.list_tables()?)
    }

    pub fn get_table(&self, table_id: u64) -> ManagerResult<DiningTable> {
        self.store
            .get_table(table_id)?
            .ok_or(OrderError::not_found(Entity::Table, table_id))
    }
}

/// Everything a generated document prints from the order header
fn same_document_basis(current: &Order, prepared: &Order) -> bool {
    current.receipt_type == prepared.receipt_type
        && current.tax_exempt == prepared.tax_exempt
        && current.subtotal == prepared.subtotal
        && current.tax == prepared.tax
        && current.tip == prepared.tip
        && current.total == prepared.total
        && current.customer == prepared.customer
}

fn enter_with_notice(
    order: &mut Order,
    to: OrderState,
    now: i64,
    notices: &mut Vec<OrderNotice>,
) {
    let from = order.state;
    state_machine::enter(order, to, now);
    notices.push(OrderNotice::StateChanged {
        order_id: order.id,
        table_id: order.table_id,
        from,
        to,
    });
    if to == OrderState::Ready {
        notices.push(OrderNotice::OrderReady {
            order_id: order.id,
            table_id: order.table_id,
        });
    }
}

#[cfg(test)]
mod tests;
