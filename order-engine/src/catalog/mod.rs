//! Catalog boundary
//!
//! Minimal registration of the catalog facts the order core reads:
//! products, combos, stock items, customers and dining tables. Menu
//! management proper lives outside this crate.

use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::models::{
    Combo, ComboComponent, ComboCreate, ComboUpdate, Customer, CustomerCreate, DiningTable,
    DiningTableCreate, Product, ProductCreate, ProductUpdate, StockItem, StockItemCreate,
    StockMovement, TableState,
};
use thiserror::Error;

use crate::ledger::{LedgerStore, StorageError, seq};
use crate::orders::error::Entity;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("{message}")]
    Validation { code: ErrorCode, message: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: u64 },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),
}

impl CatalogError {
    fn invalid(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Validation {
            code,
            message: message.into(),
        }
    }

    fn combo(message: impl Into<String>) -> Self {
        Self::invalid(ErrorCode::ComboInvalid, message)
    }
}

impl From<CatalogError> for AppError {
    fn from(err: CatalogError) -> Self {
        match err {
            CatalogError::Validation { code, message } => AppError::with_message(code, message),
            CatalogError::NotFound { entity, id } => {
                let code = match entity {
                    Entity::Product => ErrorCode::ProductNotFound,
                    Entity::Combo => ErrorCode::ComboNotFound,
                    Entity::StockItem => ErrorCode::StockItemNotFound,
                    Entity::Customer => ErrorCode::CustomerNotFound,
                    Entity::Table => ErrorCode::TableNotFound,
                    Entity::Order => ErrorCode::OrderNotFound,
                    Entity::OrderItem => ErrorCode::OrderItemNotFound,
                };
                AppError::with_message(code, format!("{} {} not found", entity, id))
                    .with_detail("id", id)
            }
            CatalogError::Storage(e) => {
                tracing::error!(error = %e, "Catalog storage error");
                AppError::database(e.to_string())
            }
        }
    }
}

pub type CatalogResult<T> = Result<T, CatalogError>;

fn require_name(name: &str, what: &str) -> CatalogResult<()> {
    if name.trim().is_empty() {
        return Err(CatalogError::invalid(
            ErrorCode::RequiredField,
            format!("{} name is required", what),
        ));
    }
    Ok(())
}

/// Catalog registration over the ledger
#[derive(Debug, Clone)]
pub struct Catalog {
    store: LedgerStore,
}

impl Catalog {
    pub fn new(store: LedgerStore) -> Self {
        Self { store }
    }

    // ========== Products ==========

    pub fn create_product(&self, data: ProductCreate) -> CatalogResult<Product> {
        require_name(&data.name, "product")?;
        if data.price < Decimal::ZERO {
            return Err(CatalogError::invalid(
                ErrorCode::ProductInvalidPrice,
                format!("price must be non-negative, got {}", data.price),
            ));
        }

        let txn = self.store.begin_write()?;
        if let Some(stock_item_id) = data.stock_item_id {
            self.store
                .get_stock_item_txn(&txn, stock_item_id)?
                .ok_or(CatalogError::NotFound {
                    entity: Entity::StockItem,
                    id: stock_item_id,
                })?;
        }
        let product = Product {
            id: self.store.next_id(&txn, seq::PRODUCT)?,
            name: data.name,
            price: data.price,
            available: true,
            stock_item_id: data.stock_item_id,
        };
        self.store.put_product(&txn, &product)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(product_id = product.id, name = %product.name, price = %product.price, "Product created");
        Ok(product)
    }

    /// Price changes never touch existing order lines (prices are snapshotted)
    pub fn update_product(&self, id: u64, data: ProductUpdate) -> CatalogResult<Product> {
        let txn = self.store.begin_write()?;
        let mut product = self
            .store
            .get_product_txn(&txn, id)?
            .ok_or(CatalogError::NotFound {
                entity: Entity::Product,
                id,
            })?;

        if let Some(name) = data.name {
            require_name(&name, "product")?;
            product.name = name;
        }
        if let Some(price) = data.price {
            if price < Decimal::ZERO {
                return Err(CatalogError::invalid(
                    ErrorCode::ProductInvalidPrice,
                    format!("price must be non-negative, got {}", price),
                ));
            }
            product.price = price;
        }
        if let Some(available) = data.available {
            product.available = available;
        }
        if let Some(stock_item_id) = data.stock_item_id {
            if let Some(sid) = stock_item_id {
                self.store
                    .get_stock_item_txn(&txn, sid)?
                    .ok_or(CatalogError::NotFound {
                        entity: Entity::StockItem,
                        id: sid,
                    })?;
            }
            product.stock_item_id = stock_item_id;
        }
        self.store.put_product(&txn, &product)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(product_id = id, "Product updated");
        Ok(product)
    }

    pub fn get_product(&self, id: u64) -> CatalogResult<Product> {
        self.store.get_product(id)?.ok_or(CatalogError::NotFound {
            entity: Entity::Product,
            id,
        })
    }

    pub fn list_products(&self) -> CatalogResult<Vec<Product>> {
        Ok(self.store.list_products()?)
    }

    // ========== Combos ==========

    /// 校验组合: 至少两个组件，组件商品存在且可售，价格不高于组件总价
    fn validate_combo(
        &self,
        txn: &redb::WriteTransaction,
        price: Decimal,
        components: &[ComboComponent],
    ) -> CatalogResult<()> {
        if components.len() < 2 {
            return Err(CatalogError::combo(format!(
                "combo needs at least two components, got {}",
                components.len()
            )));
        }
        if price <= Decimal::ZERO {
            return Err(CatalogError::combo(format!(
                "combo price must be positive, got {}",
                price
            )));
        }

        let mut sum = Decimal::ZERO;
        for component in components {
            if component.quantity == 0 {
                return Err(CatalogError::combo(format!(
                    "component {} has zero quantity",
                    component.product_id
                )));
            }
            let product = self
                .store
                .get_product_txn(txn, component.product_id)?
                .ok_or(CatalogError::NotFound {
                    entity: Entity::Product,
                    id: component.product_id,
                })?;
            if !product.available {
                return Err(CatalogError::combo(format!(
                    "component product {} is not available",
                    product.id
                )));
            }
            sum += product.price * Decimal::from(component.quantity);
        }

        if price > sum {
            return Err(CatalogError::combo(format!(
                "combo price {} exceeds component total {}",
                price, sum
            )));
        }
        Ok(())
    }

    pub fn create_combo(&self, data: ComboCreate) -> CatalogResult<Combo> {
        require_name(&data.name, "combo")?;

        let txn = self.store.begin_write()?;
        self.validate_combo(&txn, data.price, &data.components)?;
        let combo = Combo {
            id: self.store.next_id(&txn, seq::COMBO)?,
            name: data.name,
            price: data.price,
            active: true,
            components: data.components,
        };
        self.store.put_combo(&txn, &combo)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(combo_id = combo.id, name = %combo.name, price = %combo.price, "Combo created");
        Ok(combo)
    }

    pub fn update_combo(&self, id: u64, data: ComboUpdate) -> CatalogResult<Combo> {
        let txn = self.store.begin_write()?;
        let mut combo = self
            .store
            .get_combo_txn(&txn, id)?
            .ok_or(CatalogError::NotFound {
                entity: Entity::Combo,
                id,
            })?;

        if let Some(name) = data.name {
            require_name(&name, "combo")?;
            combo.name = name;
        }
        if let Some(price) = data.price {
            combo.price = price;
        }
        if let Some(components) = data.components {
            combo.components = components;
        }
        self.validate_combo(&txn, combo.price, &combo.components)?;
        self.store.put_combo(&txn, &combo)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(combo_id = id, "Combo updated");
        Ok(combo)
    }

    /// Deactivated combos stay readable for existing orders
    pub fn deactivate_combo(&self, id: u64) -> CatalogResult<Combo> {
        let txn = self.store.begin_write()?;
        let mut combo = self
            .store
            .get_combo_txn(&txn, id)?
            .ok_or(CatalogError::NotFound {
                entity: Entity::Combo,
                id,
            })?;
        combo.active = false;
        self.store.put_combo(&txn, &combo)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(combo_id = id, "Combo deactivated");
        Ok(combo)
    }

    pub fn get_combo(&self, id: u64) -> CatalogResult<Combo> {
        self.store.get_combo(id)?.ok_or(CatalogError::NotFound {
            entity: Entity::Combo,
            id,
        })
    }

    pub fn list_combos(&self) -> CatalogResult<Vec<Combo>> {
        Ok(self.store.list_combos()?)
    }

    // ========== Stock ==========

    pub fn create_stock_item(&self, data: StockItemCreate) -> CatalogResult<StockItem> {
        require_name(&data.name, "stock item")?;
        if data.min_level < Decimal::ZERO {
            return Err(CatalogError::invalid(
                ErrorCode::ValueOutOfRange,
                format!("minimum level must be non-negative, got {}", data.min_level),
            ));
        }

        let txn = self.store.begin_write()?;
        let item = StockItem {
            id: self.store.next_id(&txn, seq::STOCK_ITEM)?,
            name: data.name,
            unit: data.unit,
            level: data.level,
            min_level: data.min_level,
        };
        self.store.put_stock_item(&txn, &item)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(stock_item_id = item.id, level = %item.level, "Stock item created");
        Ok(item)
    }

    /// Manual stock correction (purchase, waste, count), recorded as a movement
    pub fn adjust_stock(&self, stock_item_id: u64, delta: Decimal) -> CatalogResult<StockMovement> {
        if delta.is_zero() {
            return Err(CatalogError::invalid(
                ErrorCode::ValueOutOfRange,
                "stock adjustment must be non-zero",
            ));
        }

        let txn = self.store.begin_write()?;
        let mut item = self
            .store
            .get_stock_item_txn(&txn, stock_item_id)?
            .ok_or(CatalogError::NotFound {
                entity: Entity::StockItem,
                id: stock_item_id,
            })?;
        let movement = StockMovement {
            id: self.store.next_id(&txn, seq::STOCK_MOVEMENT)?,
            stock_item_id,
            delta,
            previous_level: item.level,
            new_level: item.level + delta,
            reference_order_id: None,
            timestamp: shared::util::now_millis(),
        };
        item.level = movement.new_level;
        self.store.put_stock_item(&txn, &item)?;
        self.store.append_movement(&txn, &movement)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(stock_item_id, delta = %delta, level = %item.level, "Stock adjusted");
        Ok(movement)
    }

    pub fn get_stock_item(&self, id: u64) -> CatalogResult<StockItem> {
        self.store.get_stock_item(id)?.ok_or(CatalogError::NotFound {
            entity: Entity::StockItem,
            id,
        })
    }

    // ========== Customers ==========

    pub fn create_customer(&self, data: CustomerCreate) -> CatalogResult<Customer> {
        require_name(&data.name, "customer")?;
        if data.credit_limit < Decimal::ZERO {
            return Err(CatalogError::invalid(
                ErrorCode::ValueOutOfRange,
                format!("credit limit must be non-negative, got {}", data.credit_limit),
            ));
        }

        let txn = self.store.begin_write()?;
        let customer = Customer {
            id: self.store.next_id(&txn, seq::CUSTOMER)?,
            name: data.name,
            document_type: data.document_type,
            document_number: data.document_number,
            nrc: data.nrc,
            address: data.address,
            phone: data.phone,
            email: data.email,
            credit_limit: data.credit_limit,
            active: true,
        };
        self.store.put_customer(&txn, &customer)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(customer_id = customer.id, credit_limit = %customer.credit_limit, "Customer created");
        Ok(customer)
    }

    pub fn set_customer_active(&self, id: u64, active: bool) -> CatalogResult<Customer> {
        let txn = self.store.begin_write()?;
        let mut customer = self
            .store
            .get_customer_txn(&txn, id)?
            .ok_or(CatalogError::NotFound {
                entity: Entity::Customer,
                id,
            })?;
        customer.active = active;
        self.store.put_customer(&txn, &customer)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(customer_id = id, active, "Customer status changed");
        Ok(customer)
    }

    pub fn get_customer(&self, id: u64) -> CatalogResult<Customer> {
        self.store.get_customer(id)?.ok_or(CatalogError::NotFound {
            entity: Entity::Customer,
            id,
        })
    }

    // ========== Tables ==========

    pub fn create_table(&self, data: DiningTableCreate) -> CatalogResult<DiningTable> {
        require_name(&data.name, "table")?;
        if data.capacity == 0 {
            return Err(CatalogError::invalid(
                ErrorCode::ValueOutOfRange,
                "table capacity must be positive",
            ));
        }

        let txn = self.store.begin_write()?;
        let table = DiningTable {
            id: self.store.next_id(&txn, seq::TABLE)?,
            name: data.name,
            capacity: data.capacity,
            state: TableState::Free,
        };
        self.store.put_table(&txn, &table)?;
        txn.commit().map_err(StorageError::from)?;

        tracing::info!(table_id = table.id, capacity = table.capacity, "Table created");
        Ok(table)
    }
}
