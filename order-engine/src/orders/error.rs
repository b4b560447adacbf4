//! Order service errors
//!
//! Every failure of an order operation is one of these variants; the request
//! layer receives them converted into [`AppError`] with a stable code.

use rust_decimal::Decimal;
use shared::error::{AppError, ErrorCode};
use shared::order::OrderState;
use std::fmt;
use thiserror::Error;

use crate::documents::DocumentError;
use crate::ledger::StorageError;

/// Entity kinds referenced by not-found and availability errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entity {
    Order,
    OrderItem,
    Table,
    Customer,
    Product,
    Combo,
    StockItem,
}

impl Entity {
    fn not_found_code(&self) -> ErrorCode {
        match self {
            Entity::Order => ErrorCode::OrderNotFound,
            Entity::OrderItem => ErrorCode::OrderItemNotFound,
            Entity::Table => ErrorCode::TableNotFound,
            Entity::Customer => ErrorCode::CustomerNotFound,
            Entity::Product => ErrorCode::ProductNotFound,
            Entity::Combo => ErrorCode::ComboNotFound,
            Entity::StockItem => ErrorCode::StockItemNotFound,
        }
    }
}

impl fmt::Display for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Entity::Order => "Order",
            Entity::OrderItem => "Order item",
            Entity::Table => "Table",
            Entity::Customer => "Customer",
            Entity::Product => "Product",
            Entity::Combo => "Combo",
            Entity::StockItem => "Stock item",
        };
        f.write_str(s)
    }
}

/// Why an operation is not permitted in the order's current state
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Conflict {
    #[error("transition {from} -> {to} is not permitted")]
    Transition { from: OrderState, to: OrderState },

    #[error("items are frozen in state {state}")]
    ItemsFrozen { state: OrderState },

    #[error("item {item_id} is a combo decomposition line and follows its billing line")]
    DecompositionLine { item_id: u64 },

    #[error("order is already paid")]
    AlreadyPaid,

    #[error("order is not paid yet (state {state})")]
    NotPaid { state: OrderState },

    #[error("order is {state}")]
    Inactive { state: OrderState },

    #[error("a fiscal document was already issued")]
    DocumentIssued,

    #[error("order changed while its document was being generated")]
    DocumentStale,

    #[error("{entity} {id} is not available")]
    Unavailable { entity: Entity, id: u64 },
}

impl Conflict {
    fn code(&self) -> ErrorCode {
        match self {
            Conflict::Transition { .. } => ErrorCode::InvalidTransition,
            Conflict::ItemsFrozen { .. } | Conflict::DecompositionLine { .. } => {
                ErrorCode::OrderItemsFrozen
            }
            Conflict::AlreadyPaid => ErrorCode::OrderAlreadyPaid,
            Conflict::NotPaid { .. } => ErrorCode::InvalidTransition,
            Conflict::Inactive { state } => match state {
                OrderState::Cancelled => ErrorCode::OrderAlreadyCancelled,
                OrderState::Closed => ErrorCode::OrderAlreadyClosed,
                _ => ErrorCode::InvalidTransition,
            },
            Conflict::DocumentIssued => ErrorCode::DocumentAlreadyIssued,
            // 重新开票即可
            Conflict::DocumentStale => ErrorCode::ConcurrencyConflict,
            Conflict::Unavailable { .. } => ErrorCode::ProductUnavailable,
        }
    }
}

/// Order service errors
#[derive(Debug, Error)]
pub enum OrderError {
    #[error("{message}")]
    Validation { code: ErrorCode, message: String },

    #[error("{entity} {id} not found")]
    NotFound { entity: Entity, id: u64 },

    #[error("{0}")]
    StateConflict(#[from] Conflict),

    #[error("insufficient stock for item {stock_item_id}: available {available}, requested {requested}")]
    InsufficientStock {
        stock_item_id: u64,
        available: Decimal,
        requested: Decimal,
    },

    #[error("insufficient credit for customer {customer_id}: available {available}, requested {requested}")]
    InsufficientCredit {
        customer_id: u64,
        available: Decimal,
        requested: Decimal,
    },

    #[error("concurrent update: {0}")]
    Concurrency(String),

    #[error("document generation failed: {0}")]
    UpstreamDocument(#[from] DocumentError),

    #[error("storage error: {0}")]
    Storage(StorageError),
}

impl OrderError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            code: ErrorCode::ValidationFailed,
            message: message.into(),
        }
    }

    pub fn invalid(code: ErrorCode, message: impl Into<String>) -> Self {
        Self::Validation {
            code,
            message: message.into(),
        }
    }

    pub fn not_found(entity: Entity, id: u64) -> Self {
        Self::NotFound { entity, id }
    }

    /// Stable error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            OrderError::Validation { code, .. } => *code,
            OrderError::NotFound { entity, .. } => entity.not_found_code(),
            OrderError::StateConflict(conflict) => conflict.code(),
            OrderError::InsufficientStock { .. } => ErrorCode::ProductOutOfStock,
            OrderError::InsufficientCredit { .. } => ErrorCode::InsufficientCredit,
            OrderError::Concurrency(_) => ErrorCode::ConcurrencyConflict,
            OrderError::UpstreamDocument(_) => ErrorCode::DocumentGenerationFailed,
            OrderError::Storage(e) => classify_storage_error(e),
        }
    }
}

impl From<StorageError> for OrderError {
    fn from(err: StorageError) -> Self {
        if err.is_contention() {
            OrderError::Concurrency(err.to_string())
        } else {
            OrderError::Storage(err)
        }
    }
}

pub type OrderResult<T> = Result<T, OrderError>;

/// 将存储错误转换为错误码
fn classify_storage_error(e: &StorageError) -> ErrorCode {
    if let StorageError::Serialization(_) = e {
        return ErrorCode::InternalError;
    }

    // redb 错误通过字符串匹配分类
    let err_str = e.to_string().to_lowercase();

    // 磁盘空间不足
    if err_str.contains("no space") || err_str.contains("disk full") || err_str.contains("enospc")
    {
        return ErrorCode::StorageFull;
    }

    // 数据损坏
    if err_str.contains("corrupt") || err_str.contains("invalid database") {
        return ErrorCode::StorageCorrupted;
    }

    // 默认：系统繁忙
    ErrorCode::SystemBusy
}

impl From<OrderError> for AppError {
    fn from(err: OrderError) -> Self {
        let code = err.code();
        let message = err.to_string();
        match err {
            OrderError::Validation { .. } => AppError::with_message(code, message),
            OrderError::NotFound { entity, id } => AppError::with_message(code, message)
                .with_detail("entity", entity.to_string())
                .with_detail("id", id),
            OrderError::StateConflict(conflict) => {
                let err = AppError::with_message(code, message);
                match conflict {
                    Conflict::Transition { from, to } => err
                        .with_detail("from", from.as_str())
                        .with_detail("to", to.as_str()),
                    Conflict::ItemsFrozen { state }
                    | Conflict::NotPaid { state }
                    | Conflict::Inactive { state } => err.with_detail("state", state.as_str()),
                    Conflict::DecompositionLine { item_id } => err.with_detail("item_id", item_id),
                    Conflict::Unavailable { id, .. } => err.with_detail("id", id),
                    Conflict::AlreadyPaid | Conflict::DocumentIssued | Conflict::DocumentStale => err,
                }
            }
            OrderError::InsufficientStock {
                stock_item_id,
                available,
                requested,
            } => AppError::with_message(code, message)
                .with_detail("stock_item_id", stock_item_id)
                .with_detail("available", available.to_string())
                .with_detail("requested", requested.to_string()),
            OrderError::InsufficientCredit {
                customer_id,
                available,
                requested,
            } => AppError::with_message(code, message)
                .with_detail("customer_id", customer_id)
                .with_detail("available", available.to_string())
                .with_detail("requested", requested.to_string()),
            OrderError::Concurrency(_) => AppError::with_message(code, message),
            OrderError::UpstreamDocument(_) => {
                tracing::error!(error = %message, "Document generation failed");
                AppError::with_message(code, message)
            }
            OrderError::Storage(e) => {
                tracing::error!(error = %e, error_code = ?code, "Storage error occurred");
                AppError::with_message(code, message)
            }
        }
    }
}
