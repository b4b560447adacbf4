//! Errors returned by [`super::OrderService`]
//!
//! The service speaks the order error taxonomy directly; request layers
//! convert into `shared::error::AppError`.

pub use crate::orders::error::{Conflict, Entity, OrderError};

pub type ManagerResult<T> = Result<T, OrderError>;
