//! Order Lifecycle Module
//!
//! - **aggregate**: line item mutations (combo expansion, exact rescale)
//! - **money**: totals and IVA recomputation
//! - **state_machine**: transition policy and lifecycle timestamps
//! - **guard**: exactly-once stock decrement, serialized credit admission
//! - **tables**: table occupancy derived from active orders
//! - **queries**: role queues and tax breakdown
//! - **manager**: `OrderService`, the facade running every command
//!
//! # Data Flow
//!
//! ```text
//! request → OrderService → aggregate / state_machine
//!                 ↓
//!          guard (stock, credit) → ledger (redb txn) → tables::rederive
//!                 ↓ commit
//!          EventSink (notification hub)
//! ```

pub mod aggregate;
pub mod error;
pub mod guard;
pub mod manager;
pub mod money;
pub mod queries;
pub mod state_machine;
pub mod tables;

// Re-exports
pub use error::{Conflict, Entity, OrderError, OrderResult};
pub use manager::{DocumentPlan, OrderService, ServiceSettings};
