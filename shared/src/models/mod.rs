//! Catalog models
//!
//! Shared between the order engine and its request layer.
//! All IDs are `u64`, allocated by the ledger sequences.

pub mod customer;
pub mod dining_table;
pub mod product;
pub mod stock;

// Re-exports
pub use customer::*;
pub use dining_table::*;
pub use product::*;
pub use stock::*;
