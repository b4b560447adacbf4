//! Ledger Store
//!
//! Durable storage for orders, items, tables, catalog facts, stock and
//! customers. Every other component reads and writes through it.

pub mod storage;

pub use storage::{LedgerStore, StorageError, StorageResult, seq};
