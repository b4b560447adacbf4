//! Order aggregate types
//!
//! - [`OrderState`]: lifecycle states
//! - [`Order`] / [`OrderItem`]: persisted rows
//! - [`OrderSnapshot`]: one order plus its items, as returned by every command
//! - Command inputs ([`CreateOrder`], [`ItemInput`], [`Settlement`])

pub mod snapshot;
pub mod state;
pub mod types;

// Re-exports
pub use snapshot::{OrderSnapshot, TaxBreakdown, TaxLine, TaxSummary};
pub use state::{OrderState, UnknownOrderState};
pub use types::*;
