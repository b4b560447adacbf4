//! Shared types for the order engine
//!
//! Wire and domain types used by the engine and by whatever request layer
//! embeds it: catalog models, the order aggregate snapshot, the notification
//! wire shape and the unified error code system.

pub mod error;
pub mod message;
pub mod models;
pub mod order;
pub mod util;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use error::{ApiResponse, AppError, AppResult, ErrorCategory, ErrorCode};
pub use message::{NotificationEvent, OrderNotice, PollChannel, PollResponse, Role, Room};
pub use order::{OrderSnapshot, OrderState, PaymentMode};
