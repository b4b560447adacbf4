//! 工具模块 - 日志等通用工具
//!
//! 错误类型来自 `shared::error`

pub mod logger;

pub use shared::error::{AppError, AppResult, ErrorCategory, ErrorCode};
