//! 核心模块 - 引擎配置和状态
//!
//! - [`Config`] - 环境变量配置
//! - [`ServerState`] - 服务组装

pub mod config;
pub mod state;

pub use config::Config;
pub use state::ServerState;
