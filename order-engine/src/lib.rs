//! Order Engine - 餐厅订单生命周期与实时出单引擎
//!
//! # 架构概述
//!
//! - **订单** (`orders`): 状态机、套餐拆分、金额与 IVA、库存/信用守卫
//! - **账本** (`ledger`): 嵌入式 redb 存储，单写事务
//! - **目录** (`catalog`): 商品、套餐、库存项、顾客、餐桌
//! - **通知** (`notify`): 按角色推送 + 轮询窗口
//! - **票据** (`documents`): 付款后开具票据/发票
//!
//! # 模块结构
//!
//! ```text
//! order-engine/src/
//! ├── core/          # 配置、状态
//! ├── ledger/        # redb 账本
//! ├── catalog/       # 目录维护
//! ├── orders/        # 订单命令与查询
//! ├── notify/        # 通知中心
//! ├── documents/     # 票据边界
//! └── utils/         # 日志
//! ```

pub mod catalog;
pub mod core;
pub mod documents;
pub mod ledger;
pub mod notify;
pub mod orders;
pub mod utils;

// Re-export 公共类型
pub use catalog::{Catalog, CatalogError};
pub use core::{Config, ServerState};
pub use documents::{DocumentGenerator, DocumentService, LocalTicketGenerator};
pub use ledger::LedgerStore;
pub use notify::{EventSink, HubHandle, MemorySink, spawn_hub};
pub use orders::{OrderError, OrderService, ServiceSettings};
pub use utils::{AppError, AppResult, ErrorCode};

// Re-export logger functions
pub use utils::logger::{init_logger, init_logger_with_file};

/// 设置运行环境: 加载 .env、初始化日志
pub fn setup_environment(config: &Config) {
    if let Some(dir) = &config.log_dir
        && let Err(e) = std::fs::create_dir_all(dir)
    {
        eprintln!("Failed to create log dir {}: {}", dir, e);
    }
    init_logger_with_file(
        Some(&config.log_level),
        Some(config.log_json),
        config.log_dir.as_deref(),
    );
}
