use std::path::PathBuf;
use std::sync::Arc;

use crate::catalog::Catalog;
use crate::core::Config;
use crate::documents::{DocumentService, LocalTicketGenerator};
use crate::ledger::LedgerStore;
use crate::notify::{HubHandle, spawn_hub};
use crate::orders::OrderService;

/// 引擎状态 - 持有所有服务的共享引用
///
/// | 字段 | 类型 | 说明 |
/// |------|------|------|
/// | config | Config | 引擎配置 |
/// | store | LedgerStore | redb 账本 (订单/目录/库存/顾客) |
/// | hub | HubHandle | 通知中心 (推送 + 轮询) |
/// | orders | OrderService | 订单生命周期 |
/// | catalog | Catalog | 商品/套餐/库存/顾客/餐桌 |
/// | documents | DocumentService | 票据/发票开具 |
///
/// 克隆成本低：所有服务内部都是 `Arc` 或句柄
#[derive(Clone, Debug)]
pub struct ServerState {
    pub config: Config,
    pub store: LedgerStore,
    pub hub: HubHandle,
    pub orders: OrderService,
    pub catalog: Catalog,
    pub documents: DocumentService,
}

impl ServerState {
    /// 初始化引擎状态
    ///
    /// 1. 创建工作目录
    /// 2. 打开账本
    /// 3. 启动通知中心 (需要 tokio runtime)
    /// 4. 组装服务
    pub fn initialize(config: &Config) -> anyhow::Result<Self> {
        let work_dir = PathBuf::from(&config.work_dir);
        std::fs::create_dir_all(&work_dir)?;

        let ledger_path = config.ledger_path();
        let store = LedgerStore::open(&ledger_path)?;
        tracing::info!(path = %ledger_path.display(), "Ledger opened");

        let hub = spawn_hub(config.hub_config());
        let orders = OrderService::new(
            store.clone(),
            Arc::new(hub.clone()),
            config.service_settings(),
        );
        let catalog = Catalog::new(store.clone());
        let documents = DocumentService::new(
            orders.clone(),
            Arc::new(LocalTicketGenerator),
            config.document_settings(),
        );

        Ok(Self {
            config: config.clone(),
            store,
            hub,
            orders,
            catalog,
            documents,
        })
    }

    /// 停止通知中心
    pub fn shutdown(&self) {
        if let Err(e) = self.hub.shutdown() {
            tracing::warn!("Hub shutdown: {}", e);
        }
    }
}
