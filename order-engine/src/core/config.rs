use std::path::PathBuf;
use std::time::Duration;

use crate::documents::DocumentSettings;
use crate::notify::HubConfig;
use crate::orders::ServiceSettings;

/// 订单引擎配置
///
/// # 环境变量
///
/// 所有配置项都可以通过环境变量覆盖：
///
/// | 环境变量 | 默认值 | 说明 |
/// |----------|--------|------|
/// | WORK_DIR | ./data | 工作目录 (账本文件) |
/// | LEDGER_FILE | orders.redb | 账本数据库文件名 |
/// | ENVIRONMENT | development | 运行环境 |
/// | LOG_LEVEL | info | 日志级别 |
/// | LOG_JSON | false | JSON 格式日志 |
/// | LOG_DIR | (未设置) | 按天滚动的日志目录 |
/// | POLL_WINDOW_SECS | 300 | 轮询可见窗口(秒) |
/// | RING_CAPACITY | 100 | 每个轮询频道的缓冲容量 |
/// | PUSH_BUFFER | 256 | 每个连接的推送缓冲 |
/// | ALLOW_NEGATIVE_STOCK | false | 允许库存为负 |
/// | DOCUMENT_TIMEOUT_MS | 10000 | 单次开票超时(毫秒) |
/// | DOCUMENT_MAX_RETRIES | 3 | 开票最多尝试次数 |
/// | DOCUMENT_RETRY_BACKOFF_MS | 500 | 重试线性退避(毫秒) |
///
/// # 示例
///
/// ```ignore
/// WORK_DIR=/data/orders LOG_LEVEL=debug cargo run
/// ```
#[derive(Debug, Clone)]
pub struct Config {
    /// 工作目录
    pub work_dir: String,
    /// 账本文件名 (位于 work_dir 下)
    pub ledger_file: String,
    /// 运行环境: development | production
    pub environment: String,
    pub log_level: String,
    pub log_json: bool,
    pub log_dir: Option<String>,
    pub poll_window_secs: u64,
    pub ring_capacity: usize,
    pub push_buffer: usize,
    pub allow_negative_stock: bool,
    pub document_timeout_ms: u64,
    pub document_max_retries: u32,
    pub document_retry_backoff_ms: u64,
}

fn env_or<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// 从环境变量加载配置
    ///
    /// 如果环境变量未设置或无法解析，使用默认值
    pub fn from_env() -> Self {
        Self {
            work_dir: std::env::var("WORK_DIR").unwrap_or_else(|_| "./data".into()),
            ledger_file: std::env::var("LEDGER_FILE").unwrap_or_else(|_| "orders.redb".into()),
            environment: std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".into()),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".into()),
            log_json: env_or("LOG_JSON", false),
            log_dir: std::env::var("LOG_DIR").ok().filter(|d| !d.is_empty()),
            poll_window_secs: env_or("POLL_WINDOW_SECS", 300),
            ring_capacity: env_or("RING_CAPACITY", 100),
            push_buffer: env_or("PUSH_BUFFER", 256),
            allow_negative_stock: env_or("ALLOW_NEGATIVE_STOCK", false),
            document_timeout_ms: env_or("DOCUMENT_TIMEOUT_MS", 10_000),
            document_max_retries: env_or("DOCUMENT_MAX_RETRIES", 3),
            document_retry_backoff_ms: env_or("DOCUMENT_RETRY_BACKOFF_MS", 500),
        }
    }

    /// 使用自定义工作目录
    ///
    /// 常用于测试场景
    pub fn with_work_dir(work_dir: impl Into<String>) -> Self {
        let mut config = Self::from_env();
        config.work_dir = work_dir.into();
        config
    }

    /// 账本文件完整路径
    pub fn ledger_path(&self) -> PathBuf {
        PathBuf::from(&self.work_dir).join(&self.ledger_file)
    }

    /// 是否生产环境
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn hub_config(&self) -> HubConfig {
        HubConfig {
            ring_capacity: self.ring_capacity,
            poll_window: Duration::from_secs(self.poll_window_secs),
            push_buffer: self.push_buffer,
        }
    }

    pub fn service_settings(&self) -> ServiceSettings {
        ServiceSettings {
            allow_negative_stock: self.allow_negative_stock,
        }
    }

    pub fn document_settings(&self) -> DocumentSettings {
        DocumentSettings {
            timeout: Duration::from_millis(self.document_timeout_ms),
            max_retries: self.document_max_retries,
            retry_backoff: Duration::from_millis(self.document_retry_backoff_ms),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::from_env()
    }
}
