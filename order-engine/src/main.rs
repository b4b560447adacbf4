use order_engine::{Config, ServerState, setup_environment};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 加载 .env (可选)
    dotenv::dotenv().ok();

    // 2. 加载配置并初始化日志
    let config = Config::from_env();
    setup_environment(&config);

    tracing::info!(
        environment = %config.environment,
        work_dir = %config.work_dir,
        "Order engine starting..."
    );

    // 3. 初始化引擎状态
    let state = ServerState::initialize(&config)?;

    let tables = state.orders.list_tables()?.len();
    let active = state.orders.list_orders(None)?.len();
    tracing::info!(tables, active_orders = active, "Order engine ready");

    // 4. 等待退出信号
    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received");
    state.shutdown();

    Ok(())
}
