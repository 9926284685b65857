use std::sync::Arc;

use anyhow::Context;
use dine_server::{Config, MessageBus, ServerState, init_logger_with_file};
use tokio::sync::broadcast::error::RecvError;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. 环境变量 (.env 可选)
    dotenv::dotenv().ok();

    // 2. 加载配置
    let config = Config::from_env();
    std::fs::create_dir_all(config.log_dir())
        .with_context(|| format!("failed to create {}", config.log_dir().display()))?;

    // 3. 日志
    let log_dir = config.log_dir();
    init_logger_with_file(
        Some(&config.log_level),
        Some(config.is_production()),
        log_dir.to_str(),
    );
    tracing::info!(
        restaurant_id = %config.restaurant_id,
        timezone = %config.timezone,
        environment = %config.environment,
        "dine-server starting"
    );
    if !config.vnpay.is_configured() {
        tracing::warn!("VNPay is not configured, online payments are disabled");
    }

    // 4. 事件总线 + 服务状态
    let bus = MessageBus::new();
    let state = ServerState::initialize(config, Arc::new(bus.clone()))
        .context("failed to initialize server state")?;
    tracing::info!(tenant = %state.tenant().restaurant_id, "server state ready");

    // 5. 订阅事件直到 Ctrl-C
    let mut rx = bus.subscribe();
    let shutdown = bus.shutdown_token().clone();
    let tail = tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                msg = rx.recv() => match msg {
                    Ok(msg) => tracing::info!(
                        topic = %msg.topic,
                        event = msg.event.name(),
                        id = %msg.id,
                        "realtime event"
                    ),
                    Err(RecvError::Lagged(n)) => tracing::warn!(skipped = n, "event tail lagged"),
                    Err(RecvError::Closed) => break,
                },
            }
        }
    });

    tokio::signal::ctrl_c().await.context("failed to listen for ctrl-c")?;
    tracing::info!("shutting down");
    bus.shutdown();
    tail.await.ok();

    Ok(())
}
