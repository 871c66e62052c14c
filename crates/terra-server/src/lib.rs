pub mod config;

use anyhow::{Context, Result};
use sea_orm::Database;
use std::sync::Arc;
use std::time::Duration;
use terra_core::{EventBus, SharedEventBus};
use terra_monitor::db::setup_schema;
use terra_monitor::{MonitoringOrchestrator, SimulatedDataSource, SimulatedDetector};
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

pub use config::AppConfig;

/// 进程内共享的服务对象
pub struct AppState {
    pub config: AppConfig,
    pub event_bus: SharedEventBus,
    pub orchestrator: Arc<MonitoringOrchestrator>,
}

/// 初始化日志；设置了 RUST_LOG 时以其为准
pub fn init_tracing(logging: &config::LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&logging.level))
        .context("invalid log level")?;

    let registry = tracing_subscriber::registry().with(filter);
    if logging.json {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .try_init()?;
    } else {
        registry.with(tracing_subscriber::fmt::layer()).try_init()?;
    }
    Ok(())
}

/// 连接数据库、建表、写入默认区域，并装配编排器
pub async fn bootstrap(config: AppConfig) -> Result<AppState> {
    terra_core::init();

    let db = Database::connect(&config.database.url)
        .await
        .with_context(|| format!("failed to connect to {}", config.database.url))?;
    setup_schema(&db)
        .await
        .context("failed to create schema")?;
    let db = Arc::new(db);

    let latency = Duration::from_millis(config.simulation.latency_ms);
    let data_source = SimulatedDataSource::new(config.simulation.seed).with_latency(latency);
    // 检测器使用独立的随机序列
    let detector =
        SimulatedDetector::new(config.simulation.seed.wrapping_add(1)).with_latency(latency);

    let event_bus: SharedEventBus = Arc::new(EventBus::new(config.eventbus.capacity));
    let orchestrator = Arc::new(MonitoringOrchestrator::new(
        db,
        Arc::new(data_source),
        Arc::new(detector),
        event_bus.clone(),
        config.orchestrator(),
    ));

    let seeded = orchestrator.registry().seed_defaults().await?;
    tracing::info!(seeded, "Database ready");

    Ok(AppState {
        config,
        event_bus,
        orchestrator,
    })
}

/// 把总线上的事件写入日志，直到总线关闭
pub fn spawn_event_logger(event_bus: &SharedEventBus) -> JoinHandle<()> {
    let mut rx = event_bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(message) => {
                    tracing::info!(
                        topic = %message.topic,
                        payload = %message.payload,
                        "Event"
                    );
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Event logger lagged behind");
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}
