/// terra-monitor 基本使用示例
///
/// 用模拟协作方对默认区域执行一次扫描，处理一条告警并输出健康指标。
use sea_orm::Database;
use std::sync::Arc;
use terra_core::EventBus;
use terra_monitor::db::setup_schema;
use terra_monitor::{
    AlertFilter, MonitoringOrchestrator, OrchestratorConfig, SimulatedDataSource,
    SimulatedDetector,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt::init();

    println!("=== TERRA 区域监控示例 ===\n");

    let db = Arc::new(Database::connect("sqlite::memory:").await?);
    setup_schema(&db).await?;

    let bus = Arc::new(EventBus::new(256));
    let mut events = bus.subscribe();

    let orchestrator = Arc::new(MonitoringOrchestrator::new(
        db,
        Arc::new(SimulatedDataSource::new(42)),
        Arc::new(SimulatedDetector::new(42)),
        bus,
        OrchestratorConfig::default(),
    ));

    let seeded = orchestrator.registry().seed_defaults().await?;
    println!("✓ 写入默认区域 {} 个\n", seeded);

    println!("--- 区域扫描 ---");
    let report = orchestrator.run_scan().await?;
    for summary in &report.completed {
        println!(
            "{:<10} 威胁等级 {:<8} 威胁 {} 新告警 {}",
            summary.region_name,
            summary.threat_level.as_str(),
            summary.threats_detected,
            summary.new_alerts.len()
        );
    }

    println!("\n--- 告警处理 ---");
    let open = orchestrator.list_alerts(AlertFilter::open()).await?;
    match open.first() {
        Some(alert) => {
            orchestrator.acknowledge_alert(&alert.id, "operator").await?;
            let resolved = orchestrator.resolve_alert(&alert.id, "operator").await?;
            println!("✓ {} -> {}", resolved.title, resolved.status);
        }
        None => println!("当前没有未关闭的告警"),
    }

    println!("\n--- 健康指标 ---");
    let health = orchestrator.run_health_tick().await?;
    println!(
        "活跃告警 {} / 监控区域 {} / CPU {:.0}% / 内存 {:.0}%",
        health.active_alerts, health.monitoring_regions, health.cpu_usage, health.memory_usage
    );

    println!("\n--- 事件 ---");
    while let Ok(message) = events.try_recv() {
        println!("{:<22} {}", message.topic, message.payload);
    }

    Ok(())
}
