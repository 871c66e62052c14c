use std::fs;
use std::time::Duration;
use tempfile::tempdir;
use terra_server::{bootstrap, AppConfig};
use terra_types::topic;

#[test]
fn test_missing_file_uses_defaults() {
    let dir = tempdir().unwrap();
    let config = AppConfig::load(dir.path().join("absent.toml")).unwrap();

    assert_eq!(config.monitoring.scan_interval_secs, 300);
    assert_eq!(config.monitoring.health_interval_secs, 60);
    assert_eq!(config.eventbus.capacity, 1024);
    assert_eq!(config.logging.level, "info");
}

#[test]
fn test_load_from_file() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("terra.toml");
    fs::write(
        &path,
        r#"
[database]
url = "sqlite::memory:"

[monitoring]
scan_interval_secs = 120
max_concurrent_cycles = 3

[health]
cpu_base = 40.0
cpu_max = 80.0

[logging]
level = "debug"
json = true
"#,
    )
    .unwrap();

    let config = AppConfig::load(&path).unwrap();
    assert_eq!(config.database.url, "sqlite::memory:");
    assert_eq!(config.monitoring.scan_interval_secs, 120);
    // 未写的字段取默认值
    assert_eq!(config.monitoring.health_interval_secs, 60);
    assert_eq!(config.health.cpu_base, 40.0);
    assert_eq!(config.health.cpu_per_alert, 2.0);
    assert!(config.logging.json);

    let orchestrator = config.orchestrator();
    assert_eq!(orchestrator.scan_interval, Duration::from_secs(120));
    assert_eq!(orchestrator.max_concurrent_cycles, 3);
    assert_eq!(orchestrator.health.cpu_max, 80.0);
}

#[test]
fn test_zero_interval_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("terra.toml");
    fs::write(&path, "[monitoring]\nhealth_interval_secs = 0\n").unwrap();

    assert!(AppConfig::load(&path).is_err());
}

#[tokio::test]
async fn test_bootstrap_seeds_regions_and_runs_a_pass() {
    let mut config = AppConfig::default();
    config.database.url = "sqlite::memory:".to_string();

    let state = bootstrap(config).await.unwrap();
    let mut events = state.event_bus.subscribe();

    let report = state.orchestrator.run_scan().await.unwrap();
    assert_eq!(report.completed.len() + report.failed.len(), 5);

    let health = state.orchestrator.run_health_tick().await.unwrap();
    assert_eq!(health.total_regions, 5);
    assert_eq!(health.monitoring_regions, 5);

    let mut health_events = 0;
    let mut status_updates = 0;
    while let Ok(message) = events.try_recv() {
        if message.is(topic::SYSTEM_HEALTH_UPDATE) {
            health_events += 1;
        }
        if message.is(topic::REGION_STATUS_UPDATE) {
            status_updates += 1;
        }
    }
    assert_eq!(health_events, 1);
    assert_eq!(status_updates, 5);
}

#[test]
fn test_negative_health_rate_is_rejected() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("terra.toml");
    fs::write(&path, "[health]\ncpu_per_alert = -5.0\n").unwrap();

    assert!(AppConfig::load(&path).is_err());
}

#[test]
fn test_oversized_scan_interval_is_rejected() {
    let mut config = AppConfig::default();
    config.monitoring.scan_interval_secs = u64::MAX;
    assert!(config.validate().is_err());
}
