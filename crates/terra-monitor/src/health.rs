use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 健康指标公式参数
///
/// cpu = min(cpu_base + cpu_per_alert × 活跃告警数, cpu_max)
/// memory = min(memory_base + memory_per_region × 监控中区域数, memory_max)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub cpu_base: f64,
    pub cpu_per_alert: f64,
    pub cpu_max: f64,
    pub memory_base: f64,
    pub memory_per_region: f64,
    pub memory_max: f64,
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            cpu_base: 50.0,
            cpu_per_alert: 2.0,
            cpu_max: 95.0,
            memory_base: 40.0,
            memory_per_region: 3.0,
            memory_max: 90.0,
        }
    }
}

/// 聚合输入：当前计数快照
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthInputs {
    /// status = active 的告警数
    pub active_alert_count: u64,
    /// is_active 的区域状态数
    pub regions_monitored_count: u64,
    /// 开启监控的区域数
    pub total_regions_count: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceStatus {
    Healthy,
    Stopped,
}

impl ServiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ServiceStatus::Healthy => "healthy",
            ServiceStatus::Stopped => "stopped",
        }
    }
}

/// 一次健康检查的结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthSnapshot {
    pub timestamp: DateTime<Utc>,
    pub active_alerts: u64,
    pub monitoring_regions: u64,
    pub total_regions: u64,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub service_status: ServiceStatus,
}

/// 健康聚合器（纯函数，不修改任何状态）
#[derive(Debug, Clone, Default)]
pub struct HealthAggregator {
    config: HealthConfig,
}

impl HealthAggregator {
    pub fn new(config: HealthConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HealthConfig {
        &self.config
    }

    pub fn cpu_usage(&self, active_alerts: u64) -> f64 {
        let c = &self.config;
        (c.cpu_base + c.cpu_per_alert * active_alerts as f64).min(c.cpu_max)
    }

    pub fn memory_usage(&self, monitored_regions: u64) -> f64 {
        let c = &self.config;
        (c.memory_base + c.memory_per_region * monitored_regions as f64).min(c.memory_max)
    }

    pub fn aggregate(
        &self,
        inputs: HealthInputs,
        running: bool,
        timestamp: DateTime<Utc>,
    ) -> HealthSnapshot {
        HealthSnapshot {
            timestamp,
            active_alerts: inputs.active_alert_count,
            monitoring_regions: inputs.regions_monitored_count,
            total_regions: inputs.total_regions_count,
            cpu_usage: self.cpu_usage(inputs.active_alert_count),
            memory_usage: self.memory_usage(inputs.regions_monitored_count),
            service_status: if running {
                ServiceStatus::Healthy
            } else {
                ServiceStatus::Stopped
            },
        }
    }
}
