use crate::error::{MonitorError, Result};
use crate::health::HealthConfig;
use std::time::Duration;

/// 定时周期与调用超时的上限
pub const MAX_INTERVAL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// 编排器配置
#[derive(Debug, Clone, PartialEq)]
pub struct OrchestratorConfig {
    /// 区域扫描周期
    pub scan_interval: Duration,

    /// 健康检查周期
    pub health_interval: Duration,

    /// 单次数据源 / 检测器调用的超时
    pub collaborator_timeout: Duration,

    /// 一次扫描内并发执行的区域周期数
    pub max_concurrent_cycles: usize,

    pub health: HealthConfig,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            scan_interval: Duration::from_secs(300),
            health_interval: Duration::from_secs(60),
            collaborator_timeout: Duration::from_secs(30),
            max_concurrent_cycles: 1,
            health: HealthConfig::default(),
        }
    }
}

impl OrchestratorConfig {
    pub fn with_scan_interval(mut self, interval: Duration) -> Self {
        self.scan_interval = interval;
        self
    }

    pub fn with_health_interval(mut self, interval: Duration) -> Self {
        self.health_interval = interval;
        self
    }

    pub fn with_collaborator_timeout(mut self, timeout: Duration) -> Self {
        self.collaborator_timeout = timeout;
        self
    }

    pub fn with_max_concurrent_cycles(mut self, n: usize) -> Self {
        self.max_concurrent_cycles = n;
        self
    }

    pub fn with_health(mut self, health: HealthConfig) -> Self {
        self.health = health;
        self
    }

    /// 启动前校验；非法配置不会装配定时器
    pub fn validate(&self) -> Result<()> {
        if self.scan_interval.is_zero() {
            return Err(MonitorError::config("scan interval must be greater than zero"));
        }
        if self.health_interval.is_zero() {
            return Err(MonitorError::config("health interval must be greater than zero"));
        }
        if self.collaborator_timeout.is_zero() {
            return Err(MonitorError::config(
                "collaborator timeout must be greater than zero",
            ));
        }
        for (name, value) in [
            ("scan interval", self.scan_interval),
            ("health interval", self.health_interval),
            ("collaborator timeout", self.collaborator_timeout),
        ] {
            if value > MAX_INTERVAL {
                return Err(MonitorError::config(format!(
                    "{} must not exceed {}s",
                    name,
                    MAX_INTERVAL.as_secs()
                )));
            }
        }
        if self.max_concurrent_cycles == 0 {
            return Err(MonitorError::config(
                "max concurrent cycles must be at least 1",
            ));
        }
        self.validate_health()
    }

    /// 健康指标公式须随输入单调不减且有上限
    fn validate_health(&self) -> Result<()> {
        let h = &self.health;
        let values = [
            ("cpu_base", h.cpu_base),
            ("cpu_per_alert", h.cpu_per_alert),
            ("cpu_max", h.cpu_max),
            ("memory_base", h.memory_base),
            ("memory_per_region", h.memory_per_region),
            ("memory_max", h.memory_max),
        ];
        for (name, value) in values {
            if !value.is_finite() {
                return Err(MonitorError::config(format!("health.{} must be finite", name)));
            }
        }
        if h.cpu_per_alert < 0.0 || h.memory_per_region < 0.0 {
            return Err(MonitorError::config("health gauge rates must not be negative"));
        }
        if h.cpu_max < h.cpu_base || h.memory_max < h.memory_base {
            return Err(MonitorError::config("health gauge maximum below its base"));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = OrchestratorConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scan_interval, Duration::from_secs(300));
        assert_eq!(config.health_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_zero_interval_rejected() {
        let config = OrchestratorConfig::default().with_scan_interval(Duration::ZERO);
        assert!(matches!(config.validate(), Err(MonitorError::Config(_))));

        let config = OrchestratorConfig::default().with_max_concurrent_cycles(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_oversized_interval_rejected() {
        let config =
            OrchestratorConfig::default().with_scan_interval(Duration::from_secs(u64::MAX));
        assert!(matches!(config.validate(), Err(MonitorError::Config(_))));

        let config = OrchestratorConfig::default()
            .with_collaborator_timeout(MAX_INTERVAL + Duration::from_secs(1));
        assert!(config.validate().is_err());

        let config = OrchestratorConfig::default().with_health_interval(MAX_INTERVAL);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_negative_or_nan_gauge_rate_rejected() {
        let health = HealthConfig {
            cpu_per_alert: -5.0,
            ..HealthConfig::default()
        };
        let config = OrchestratorConfig::default().with_health(health);
        assert!(matches!(config.validate(), Err(MonitorError::Config(_))));

        let health = HealthConfig {
            memory_per_region: f64::NAN,
            ..HealthConfig::default()
        };
        assert!(OrchestratorConfig::default().with_health(health).validate().is_err());

        let health = HealthConfig {
            cpu_max: f64::INFINITY,
            ..HealthConfig::default()
        };
        assert!(OrchestratorConfig::default().with_health(health).validate().is_err());

        // 零增量仍是单调的
        let health = HealthConfig {
            cpu_per_alert: 0.0,
            ..HealthConfig::default()
        };
        assert!(OrchestratorConfig::default().with_health(health).validate().is_ok());
    }
}
