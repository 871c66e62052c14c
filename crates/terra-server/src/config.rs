use anyhow::{anyhow, bail, Result};
use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use terra_monitor::{HealthConfig, OrchestratorConfig};

/// 环境变量前缀，例如 `TERRA__MONITORING__SCAN_INTERVAL_SECS=120`
pub const ENV_PREFIX: &str = "TERRA";

#[derive(Debug, Deserialize, Serialize, Clone, Default, PartialEq)]
pub struct AppConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    #[serde(default)]
    pub eventbus: EventBusConfig,
    #[serde(default)]
    pub monitoring: MonitoringConfig,
    #[serde(default)]
    pub health: HealthConfig,
    #[serde(default)]
    pub simulation: SimulationConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DatabaseConfig {
    #[serde(default = "default_database_url")]
    pub url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct EventBusConfig {
    #[serde(default = "default_eventbus_capacity")]
    pub capacity: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct MonitoringConfig {
    /// 区域扫描周期（秒）
    #[serde(default = "default_scan_interval")]
    pub scan_interval_secs: u64,

    /// 健康检查周期（秒）
    #[serde(default = "default_health_interval")]
    pub health_interval_secs: u64,

    /// 数据源 / 检测器单次调用超时（秒）
    #[serde(default = "default_collaborator_timeout")]
    pub collaborator_timeout_secs: u64,

    #[serde(default = "default_max_concurrent_cycles")]
    pub max_concurrent_cycles: usize,
}

/// 模拟协作方参数
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct SimulationConfig {
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// 每次调用的模拟延迟（毫秒）
    #[serde(default)]
    pub latency_ms: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// 输出 JSON 格式日志
    #[serde(default)]
    pub json: bool,
}

// 默认值函数
fn default_database_url() -> String {
    "sqlite://terra.db?mode=rwc".to_string()
}

fn default_eventbus_capacity() -> usize {
    1024
}

fn default_scan_interval() -> u64 {
    300
}

fn default_health_interval() -> u64 {
    60
}

fn default_collaborator_timeout() -> u64 {
    30
}

fn default_max_concurrent_cycles() -> usize {
    1
}

fn default_seed() -> u64 {
    42
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: default_database_url(),
        }
    }
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            capacity: default_eventbus_capacity(),
        }
    }
}

impl Default for MonitoringConfig {
    fn default() -> Self {
        Self {
            scan_interval_secs: default_scan_interval(),
            health_interval_secs: default_health_interval(),
            collaborator_timeout_secs: default_collaborator_timeout(),
            max_concurrent_cycles: default_max_concurrent_cycles(),
        }
    }
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            seed: default_seed(),
            latency_ms: 0,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl AppConfig {
    /// 加载配置：TOML 文件（不存在时使用默认值）叠加 `TERRA__*` 环境变量
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path
            .to_str()
            .ok_or_else(|| anyhow!("Invalid config path: {}", path.display()))?;

        let config = Config::builder()
            .add_source(File::new(path_str, FileFormat::Toml).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let app_config: AppConfig = config.try_deserialize()?;
        app_config.validate()?;
        Ok(app_config)
    }

    /// 验证配置
    pub fn validate(&self) -> Result<()> {
        if self.database.url.is_empty() {
            bail!("database.url cannot be empty");
        }
        if self.eventbus.capacity == 0 {
            bail!("eventbus.capacity must be greater than 0");
        }
        if self.monitoring.scan_interval_secs == 0 {
            bail!("monitoring.scan_interval_secs must be greater than 0");
        }
        if self.monitoring.health_interval_secs == 0 {
            bail!("monitoring.health_interval_secs must be greater than 0");
        }
        self.orchestrator()
            .validate()
            .map_err(|e| anyhow!("invalid monitoring config: {}", e))?;
        Ok(())
    }

    pub fn orchestrator(&self) -> OrchestratorConfig {
        let m = &self.monitoring;
        OrchestratorConfig::default()
            .with_scan_interval(Duration::from_secs(m.scan_interval_secs))
            .with_health_interval(Duration::from_secs(m.health_interval_secs))
            .with_collaborator_timeout(Duration::from_secs(m.collaborator_timeout_secs))
            .with_max_concurrent_cycles(m.max_concurrent_cycles)
            .with_health(self.health.clone())
    }

    /// 生效配置的 TOML 表示
    pub fn to_toml(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }
}
