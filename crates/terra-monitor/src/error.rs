use crate::model::{AlertAction, AlertStatus};
use crate::pipeline::{DataSourceError, DetectorError};
use thiserror::Error;

/// 监控编排错误类型
#[derive(Error, Debug)]
pub enum MonitorError {
    /// 区域 / 告警 / 状态未找到
    #[error("Not found: {0}")]
    NotFound(String),

    /// 区域已存在
    #[error("Region already exists: {0}")]
    AlreadyExists(String),

    /// 数据源失败（区域级，可在下一周期重试）
    #[error("Data source error: {0}")]
    DataSource(#[from] DataSourceError),

    /// 检测器失败（区域级，可在下一周期重试）
    #[error("Detector error: {0}")]
    Detector(#[from] DetectorError),

    /// 非法的告警状态迁移，记录保持不变
    #[error("Invalid transition: cannot {action} alert {alert_id} in status {from}")]
    InvalidTransition {
        alert_id: String,
        from: AlertStatus,
        action: AlertAction,
    },

    /// 持久化失败，本周期写入整体回滚
    #[error("Persistence error: {0}")]
    Persistence(#[from] sea_orm::DbErr),

    /// 序列化错误
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// 验证错误
    #[error("Validation error: {0}")]
    Validation(String),

    /// 配置错误
    #[error("Configuration error: {0}")]
    Config(String),

    /// 存储中的数据无法解析
    #[error("Corrupt record: {0}")]
    Corrupt(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// 监控结果类型
pub type Result<T> = std::result::Result<T, MonitorError>;

impl MonitorError {
    pub fn validation(msg: impl Into<String>) -> Self {
        MonitorError::Validation(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        MonitorError::Config(msg.into())
    }

    pub fn corrupt(msg: impl Into<String>) -> Self {
        MonitorError::Corrupt(msg.into())
    }

    pub fn not_found(what: &str, id: &str) -> Self {
        MonitorError::NotFound(format!("{} {}", what, id))
    }

    /// 数据源 / 检测器失败，周期调度时降级为 error 标记
    pub fn is_collaborator(&self) -> bool {
        matches!(self, MonitorError::DataSource(_) | MonitorError::Detector(_))
    }
}
