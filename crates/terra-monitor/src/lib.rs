//! 区域灾害风险监控
//!
//! 区域注册、检测管线适配、告警生命周期与去重、健康聚合，以及驱动它们的
//! 监控编排器。

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod health;
pub mod lifecycle;
pub mod model;
pub mod orchestrator;
pub mod pipeline;
pub mod registry;
pub mod store;

pub use config::OrchestratorConfig;
pub use error::{MonitorError, Result};
pub use health::{HealthAggregator, HealthConfig, HealthInputs, HealthSnapshot, ServiceStatus};
pub use lifecycle::{ActiveAlertIndex, AlertLifecycleManager};
pub use model::{
    Alert, AlertAction, AlertFilter, AlertStatistics, AlertStats, AlertStatus, CycleSummary,
    DailyAlertCount, DetectionResult, DisasterType, GeoBounds, MonitoringState, Region,
    RegionAlertStats, RegionFilter, RegionOverview, Severity, ThreatLevel, ThreatSpec,
    ThreatStatus,
};
pub use orchestrator::{MonitoringOrchestrator, ScanReport};
pub use pipeline::{
    DataSource, DataSourceError, Detector, DetectorError, MeasurementPayload, SimulatedDataSource,
    SimulatedDetector,
};
pub use registry::RegionRegistry;
pub use store::MonitorStore;
