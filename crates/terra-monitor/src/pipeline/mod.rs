//! 检测管线适配层
//!
//! 编排器只依赖这里的两个协作方接口：数据源负责按包围盒采集观测数据，
//! 检测器负责把观测数据变成威胁列表。两者都是不透明的，生产实现可以替换，
//! 编排器不需要改动。

pub mod simulated;

use crate::model::{DetectionResult, GeoBounds};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

pub use simulated::{SimulatedDataSource, SimulatedDetector};

/// 数据源错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DataSourceError {
    #[error("data source unavailable: {0}")]
    Unavailable(String),

    #[error("data fetch timed out after {0:?}")]
    Timeout(Duration),

    #[error("invalid bounds: {0}")]
    InvalidBounds(String),
}

/// 检测器错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectorError {
    #[error("analysis failed: {0}")]
    Failed(String),

    #[error("analysis timed out after {0:?}")]
    Timeout(Duration),
}

/// 大气条件
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AtmosphericConditions {
    pub visibility_km: f64,
    pub humidity_percent: f64,
    pub temperature_celsius: f64,
    pub wind_speed_kmh: f64,
    pub precipitation_mm: f64,
    pub atmospheric_pressure: f64,
}

/// 地形分析
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainAnalysis {
    pub average_elevation: f64,
    pub elevation_variance: f64,
    pub slope_angle_avg: f64,
    pub vegetation_index: f64,
    pub water_body_coverage: f64,
    pub urban_coverage: f64,
    pub soil_moisture: f64,
    pub surface_temperature: f64,
}

/// 变化检测中识别出的变化类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeKind {
    VegetationLoss,
    WaterLevelChange,
    UrbanExpansion,
    ThermalAnomaly,
    GroundDeformation,
    SmokeDetection,
}

impl ChangeKind {
    pub const ALL: [ChangeKind; 6] = [
        ChangeKind::VegetationLoss,
        ChangeKind::WaterLevelChange,
        ChangeKind::UrbanExpansion,
        ChangeKind::ThermalAnomaly,
        ChangeKind::GroundDeformation,
        ChangeKind::SmokeDetection,
    ];
}

/// 变化检测
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChangeDetection {
    pub temporal_comparison_days: u32,
    pub significant_changes_detected: u32,
    pub change_types: Vec<ChangeKind>,
    pub change_confidence: f64,
    pub anomaly_score: f64,
}

impl ChangeDetection {
    pub fn has(&self, kind: ChangeKind) -> bool {
        self.change_types.contains(&kind)
    }
}

/// 一次采集的观测数据
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasurementPayload {
    pub acquired_at: DateTime<Utc>,
    pub bounds: GeoBounds,
    pub sources: Vec<String>,
    pub atmospheric: AtmosphericConditions,
    pub terrain: TerrainAnalysis,
    pub changes: ChangeDetection,
}

/// 数据源
///
/// 实现方应自行控制超时并显式失败，不能无限挂起。
#[async_trait]
pub trait DataSource: Send + Sync {
    async fn fetch(&self, bounds: &GeoBounds) -> Result<MeasurementPayload, DataSourceError>;
}

/// 检测器
#[async_trait]
pub trait Detector: Send + Sync {
    async fn analyze(
        &self,
        payload: &MeasurementPayload,
        region_name: &str,
    ) -> Result<DetectionResult, DetectorError>;
}
