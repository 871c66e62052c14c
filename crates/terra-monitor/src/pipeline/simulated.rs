//! 模拟协作方
//!
//! 没有真实遥感接入时使用。随机源由调用方注入种子，相同种子产生相同序列，
//! 测试因此是确定的。

use super::{
    AtmosphericConditions, ChangeDetection, ChangeKind, DataSource, DataSourceError,
    DetectionResult, Detector, DetectorError, MeasurementPayload, TerrainAnalysis,
};
use crate::model::{DisasterType, GeoBounds, Severity, ThreatLevel, ThreatSpec};
use async_trait::async_trait;
use chrono::Utc;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::{Rng, SeedableRng};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::debug;

const SATELLITES: [&str; 4] = ["Sentinel-2", "Landsat-8", "MODIS", "Sentinel-1"];

/// 未登记区域的人口基数
const DEFAULT_POPULATION: i64 = 5_000_000;

/// 模拟数据源
pub struct SimulatedDataSource {
    rng: Mutex<StdRng>,
    latency: Duration,
}

impl SimulatedDataSource {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            latency: Duration::ZERO,
        }
    }

    /// 模拟采集延迟
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    fn generate(&self, bounds: &GeoBounds) -> MeasurementPayload {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        let (center_lat, _) = bounds.center();

        // 北部偏高海拔，南部植被更密
        let (elevation_base, vegetation_base) = if center_lat > 30.0 {
            (500.0, 0.4)
        } else if center_lat < 20.0 {
            (200.0, 0.6)
        } else {
            (300.0, 0.5)
        };

        let source_count = rng.gen_range(2..=4);
        let sources = (0..source_count)
            .filter_map(|_| SATELLITES.choose(&mut *rng).map(|s| s.to_string()))
            .collect();

        let atmospheric = AtmosphericConditions {
            visibility_km: rng.gen_range(5.0..50.0),
            humidity_percent: rng.gen_range(30.0..90.0),
            temperature_celsius: rng.gen_range(-10.0..45.0),
            wind_speed_kmh: rng.gen_range(0.0..50.0),
            precipitation_mm: rng.gen_range(0.0..20.0),
            atmospheric_pressure: rng.gen_range(980.0..1030.0),
        };

        let terrain = TerrainAnalysis {
            average_elevation: elevation_base + rng.gen_range(-100.0..300.0),
            elevation_variance: rng.gen_range(50.0..500.0),
            slope_angle_avg: rng.gen_range(0.0..15.0),
            vegetation_index: vegetation_base + rng.gen_range(-0.2..0.3),
            water_body_coverage: rng.gen_range(0.01..0.15),
            urban_coverage: rng.gen_range(0.2..0.8),
            soil_moisture: rng.gen_range(0.1..0.9),
            surface_temperature: rng.gen_range(15.0..40.0),
        };

        let change_count = rng.gen_range(0..=3);
        let change_types = ChangeKind::ALL
            .choose_multiple(&mut *rng, change_count)
            .copied()
            .collect();

        let changes = ChangeDetection {
            temporal_comparison_days: rng.gen_range(1..=30),
            significant_changes_detected: rng.gen_range(0..=5),
            change_types,
            change_confidence: rng.gen_range(0.6..0.95),
            anomaly_score: rng.gen::<f64>(),
        };

        MeasurementPayload {
            acquired_at: Utc::now(),
            bounds: *bounds,
            sources,
            atmospheric,
            terrain,
            changes,
        }
    }
}

#[async_trait]
impl DataSource for SimulatedDataSource {
    async fn fetch(&self, bounds: &GeoBounds) -> Result<MeasurementPayload, DataSourceError> {
        if !bounds.is_valid() {
            return Err(DataSourceError::InvalidBounds(format!("{:?}", bounds)));
        }
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let payload = self.generate(bounds);
        debug!(
            min_lat = bounds.min_latitude,
            min_lon = bounds.min_longitude,
            max_lat = bounds.max_latitude,
            max_lon = bounds.max_longitude,
            sources = payload.sources.len(),
            "Generated measurement payload"
        );
        Ok(payload)
    }
}

/// 模拟检测器
pub struct SimulatedDetector {
    rng: Mutex<StdRng>,
    latency: Duration,
    populations: HashMap<String, i64>,
}

impl SimulatedDetector {
    pub fn new(seed: u64) -> Self {
        let populations = [
            ("Delhi", 30_000_000),
            ("Mumbai", 20_000_000),
            ("Bangalore", 12_500_000),
            ("Pune", 7_500_000),
            ("Jammu", 1_500_000),
        ]
        .into_iter()
        .map(|(name, pop)| (name.to_string(), pop))
        .collect();

        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
            latency: Duration::ZERO,
            populations,
        }
    }

    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// 登记区域人口基数
    pub fn with_population(mut self, region_name: impl Into<String>, population: i64) -> Self {
        self.populations.insert(region_name.into(), population);
        self
    }

    fn detect(&self, payload: &MeasurementPayload, region_name: &str) -> (Vec<ThreatSpec>, u32) {
        let mut rng = self.rng.lock().unwrap_or_else(|e| e.into_inner());
        let atm = &payload.atmospheric;
        let terrain = &payload.terrain;
        let changes = &payload.changes;
        let mut threats = Vec::new();

        let fire_factors = [
            atm.temperature_celsius > 35.0,
            atm.humidity_percent < 30.0,
            terrain.vegetation_index < 0.3,
            changes.has(ChangeKind::ThermalAnomaly),
        ];
        if count(&fire_factors) >= 2 && rng.gen::<f64>() > 0.7 {
            let confidence = rng.gen_range(0.6..0.95);
            let severity = determine_severity(confidence, atm.temperature_celsius);
            threats.push(
                ThreatSpec::new(DisasterType::Fire, severity, confidence)
                    .with_title(format!("Wildfire Risk Detected in {}", region_name))
                    .with_description(format!(
                        "High fire risk conditions detected: temperature {:.1}°C, humidity {:.1}%, vegetation index {:.2}",
                        atm.temperature_celsius, atm.humidity_percent, terrain.vegetation_index
                    ))
                    .with_model("FireDetectionCNN")
                    .with_population(self.affected(&mut rng, region_name, DisasterType::Fire)),
            );
        }

        let flood_factors = [
            atm.precipitation_mm > 15.0,
            changes.has(ChangeKind::WaterLevelChange),
            terrain.average_elevation < 200.0,
        ];
        if count(&flood_factors) >= 2 && rng.gen::<f64>() > 0.8 {
            let confidence = rng.gen_range(0.65..0.9);
            let severity = determine_severity(confidence, atm.precipitation_mm);
            threats.push(
                ThreatSpec::new(DisasterType::Flood, severity, confidence)
                    .with_title(format!("Flood Risk Detected in {}", region_name))
                    .with_description(format!(
                        "High flood risk: precipitation {:.1}mm, elevation {:.0}m, water coverage {:.1}%",
                        atm.precipitation_mm,
                        terrain.average_elevation,
                        terrain.water_body_coverage * 100.0
                    ))
                    .with_model("FloodPredictionRNN")
                    .with_population(self.affected(&mut rng, region_name, DisasterType::Flood)),
            );
        }

        let seismic = changes.has(ChangeKind::GroundDeformation) || terrain.elevation_variance > 400.0;
        if seismic && rng.gen::<f64>() > 0.9 {
            let confidence = rng.gen_range(0.7..0.85);
            threats.push(
                ThreatSpec::new(DisasterType::Earthquake, Severity::High, confidence)
                    .with_title(format!("Seismic Activity Detected in {}", region_name))
                    .with_description(format!(
                        "Ground deformation detected: elevation variance {:.0}m",
                        terrain.elevation_variance
                    ))
                    .with_model("SeismicAnalysisAI")
                    .with_population(self.affected(&mut rng, region_name, DisasterType::Earthquake)),
            );
        }

        let landslide_factors = [
            terrain.slope_angle_avg > 10.0,
            terrain.soil_moisture > 0.7,
            changes.significant_changes_detected > 2,
        ];
        if count(&landslide_factors) >= 2 && rng.gen::<f64>() > 0.85 {
            let confidence = rng.gen_range(0.6..0.88);
            let severity = determine_severity(confidence, terrain.slope_angle_avg);
            threats.push(
                ThreatSpec::new(DisasterType::Landslide, severity, confidence)
                    .with_title(format!("Landslide Risk Detected in {}", region_name))
                    .with_description(format!(
                        "Unstable slope conditions: average slope {:.1}°, soil moisture {:.1}%",
                        terrain.slope_angle_avg,
                        terrain.soil_moisture * 100.0
                    ))
                    .with_model("LandslideRiskAssessment")
                    .with_population(self.affected(&mut rng, region_name, DisasterType::Landslide)),
            );
        }

        let anomalies = u32::from(changes.anomaly_score > 0.5);
        (threats, anomalies)
    }

    /// 受影响人口：区域基数乘以灾种影响系数
    fn affected(&self, rng: &mut StdRng, region_name: &str, disaster: DisasterType) -> i64 {
        let base = self
            .populations
            .get(region_name)
            .copied()
            .unwrap_or(DEFAULT_POPULATION);
        let factor = match disaster {
            DisasterType::Earthquake => rng.gen_range(0.1..0.3),
            DisasterType::Flood => rng.gen_range(0.05..0.2),
            DisasterType::Fire => rng.gen_range(0.01..0.1),
            DisasterType::Landslide => rng.gen_range(0.001..0.05),
            DisasterType::Cyclone => rng.gen_range(0.1..0.4),
            _ => 0.05,
        };
        (base as f64 * factor) as i64
    }
}

#[async_trait]
impl Detector for SimulatedDetector {
    async fn analyze(
        &self,
        payload: &MeasurementPayload,
        region_name: &str,
    ) -> Result<DetectionResult, DetectorError> {
        let started = Instant::now();
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }

        let (threats, anomaly_count) = self.detect(payload, region_name);
        let result = DetectionResult {
            threat_level: ThreatLevel::from_threats(&threats),
            anomaly_count,
            threats,
            processing_time_seconds: started.elapsed().as_secs_f64(),
        };

        debug!(
            region = %region_name,
            threats = result.threats.len(),
            threat_level = result.threat_level.as_str(),
            "Simulated analysis completed"
        );
        Ok(result)
    }
}

fn count(factors: &[bool]) -> usize {
    factors.iter().filter(|f| **f).count()
}

/// 由置信度与指标值推导严重程度
pub fn determine_severity(confidence: f64, metric_value: f64) -> Severity {
    if confidence > 0.9 || metric_value > 40.0 {
        Severity::Critical
    } else if confidence > 0.8 || metric_value > 30.0 {
        Severity::High
    } else if confidence > 0.7 || metric_value > 20.0 {
        Severity::Medium
    } else {
        Severity::Low
    }
}
