//! 事件负载
//!
//! 字段名是对订阅端的契约，时间统一为 ISO-8601 (UTC) 字符串。

use crate::health::HealthSnapshot;
use crate::model::{Alert, CycleSummary, ThreatLevel};
use serde::{Deserialize, Serialize};

/// `monitoring_status`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringStatusEvent {
    pub status: String,
    pub message: String,
}

impl MonitoringStatusEvent {
    pub fn started() -> Self {
        Self {
            status: "started".to_string(),
            message: "Real-time monitoring has been activated".to_string(),
        }
    }

    pub fn stopped() -> Self {
        Self {
            status: "stopped".to_string(),
            message: "Real-time monitoring has been deactivated".to_string(),
        }
    }
}

/// `new_alert`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAlertEvent {
    pub alert_id: String,
    pub region_id: String,
    pub region_name: String,
    pub disaster_type: String,
    pub severity: String,
    pub title: String,
    pub confidence: f64,
    pub detected_at: String,
}

impl NewAlertEvent {
    pub fn new(alert: &Alert, region_name: &str) -> Self {
        Self {
            alert_id: alert.id.clone(),
            region_id: alert.region_id.clone(),
            region_name: region_name.to_string(),
            disaster_type: alert.disaster_type.as_str().to_string(),
            severity: alert.severity.as_str().to_string(),
            title: alert.title.clone(),
            confidence: alert.confidence,
            detected_at: alert.detected_at.to_rfc3339(),
        }
    }
}

/// `alert_updated`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertUpdatedEvent {
    pub alert_id: String,
    pub region_id: String,
    pub status: String,
    pub actor: String,
}

impl AlertUpdatedEvent {
    pub fn new(alert: &Alert, actor: &str) -> Self {
        Self {
            alert_id: alert.id.clone(),
            region_id: alert.region_id.clone(),
            status: alert.status.as_str().to_string(),
            actor: actor.to_string(),
        }
    }
}

/// `region_status_update`，每个成功周期恰好一条
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionStatusEvent {
    pub region_id: String,
    pub region_name: String,
    pub threat_level: ThreatLevel,
    pub anomalies: u32,
    pub last_analysis: String,
    pub new_alerts: usize,
    pub processing_time_seconds: f64,
}

impl From<&CycleSummary> for RegionStatusEvent {
    fn from(summary: &CycleSummary) -> Self {
        Self {
            region_id: summary.region_id.clone(),
            region_name: summary.region_name.clone(),
            threat_level: summary.threat_level,
            anomalies: summary.anomaly_count,
            last_analysis: summary.completed_at.to_rfc3339(),
            new_alerts: summary.new_alerts.len(),
            processing_time_seconds: summary.processing_time_seconds,
        }
    }
}

/// `region_analyzed`，按需分析完成后发布
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionAnalyzedEvent {
    pub region_id: String,
    pub region_name: String,
    pub threat_level: ThreatLevel,
    pub anomalies: u32,
    pub threats_detected: usize,
}

impl From<&CycleSummary> for RegionAnalyzedEvent {
    fn from(summary: &CycleSummary) -> Self {
        Self {
            region_id: summary.region_id.clone(),
            region_name: summary.region_name.clone(),
            threat_level: summary.threat_level,
            anomalies: summary.anomaly_count,
            threats_detected: summary.threats_detected,
        }
    }
}

/// `system_health_update`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemHealthEvent {
    pub timestamp: String,
    pub active_alerts: u64,
    pub monitoring_regions: u64,
    pub total_regions: u64,
    pub cpu_usage: f64,
    pub memory_usage: f64,
    pub service_status: String,
}

impl From<&HealthSnapshot> for SystemHealthEvent {
    fn from(snapshot: &HealthSnapshot) -> Self {
        Self {
            timestamp: snapshot.timestamp.to_rfc3339(),
            active_alerts: snapshot.active_alerts,
            monitoring_regions: snapshot.monitoring_regions,
            total_regions: snapshot.total_regions,
            cpu_usage: snapshot.cpu_usage,
            memory_usage: snapshot.memory_usage,
            service_status: snapshot.service_status.as_str().to_string(),
        }
    }
}
