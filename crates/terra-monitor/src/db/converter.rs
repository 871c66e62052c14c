use crate::error::MonitorError;
use crate::model::{
    Alert, AlertStatus, DisasterType, GeoBounds, MonitoringState, Region, Severity, ThreatStatus,
};
use sea_orm::ActiveValue::Set;

/// Region 模型与数据库实体的转换
impl From<Region> for super::region::ActiveModel {
    fn from(region: Region) -> Self {
        Self {
            id: Set(region.id),
            name: Set(region.name),
            description: Set(region.description),
            min_latitude: Set(region.bounds.min_latitude),
            max_latitude: Set(region.bounds.max_latitude),
            min_longitude: Set(region.bounds.min_longitude),
            max_longitude: Set(region.bounds.max_longitude),
            center_latitude: Set(region.center_latitude),
            center_longitude: Set(region.center_longitude),
            is_monitored: Set(region.is_monitored),
            population: Set(region.population),
            created_at: Set(region.created_at),
        }
    }
}

impl From<super::region::Model> for Region {
    fn from(model: super::region::Model) -> Self {
        Self {
            id: model.id,
            name: model.name,
            description: model.description,
            bounds: GeoBounds::new(
                model.min_latitude,
                model.max_latitude,
                model.min_longitude,
                model.max_longitude,
            ),
            center_latitude: model.center_latitude,
            center_longitude: model.center_longitude,
            is_monitored: model.is_monitored,
            population: model.population,
            created_at: model.created_at,
        }
    }
}

/// MonitoringState 模型与数据库实体的转换
impl From<MonitoringState> for super::monitoring_state::ActiveModel {
    fn from(state: MonitoringState) -> Self {
        Self {
            region_id: Set(state.region_id),
            is_active: Set(state.is_active),
            last_cycle_at: Set(state.last_cycle_at),
            last_data_fetch_at: Set(state.last_data_fetch_at),
            threat_level: Set(state.threat_level.as_str().to_string()),
            anomaly_count: Set(i32::try_from(state.anomaly_count).unwrap_or(i32::MAX)),
            last_cycle_duration: Set(state.last_cycle_duration),
            cpu_usage: Set(state.cpu_usage),
            memory_usage: Set(state.memory_usage),
            updated_at: Set(state.updated_at),
        }
    }
}

impl TryFrom<super::monitoring_state::Model> for MonitoringState {
    type Error = MonitorError;

    fn try_from(model: super::monitoring_state::Model) -> Result<Self, Self::Error> {
        let threat_level = ThreatStatus::parse(&model.threat_level).ok_or_else(|| {
            MonitorError::corrupt(format!(
                "monitoring state {} has threat level {:?}",
                model.region_id, model.threat_level
            ))
        })?;

        Ok(Self {
            region_id: model.region_id,
            is_active: model.is_active,
            last_cycle_at: model.last_cycle_at,
            last_data_fetch_at: model.last_data_fetch_at,
            threat_level,
            anomaly_count: u32::try_from(model.anomaly_count).unwrap_or(0),
            last_cycle_duration: model.last_cycle_duration,
            cpu_usage: model.cpu_usage,
            memory_usage: model.memory_usage,
            updated_at: model.updated_at,
        })
    }
}

/// Alert 模型与数据库实体的转换
impl From<Alert> for super::alert::ActiveModel {
    fn from(alert: Alert) -> Self {
        Self {
            id: Set(alert.id),
            region_id: Set(alert.region_id),
            disaster_type: Set(alert.disaster_type.as_str().to_string()),
            severity: Set(alert.severity.as_str().to_string()),
            status: Set(alert.status.as_str().to_string()),
            title: Set(alert.title),
            description: Set(alert.description),
            latitude: Set(alert.latitude),
            longitude: Set(alert.longitude),
            confidence: Set(alert.confidence),
            prediction_model: Set(alert.prediction_model),
            estimated_affected_population: Set(alert.estimated_affected_population),
            detected_at: Set(alert.detected_at),
            acknowledged_at: Set(alert.acknowledged_at),
            acknowledged_by: Set(alert.acknowledged_by),
            resolved_at: Set(alert.resolved_at),
            resolved_by: Set(alert.resolved_by),
            dismissed_at: Set(alert.dismissed_at),
            dismissed_by: Set(alert.dismissed_by),
        }
    }
}

impl TryFrom<super::alert::Model> for Alert {
    type Error = MonitorError;

    fn try_from(model: super::alert::Model) -> Result<Self, Self::Error> {
        let disaster_type = DisasterType::parse(&model.disaster_type).ok_or_else(|| {
            MonitorError::corrupt(format!(
                "alert {} has disaster type {:?}",
                model.id, model.disaster_type
            ))
        })?;
        let severity = Severity::parse(&model.severity).ok_or_else(|| {
            MonitorError::corrupt(format!("alert {} has severity {:?}", model.id, model.severity))
        })?;
        let status = AlertStatus::parse(&model.status).ok_or_else(|| {
            MonitorError::corrupt(format!("alert {} has status {:?}", model.id, model.status))
        })?;

        Ok(Self {
            id: model.id,
            region_id: model.region_id,
            disaster_type,
            severity,
            status,
            title: model.title,
            description: model.description,
            latitude: model.latitude,
            longitude: model.longitude,
            confidence: model.confidence,
            prediction_model: model.prediction_model,
            estimated_affected_population: model.estimated_affected_population,
            detected_at: model.detected_at,
            acknowledged_at: model.acknowledged_at,
            acknowledged_by: model.acknowledged_by,
            resolved_at: model.resolved_at,
            resolved_by: model.resolved_by,
            dismissed_at: model.dismissed_at,
            dismissed_by: model.dismissed_by,
        })
    }
}
