use crate::error::{MonitorError, Result};
use crate::model::{Alert, AlertAction, AlertStatus, DisasterType, NewAlert, Region, ThreatSpec};
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use tracing::debug;

/// 未指定模型名时的默认值
pub const DEFAULT_MODEL: &str = "DisasterDetectionAI";

/// 当前处于 active 的 (region, disaster_type) 集合
///
/// 由存储层在检查-插入临界区内加载，生命周期管理器据此去重。
#[derive(Debug, Clone, Default)]
pub struct ActiveAlertIndex {
    keys: HashSet<(String, DisasterType)>,
}

impl ActiveAlertIndex {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_alerts<'a>(alerts: impl IntoIterator<Item = &'a Alert>) -> Self {
        let keys = alerts
            .into_iter()
            .filter(|a| a.is_active())
            .map(Alert::key)
            .collect();
        Self { keys }
    }

    pub fn contains(&self, region_id: &str, disaster_type: DisasterType) -> bool {
        self.keys.contains(&(region_id.to_string(), disaster_type))
    }

    pub fn insert(&mut self, region_id: &str, disaster_type: DisasterType) -> bool {
        self.keys.insert((region_id.to_string(), disaster_type))
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// 告警生命周期管理器
///
/// 纯决策逻辑，不做任何 I/O：新建告警前查重，状态迁移前校验状态机。
#[derive(Debug, Clone, Default)]
pub struct AlertLifecycleManager;

impl AlertLifecycleManager {
    pub fn new() -> Self {
        Self
    }

    /// 上报一个威胁
    ///
    /// 同一区域、同一灾种已有 active 告警时返回 `None`（重复，被抑制）；
    /// 否则构建新的 active 告警并记入索引，同一批次内的重复也会被抑制。
    pub fn report_threat(
        &self,
        index: &mut ActiveAlertIndex,
        region: &Region,
        threat: &ThreatSpec,
        now: DateTime<Utc>,
    ) -> Option<NewAlert> {
        if index.contains(&region.id, threat.disaster_type) {
            debug!(
                region_id = %region.id,
                disaster_type = %threat.disaster_type,
                "Duplicate threat suppressed"
            );
            return None;
        }

        let alert = Alert {
            id: format!("alert_{}", uuid::Uuid::new_v4().simple()),
            region_id: region.id.clone(),
            disaster_type: threat.disaster_type,
            severity: threat.severity,
            status: AlertStatus::Active,
            title: threat.title.clone(),
            description: threat.description.clone(),
            latitude: threat.latitude.unwrap_or(region.center_latitude),
            longitude: threat.longitude.unwrap_or(region.center_longitude),
            confidence: clamp_confidence(threat.confidence),
            prediction_model: threat
                .model_name
                .clone()
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            estimated_affected_population: threat.estimated_population.max(0),
            detected_at: now,
            acknowledged_at: None,
            acknowledged_by: None,
            resolved_at: None,
            resolved_by: None,
            dismissed_at: None,
            dismissed_by: None,
        };

        index.insert(&region.id, threat.disaster_type);
        Some(alert)
    }

    /// 确认：仅 active 可确认
    pub fn acknowledge(&self, alert: &mut Alert, actor: &str, now: DateTime<Utc>) -> Result<()> {
        self.apply(alert, AlertAction::Acknowledge, actor, now)
    }

    /// 解决：active 或 acknowledged 可解决
    pub fn resolve(&self, alert: &mut Alert, actor: &str, now: DateTime<Utc>) -> Result<()> {
        self.apply(alert, AlertAction::Resolve, actor, now)
    }

    /// 忽略：active 或 acknowledged 可忽略
    pub fn dismiss(&self, alert: &mut Alert, actor: &str, now: DateTime<Utc>) -> Result<()> {
        self.apply(alert, AlertAction::Dismiss, actor, now)
    }

    /// 执行状态迁移；非法迁移返回 `InvalidTransition`，告警保持不变
    pub fn apply(
        &self,
        alert: &mut Alert,
        action: AlertAction,
        actor: &str,
        now: DateTime<Utc>,
    ) -> Result<()> {
        let target = action.target();
        if !alert.status.can_transition_to(target) {
            return Err(MonitorError::InvalidTransition {
                alert_id: alert.id.clone(),
                from: alert.status,
                action,
            });
        }

        alert.status = target;
        match action {
            AlertAction::Acknowledge => {
                alert.acknowledged_at = Some(now);
                alert.acknowledged_by = Some(actor.to_string());
            }
            AlertAction::Resolve => {
                alert.resolved_at = Some(now);
                alert.resolved_by = Some(actor.to_string());
            }
            AlertAction::Dismiss => {
                alert.dismissed_at = Some(now);
                alert.dismissed_by = Some(actor.to_string());
            }
        }
        Ok(())
    }
}

fn clamp_confidence(confidence: f64) -> f64 {
    if confidence.is_nan() {
        0.0
    } else {
        confidence.clamp(0.0, 1.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{GeoBounds, Severity};

    fn delta() -> Region {
        Region::new("Delta", GeoBounds::new(10.0, 11.0, 20.0, 21.0)).with_id("reg_delta")
    }

    fn fire() -> ThreatSpec {
        ThreatSpec::new(DisasterType::Fire, Severity::High, 0.82)
    }

    #[test]
    fn test_new_threat_creates_active_alert() {
        let manager = AlertLifecycleManager::new();
        let mut index = ActiveAlertIndex::new();
        let now = Utc::now();

        let alert = manager
            .report_threat(&mut index, &delta(), &fire(), now)
            .expect("first report must create an alert");

        assert_eq!(alert.status, AlertStatus::Active);
        assert_eq!(alert.disaster_type, DisasterType::Fire);
        assert_eq!(alert.severity, Severity::High);
        assert_eq!(alert.confidence, 0.82);
        assert_eq!(alert.detected_at, now);
        assert_eq!(alert.prediction_model, DEFAULT_MODEL);
        // 未给坐标时取区域中心
        assert_eq!((alert.latitude, alert.longitude), (10.5, 20.5));
        assert!(index.contains("reg_delta", DisasterType::Fire));
    }

    #[test]
    fn test_duplicate_is_suppressed() {
        let manager = AlertLifecycleManager::new();
        let mut index = ActiveAlertIndex::new();
        let region = delta();

        assert!(manager.report_threat(&mut index, &region, &fire(), Utc::now()).is_some());
        assert!(manager.report_threat(&mut index, &region, &fire(), Utc::now()).is_none());

        // 不同灾种不受影响
        let flood = ThreatSpec::new(DisasterType::Flood, Severity::Low, 0.7);
        assert!(manager.report_threat(&mut index, &region, &flood, Utc::now()).is_some());
        assert_eq!(index.len(), 2);
    }

    #[test]
    fn test_index_ignores_closed_alerts() {
        let manager = AlertLifecycleManager::new();
        let mut scratch = ActiveAlertIndex::new();
        let mut alert = manager
            .report_threat(&mut scratch, &delta(), &fire(), Utc::now())
            .unwrap();
        manager.resolve(&mut alert, "ops", Utc::now()).unwrap();

        let mut index = ActiveAlertIndex::from_alerts([&alert]);
        assert!(index.is_empty());
        assert!(manager.report_threat(&mut index, &delta(), &fire(), Utc::now()).is_some());
    }

    #[test]
    fn test_confidence_is_clamped() {
        let manager = AlertLifecycleManager::new();
        let mut index = ActiveAlertIndex::new();
        let threat = ThreatSpec::new(DisasterType::Fire, Severity::Low, 1.7);
        let alert = manager.report_threat(&mut index, &delta(), &threat, Utc::now()).unwrap();
        assert_eq!(alert.confidence, 1.0);

        let mut index = ActiveAlertIndex::new();
        let threat = ThreatSpec::new(DisasterType::Fire, Severity::Low, f64::NAN);
        let alert = manager.report_threat(&mut index, &delta(), &threat, Utc::now()).unwrap();
        assert_eq!(alert.confidence, 0.0);
    }

    #[test]
    fn test_acknowledge_then_resolve() {
        let manager = AlertLifecycleManager::new();
        let mut index = ActiveAlertIndex::new();
        let mut alert = manager.report_threat(&mut index, &delta(), &fire(), Utc::now()).unwrap();

        manager.acknowledge(&mut alert, "alice", Utc::now()).unwrap();
        assert_eq!(alert.status, AlertStatus::Acknowledged);
        assert_eq!(alert.acknowledged_by.as_deref(), Some("alice"));

        manager.resolve(&mut alert, "bob", Utc::now()).unwrap();
        assert_eq!(alert.status, AlertStatus::Resolved);
        assert_eq!(alert.resolved_by.as_deref(), Some("bob"));
        assert!(alert.resolved_at.is_some());
    }

    #[test]
    fn test_resolve_then_acknowledge_fails_without_mutation() {
        let manager = AlertLifecycleManager::new();
        let mut index = ActiveAlertIndex::new();
        let mut alert = manager.report_threat(&mut index, &delta(), &fire(), Utc::now()).unwrap();
        manager.resolve(&mut alert, "bob", Utc::now()).unwrap();
        let before = alert.clone();

        let err = manager.acknowledge(&mut alert, "alice", Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            MonitorError::InvalidTransition {
                from: AlertStatus::Resolved,
                action: AlertAction::Acknowledge,
                ..
            }
        ));
        assert_eq!(alert, before);
    }

    #[test]
    fn test_terminal_states_have_no_exits() {
        let manager = AlertLifecycleManager::new();
        let mut index = ActiveAlertIndex::new();
        let mut alert = manager.report_threat(&mut index, &delta(), &fire(), Utc::now()).unwrap();
        manager.dismiss(&mut alert, "carol", Utc::now()).unwrap();

        for action in [AlertAction::Acknowledge, AlertAction::Resolve, AlertAction::Dismiss] {
            assert!(manager.apply(&mut alert, action, "dave", Utc::now()).is_err());
        }
        assert_eq!(alert.status, AlertStatus::Dismissed);
        assert_eq!(alert.dismissed_by.as_deref(), Some("carol"));
    }
}
