use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// 经纬度包围盒
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub min_latitude: f64,
    pub max_latitude: f64,
    pub min_longitude: f64,
    pub max_longitude: f64,
}

impl GeoBounds {
    pub fn new(min_latitude: f64, max_latitude: f64, min_longitude: f64, max_longitude: f64) -> Self {
        Self {
            min_latitude,
            max_latitude,
            min_longitude,
            max_longitude,
        }
    }

    /// 包围盒中心点 (lat, lon)
    pub fn center(&self) -> (f64, f64) {
        (
            (self.min_latitude + self.max_latitude) / 2.0,
            (self.min_longitude + self.max_longitude) / 2.0,
        )
    }

    pub fn is_valid(&self) -> bool {
        let lat_ok = (-90.0..=90.0).contains(&self.min_latitude)
            && (-90.0..=90.0).contains(&self.max_latitude);
        let lon_ok = (-180.0..=180.0).contains(&self.min_longitude)
            && (-180.0..=180.0).contains(&self.max_longitude);
        lat_ok
            && lon_ok
            && self.min_latitude <= self.max_latitude
            && self.min_longitude <= self.max_longitude
    }
}

/// 监控区域
///
/// 除 `is_monitored` 外创建后不可变，正常运行期间不会被删除。
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Region {
    /// 区域 ID（全局唯一）
    pub id: String,

    /// 区域名称（唯一）
    pub name: String,

    pub description: Option<String>,

    /// 包围盒
    pub bounds: GeoBounds,

    /// 地图中心点
    pub center_latitude: f64,
    pub center_longitude: f64,

    /// 是否纳入周期扫描
    pub is_monitored: bool,

    /// 人口估计
    pub population: Option<i64>,

    pub created_at: DateTime<Utc>,
}

impl Region {
    /// 创建新区域，中心点取包围盒中心
    pub fn new(name: impl Into<String>, bounds: GeoBounds) -> Self {
        let (center_latitude, center_longitude) = bounds.center();
        Self {
            id: format!("reg_{}", uuid::Uuid::new_v4().simple()),
            name: name.into(),
            description: None,
            bounds,
            center_latitude,
            center_longitude,
            is_monitored: true,
            population: None,
            created_at: Utc::now(),
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn with_center(mut self, latitude: f64, longitude: f64) -> Self {
        self.center_latitude = latitude;
        self.center_longitude = longitude;
        self
    }

    pub fn with_population(mut self, population: i64) -> Self {
        self.population = Some(population);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn unmonitored(mut self) -> Self {
        self.is_monitored = false;
        self
    }
}

/// 区域过滤条件
#[derive(Debug, Clone, Default)]
pub struct RegionFilter {
    pub monitored: Option<bool>,
    pub name: Option<String>,
}

/// 威胁等级：normal < low < medium < high < critical
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThreatLevel {
    Normal,
    Low,
    Medium,
    High,
    Critical,
}

impl ThreatLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatLevel::Normal => "normal",
            ThreatLevel::Low => "low",
            ThreatLevel::Medium => "medium",
            ThreatLevel::High => "high",
            ThreatLevel::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "normal" => Some(ThreatLevel::Normal),
            "low" => Some(ThreatLevel::Low),
            "medium" => Some(ThreatLevel::Medium),
            "high" => Some(ThreatLevel::High),
            "critical" => Some(ThreatLevel::Critical),
            _ => None,
        }
    }

    /// 由一批威胁推导区域整体威胁等级
    ///
    /// 无威胁为 normal；任一 critical 为 critical；最高为 high 或威胁数超过 2 为 high；
    /// 最高为 medium 为 medium；其余为 low。比较基于有序枚举而非字符串。
    pub fn from_threats(threats: &[ThreatSpec]) -> Self {
        let Some(max) = threats.iter().map(|t| t.severity).max() else {
            return ThreatLevel::Normal;
        };
        match max {
            Severity::Critical => ThreatLevel::Critical,
            _ if max == Severity::High || threats.len() > 2 => ThreatLevel::High,
            Severity::Medium => ThreatLevel::Medium,
            _ => ThreatLevel::Low,
        }
    }
}

impl From<Severity> for ThreatLevel {
    fn from(severity: Severity) -> Self {
        match severity {
            Severity::Low => ThreatLevel::Low,
            Severity::Medium => ThreatLevel::Medium,
            Severity::High => ThreatLevel::High,
            Severity::Critical => ThreatLevel::Critical,
        }
    }
}

/// 区域状态中的威胁标记：有序等级，或游离于排序之外的 error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum ThreatStatus {
    Assessed(ThreatLevel),
    Error,
}

impl ThreatStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ThreatStatus::Assessed(level) => level.as_str(),
            ThreatStatus::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        if s == "error" {
            return Some(ThreatStatus::Error);
        }
        ThreatLevel::parse(s).map(ThreatStatus::Assessed)
    }

    pub fn level(&self) -> Option<ThreatLevel> {
        match self {
            ThreatStatus::Assessed(level) => Some(*level),
            ThreatStatus::Error => None,
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ThreatStatus::Error)
    }
}

impl Default for ThreatStatus {
    fn default() -> Self {
        ThreatStatus::Assessed(ThreatLevel::Normal)
    }
}

impl From<ThreatLevel> for ThreatStatus {
    fn from(level: ThreatLevel) -> Self {
        ThreatStatus::Assessed(level)
    }
}

impl From<ThreatStatus> for String {
    fn from(status: ThreatStatus) -> Self {
        status.as_str().to_string()
    }
}

impl TryFrom<String> for ThreatStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, String> {
        ThreatStatus::parse(&value).ok_or_else(|| format!("unknown threat level: {}", value))
    }
}

impl fmt::Display for ThreatStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 告警严重程度：low < medium < high < critical
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Low => "low",
            Severity::Medium => "medium",
            Severity::High => "high",
            Severity::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Severity::Low),
            "medium" => Some(Severity::Medium),
            "high" => Some(Severity::High),
            "critical" => Some(Severity::Critical),
            _ => None,
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 灾害类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DisasterType {
    Earthquake,
    Flood,
    Fire,
    Cyclone,
    Landslide,
    Drought,
    Tsunami,
}

impl DisasterType {
    pub const ALL: [DisasterType; 7] = [
        DisasterType::Earthquake,
        DisasterType::Flood,
        DisasterType::Fire,
        DisasterType::Cyclone,
        DisasterType::Landslide,
        DisasterType::Drought,
        DisasterType::Tsunami,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            DisasterType::Earthquake => "earthquake",
            DisasterType::Flood => "flood",
            DisasterType::Fire => "fire",
            DisasterType::Cyclone => "cyclone",
            DisasterType::Landslide => "landslide",
            DisasterType::Drought => "drought",
            DisasterType::Tsunami => "tsunami",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == s)
    }
}

impl fmt::Display for DisasterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 告警状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertStatus {
    Active,
    Acknowledged,
    Resolved,
    Dismissed,
}

impl AlertStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertStatus::Active => "active",
            AlertStatus::Acknowledged => "acknowledged",
            AlertStatus::Resolved => "resolved",
            AlertStatus::Dismissed => "dismissed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "active" => Some(AlertStatus::Active),
            "acknowledged" => Some(AlertStatus::Acknowledged),
            "resolved" => Some(AlertStatus::Resolved),
            "dismissed" => Some(AlertStatus::Dismissed),
            _ => None,
        }
    }

    /// resolved 与 dismissed 为终态
    pub fn is_terminal(&self) -> bool {
        matches!(self, AlertStatus::Resolved | AlertStatus::Dismissed)
    }

    pub fn can_transition_to(&self, next: AlertStatus) -> bool {
        matches!(
            (self, next),
            (AlertStatus::Active, AlertStatus::Acknowledged)
                | (AlertStatus::Active, AlertStatus::Resolved)
                | (AlertStatus::Active, AlertStatus::Dismissed)
                | (AlertStatus::Acknowledged, AlertStatus::Resolved)
                | (AlertStatus::Acknowledged, AlertStatus::Dismissed)
        )
    }
}

impl fmt::Display for AlertStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 告警操作
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AlertAction {
    Acknowledge,
    Resolve,
    Dismiss,
}

impl AlertAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertAction::Acknowledge => "acknowledge",
            AlertAction::Resolve => "resolve",
            AlertAction::Dismiss => "dismiss",
        }
    }

    pub fn target(&self) -> AlertStatus {
        match self {
            AlertAction::Acknowledge => AlertStatus::Acknowledged,
            AlertAction::Resolve => AlertStatus::Resolved,
            AlertAction::Dismiss => AlertStatus::Dismissed,
        }
    }
}

impl fmt::Display for AlertAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 告警
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub id: String,
    pub region_id: String,
    pub disaster_type: DisasterType,
    pub severity: Severity,
    pub status: AlertStatus,
    pub title: String,
    pub description: String,
    pub latitude: f64,
    pub longitude: f64,
    /// 置信度 [0, 1]
    pub confidence: f64,
    pub prediction_model: String,
    pub estimated_affected_population: i64,
    pub detected_at: DateTime<Utc>,
    pub acknowledged_at: Option<DateTime<Utc>>,
    pub acknowledged_by: Option<String>,
    pub resolved_at: Option<DateTime<Utc>>,
    pub resolved_by: Option<String>,
    pub dismissed_at: Option<DateTime<Utc>>,
    pub dismissed_by: Option<String>,
}

impl Alert {
    pub fn is_active(&self) -> bool {
        self.status == AlertStatus::Active
    }

    /// 去重键
    pub fn key(&self) -> (String, DisasterType) {
        (self.region_id.clone(), self.disaster_type)
    }
}

/// 由生命周期管理器新建、尚未持久化的告警
pub type NewAlert = Alert;

/// 告警过滤条件
#[derive(Debug, Clone, Default)]
pub struct AlertFilter {
    pub region_id: Option<String>,
    pub disaster_type: Option<DisasterType>,
    pub severity: Option<Severity>,
    pub statuses: Vec<AlertStatus>,
    pub limit: Option<u64>,
}

impl AlertFilter {
    /// 未关闭（active / acknowledged）的告警
    pub fn open() -> Self {
        Self {
            statuses: vec![AlertStatus::Active, AlertStatus::Acknowledged],
            ..Default::default()
        }
    }

    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }
}

/// 仪表盘告警统计
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertStats {
    pub total_active: u64,
    pub total_acknowledged: u64,
    pub total_resolved_today: u64,
    pub critical_open: u64,
}

/// 告警统计报表：按类型、严重程度、区域和日期汇总
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AlertStatistics {
    /// 按数量降序
    pub by_disaster_type: Vec<(DisasterType, u64)>,
    /// 按严重程度从高到低
    pub by_severity: Vec<(Severity, u64)>,
    /// 每个区域一项，没有告警的区域计数为 0
    pub regions: Vec<RegionAlertStats>,
    /// 统计窗口内有告警的日期（UTC），按日期升序
    pub daily: Vec<DailyAlertCount>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionAlertStats {
    pub region_id: String,
    pub region_name: String,
    pub alert_count: u64,
    /// 区域没有告警时为 None
    pub avg_confidence: Option<f64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DailyAlertCount {
    pub date: NaiveDate,
    pub count: u64,
}

/// 区域监控状态
///
/// 只由编排器写入：每完成一个周期或一次健康检查写一次。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MonitoringState {
    pub region_id: String,
    pub is_active: bool,
    pub last_cycle_at: Option<DateTime<Utc>>,
    pub last_data_fetch_at: Option<DateTime<Utc>>,
    pub threat_level: ThreatStatus,
    pub anomaly_count: u32,
    /// 检测耗时（秒）
    pub last_cycle_duration: f64,
    pub cpu_usage: Option<f64>,
    pub memory_usage: Option<f64>,
    pub updated_at: DateTime<Utc>,
}

impl MonitoringState {
    pub fn new(region_id: impl Into<String>) -> Self {
        Self {
            region_id: region_id.into(),
            is_active: false,
            last_cycle_at: None,
            last_data_fetch_at: None,
            threat_level: ThreatStatus::default(),
            anomaly_count: 0,
            last_cycle_duration: 0.0,
            cpu_usage: None,
            memory_usage: None,
            updated_at: Utc::now(),
        }
    }
}

/// 检测器上报的单个威胁
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ThreatSpec {
    pub disaster_type: DisasterType,
    pub severity: Severity,
    pub confidence: f64,
    pub title: String,
    pub description: String,
    pub estimated_population: i64,
    pub model_name: Option<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
}

impl ThreatSpec {
    pub fn new(disaster_type: DisasterType, severity: Severity, confidence: f64) -> Self {
        Self {
            disaster_type,
            severity,
            confidence,
            title: format!("{} risk detected", disaster_type),
            description: String::new(),
            estimated_population: 0,
            model_name: None,
            latitude: None,
            longitude: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model_name = Some(model.into());
        self
    }

    pub fn with_population(mut self, population: i64) -> Self {
        self.estimated_population = population;
        self
    }

    pub fn at(mut self, latitude: f64, longitude: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self
    }
}

/// 检测结果
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectionResult {
    pub threat_level: ThreatLevel,
    pub anomaly_count: u32,
    pub threats: Vec<ThreatSpec>,
    pub processing_time_seconds: f64,
}

impl DetectionResult {
    /// 无威胁的结果
    pub fn clear() -> Self {
        Self {
            threat_level: ThreatLevel::Normal,
            anomaly_count: 0,
            threats: Vec::new(),
            processing_time_seconds: 0.0,
        }
    }

    /// 整体等级由威胁列表推导
    pub fn from_threats(threats: Vec<ThreatSpec>, anomaly_count: u32) -> Self {
        Self {
            threat_level: ThreatLevel::from_threats(&threats),
            anomaly_count,
            threats,
            processing_time_seconds: 0.0,
        }
    }
}

/// 单次区域周期的摘要
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CycleSummary {
    pub region_id: String,
    pub region_name: String,
    pub threat_level: ThreatLevel,
    pub anomaly_count: u32,
    pub threats_detected: usize,
    pub new_alerts: Vec<Alert>,
    pub processing_time_seconds: f64,
    pub completed_at: DateTime<Utc>,
}

/// 区域及其（可能尚未创建的）监控状态
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionOverview {
    pub region: Region,
    pub state: Option<MonitoringState>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn threat(severity: Severity) -> ThreatSpec {
        ThreatSpec::new(DisasterType::Fire, severity, 0.8)
    }

    #[test]
    fn test_severity_ordering_is_not_alphabetical() {
        // 按字符串比较 "critical" < "high"，有序枚举必须相反
        assert!(Severity::Critical > Severity::High);
        assert!(Severity::High > Severity::Medium);
        assert!(Severity::Medium > Severity::Low);
        assert!(ThreatLevel::Low > ThreatLevel::Normal);
    }

    #[test]
    fn test_overall_threat_level() {
        assert_eq!(ThreatLevel::from_threats(&[]), ThreatLevel::Normal);
        assert_eq!(ThreatLevel::from_threats(&[threat(Severity::Low)]), ThreatLevel::Low);
        assert_eq!(
            ThreatLevel::from_threats(&[threat(Severity::Low), threat(Severity::Medium)]),
            ThreatLevel::Medium
        );
        assert_eq!(
            ThreatLevel::from_threats(&[threat(Severity::High), threat(Severity::Critical)]),
            ThreatLevel::Critical
        );
        // 超过两个威胁时至少为 high
        assert_eq!(
            ThreatLevel::from_threats(&[
                threat(Severity::Low),
                threat(Severity::Low),
                threat(Severity::Medium)
            ]),
            ThreatLevel::High
        );
    }

    #[test]
    fn test_threat_status_round_trip_strings() {
        assert_eq!(ThreatStatus::parse("error"), Some(ThreatStatus::Error));
        assert_eq!(
            ThreatStatus::parse("high"),
            Some(ThreatStatus::Assessed(ThreatLevel::High))
        );
        assert_eq!(ThreatStatus::parse("bogus"), None);
        assert_eq!(ThreatStatus::Error.level(), None);

        let json = serde_json::to_string(&ThreatStatus::Error).unwrap();
        assert_eq!(json, "\"error\"");
    }

    #[test]
    fn test_status_transitions() {
        use AlertStatus::*;
        assert!(Active.can_transition_to(Acknowledged));
        assert!(Active.can_transition_to(Resolved));
        assert!(Acknowledged.can_transition_to(Dismissed));
        assert!(!Acknowledged.can_transition_to(Active));
        assert!(!Resolved.can_transition_to(Acknowledged));
        assert!(!Dismissed.can_transition_to(Resolved));
        assert!(Resolved.is_terminal() && Dismissed.is_terminal());
    }

    #[test]
    fn test_bounds_validation() {
        assert!(GeoBounds::new(12.7, 13.1, 77.4, 77.8).is_valid());
        assert!(!GeoBounds::new(13.1, 12.7, 77.4, 77.8).is_valid());
        assert!(!GeoBounds::new(12.0, 95.0, 77.4, 77.8).is_valid());
        assert_eq!(GeoBounds::new(10.0, 20.0, 70.0, 80.0).center(), (15.0, 75.0));
    }
}
