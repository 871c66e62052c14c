//! 事件总线上的主题名称
//!
//! 订阅端按这些字符串区分负载结构，名称一经发布不可更改。

/// 监控服务启停
pub const MONITORING_STATUS: &str = "monitoring_status";

/// 新告警
pub const NEW_ALERT: &str = "new_alert";

/// 告警状态变化（确认 / 解决 / 忽略）
pub const ALERT_UPDATED: &str = "alert_updated";

/// 单个区域完成一次检测周期
pub const REGION_STATUS_UPDATE: &str = "region_status_update";

/// 系统健康快照
pub const SYSTEM_HEALTH_UPDATE: &str = "system_health_update";

/// 按需分析完成
pub const REGION_ANALYZED: &str = "region_analyzed";

pub const ALL: [&str; 6] = [
    MONITORING_STATUS,
    NEW_ALERT,
    ALERT_UPDATED,
    REGION_STATUS_UPDATE,
    SYSTEM_HEALTH_UPDATE,
    REGION_ANALYZED,
];
