use crate::db::{alert, monitoring_state, region};
use crate::error::{MonitorError, Result};
use crate::health::HealthInputs;
use crate::lifecycle::ActiveAlertIndex;
use crate::model::{
    Alert, AlertAction, AlertFilter, AlertStatistics, AlertStats, AlertStatus, DailyAlertCount,
    DisasterType, MonitoringState, RegionAlertStats, Severity,
};
use chrono::{DateTime, Duration, NaiveDate, TimeZone, Utc};
use sea_orm::sea_query::{Expr, Func, OnConflict, SimpleExpr};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, TransactionTrait,
};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// 按日统计的窗口长度
pub const STATISTICS_WINDOW_DAYS: i64 = 7;

/// 监控状态与告警的持久化
///
/// 一个周期的状态与新告警在同一事务中提交；告警状态迁移是基于旧状态的
/// compare-and-set，并发迁移不会相互覆盖。
#[derive(Clone)]
pub struct MonitorStore {
    db: Arc<DatabaseConnection>,
}

impl MonitorStore {
    pub fn new(db: Arc<DatabaseConnection>) -> Self {
        Self { db }
    }

    pub fn db(&self) -> &DatabaseConnection {
        &self.db
    }

    // ========== 区域状态 ==========

    pub async fn get_state(&self, region_id: &str) -> Result<Option<MonitoringState>> {
        monitoring_state::Entity::find_by_id(region_id.to_string())
            .one(&*self.db)
            .await?
            .map(MonitoringState::try_from)
            .transpose()
    }

    /// 读取区域状态，尚未创建时返回默认状态（不落库）
    pub async fn load_or_init_state(&self, region_id: &str) -> Result<MonitoringState> {
        Ok(self
            .get_state(region_id)
            .await?
            .unwrap_or_else(|| MonitoringState::new(region_id)))
    }

    pub async fn list_states(&self) -> Result<Vec<MonitoringState>> {
        monitoring_state::Entity::find()
            .order_by_asc(monitoring_state::Column::RegionId)
            .all(&*self.db)
            .await?
            .into_iter()
            .map(MonitoringState::try_from)
            .collect()
    }

    /// 单独保存区域状态（用于写入 error 标记）
    pub async fn save_state(&self, state: &MonitoringState) -> Result<()> {
        upsert_state(&*self.db, state).await
    }

    /// 在同一事务中提交区域状态与本周期新建的告警
    ///
    /// 任一写入失败时事务回滚，之前提交的状态保持不变。
    pub async fn commit_cycle(&self, state: &MonitoringState, alerts: &[Alert]) -> Result<()> {
        let txn = self.db.begin().await?;

        upsert_state(&txn, state).await?;
        for alert in alerts {
            let model: alert::ActiveModel = alert.clone().into();
            alert::Entity::insert(model)
                .exec_without_returning(&txn)
                .await?;
        }

        txn.commit().await?;
        debug!(
            region_id = %state.region_id,
            new_alerts = alerts.len(),
            "Cycle committed"
        );
        Ok(())
    }

    // ========== 告警 ==========

    /// 区域当前 active 告警的去重索引
    pub async fn active_index(&self, region_id: &str) -> Result<ActiveAlertIndex> {
        let alerts = self
            .list_alerts(AlertFilter {
                region_id: Some(region_id.to_string()),
                statuses: vec![AlertStatus::Active],
                ..Default::default()
            })
            .await?;
        Ok(ActiveAlertIndex::from_alerts(&alerts))
    }

    pub async fn get_alert(&self, alert_id: &str) -> Result<Option<Alert>> {
        alert::Entity::find_by_id(alert_id.to_string())
            .one(&*self.db)
            .await?
            .map(Alert::try_from)
            .transpose()
    }

    /// 持久化一次状态迁移
    ///
    /// 仅当库中状态仍为 `expected` 时写入；否则按当前状态返回
    /// `InvalidTransition`（或记录已不存在时返回 `NotFound`）。
    pub async fn transition(
        &self,
        alert: &Alert,
        expected: AlertStatus,
        action: AlertAction,
    ) -> Result<()> {
        let model: alert::ActiveModel = alert.clone().into();
        let result = alert::Entity::update_many()
            .set(model)
            .filter(alert::Column::Id.eq(alert.id.as_str()))
            .filter(alert::Column::Status.eq(expected.as_str()))
            .exec(&*self.db)
            .await?;

        if result.rows_affected == 0 {
            let current = self
                .get_alert(&alert.id)
                .await?
                .ok_or_else(|| MonitorError::not_found("alert", &alert.id))?;
            warn!(
                alert_id = %alert.id,
                expected = %expected,
                current = %current.status,
                "Alert changed concurrently, transition rejected"
            );
            return Err(MonitorError::InvalidTransition {
                alert_id: alert.id.clone(),
                from: current.status,
                action,
            });
        }
        Ok(())
    }

    /// 按条件列出告警（按检测时间倒序）
    pub async fn list_alerts(&self, filter: AlertFilter) -> Result<Vec<Alert>> {
        let mut query = alert::Entity::find();
        if let Some(region_id) = &filter.region_id {
            query = query.filter(alert::Column::RegionId.eq(region_id.as_str()));
        }
        if let Some(disaster_type) = filter.disaster_type {
            query = query.filter(alert::Column::DisasterType.eq(disaster_type.as_str()));
        }
        if let Some(severity) = filter.severity {
            query = query.filter(alert::Column::Severity.eq(severity.as_str()));
        }
        if !filter.statuses.is_empty() {
            query = query.filter(
                alert::Column::Status.is_in(filter.statuses.iter().map(|s| s.as_str())),
            );
        }
        query = query.order_by_desc(alert::Column::DetectedAt);
        if let Some(limit) = filter.limit {
            query = query.limit(limit);
        }

        query
            .all(&*self.db)
            .await?
            .into_iter()
            .map(Alert::try_from)
            .collect()
    }

    /// 仪表盘统计
    pub async fn alert_stats(&self, now: DateTime<Utc>) -> Result<AlertStats> {
        let count_status = |status: AlertStatus| {
            alert::Entity::find().filter(alert::Column::Status.eq(status.as_str()))
        };

        let total_active = count_status(AlertStatus::Active).count(&*self.db).await?;
        let total_acknowledged = count_status(AlertStatus::Acknowledged)
            .count(&*self.db)
            .await?;

        let start_of_day = now
            .date_naive()
            .and_hms_opt(0, 0, 0)
            .map(|midnight| Utc.from_utc_datetime(&midnight))
            .unwrap_or(now);
        let total_resolved_today = count_status(AlertStatus::Resolved)
            .filter(alert::Column::ResolvedAt.gte(start_of_day))
            .count(&*self.db)
            .await?;

        let critical_open = alert::Entity::find()
            .filter(alert::Column::Severity.eq(Severity::Critical.as_str()))
            .filter(alert::Column::Status.is_in([
                AlertStatus::Active.as_str(),
                AlertStatus::Acknowledged.as_str(),
            ]))
            .count(&*self.db)
            .await?;

        Ok(AlertStats {
            total_active,
            total_acknowledged,
            total_resolved_today,
            critical_open,
        })
    }

    /// 告警统计报表
    ///
    /// 类型、严重程度和区域统计覆盖全部告警；按日统计只取 `now` 之前
    /// [`STATISTICS_WINDOW_DAYS`] 天内检测到的告警。
    pub async fn alert_statistics(&self, now: DateTime<Utc>) -> Result<AlertStatistics> {
        let type_rows: Vec<(String, i64)> = alert::Entity::find()
            .select_only()
            .column(alert::Column::DisasterType)
            .column_as(alert::Column::Id.count(), "count")
            .group_by(alert::Column::DisasterType)
            .into_tuple()
            .all(&*self.db)
            .await?;
        let mut by_disaster_type = type_rows
            .into_iter()
            .map(|(name, count)| -> Result<(DisasterType, u64)> {
                let disaster_type = DisasterType::parse(&name).ok_or_else(|| {
                    MonitorError::corrupt(format!("unknown disaster type {:?}", name))
                })?;
                Ok((disaster_type, count.max(0) as u64))
            })
            .collect::<Result<Vec<_>>>()?;
        by_disaster_type
            .sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.as_str().cmp(b.0.as_str())));

        let severity_rows: Vec<(String, i64)> = alert::Entity::find()
            .select_only()
            .column(alert::Column::Severity)
            .column_as(alert::Column::Id.count(), "count")
            .group_by(alert::Column::Severity)
            .into_tuple()
            .all(&*self.db)
            .await?;
        let mut by_severity = severity_rows
            .into_iter()
            .map(|(name, count)| -> Result<(Severity, u64)> {
                let severity = Severity::parse(&name).ok_or_else(|| {
                    MonitorError::corrupt(format!("unknown severity {:?}", name))
                })?;
                Ok((severity, count.max(0) as u64))
            })
            .collect::<Result<Vec<_>>>()?;
        by_severity.sort_by(|a, b| b.0.cmp(&a.0));

        let avg_confidence =
            SimpleExpr::from(Func::avg(Expr::col((alert::Entity, alert::Column::Confidence))));
        let region_rows: Vec<(String, String, i64, Option<f64>)> = region::Entity::find()
            .select_only()
            .column(region::Column::Id)
            .column(region::Column::Name)
            .column_as(alert::Column::Id.count(), "alert_count")
            .column_as(avg_confidence, "avg_confidence")
            .left_join(alert::Entity)
            .group_by(region::Column::Id)
            .group_by(region::Column::Name)
            .order_by_asc(region::Column::Name)
            .into_tuple()
            .all(&*self.db)
            .await?;
        let regions = region_rows
            .into_iter()
            .map(|(region_id, region_name, count, avg)| RegionAlertStats {
                region_id,
                region_name,
                alert_count: count.max(0) as u64,
                avg_confidence: avg,
            })
            .collect();

        // 按 UTC 日期在内存中归并，避免依赖各数据库的日期函数
        let since = now - Duration::days(STATISTICS_WINDOW_DAYS);
        let detected: Vec<DateTime<Utc>> = alert::Entity::find()
            .select_only()
            .column(alert::Column::DetectedAt)
            .filter(alert::Column::DetectedAt.gte(since))
            .filter(alert::Column::DetectedAt.lte(now))
            .into_tuple()
            .all(&*self.db)
            .await?;
        let mut per_day: BTreeMap<NaiveDate, u64> = BTreeMap::new();
        for at in detected {
            *per_day.entry(at.date_naive()).or_default() += 1;
        }
        let daily = per_day
            .into_iter()
            .map(|(date, count)| DailyAlertCount { date, count })
            .collect();

        Ok(AlertStatistics {
            by_disaster_type,
            by_severity,
            regions,
            daily,
        })
    }

    // ========== 健康指标 ==========

    /// 健康聚合所需的计数快照
    pub async fn health_inputs(&self) -> Result<HealthInputs> {
        let active_alerts = alert::Entity::find()
            .filter(alert::Column::Status.eq(AlertStatus::Active.as_str()))
            .count(&*self.db)
            .await?;
        let regions_monitored = monitoring_state::Entity::find()
            .filter(monitoring_state::Column::IsActive.eq(true))
            .count(&*self.db)
            .await?;
        let total_regions = region::Entity::find()
            .filter(region::Column::IsMonitored.eq(true))
            .count(&*self.db)
            .await?;

        Ok(HealthInputs {
            active_alert_count: active_alerts,
            regions_monitored_count: regions_monitored,
            total_regions_count: total_regions,
        })
    }

    /// 把健康指标写入所有区域状态，返回更新的行数
    pub async fn apply_health_gauges(
        &self,
        cpu_usage: f64,
        memory_usage: f64,
        now: DateTime<Utc>,
    ) -> Result<u64> {
        let result = monitoring_state::Entity::update_many()
            .col_expr(monitoring_state::Column::CpuUsage, Expr::value(cpu_usage))
            .col_expr(monitoring_state::Column::MemoryUsage, Expr::value(memory_usage))
            .col_expr(monitoring_state::Column::UpdatedAt, Expr::value(now))
            .exec(&*self.db)
            .await?;
        Ok(result.rows_affected)
    }
}

/// 插入或更新区域状态
///
/// 健康指标列只由健康检查写入，周期提交不覆盖它们。
async fn upsert_state<C: ConnectionTrait>(conn: &C, state: &MonitoringState) -> Result<()> {
    use monitoring_state::Column;

    let model: monitoring_state::ActiveModel = state.clone().into();
    monitoring_state::Entity::insert(model)
        .on_conflict(
            OnConflict::column(Column::RegionId)
                .update_columns([
                    Column::IsActive,
                    Column::LastCycleAt,
                    Column::LastDataFetchAt,
                    Column::ThreatLevel,
                    Column::AnomalyCount,
                    Column::LastCycleDuration,
                    Column::UpdatedAt,
                ])
                .to_owned(),
        )
        .exec_without_returning(conn)
        .await?;
    Ok(())
}
