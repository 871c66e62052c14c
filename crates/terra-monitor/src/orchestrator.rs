use crate::config::OrchestratorConfig;
use crate::error::{MonitorError, Result};
use crate::events::{
    AlertUpdatedEvent, MonitoringStatusEvent, NewAlertEvent, RegionAnalyzedEvent,
    RegionStatusEvent, SystemHealthEvent,
};
use crate::health::{HealthAggregator, HealthSnapshot};
use crate::lifecycle::AlertLifecycleManager;
use crate::model::{
    Alert, AlertAction, AlertFilter, AlertStatistics, AlertStats, CycleSummary, DetectionResult, MonitoringState,
    Region, RegionFilter, RegionOverview, ThreatStatus,
};
use crate::pipeline::{DataSource, DataSourceError, Detector, DetectorError};
use crate::registry::RegionRegistry;
use crate::store::MonitorStore;
use chrono::{DateTime, Utc};
use sea_orm::DatabaseConnection;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use terra_core::SharedEventBus;
use terra_types::topic;
use tokio::sync::{watch, Mutex, Semaphore};
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};
use tracing::{debug, error, info, warn};

/// 启停控制状态，由同一把锁保护
#[derive(Default)]
struct Control {
    stop_tx: Option<watch::Sender<bool>>,
    timers: Vec<JoinHandle<()>>,
}

/// 按区域加锁：同一区域的定时周期与按需周期串行执行
#[derive(Default)]
struct RegionLocks {
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RegionLocks {
    async fn get(&self, region_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .await
            .entry(region_id.to_string())
            .or_default()
            .clone()
    }
}

#[derive(Debug, Clone, Copy)]
enum TimerKind {
    Scan,
    Health,
}

/// 一次全量扫描的结果
#[derive(Debug, Default)]
pub struct ScanReport {
    pub completed: Vec<CycleSummary>,
    /// 周期失败的区域 ID
    pub failed: Vec<String>,
}

/// 监控编排器
///
/// 驱动区域扫描与健康检查两个独立定时器，调用检测管线、生命周期管理器和
/// 健康聚合器，并在持久化之后发布事件。进程启动时显式构造一次，以 `Arc` 共享。
pub struct MonitoringOrchestrator {
    registry: Arc<RegionRegistry>,
    store: MonitorStore,
    data_source: Arc<dyn DataSource>,
    detector: Arc<dyn Detector>,
    lifecycle: AlertLifecycleManager,
    health: HealthAggregator,
    bus: SharedEventBus,
    config: OrchestratorConfig,

    control: Mutex<Control>,
    running: AtomicBool,
    region_locks: RegionLocks,
}

impl MonitoringOrchestrator {
    pub fn new(
        db: Arc<DatabaseConnection>,
        data_source: Arc<dyn DataSource>,
        detector: Arc<dyn Detector>,
        bus: SharedEventBus,
        config: OrchestratorConfig,
    ) -> Self {
        let registry = Arc::new(RegionRegistry::new(db.clone()));
        let store = MonitorStore::new(db);
        let health = HealthAggregator::new(config.health.clone());

        info!("Monitoring orchestrator created");

        Self {
            registry,
            store,
            data_source,
            detector,
            lifecycle: AlertLifecycleManager::new(),
            health,
            bus,
            config,
            control: Mutex::new(Control::default()),
            running: AtomicBool::new(false),
            region_locks: RegionLocks::default(),
        }
    }

    pub fn registry(&self) -> &Arc<RegionRegistry> {
        &self.registry
    }

    pub fn store(&self) -> &MonitorStore {
        &self.store
    }

    pub fn event_bus(&self) -> &SharedEventBus {
        &self.bus
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    // ========== 启停控制 ==========

    /// 启动监控，返回启动后的运行状态
    ///
    /// 已在运行时为空操作。配置非法时记录日志并返回错误，运行标志保持不变。
    /// 两个定时器的首次触发都在一个完整周期之后。
    pub async fn start_monitoring(self: &Arc<Self>) -> Result<bool> {
        let mut control = self.control.lock().await;
        if self.is_running() {
            debug!("Monitoring already running");
            return Ok(true);
        }

        if let Err(e) = self.config.validate() {
            error!(error = %e, "Failed to start monitoring");
            return Err(e);
        }

        let now = Instant::now();
        let first_ticks = now
            .checked_add(self.config.scan_interval)
            .zip(now.checked_add(self.config.health_interval));
        let Some((first_scan, first_health)) = first_ticks else {
            let e = MonitorError::config("timer interval overflows the clock");
            error!(error = %e, "Failed to start monitoring");
            return Err(e);
        };

        let (stop_tx, stop_rx) = watch::channel(false);
        let this = Arc::downgrade(self);
        // 上一轮停止后仍在收尾的定时任务继续计数，直到退出
        control.timers.retain(|t| !t.is_finished());
        control.timers.push(tokio::spawn(Self::timer_loop(
            this.clone(),
            TimerKind::Scan,
            first_scan,
            self.config.scan_interval,
            stop_rx.clone(),
        )));
        control.timers.push(tokio::spawn(Self::timer_loop(
            this,
            TimerKind::Health,
            first_health,
            self.config.health_interval,
            stop_rx,
        )));
        control.stop_tx = Some(stop_tx);
        self.running.store(true, Ordering::SeqCst);

        info!(
            scan_interval = ?self.config.scan_interval,
            health_interval = ?self.config.health_interval,
            "Monitoring started"
        );
        self.bus
            .publish_payload(topic::MONITORING_STATUS, &MonitoringStatusEvent::started());
        Ok(true)
    }

    /// 停止监控，返回停止后的运行状态
    ///
    /// 只阻止后续触发，正在执行的周期会跑完。
    pub async fn stop_monitoring(&self) -> Result<bool> {
        let mut control = self.control.lock().await;
        if !self.is_running() {
            debug!("Monitoring not running");
            return Ok(false);
        }

        if let Some(stop_tx) = control.stop_tx.take() {
            let _ = stop_tx.send(true);
        }
        self.running.store(false, Ordering::SeqCst);

        info!("Monitoring stopped");
        self.bus
            .publish_payload(topic::MONITORING_STATUS, &MonitoringStatusEvent::stopped());
        Ok(false)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// 尚未退出的定时任务数
    ///
    /// 停止后正在收尾的任务仍计入，任务退出后归零。
    pub async fn timer_count(&self) -> usize {
        self.control
            .lock()
            .await
            .timers
            .iter()
            .filter(|t| !t.is_finished())
            .count()
    }

    async fn timer_loop(
        this: Weak<Self>,
        kind: TimerKind,
        first_tick: Instant,
        period: Duration,
        mut stop: watch::Receiver<bool>,
    ) {
        let mut ticker = interval_at(first_tick, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                biased;
                _ = stop.changed() => break,
                _ = ticker.tick() => {}
            }

            let Some(orchestrator) = this.upgrade() else {
                break;
            };
            match kind {
                TimerKind::Scan => {
                    if let Err(e) = orchestrator.run_scan().await {
                        error!(error = %e, "Region scan failed");
                    }
                }
                TimerKind::Health => {
                    if let Err(e) = orchestrator.run_health_tick().await {
                        error!(error = %e, "Health update failed");
                    }
                }
            }
        }

        debug!(timer = ?kind, "Timer exited");
    }

    // ========== 检测周期 ==========

    /// 对所有开启监控的区域各执行一次周期
    ///
    /// 单个区域失败只记录日志，不影响其他区域。
    pub async fn run_scan(self: &Arc<Self>) -> Result<ScanReport> {
        let regions = self.registry.list_monitored().await?;
        debug!(regions = regions.len(), "Region scan started");

        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_cycles));
        let mut cycles = JoinSet::new();
        for region in regions {
            let permit = semaphore
                .clone()
                .acquire_owned()
                .await
                .map_err(|e| MonitorError::Other(e.into()))?;
            let this = Arc::clone(self);
            cycles.spawn(async move {
                let _permit = permit;
                let result = this.run_cycle(&region).await;
                (region, result)
            });
        }

        let mut report = ScanReport::default();
        while let Some(joined) = cycles.join_next().await {
            match joined {
                Ok((_, Ok(summary))) => report.completed.push(summary),
                Ok((region, Err(e))) => {
                    error!(
                        region_id = %region.id,
                        region_name = %region.name,
                        error = %e,
                        "Region cycle failed"
                    );
                    report.failed.push(region.id);
                }
                Err(e) => error!(error = %e, "Region cycle task aborted"),
            }
        }

        info!(
            completed = report.completed.len(),
            failed = report.failed.len(),
            "Region scan finished"
        );
        Ok(report)
    }

    /// 单个区域的一次完整周期
    ///
    /// 持有区域锁执行：加载状态、采集、检测、去重、在一个事务中提交，
    /// 提交成功后依次发布 `new_alert` 与 `region_status_update`。
    pub async fn run_cycle(&self, region: &Region) -> Result<CycleSummary> {
        let lock = self.region_locks.get(&region.id).await;
        let _guard = lock.lock().await;

        let started_at = Utc::now();
        let mut state = self.store.load_or_init_state(&region.id).await?;
        state.is_active = true;
        state.last_cycle_at = Some(started_at);
        state.updated_at = started_at;

        let (fetched_at, detection) = match self.detect(region).await {
            Ok(result) => result,
            Err(e) => {
                self.mark_error(&mut state).await;
                error!(
                    region_id = %region.id,
                    region_name = %region.name,
                    error = %e,
                    "Detection failed, region marked as error"
                );
                return Err(e);
            }
        };

        state.threat_level = ThreatStatus::Assessed(detection.threat_level);
        state.anomaly_count = detection.anomaly_count;
        state.last_cycle_duration = detection.processing_time_seconds;
        state.last_data_fetch_at = Some(fetched_at);

        let mut index = self.store.active_index(&region.id).await?;
        let completed_at = Utc::now();
        let new_alerts: Vec<Alert> = detection
            .threats
            .iter()
            .filter_map(|threat| {
                self.lifecycle
                    .report_threat(&mut index, region, threat, completed_at)
            })
            .collect();
        state.updated_at = completed_at;

        if let Err(e) = self.store.commit_cycle(&state, &new_alerts).await {
            error!(
                region_id = %region.id,
                error = %e,
                "Cycle commit failed, changes rolled back"
            );
            return Err(e);
        }

        for alert in &new_alerts {
            info!(
                alert_id = %alert.id,
                region_id = %region.id,
                disaster_type = %alert.disaster_type,
                severity = %alert.severity,
                "New alert"
            );
            self.bus
                .publish_payload(topic::NEW_ALERT, &NewAlertEvent::new(alert, &region.name));
        }

        let summary = CycleSummary {
            region_id: region.id.clone(),
            region_name: region.name.clone(),
            threat_level: detection.threat_level,
            anomaly_count: detection.anomaly_count,
            threats_detected: detection.threats.len(),
            new_alerts,
            processing_time_seconds: detection.processing_time_seconds,
            completed_at,
        };
        self.bus.publish_payload(
            topic::REGION_STATUS_UPDATE,
            &RegionStatusEvent::from(&summary),
        );

        debug!(
            region_id = %region.id,
            threat_level = %summary.threat_level.as_str(),
            new_alerts = summary.new_alerts.len(),
            "Region cycle completed"
        );
        Ok(summary)
    }

    /// 按需分析单个区域（不要求区域开启监控）
    pub async fn analyze_on_demand(&self, region_id: &str) -> Result<CycleSummary> {
        let region = self.registry.require(region_id).await?;
        let summary = self.run_cycle(&region).await?;

        self.bus.publish_payload(
            topic::REGION_ANALYZED,
            &RegionAnalyzedEvent::from(&summary),
        );
        info!(
            region_id = %region.id,
            threat_level = %summary.threat_level.as_str(),
            "On-demand analysis completed"
        );
        Ok(summary)
    }

    async fn detect(&self, region: &Region) -> Result<(DateTime<Utc>, DetectionResult)> {
        let limit = self.config.collaborator_timeout;

        let payload = timeout(limit, self.data_source.fetch(&region.bounds))
            .await
            .map_err(|_| DataSourceError::Timeout(limit))??;
        let fetched_at = Utc::now();

        let detection = timeout(limit, self.detector.analyze(&payload, &region.name))
            .await
            .map_err(|_| DetectorError::Timeout(limit))??;

        Ok((fetched_at, detection))
    }

    /// 写入 error 标记；写入失败只记录日志，原始错误照常返回
    async fn mark_error(&self, state: &mut MonitoringState) {
        state.threat_level = ThreatStatus::Error;
        state.updated_at = Utc::now();
        if let Err(e) = self.store.save_state(state).await {
            warn!(
                region_id = %state.region_id,
                error = %e,
                "Failed to persist error marker"
            );
        }
    }

    // ========== 健康检查 ==========

    /// 计算并发布系统健康指标，同时写入各区域状态
    pub async fn run_health_tick(&self) -> Result<HealthSnapshot> {
        let inputs = self.store.health_inputs().await?;
        let snapshot = self.health.aggregate(inputs, self.is_running(), Utc::now());

        let updated = self
            .store
            .apply_health_gauges(snapshot.cpu_usage, snapshot.memory_usage, snapshot.timestamp)
            .await?;

        self.bus.publish_payload(
            topic::SYSTEM_HEALTH_UPDATE,
            &SystemHealthEvent::from(&snapshot),
        );
        debug!(
            active_alerts = snapshot.active_alerts,
            cpu_usage = snapshot.cpu_usage,
            memory_usage = snapshot.memory_usage,
            states = updated,
            "System health updated"
        );
        Ok(snapshot)
    }

    // ========== 告警操作 ==========

    pub async fn acknowledge_alert(&self, alert_id: &str, actor: &str) -> Result<Alert> {
        self.transition_alert(alert_id, AlertAction::Acknowledge, actor)
            .await
    }

    pub async fn resolve_alert(&self, alert_id: &str, actor: &str) -> Result<Alert> {
        self.transition_alert(alert_id, AlertAction::Resolve, actor)
            .await
    }

    pub async fn dismiss_alert(&self, alert_id: &str, actor: &str) -> Result<Alert> {
        self.transition_alert(alert_id, AlertAction::Dismiss, actor)
            .await
    }

    async fn transition_alert(
        &self,
        alert_id: &str,
        action: AlertAction,
        actor: &str,
    ) -> Result<Alert> {
        let mut alert = self
            .store
            .get_alert(alert_id)
            .await?
            .ok_or_else(|| MonitorError::not_found("alert", alert_id))?;

        let from = alert.status;
        self.lifecycle.apply(&mut alert, action, actor, Utc::now())?;
        self.store.transition(&alert, from, action).await?;

        info!(
            alert_id = %alert.id,
            action = %action,
            status = %alert.status,
            actor = %actor,
            "Alert updated"
        );
        self.bus
            .publish_payload(topic::ALERT_UPDATED, &AlertUpdatedEvent::new(&alert, actor));
        Ok(alert)
    }

    pub async fn list_alerts(&self, filter: AlertFilter) -> Result<Vec<Alert>> {
        self.store.list_alerts(filter).await
    }

    pub async fn alert_stats(&self) -> Result<AlertStats> {
        self.store.alert_stats(Utc::now()).await
    }

    /// 最近一周的告警统计报表
    pub async fn alert_statistics(&self) -> Result<AlertStatistics> {
        self.store.alert_statistics(Utc::now()).await
    }

    // ========== 区域状态 ==========

    pub async fn get_region_status(&self, region_id: &str) -> Result<MonitoringState> {
        self.store
            .get_state(region_id)
            .await?
            .ok_or_else(|| MonitorError::not_found("monitoring state for region", region_id))
    }

    /// 所有区域及其监控状态（尚未执行过周期的区域状态为 None）
    pub async fn list_region_statuses(&self) -> Result<Vec<RegionOverview>> {
        let regions = self.registry.list(RegionFilter::default()).await?;
        let mut states: HashMap<String, MonitoringState> = self
            .store
            .list_states()
            .await?
            .into_iter()
            .map(|s| (s.region_id.clone(), s))
            .collect();

        Ok(regions
            .into_iter()
            .map(|region| {
                let state = states.remove(&region.id);
                RegionOverview { region, state }
            })
            .collect())
    }
}
