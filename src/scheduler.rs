//! Scheduler (spec.md §4.J). Single live instance per process; jobs are
//! value types, replaced wholesale by rebinding rather than mutated in
//! place (spec.md §9 "Global mutable state").

use crate::aggregator::aggregate;
use crate::audit::ReportSink;
use crate::clock::Clock;
use crate::config::SchedulerConfig;
use crate::deposit::DepositLedger;
use crate::health::HealthInspector;
use crate::resolver::ConflictResolver;
use async_trait::async_trait;
use chrono::Duration as ChronoDuration;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;

const JOB_DEADLINE: std::time::Duration = std::time::Duration::from_secs(600);

/// One recurring unit of work the scheduler drives. Implementations own
/// whatever collaborators they need (Reservation Registry, Aggregator,
/// Health & Repair); the scheduler only owns timing and overlap policy.
#[async_trait]
pub trait SchedulerJob: std::fmt::Debug + Send + Sync {
    async fn run(&self);
    fn name(&self) -> &str;
}

#[derive(Debug)]
struct RunningJob {
    handle: JoinHandle<()>,
}

impl Drop for RunningJob {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

#[derive(Debug)]
pub struct Scheduler {
    config_tx: watch::Sender<SchedulerConfig>,
    clock: Arc<dyn Clock>,
    jobs: RwLock<Vec<RunningJob>>,
}

impl Scheduler {
    pub fn new(config: SchedulerConfig, clock: Arc<dyn Clock>) -> Self {
        let (config_tx, _rx) = watch::channel(config);
        Self { config_tx, clock, jobs: RwLock::new(Vec::new()) }
    }

    /// Starts (or restarts) all three recurring jobs. Any previously-running
    /// jobs are cancelled first; config changes propagate to running jobs
    /// without needing a restart, via the internal watch channel.
    pub async fn start(&self, daily_report: Arc<dyn SchedulerJob>, grace_sweep: Arc<dyn SchedulerJob>, health_check: Arc<dyn SchedulerJob>) {
        let mut jobs = self.jobs.write().await;
        jobs.clear();

        jobs.push(RunningJob { handle: self.spawn_daily(daily_report) });
        jobs.push(RunningJob { handle: self.spawn_interval(grace_sweep, |_cfg| ChronoDuration::days(1).to_std().unwrap_or_default(), "grace_sweep") });
        jobs.push(RunningJob {
            handle: self.spawn_interval(health_check, |cfg| std::time::Duration::from_secs(cfg.health_check_interval_hours as u64 * 3600), "health_check"),
        });
    }

    /// Atomically replaces configuration; running jobs observe the change on
    /// their next wait point without being torn down.
    pub fn update(&self, config: SchedulerConfig) {
        let _ = self.config_tx.send(config);
    }

    fn spawn_daily(&self, job: Arc<dyn SchedulerJob>) -> JoinHandle<()> {
        let clock = self.clock.clone();
        let mut config_rx = self.config_tx.subscribe();
        let running = Arc::new(AtomicBool::new(false));

        tokio::spawn(async move {
            loop {
                let target_time = config_rx.borrow().daily_report_at;
                let sleep_for = duration_until_next(clock.as_ref(), target_time);

                tokio::select! {
                    _ = tokio::time::sleep(sleep_for) => {
                        run_guarded(&job, &running).await;
                    }
                    changed = config_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        })
    }

    fn spawn_interval<F>(&self, job: Arc<dyn SchedulerJob>, interval_of: F, _label: &'static str) -> JoinHandle<()>
    where
        F: Fn(&SchedulerConfig) -> std::time::Duration + Send + Sync + 'static,
    {
        let mut config_rx = self.config_tx.subscribe();
        let running = Arc::new(AtomicBool::new(false));

        tokio::spawn(async move {
            loop {
                let sleep_for = interval_of(&config_rx.borrow());
                tokio::select! {
                    _ = tokio::time::sleep(sleep_for) => {
                        run_guarded(&job, &running).await;
                    }
                    changed = config_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                    }
                }
            }
        })
    }
}

/// Runs `job` unless a prior invocation of the same job is still in flight,
/// in which case this tick is skipped entirely. Enforces the per-run
/// deadline by aborting a job that overruns it.
async fn run_guarded(job: &Arc<dyn SchedulerJob>, running: &Arc<AtomicBool>) {
    if running.compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst).is_err() {
        log::warn!("skipping {} tick: previous run still in flight", job.name());
        return;
    }

    let job = job.clone();
    let running = running.clone();
    tokio::spawn(async move {
        match tokio::time::timeout(JOB_DEADLINE, job.run()).await {
            Ok(()) => {}
            Err(_) => log::warn!("{} exceeded its deadline and was terminated", job.name()),
        }
        running.store(false, Ordering::SeqCst);
    });
}

/// Concrete daily-report job (spec.md §4.I/§4.J): aggregates today's
/// deposits and hands the result to a `ReportSink`.
#[derive(Debug)]
pub struct DailyReportJob {
    deposits: Arc<DepositLedger>,
    report_sink: Arc<dyn ReportSink>,
    clock: Arc<dyn Clock>,
}

impl DailyReportJob {
    pub fn new(deposits: Arc<DepositLedger>, report_sink: Arc<dyn ReportSink>, clock: Arc<dyn Clock>) -> Self {
        Self { deposits, report_sink, clock }
    }
}

#[async_trait]
impl SchedulerJob for DailyReportJob {
    async fn run(&self) {
        let today = self.clock.now().date_naive();
        let deposits = self.deposits.by_date(today).await;
        let report = aggregate(&deposits);
        self.report_sink.deliver(today, &report).await;
    }

    fn name(&self) -> &str {
        "daily_report"
    }
}

/// Concrete grace-sweep job (spec.md §4.B/§4.J): expires every approved,
/// non-permanent reservation whose grace window has elapsed.
#[derive(Debug)]
pub struct GraceSweepJob {
    registry: Arc<crate::reservation::ReservationRegistry>,
    resolver: Arc<ConflictResolver>,
    clock: Arc<dyn Clock>,
    default_grace_days: i64,
}

impl GraceSweepJob {
    pub fn new(registry: Arc<crate::reservation::ReservationRegistry>, resolver: Arc<ConflictResolver>, clock: Arc<dyn Clock>, default_grace_days: i64) -> Self {
        Self { registry, resolver, clock, default_grace_days }
    }
}

#[async_trait]
impl SchedulerJob for GraceSweepJob {
    async fn run(&self) {
        let now = self.clock.now();
        let candidates = self.registry.expire_candidates(now, self.default_grace_days).await;
        for id in candidates {
            if let Err(err) = self.registry.expire(id, &self.resolver).await {
                log::warn!("grace sweep failed to expire reservation {id}: {err}");
            }
        }
    }

    fn name(&self) -> &str {
        "grace_sweep"
    }
}

/// Concrete health-check job (spec.md §4.J/§4.K): runs a full repair pass on
/// every tick so drift never persists longer than one interval.
#[derive(Debug)]
pub struct HealthCheckJob {
    inspector: Arc<HealthInspector>,
}

impl HealthCheckJob {
    pub fn new(inspector: Arc<HealthInspector>) -> Self {
        Self { inspector }
    }
}

#[async_trait]
impl SchedulerJob for HealthCheckJob {
    async fn run(&self) {
        match self.inspector.repair(&std::collections::HashMap::new()).await {
            Ok(summary) => log::info!("health check repaired {} record(s), recomputed {} batch count(s)", summary.records_reconciled, summary.batch_counts_recomputed),
            Err(err) => log::warn!("health check repair failed: {err}"),
        }
    }

    fn name(&self) -> &str {
        "health_check"
    }
}

fn duration_until_next(clock: &dyn Clock, target: chrono::NaiveTime) -> std::time::Duration {
    let now = clock.now();
    let today_target = now.date_naive().and_time(target).and_utc();
    let next = if today_target > now { today_target } else { today_target + ChronoDuration::days(1) };
    (next - now).to_std().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use chrono::{NaiveTime, TimeZone, Utc};
    use std::sync::atomic::AtomicU32;

    #[derive(Debug)]
    struct CountingJob {
        name: &'static str,
        count: Arc<AtomicU32>,
    }

    #[async_trait]
    impl SchedulerJob for CountingJob {
        async fn run(&self) {
            self.count.fetch_add(1, Ordering::SeqCst);
        }
        fn name(&self) -> &str {
            self.name
        }
    }

    #[test]
    fn duration_until_next_wraps_to_tomorrow_once_past() {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 1, 1, 2, 0, 0).unwrap());
        let target = NaiveTime::from_hms_opt(1, 0, 0).unwrap();
        let remaining = duration_until_next(&clock, target);
        assert!(remaining > std::time::Duration::from_secs(23 * 3600));
    }

    #[test]
    fn duration_until_next_same_day_when_still_ahead() {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        let target = NaiveTime::from_hms_opt(1, 0, 0).unwrap();
        let remaining = duration_until_next(&clock, target);
        assert_eq!(remaining, std::time::Duration::from_secs(3600));
    }

    #[derive(Debug, Default)]
    struct RecordingReportSink {
        delivered: std::sync::Mutex<Vec<chrono::NaiveDate>>,
    }

    #[async_trait]
    impl ReportSink for RecordingReportSink {
        async fn deliver(&self, date: chrono::NaiveDate, _report: &crate::aggregator::DailyReport) {
            self.delivered.lock().expect("lock poisoned").push(date);
        }
    }

    #[tokio::test]
    async fn daily_report_job_aggregates_todays_deposits_and_delivers() {
        use crate::ids::{ProductId, StaffId};
        use crate::money::Money;

        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()));
        let deposits = Arc::new(DepositLedger::new());
        deposits.insert(StaffId::new(), ProductId::new(), "ALICE", clock.now().date_naive(), Money::from_cents(100), "").await.unwrap();
        let sink = Arc::new(RecordingReportSink::default());

        let job = DailyReportJob::new(deposits, sink.clone(), clock.clone());
        job.run().await;

        let delivered = sink.delivered.lock().expect("lock poisoned");
        assert_eq!(delivered.as_slice(), &[clock.now().date_naive()]);
    }

    #[tokio::test]
    async fn grace_sweep_job_expires_reservations_past_their_grace_window() {
        use crate::audit::NullNotificationSink;
        use crate::ids::{ProductId, StaffId};
        use crate::record::RecordStore;
        use crate::reservation::{ReservationRegistry, ReservationState};

        let registry = Arc::new(ReservationRegistry::new(Arc::new(NullNotificationSink)));
        let records = Arc::new(RecordStore::new());
        let resolver = Arc::new(ConflictResolver::new(registry.clone(), records, Arc::new(NullNotificationSink)));
        let id = registry.create(Some("bob".into()), None, ProductId::new(), StaffId::new(), None, true, &resolver).await.unwrap();

        let future = Utc::now() + ChronoDuration::days(31);
        let clock = Arc::new(FixedClock::new(future));
        let job = GraceSweepJob::new(registry.clone(), resolver, clock, 30);
        job.run().await;

        let reservation = registry.get(id).await.unwrap();
        assert_eq!(reservation.state, ReservationState::Expired);
    }

    #[tokio::test]
    async fn health_check_job_runs_repair_without_error() {
        use crate::audit::NullNotificationSink;
        use crate::record::RecordStore;
        use crate::reservation::ReservationRegistry;

        let registry = Arc::new(ReservationRegistry::new(Arc::new(NullNotificationSink)));
        let records = Arc::new(RecordStore::new());
        let resolver = Arc::new(ConflictResolver::new(registry, records.clone(), Arc::new(NullNotificationSink)));
        let inspector = Arc::new(HealthInspector::new(records, resolver));

        let job = HealthCheckJob::new(inspector);
        job.run().await;
    }
}
