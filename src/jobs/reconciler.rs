//! Archival job reconciliation.
//!
//! Polls every incomplete job against its vault. A job that completes
//! successfully is marked complete and its effect is applied to the linked
//! record exactly once. A job whose remote status is `Failed` stays incomplete
//! and is polled again later. Completed jobs are deleted once they outlive
//! the retention window.

use std::{
    collections::{BTreeMap, HashMap},
    sync::Arc,
    time::Duration,
};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use thiserror::Error;
use uuid::Uuid;

use super::{Clock, PeriodicTask};
use crate::{
    config::ReconcilerConfig,
    db::{DbError, DbPool, DbResult},
    models::{ArchivalJob, JobType, Signal, Vault},
    observability::metrics,
    services::{ColdArchive, ColdArchiveConnector, ColdArchiveError, JobInfo},
    signals::{SignalError, SignalService},
};

const MAX_BACKOFF: Duration = Duration::from_secs(3600);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    StillRunning,
    RemoteFailed { status: String },
    BackedOff,
    Completed { job_type: JobType },
    Collected,
    Retained,
    Failed { error: String },
}

impl JobOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            JobOutcome::StillRunning => "still_running",
            JobOutcome::RemoteFailed { .. } => "remote_failed",
            JobOutcome::BackedOff => "backed_off",
            JobOutcome::Completed { .. } => "completed",
            JobOutcome::Collected => "collected",
            JobOutcome::Retained => "retained",
            JobOutcome::Failed { .. } => "failed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobResult {
    pub job_id: Uuid,
    pub outcome: JobOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultFailed {
    pub vault_id: Uuid,
    pub error: String,
}

#[derive(Debug, Default)]
pub struct ReconcileReport {
    pub jobs: Vec<JobResult>,
    pub failed_vaults: Vec<VaultFailed>,
}

impl ReconcileReport {
    pub fn counts(&self) -> BTreeMap<&'static str, u64> {
        let mut counts = BTreeMap::new();
        for job in &self.jobs {
            *counts.entry(job.outcome.label()).or_insert(0) += 1;
        }
        counts
    }

    pub fn count(&self, label: &str) -> u64 {
        self.counts().get(label).copied().unwrap_or(0)
    }

    pub fn outcome_of(&self, job_id: Uuid) -> Option<&JobOutcome> {
        self.jobs
            .iter()
            .find(|j| j.job_id == job_id)
            .map(|j| &j.outcome)
    }

    fn has_activity(&self) -> bool {
        !self.failed_vaults.is_empty()
            || self
                .jobs
                .iter()
                .any(|j| !matches!(j.outcome, JobOutcome::StillRunning | JobOutcome::Retained))
    }
}

#[derive(Debug, Error)]
enum ReconcileError {
    #[error(transparent)]
    Archive(#[from] ColdArchiveError),
    #[error(transparent)]
    Db(#[from] DbError),
    #[error(transparent)]
    Signal(#[from] SignalError),
}

/// Per-job streak of consecutive remote failures.
struct FailureBackoff {
    initial: Duration,
    streaks: Mutex<HashMap<Uuid, (u32, DateTime<Utc>)>>,
}

impl FailureBackoff {
    fn new(initial: Duration) -> Self {
        Self {
            initial,
            streaks: Mutex::new(HashMap::new()),
        }
    }

    fn is_waiting(&self, job_id: Uuid, now: DateTime<Utc>) -> bool {
        self.streaks
            .lock()
            .get(&job_id)
            .is_some_and(|(_, retry_at)| now < *retry_at)
    }

    fn record_failure(&self, job_id: Uuid, now: DateTime<Utc>) -> Duration {
        let mut streaks = self.streaks.lock();
        let failures = streaks.get(&job_id).map_or(0, |(n, _)| *n) + 1;
        let delay = self
            .initial
            .checked_mul(2u32.saturating_pow(failures - 1))
            .unwrap_or(MAX_BACKOFF)
            .min(MAX_BACKOFF);
        let retry_at = chrono::Duration::from_std(delay)
            .ok()
            .and_then(|d| now.checked_add_signed(d))
            .unwrap_or(now);
        streaks.insert(job_id, (failures, retry_at));
        delay
    }

    fn clear(&self, job_id: Uuid) {
        self.streaks.lock().remove(&job_id);
    }
}

pub struct JobReconciler {
    db: Arc<DbPool>,
    connector: Arc<dyn ColdArchiveConnector>,
    signals: Arc<SignalService>,
    clock: Arc<dyn Clock>,
    job_retention: chrono::Duration,
    backoff: Option<FailureBackoff>,
}

impl JobReconciler {
    pub fn new(
        db: Arc<DbPool>,
        connector: Arc<dyn ColdArchiveConnector>,
        signals: Arc<SignalService>,
        clock: Arc<dyn Clock>,
        config: &ReconcilerConfig,
    ) -> Self {
        Self {
            db,
            connector,
            signals,
            clock,
            job_retention: config.job_retention(),
            backoff: config.failed_job_backoff().map(FailureBackoff::new),
        }
    }

    /// Reconcile every job of every vault once.
    ///
    /// Only a failure to list vaults is returned as an error.
    pub async fn run_once(&self) -> DbResult<ReconcileReport> {
        let now = self.clock.now();
        let vaults = self.db.inventory().list_vaults().await?;
        let mut report = ReconcileReport::default();

        for vault in &vaults {
            if let Err(error) = self.reconcile_vault(vault, now, &mut report).await {
                tracing::warn!(vault_id = %vault.id, error = %error, "Failed to reconcile vault, skipping");
                report.failed_vaults.push(VaultFailed {
                    vault_id: vault.id,
                    error,
                });
            }
        }

        Ok(report)
    }

    #[tracing::instrument(skip_all, fields(vault_id = %vault.id, vault = %vault.name))]
    async fn reconcile_vault(
        &self,
        vault: &Vault,
        now: DateTime<Utc>,
        report: &mut ReconcileReport,
    ) -> Result<(), String> {
        let client = self
            .connector
            .connect(&vault.endpoint)
            .map_err(|e| e.to_string())?;
        let jobs = self
            .db
            .archival_jobs()
            .list_by_vault(vault.id)
            .await
            .map_err(|e| e.to_string())?;

        for job in &jobs {
            let outcome = match self.reconcile_job(client.as_ref(), vault, job, now).await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::warn!(job_id = %job.id, error = %e, "Failed to reconcile job, skipping");
                    JobOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            report.jobs.push(JobResult {
                job_id: job.id,
                outcome,
            });
        }
        Ok(())
    }

    /// Poll one job and apply its completion.
    ///
    /// The completion flag is set before the record update so that two
    /// reconcilers never apply the same effect. The cost is that an effect
    /// which fails to apply is not retried: the job stays complete and the
    /// failure is only reported.
    async fn reconcile_job(
        &self,
        client: &dyn ColdArchive,
        vault: &Vault,
        job: &ArchivalJob,
        now: DateTime<Utc>,
    ) -> Result<JobOutcome, ReconcileError> {
        if job.is_complete() {
            if now - job.created_at > self.job_retention {
                self.db.archival_jobs().delete(job.id).await?;
                tracing::debug!(job_id = %job.id, "Collected completed job");
                return Ok(JobOutcome::Collected);
            }
            return Ok(JobOutcome::Retained);
        }

        if let Some(backoff) = &self.backoff
            && backoff.is_waiting(job.id, now)
        {
            return Ok(JobOutcome::BackedOff);
        }

        let info = client.get_job_info(&vault.vault_id, &job.job_id).await?;
        if !info.completed {
            return Ok(JobOutcome::StillRunning);
        }

        if !info.succeeded() {
            let status = info.status_code.as_str().to_string();
            match &self.backoff {
                Some(backoff) => {
                    let delay = backoff.record_failure(job.id, now);
                    tracing::warn!(
                        job_id = %job.id,
                        remote_job_id = %job.job_id,
                        status = %status,
                        message = %info.status_message,
                        retry_in_secs = delay.as_secs(),
                        "Archival job failed remotely, will retry"
                    );
                }
                None => tracing::warn!(
                    job_id = %job.id,
                    remote_job_id = %job.job_id,
                    status = %status,
                    message = %info.status_message,
                    "Archival job failed remotely, will retry"
                ),
            }
            return Ok(JobOutcome::RemoteFailed { status });
        }

        if let Some(backoff) = &self.backoff {
            backoff.clear(job.id);
        }

        if !self.db.archival_jobs().mark_complete(job.id).await? {
            return Ok(JobOutcome::Retained);
        }
        if let Err(e) = self.apply_completion(job, &info, now).await {
            tracing::error!(
                job_id = %job.id,
                job_type = %job.job_type,
                record_id = ?job.record_id,
                error = %e,
                "Archival job completed but its effect was not applied"
            );
            return Err(e);
        }

        tracing::info!(job_id = %job.id, job_type = %job.job_type, "Archival job completed");
        Ok(JobOutcome::Completed {
            job_type: job.job_type,
        })
    }

    async fn apply_completion(
        &self,
        job: &ArchivalJob,
        info: &JobInfo,
        now: DateTime<Utc>,
    ) -> Result<(), ReconcileError> {
        let Some(record_id) = job.record_id else {
            return Ok(());
        };
        let records = self.db.records();

        match job.job_type {
            JobType::PushToOss => {
                records.restore_as_backup(record_id, now).await?;
                let detail = records.get_detail(record_id).await?.ok_or(DbError::NotFound)?;

                let host_id = detail.record.host_id.to_string();
                let signal = Signal::download(
                    &detail.full_path(),
                    &detail.location.oss_endpoint,
                    &detail.location.bucket,
                );
                let signal_id = self.signals.add_signal(&host_id, signal).await?;
                if self.signals.status().is_online(&host_id) {
                    self.signals.notify_signal(&host_id, &signal_id).await?;
                }
            }
            JobType::PullFromColdArchive => {
                records
                    .set_archive_copy(record_id, &info.archive_id, now)
                    .await?;
            }
            JobType::DeleteArchive => match records.delete(record_id).await {
                Ok(()) | Err(DbError::NotFound) => {}
                Err(e) => return Err(e.into()),
            },
            JobType::ArchiveRetrieval | JobType::InventoryRetrieval => {}
        }
        Ok(())
    }
}

#[async_trait]
impl PeriodicTask for JobReconciler {
    fn name(&self) -> &'static str {
        "job_reconciler"
    }

    async fn tick(&self) {
        match self.run_once().await {
            Ok(report) => {
                let counts = report.counts();
                for (label, count) in &counts {
                    metrics::record_job_reconciled(label, *count);
                }
                let collected = report.count("collected");
                if collected > 0 {
                    metrics::record_jobs_collected(collected);
                }

                if report.has_activity() {
                    tracing::info!(
                        failed_vaults = report.failed_vaults.len(),
                        ?counts,
                        "Job reconciliation complete"
                    );
                } else {
                    tracing::debug!(jobs = report.jobs.len(), "Job reconciliation complete, nothing changed");
                }
            }
            Err(e) => tracing::error!(error = %e, "Failed to list vaults"),
        }
    }
}

#[cfg(all(test, feature = "database-sqlite"))]
mod tests {
    use std::sync::atomic::{AtomicBool, Ordering};

    use super::*;
    use crate::{
        cache::{Cache, CacheError, CacheResult, MemoryCache},
        config::{MemoryCacheConfig, SignalsConfig},
        db::tests::harness::{self, Inventory, TEST_VAULT_ID},
        jobs::ManualClock,
        models::{NewArchivalJob, Record, RecordType},
        services::{
            JobStatusCode,
            testing::{ArchiveCall, FakeColdArchive, FakeConnector},
        },
    };

    struct Fixture {
        db: Arc<DbPool>,
        inventory: Inventory,
        archive: Arc<FakeColdArchive>,
        signals: Arc<SignalService>,
        clock: Arc<ManualClock>,
    }

    async fn fixture() -> Fixture {
        let db = Arc::new(harness::create_test_db().await);
        let inventory = harness::seed_inventory(&db).await;
        let cache = Arc::new(MemoryCache::new(&MemoryCacheConfig::default()));
        Fixture {
            db,
            inventory,
            archive: FakeColdArchive::new(),
            signals: Arc::new(SignalService::new(cache, &SignalsConfig::default())),
            clock: ManualClock::new(Utc::now()),
        }
    }

    impl Fixture {
        fn reconciler(&self, config: &ReconcilerConfig) -> JobReconciler {
            JobReconciler::new(
                self.db.clone(),
                FakeConnector::new(self.archive.clone()),
                self.signals.clone(),
                self.clock.clone(),
                config,
            )
        }

        async fn job(&self, job_type: JobType, remote_id: &str, record: Option<&Record>) -> ArchivalJob {
            self.db
                .archival_jobs()
                .create(NewArchivalJob {
                    vault_id: self.inventory.vault_id,
                    request_id: format!("req-{remote_id}"),
                    job_id: remote_id.to_string(),
                    job_type,
                    record_id: record.map(|r| r.id),
                })
                .await
                .expect("job")
        }

        async fn reload_job(&self, job: &ArchivalJob) -> Option<ArchivalJob> {
            self.db.archival_jobs().get_by_id(job.id).await.unwrap()
        }

        async fn reload(&self, record: &Record) -> Option<Record> {
            self.db.records().get_by_id(record.id).await.unwrap()
        }
    }

    #[tokio::test]
    async fn test_restore_completion_signals_connected_host() {
        let f = fixture().await;
        let record = f
            .inventory
            .create_archive(&f.db, "base.tar", Utc::now() - chrono::Duration::days(30), "arch-1")
            .await;
        let job = f.job(JobType::PushToOss, "job-r", Some(&record)).await;
        f.archive.set_job("job-r", JobStatusCode::Succeeded, "");
        let host = f.inventory.host_id.to_string();
        f.signals.status().mark_online(&host);

        let report = f.reconciler(&ReconcilerConfig::default()).run_once().await.unwrap();

        assert_eq!(
            report.outcome_of(job.id),
            Some(&JobOutcome::Completed {
                job_type: JobType::PushToOss
            })
        );
        assert!(f.reload_job(&job).await.unwrap().is_complete());

        let restored = f.reload(&record).await.unwrap();
        assert_eq!(restored.record_type, RecordType::Backup);
        assert_eq!(restored.backup_time, f.clock.now());

        let pending = f.signals.get_signals(&host).await.unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(
            pending[0].get("path").and_then(|v| v.as_str()),
            Some("postgres/db01/var/backups/base.tar")
        );
        assert_eq!(f.signals.dispatch().pending(&host), 1);
        assert!(f.archive.calls().contains(&ArchiveCall::JobInfo {
            vault_id: TEST_VAULT_ID.into(),
            job_id: "job-r".into(),
        }));
    }

    #[tokio::test]
    async fn test_restore_completion_for_offline_host_only_queues() {
        let f = fixture().await;
        let record = f
            .inventory
            .create_archive(&f.db, "base.tar", Utc::now(), "arch-1")
            .await;
        f.job(JobType::PushToOss, "job-r", Some(&record)).await;
        f.archive.set_job("job-r", JobStatusCode::Succeeded, "");
        let host = f.inventory.host_id.to_string();

        f.reconciler(&ReconcilerConfig::default()).run_once().await.unwrap();

        assert_eq!(f.signals.get_signals(&host).await.unwrap().len(), 1);
        assert_eq!(f.signals.dispatch().pending(&host), 0);
    }

    #[tokio::test]
    async fn test_archive_completion_attaches_archive_id() {
        let f = fixture().await;
        let record = f.inventory.create_backup(&f.db, "daily.tar", Utc::now()).await;
        f.job(JobType::PullFromColdArchive, "job-a", Some(&record)).await;
        f.archive.set_job("job-a", JobStatusCode::Succeeded, "arch-42");

        f.reconciler(&ReconcilerConfig::default()).run_once().await.unwrap();

        let updated = f.reload(&record).await.unwrap();
        assert_eq!(updated.archive_id.as_deref(), Some("arch-42"));
        assert_eq!(updated.archived_time, Some(f.clock.now()));
        assert_eq!(updated.record_type, RecordType::Backup);
    }

    #[tokio::test]
    async fn test_delete_completion_removes_record() {
        let f = fixture().await;
        let record = f
            .inventory
            .create_archive(&f.db, "old.tar", Utc::now(), "arch-1")
            .await;
        f.job(JobType::DeleteArchive, "job-d", Some(&record)).await;
        f.archive.set_job("job-d", JobStatusCode::Succeeded, "");

        f.reconciler(&ReconcilerConfig::default()).run_once().await.unwrap();

        assert!(f.reload(&record).await.is_none());
    }

    #[tokio::test]
    async fn test_in_progress_job_is_left_alone() {
        let f = fixture().await;
        let record = f.inventory.create_backup(&f.db, "daily.tar", Utc::now()).await;
        let job = f.job(JobType::PullFromColdArchive, "job-a", Some(&record)).await;

        let report = f.reconciler(&ReconcilerConfig::default()).run_once().await.unwrap();

        assert_eq!(report.outcome_of(job.id), Some(&JobOutcome::StillRunning));
        assert!(!f.reload_job(&job).await.unwrap().is_complete());
    }

    #[tokio::test]
    async fn test_remote_failure_is_retried_every_tick() {
        let f = fixture().await;
        let record = f.inventory.create_backup(&f.db, "daily.tar", Utc::now()).await;
        let job = f.job(JobType::PullFromColdArchive, "job-a", Some(&record)).await;
        f.archive.set_job("job-a", JobStatusCode::Failed, "");
        let reconciler = f.reconciler(&ReconcilerConfig::default());

        for polls in 1..=3 {
            let report = reconciler.run_once().await.unwrap();
            assert_eq!(
                report.outcome_of(job.id),
                Some(&JobOutcome::RemoteFailed {
                    status: "Failed".into()
                })
            );
            assert_eq!(f.archive.polls(), polls);
        }
        assert!(!f.reload_job(&job).await.unwrap().is_complete());
        assert!(f.reload(&record).await.unwrap().archive_id.is_none());
    }

    #[tokio::test]
    async fn test_remote_failure_backoff_doubles() {
        let f = fixture().await;
        let job = f.job(JobType::InventoryRetrieval, "job-i", None).await;
        f.archive.set_job("job-i", JobStatusCode::Failed, "");
        let reconciler = f.reconciler(&ReconcilerConfig {
            failed_job_backoff_secs: 60,
            ..Default::default()
        });

        let outcome = |report: ReconcileReport| report.outcome_of(job.id).cloned();
        let failed = Some(JobOutcome::RemoteFailed {
            status: "Failed".into(),
        });

        assert_eq!(outcome(reconciler.run_once().await.unwrap()), failed);
        assert_eq!(
            outcome(reconciler.run_once().await.unwrap()),
            Some(JobOutcome::BackedOff)
        );

        f.clock.advance(chrono::Duration::seconds(60));
        assert_eq!(outcome(reconciler.run_once().await.unwrap()), failed);

        // Second failure waits twice as long
        f.clock.advance(chrono::Duration::seconds(60));
        assert_eq!(
            outcome(reconciler.run_once().await.unwrap()),
            Some(JobOutcome::BackedOff)
        );
        f.clock.advance(chrono::Duration::seconds(60));
        assert_eq!(outcome(reconciler.run_once().await.unwrap()), failed);
        assert_eq!(f.archive.polls(), 3);
    }

    #[test]
    fn test_backoff_is_capped() {
        let backoff = FailureBackoff::new(Duration::from_secs(600));
        let job = Uuid::new_v4();
        let now = Utc::now();
        let delays: Vec<_> = (0..6).map(|_| backoff.record_failure(job, now)).collect();
        assert_eq!(delays[0], Duration::from_secs(600));
        assert_eq!(delays[1], Duration::from_secs(1200));
        assert_eq!(delays[2], Duration::from_secs(2400));
        assert!(delays[3..].iter().all(|d| *d == MAX_BACKOFF));

        backoff.clear(job);
        assert!(!backoff.is_waiting(job, now));
    }

    #[tokio::test]
    async fn test_completed_job_is_not_reapplied() {
        let f = fixture().await;
        let record = f
            .inventory
            .create_archive(&f.db, "base.tar", Utc::now(), "arch-1")
            .await;
        let job = f.job(JobType::PushToOss, "job-r", Some(&record)).await;
        f.archive.set_job("job-r", JobStatusCode::Succeeded, "");
        let reconciler = f.reconciler(&ReconcilerConfig::default());
        let host = f.inventory.host_id.to_string();

        reconciler.run_once().await.unwrap();
        let second = reconciler.run_once().await.unwrap();

        assert_eq!(second.outcome_of(job.id), Some(&JobOutcome::Retained));
        assert_eq!(f.archive.polls(), 1);
        assert_eq!(f.signals.get_signals(&host).await.unwrap().len(), 1);
    }

    /// Memory cache whose writes can be switched off.
    struct FlakyCache {
        inner: MemoryCache,
        fail_writes: AtomicBool,
    }

    #[async_trait]
    impl Cache for FlakyCache {
        async fn get_bytes(&self, key: &str) -> CacheResult<Option<Vec<u8>>> {
            self.inner.get_bytes(key).await
        }

        async fn set_bytes(&self, key: &str, value: &[u8], ttl: Duration) -> CacheResult<()> {
            if self.fail_writes.load(Ordering::SeqCst) {
                return Err(CacheError::Internal("cache unavailable".into()));
            }
            self.inner.set_bytes(key, value, ttl).await
        }

        async fn exists(&self, key: &str) -> CacheResult<bool> {
            self.inner.exists(key).await
        }

        async fn delete(&self, key: &str) -> CacheResult<()> {
            self.inner.delete(key).await
        }
    }

    #[tokio::test]
    async fn test_failed_completion_effect_is_not_retried() {
        let f = fixture().await;
        let cache = Arc::new(FlakyCache {
            inner: MemoryCache::new(&MemoryCacheConfig::default()),
            fail_writes: AtomicBool::new(true),
        });
        let signals = Arc::new(SignalService::new(cache.clone(), &SignalsConfig::default()));
        let reconciler = JobReconciler::new(
            f.db.clone(),
            FakeConnector::new(f.archive.clone()),
            signals.clone(),
            f.clock.clone(),
            &ReconcilerConfig::default(),
        );
        let record = f
            .inventory
            .create_archive(&f.db, "base.tar", Utc::now(), "arch-1")
            .await;
        let job = f.job(JobType::PushToOss, "job-r", Some(&record)).await;
        f.archive.set_job("job-r", JobStatusCode::Succeeded, "");
        let host = f.inventory.host_id.to_string();

        let report = reconciler.run_once().await.unwrap();
        assert!(matches!(report.outcome_of(job.id), Some(JobOutcome::Failed { .. })));
        assert!(f.reload_job(&job).await.unwrap().is_complete());
        assert_eq!(f.reload(&record).await.unwrap().record_type, RecordType::Backup);

        // Even once the cache recovers, the signal is not sent
        cache.fail_writes.store(false, Ordering::SeqCst);
        let report = reconciler.run_once().await.unwrap();
        assert_eq!(report.outcome_of(job.id), Some(&JobOutcome::Retained));
        assert!(signals.get_signals(&host).await.unwrap().is_empty());
        assert_eq!(f.archive.polls(), 1);
    }

    #[tokio::test]
    async fn test_old_completed_job_is_collected() {
        let f = fixture().await;
        let job = f.job(JobType::InventoryRetrieval, "job-i", None).await;
        f.db.archival_jobs().mark_complete(job.id).await.unwrap();
        let reconciler = f.reconciler(&ReconcilerConfig::default());

        f.clock.advance(chrono::Duration::days(6));
        let report = reconciler.run_once().await.unwrap();
        assert_eq!(report.outcome_of(job.id), Some(&JobOutcome::Retained));

        f.clock.advance(chrono::Duration::days(2));
        let report = reconciler.run_once().await.unwrap();
        assert_eq!(report.outcome_of(job.id), Some(&JobOutcome::Collected));
        assert!(f.reload_job(&job).await.is_none());
        assert_eq!(f.archive.polls(), 0);
    }

    #[tokio::test]
    async fn test_poll_failure_is_contained() {
        let f = fixture().await;
        let a = f.job(JobType::InventoryRetrieval, "job-1", None).await;
        let b = f.job(JobType::InventoryRetrieval, "job-2", None).await;
        f.archive.fail_polls(true);

        let report = f.reconciler(&ReconcilerConfig::default()).run_once().await.unwrap();

        assert_eq!(report.count("failed"), 2);
        assert!(matches!(report.outcome_of(a.id), Some(JobOutcome::Failed { .. })));
        assert!(matches!(report.outcome_of(b.id), Some(JobOutcome::Failed { .. })));
        assert!(report.failed_vaults.is_empty());
    }
}
