//! Policy evaluation.
//!
//! One tick loads every policy, resolves its window and filter combinations,
//! thins the matching records and applies the policy action to each record.
//! Failures are contained per record (or per policy for query errors) and
//! collected into a [`PolicyRunReport`].

use std::{collections::BTreeMap, sync::Arc, time::Instant};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;
use uuid::Uuid;

use super::{
    thinning::{self, Sample},
    window::PolicyWindow,
};
use crate::{
    db::{DbError, DbPool, DbResult},
    jobs::{Clock, PeriodicTask},
    models::{
        JobType, NewArchivalJob, Policy, PolicyAction, RecordDetail, RecordQuery, RecordType,
    },
    observability::metrics,
    services::{ColdArchiveConnector, ColdArchiveError, ObjectStorage, ObjectStorageError},
};

/// What happened to one record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Kept,
    ArchiveSubmitted { job_id: Uuid },
    DeleteArchiveSubmitted { job_id: Uuid },
    Deleted,
    ConvertedToArchive,
    Skipped { reason: String },
    Failed { error: String },
}

impl RecordOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            RecordOutcome::Kept => "kept",
            RecordOutcome::ArchiveSubmitted { .. } => "archive_submitted",
            RecordOutcome::DeleteArchiveSubmitted { .. } => "delete_archive_submitted",
            RecordOutcome::Deleted => "deleted",
            RecordOutcome::ConvertedToArchive => "converted_to_archive",
            RecordOutcome::Skipped { .. } => "skipped",
            RecordOutcome::Failed { .. } => "failed",
        }
    }

    fn skipped(reason: &str) -> Self {
        RecordOutcome::Skipped {
            reason: reason.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordDecision {
    pub policy_id: Uuid,
    pub record_id: Uuid,
    pub outcome: RecordOutcome,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicySkipped {
    pub policy_id: Uuid,
    pub reason: String,
}

/// Everything one evaluation tick decided.
#[derive(Debug, Default)]
pub struct PolicyRunReport {
    pub policies_evaluated: usize,
    pub decisions: Vec<RecordDecision>,
    pub skipped_policies: Vec<PolicySkipped>,
}

impl PolicyRunReport {
    /// Decision counts keyed by outcome label.
    pub fn counts(&self) -> BTreeMap<&'static str, u64> {
        let mut counts = BTreeMap::new();
        for decision in &self.decisions {
            *counts.entry(decision.outcome.label()).or_insert(0) += 1;
        }
        counts
    }

    pub fn count(&self, label: &str) -> u64 {
        self.counts().get(label).copied().unwrap_or(0)
    }

    /// Whether anything beyond keeping and skipping happened.
    pub fn has_changes(&self) -> bool {
        self.decisions.iter().any(|d| {
            !matches!(
                d.outcome,
                RecordOutcome::Kept | RecordOutcome::Skipped { .. }
            )
        })
    }

    pub fn outcomes_for(&self, record_id: Uuid) -> Vec<&RecordOutcome> {
        self.decisions
            .iter()
            .filter(|d| d.record_id == record_id)
            .map(|d| &d.outcome)
            .collect()
    }
}

#[derive(Debug, Error)]
enum ActionError {
    #[error(transparent)]
    Archive(#[from] ColdArchiveError),
    #[error(transparent)]
    Storage(#[from] ObjectStorageError),
    #[error(transparent)]
    Db(#[from] DbError),
}

pub struct PolicyEvaluator {
    db: Arc<DbPool>,
    connector: Arc<dyn ColdArchiveConnector>,
    storage: Option<Arc<dyn ObjectStorage>>,
    clock: Arc<dyn Clock>,
}

impl PolicyEvaluator {
    pub fn new(
        db: Arc<DbPool>,
        connector: Arc<dyn ColdArchiveConnector>,
        storage: Option<Arc<dyn ObjectStorage>>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            db,
            connector,
            storage,
            clock,
        }
    }

    /// Evaluate every policy once.
    ///
    /// Only a failure to load the policy list is returned as an error.
    pub async fn run_once(&self) -> DbResult<PolicyRunReport> {
        let now = self.clock.now();
        let policies = self.db.policies().list().await?;
        let mut report = PolicyRunReport::default();

        for policy in &policies {
            self.evaluate_policy(policy, now, &mut report).await;
            report.policies_evaluated += 1;
        }

        Ok(report)
    }

    #[tracing::instrument(skip_all, fields(policy_id = %policy.id, policy = %policy.name))]
    async fn evaluate_policy(
        &self,
        policy: &Policy,
        now: DateTime<Utc>,
        report: &mut PolicyRunReport,
    ) {
        let window = match PolicyWindow::for_policy(policy, now) {
            Ok(window) => window,
            Err(e) => {
                tracing::warn!(error = %e, "Misconfigured policy window, skipping");
                report.skipped_policies.push(PolicySkipped {
                    policy_id: policy.id,
                    reason: e.to_string(),
                });
                return;
            }
        };

        let record_type = policy.target.record_type();
        for (app_set_id, host_id, path_id) in filter_combinations(policy) {
            let query = RecordQuery {
                record_type,
                backup_set_id: policy.backup_set_id,
                app_set_id,
                host_id,
                path_id,
                window_start: window.start,
                window_end: window.end,
            };
            let records = match self.db.records().list_for_policy(&query).await {
                Ok(records) => records,
                Err(e) => {
                    tracing::warn!(error = %e, "Failed to query records, skipping");
                    report.skipped_policies.push(PolicySkipped {
                        policy_id: policy.id,
                        reason: format!("record query failed: {e}"),
                    });
                    continue;
                }
            };
            if records.is_empty() {
                continue;
            }

            let times: Vec<_> = records
                .iter()
                .map(|d| {
                    d.record
                        .retention_time(record_type)
                        .unwrap_or(d.record.backup_time)
                })
                .collect();
            let samples = thinning::plan(&times, policy.step);

            for (detail, sample) in records.iter().zip(samples) {
                let outcome = match self.apply(policy.action, sample, detail).await {
                    Ok(outcome) => outcome,
                    Err(e) => {
                        tracing::warn!(
                            record_id = %detail.record.id,
                            error = %e,
                            "Failed to apply policy to record, skipping"
                        );
                        RecordOutcome::Failed {
                            error: e.to_string(),
                        }
                    }
                };
                report.decisions.push(RecordDecision {
                    policy_id: policy.id,
                    record_id: detail.record.id,
                    outcome,
                });
            }
        }
    }

    async fn apply(
        &self,
        action: PolicyAction,
        sample: Sample,
        detail: &RecordDetail,
    ) -> Result<RecordOutcome, ActionError> {
        let record_type = detail.record.record_type;
        match (sample, action, record_type) {
            (Sample::Kept, PolicyAction::Archive, RecordType::Backup) => {
                self.archive(detail).await
            }
            (Sample::Kept, _, _) => Ok(RecordOutcome::Kept),
            (Sample::Disposable, PolicyAction::Archive, RecordType::Archive) => {
                Ok(RecordOutcome::skipped("already archived"))
            }
            (Sample::Disposable, PolicyAction::Archive, RecordType::Backup) => {
                Ok(RecordOutcome::skipped("not a kept sample"))
            }
            (Sample::Disposable, PolicyAction::Delete, RecordType::Backup) => {
                self.delete_backup(detail).await
            }
            (Sample::Disposable, PolicyAction::Delete, RecordType::Archive) => {
                self.delete_archive(detail).await
            }
        }
    }

    /// Promote a kept backup into cold storage.
    async fn archive(&self, detail: &RecordDetail) -> Result<RecordOutcome, ActionError> {
        let record = &detail.record;
        if record.has_archive_copy() {
            return Ok(RecordOutcome::skipped("already has an archive copy"));
        }
        if self
            .db
            .archival_jobs()
            .has_pending(record.id, JobType::PullFromColdArchive)
            .await?
        {
            return Ok(RecordOutcome::skipped("archive job pending"));
        }
        let Some(vault) = &detail.location.vault else {
            return Ok(RecordOutcome::skipped("backup set has no vault"));
        };

        let full_path = detail.full_path();
        let client = self.connector.connect(&vault.endpoint)?;
        let handle = client
            .archive_to_oas(
                &vault.vault_id,
                &detail.location.oss_endpoint,
                &detail.location.bucket,
                &full_path,
                &full_path,
            )
            .await?;

        let job = self
            .db
            .archival_jobs()
            .create(NewArchivalJob {
                vault_id: vault.id,
                request_id: handle.request_id,
                job_id: handle.job_id,
                job_type: JobType::PullFromColdArchive,
                record_id: Some(record.id),
            })
            .await?;

        tracing::debug!(record_id = %record.id, job_id = %job.id, "Archive submitted");
        Ok(RecordOutcome::ArchiveSubmitted { job_id: job.id })
    }

    /// Drop the live copy; keep the record as archive-only when a cold copy exists.
    async fn delete_backup(&self, detail: &RecordDetail) -> Result<RecordOutcome, ActionError> {
        let record = &detail.record;
        // The pending job still reads the live object
        if self
            .db
            .archival_jobs()
            .has_pending(record.id, JobType::PullFromColdArchive)
            .await?
        {
            return Ok(RecordOutcome::skipped("archive job pending"));
        }
        let storage = self
            .storage
            .as_ref()
            .ok_or(ObjectStorageError::NotConfigured)?;

        storage
            .delete_object(
                &detail.location.oss_endpoint,
                &detail.location.bucket,
                &detail.full_path(),
            )
            .await?;

        if record.has_archive_copy() {
            self.db.records().convert_to_archive(record.id).await?;
            tracing::debug!(record_id = %record.id, "Backup converted to archive");
            Ok(RecordOutcome::ConvertedToArchive)
        } else {
            self.db.records().delete(record.id).await?;
            tracing::debug!(record_id = %record.id, "Backup deleted");
            Ok(RecordOutcome::Deleted)
        }
    }

    async fn delete_archive(&self, detail: &RecordDetail) -> Result<RecordOutcome, ActionError> {
        let record = &detail.record;
        let Some(archive_id) = record.archive_id.as_deref().filter(|id| !id.is_empty()) else {
            return Ok(RecordOutcome::skipped("no archive id"));
        };
        if self
            .db
            .archival_jobs()
            .has_pending(record.id, JobType::DeleteArchive)
            .await?
        {
            return Ok(RecordOutcome::skipped("delete job pending"));
        }
        let Some(vault) = &detail.location.vault else {
            return Ok(RecordOutcome::skipped("backup set has no vault"));
        };

        let client = self.connector.connect(&vault.endpoint)?;
        let handle = client.delete_archive(&vault.vault_id, archive_id).await?;

        let job = self
            .db
            .archival_jobs()
            .create(NewArchivalJob {
                vault_id: vault.id,
                request_id: handle.request_id,
                job_id: handle.job_id,
                job_type: JobType::DeleteArchive,
                record_id: Some(record.id),
            })
            .await?;

        tracing::debug!(record_id = %record.id, job_id = %job.id, "Archive deletion submitted");
        Ok(RecordOutcome::DeleteArchiveSubmitted { job_id: job.id })
    }
}

#[async_trait]
impl PeriodicTask for PolicyEvaluator {
    fn name(&self) -> &'static str {
        "policy_evaluator"
    }

    async fn tick(&self) {
        let start = Instant::now();
        match self.run_once().await {
            Ok(report) => {
                let counts = report.counts();
                for (label, count) in &counts {
                    metrics::record_policy_action(label, *count);
                }
                metrics::record_policy_tick("ok", start.elapsed().as_secs_f64());

                if report.has_changes() || !report.skipped_policies.is_empty() {
                    tracing::info!(
                        policies = report.policies_evaluated,
                        skipped_policies = report.skipped_policies.len(),
                        ?counts,
                        "Policy evaluation complete"
                    );
                } else {
                    tracing::debug!(
                        policies = report.policies_evaluated,
                        "Policy evaluation complete, nothing to do"
                    );
                }
            }
            Err(e) => {
                metrics::record_policy_tick("failed", start.elapsed().as_secs_f64());
                tracing::error!(error = %e, "Failed to load policies");
            }
        }
    }
}

/// App set × host × path, an empty filter set acting as a wildcard.
fn filter_combinations(policy: &Policy) -> Vec<(Option<Uuid>, Option<Uuid>, Option<Uuid>)> {
    let mut combinations = Vec::new();
    for app_set_id in or_wildcard(&policy.app_set_ids) {
        for host_id in or_wildcard(&policy.host_ids) {
            for path_id in or_wildcard(&policy.path_ids) {
                combinations.push((app_set_id, host_id, path_id));
            }
        }
    }
    combinations
}

fn or_wildcard(ids: &[Uuid]) -> Vec<Option<Uuid>> {
    if ids.is_empty() {
        vec![None]
    } else {
        ids.iter().copied().map(Some).collect()
    }
}

#[cfg(all(test, feature = "database-sqlite"))]
mod tests {
    use chrono::{Duration, TimeZone};

    use super::*;
    use crate::{
        db::tests::harness::{self, Inventory, TEST_BUCKET, TEST_OSS_ENDPOINT, TEST_VAULT_ID},
        jobs::ManualClock,
        models::{
            CreatePolicy, CreateRecord, PolicyTarget, RESERVE_ALL, RESERVE_NONE, Record,
            UNBOUNDED_PAST,
        },
        services::testing::{ArchiveCall, FakeColdArchive, FakeConnector, FakeObjectStorage},
    };

    const DAY: i64 = 86_400;

    struct Fixture {
        db: Arc<DbPool>,
        inventory: Inventory,
        archive: Arc<FakeColdArchive>,
        storage: Arc<FakeObjectStorage>,
        evaluator: PolicyEvaluator,
    }

    fn base() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    }

    fn at(secs: i64) -> DateTime<Utc> {
        base() + Duration::seconds(secs)
    }

    async fn fixture() -> Fixture {
        let db = Arc::new(harness::create_test_db().await);
        let inventory = harness::seed_inventory(&db).await;
        let archive = FakeColdArchive::new();
        let storage = FakeObjectStorage::new();
        let evaluator = PolicyEvaluator::new(
            db.clone(),
            FakeConnector::new(archive.clone()),
            Some(storage.clone() as Arc<dyn ObjectStorage>),
            ManualClock::new(at(100_000)),
        );
        Fixture {
            db,
            inventory,
            archive,
            storage,
            evaluator,
        }
    }

    impl Fixture {
        async fn policy(&self, target: PolicyTarget, action: PolicyAction, step: i64) -> Policy {
            self.policy_with(CreatePolicy {
                name: "nightly".into(),
                target,
                action,
                target_start: 0,
                target_end: UNBOUNDED_PAST,
                step,
                backup_set_id: self.inventory.backup_set_id,
                app_set_ids: vec![],
                host_ids: vec![],
                path_ids: vec![],
            })
            .await
        }

        async fn policy_with(&self, input: CreatePolicy) -> Policy {
            self.db.policies().create(input).await.expect("policy")
        }

        async fn backups(&self, offsets: &[i64]) -> Vec<Record> {
            let mut records = Vec::new();
            for (i, offset) in offsets.iter().enumerate() {
                records.push(
                    self.inventory
                        .create_backup(&self.db, &format!("b{i}.tar"), at(*offset))
                        .await,
                );
            }
            records
        }

        async fn archives(&self, offsets: &[i64]) -> Vec<Record> {
            let mut records = Vec::new();
            for (i, offset) in offsets.iter().enumerate() {
                records.push(
                    self.inventory
                        .create_archive(&self.db, &format!("a{i}.tar"), at(*offset), &format!("arch-{i}"))
                        .await,
                );
            }
            records
        }

        async fn exists(&self, record: &Record) -> bool {
            self.db.records().get_by_id(record.id).await.unwrap().is_some()
        }

        async fn reload(&self, record: &Record) -> Record {
            self.db.records().get_by_id(record.id).await.unwrap().unwrap()
        }
    }

    #[tokio::test]
    async fn test_daily_delete_thins_backups() {
        let f = fixture().await;
        f.policy(PolicyTarget::Backup, PolicyAction::Delete, DAY).await;
        let records = f.backups(&[0, 3600, 90_000]).await;

        let report = f.evaluator.run_once().await.unwrap();

        assert_eq!(report.outcomes_for(records[0].id), vec![&RecordOutcome::Kept]);
        assert_eq!(report.outcomes_for(records[1].id), vec![&RecordOutcome::Deleted]);
        assert_eq!(report.outcomes_for(records[2].id), vec![&RecordOutcome::Kept]);

        assert!(f.exists(&records[0]).await);
        assert!(!f.exists(&records[1]).await);
        assert!(f.exists(&records[2]).await);
        assert_eq!(
            f.storage.deleted(),
            vec![(
                TEST_OSS_ENDPOINT.to_string(),
                TEST_BUCKET.to_string(),
                "postgres/db01/var/backups/b1.tar".to_string()
            )]
        );
    }

    #[tokio::test]
    async fn test_delete_keeps_archived_backup_as_archive() {
        let f = fixture().await;
        f.policy(PolicyTarget::Backup, PolicyAction::Delete, RESERVE_NONE).await;
        let first = f.inventory.create_backup(&f.db, "first.tar", at(0)).await;
        let archived = f
            .db
            .records()
            .create(CreateRecord {
                archive_id: Some("arch-9".into()),
                archived_time: Some(at(50)),
                ..f.inventory.record_input("second.tar", at(10))
            })
            .await
            .unwrap();

        let report = f.evaluator.run_once().await.unwrap();

        assert_eq!(report.outcomes_for(first.id), vec![&RecordOutcome::Kept]);
        assert_eq!(
            report.outcomes_for(archived.id),
            vec![&RecordOutcome::ConvertedToArchive]
        );
        let reloaded = f.reload(&archived).await;
        assert_eq!(reloaded.record_type, RecordType::Archive);
        assert_eq!(reloaded.archive_id.as_deref(), Some("arch-9"));
        assert_eq!(f.storage.deleted().len(), 1);
    }

    #[tokio::test]
    async fn test_reserve_none_keeps_only_first_backup() {
        let f = fixture().await;
        f.policy(PolicyTarget::Backup, PolicyAction::Delete, RESERVE_NONE).await;
        let records = f.backups(&[0, 10, 5 * DAY, 6 * DAY]).await;

        let report = f.evaluator.run_once().await.unwrap();

        assert_eq!(report.count("kept"), 1);
        assert_eq!(report.count("deleted"), 3);
        assert!(f.exists(&records[0]).await);
        for record in &records[1..] {
            assert!(!f.exists(record).await);
        }
    }

    #[tokio::test]
    async fn test_reserve_all_archives_every_backup_and_deletes_nothing() {
        let f = fixture().await;
        f.policy(PolicyTarget::Backup, PolicyAction::Archive, RESERVE_ALL).await;
        let records = f.backups(&[0, 10, 20]).await;

        let report = f.evaluator.run_once().await.unwrap();

        assert_eq!(report.count("archive_submitted"), 3);
        assert!(f.storage.deleted().is_empty());
        for record in &records {
            assert!(f.exists(record).await);
            assert!(
                f.db.archival_jobs()
                    .has_pending(record.id, JobType::PullFromColdArchive)
                    .await
                    .unwrap()
            );
        }
        assert_eq!(
            f.archive.calls()[0],
            ArchiveCall::Archive {
                vault_id: TEST_VAULT_ID.into(),
                object: "postgres/db01/var/backups/b0.tar".into(),
            }
        );
    }

    #[tokio::test]
    async fn test_rerun_is_idempotent() {
        let f = fixture().await;
        f.policy(PolicyTarget::Backup, PolicyAction::Archive, DAY).await;
        f.backups(&[0, 3600, 2 * DAY]).await;

        let first = f.evaluator.run_once().await.unwrap();
        assert_eq!(first.count("archive_submitted"), 2);
        assert_eq!(f.archive.submissions(), 2);

        let second = f.evaluator.run_once().await.unwrap();
        assert_eq!(second.count("archive_submitted"), 0);
        assert!(!second.has_changes());
        assert_eq!(f.archive.submissions(), 2);
    }

    #[tokio::test]
    async fn test_archive_action_leaves_disposable_backup_alone() {
        let f = fixture().await;
        f.policy(PolicyTarget::Backup, PolicyAction::Archive, RESERVE_NONE).await;
        let records = f.backups(&[0, 10]).await;

        let report = f.evaluator.run_once().await.unwrap();

        assert!(matches!(
            report.outcomes_for(records[0].id)[..],
            [RecordOutcome::ArchiveSubmitted { .. }]
        ));
        assert!(matches!(
            report.outcomes_for(records[1].id)[..],
            [RecordOutcome::Skipped { .. }]
        ));
        assert!(f.exists(&records[1]).await);
        assert!(f.storage.deleted().is_empty());
    }

    #[tokio::test]
    async fn test_kept_backup_with_archive_copy_is_not_resubmitted() {
        let f = fixture().await;
        f.policy(PolicyTarget::Backup, PolicyAction::Archive, RESERVE_ALL).await;
        f.db.records()
            .create(CreateRecord {
                archive_id: Some("arch-1".into()),
                archived_time: Some(at(5)),
                ..f.inventory.record_input("done.tar", at(0))
            })
            .await
            .unwrap();

        let report = f.evaluator.run_once().await.unwrap();

        assert_eq!(report.count("skipped"), 1);
        assert_eq!(f.archive.submissions(), 0);
    }

    #[tokio::test]
    async fn test_archive_target_delete_submits_delete_jobs_once() {
        let f = fixture().await;
        f.policy(PolicyTarget::Archive, PolicyAction::Delete, RESERVE_NONE).await;
        let records = f.archives(&[0, 100, 200]).await;

        let report = f.evaluator.run_once().await.unwrap();

        assert_eq!(report.outcomes_for(records[0].id), vec![&RecordOutcome::Kept]);
        assert_eq!(report.count("delete_archive_submitted"), 2);
        assert_eq!(
            f.archive.calls()[0],
            ArchiveCall::Delete {
                vault_id: TEST_VAULT_ID.into(),
                archive_id: "arch-1".into(),
            }
        );
        // The record itself goes away only when the job completes
        assert!(f.exists(&records[1]).await);

        let second = f.evaluator.run_once().await.unwrap();
        assert_eq!(second.count("delete_archive_submitted"), 0);
        assert_eq!(f.archive.submissions(), 2);
    }

    #[tokio::test]
    async fn test_inverted_window_skips_policy() {
        let f = fixture().await;
        let policy = f
            .policy_with(CreatePolicy {
                name: "broken".into(),
                target: PolicyTarget::Backup,
                action: PolicyAction::Delete,
                target_start: 2 * DAY,
                target_end: DAY,
                step: RESERVE_NONE,
                backup_set_id: f.inventory.backup_set_id,
                app_set_ids: vec![],
                host_ids: vec![],
                path_ids: vec![],
            })
            .await;
        let records = f.backups(&[0, 10]).await;

        let report = f.evaluator.run_once().await.unwrap();

        assert_eq!(report.skipped_policies.len(), 1);
        assert_eq!(report.skipped_policies[0].policy_id, policy.id);
        assert!(report.decisions.is_empty());
        assert!(f.exists(&records[1]).await);
    }

    #[tokio::test]
    async fn test_window_excludes_recent_records() {
        let f = fixture().await;
        // Clock is at 100_000s; only records at least 20_000s old are in scope
        f.policy_with(CreatePolicy {
            name: "older".into(),
            target: PolicyTarget::Backup,
            action: PolicyAction::Delete,
            target_start: 20_000,
            target_end: UNBOUNDED_PAST,
            step: RESERVE_NONE,
            backup_set_id: f.inventory.backup_set_id,
            app_set_ids: vec![],
            host_ids: vec![],
            path_ids: vec![],
        })
        .await;
        let records = f.backups(&[0, 10, 90_000]).await;

        let report = f.evaluator.run_once().await.unwrap();

        assert_eq!(report.decisions.len(), 2);
        assert!(!f.exists(&records[1]).await);
        assert!(f.exists(&records[2]).await);
    }

    #[tokio::test]
    async fn test_filters_restrict_records() {
        let f = fixture().await;
        f.policy_with(CreatePolicy {
            name: "other host".into(),
            target: PolicyTarget::Backup,
            action: PolicyAction::Delete,
            target_start: 0,
            target_end: UNBOUNDED_PAST,
            step: RESERVE_NONE,
            backup_set_id: f.inventory.backup_set_id,
            app_set_ids: vec![f.inventory.app_set_id],
            host_ids: vec![Uuid::new_v4()],
            path_ids: vec![],
        })
        .await;
        let records = f.backups(&[0, 10]).await;

        let report = f.evaluator.run_once().await.unwrap();

        assert!(report.decisions.is_empty());
        assert!(f.exists(&records[1]).await);
    }

    #[tokio::test]
    async fn test_archive_failure_is_contained() {
        let f = fixture().await;
        f.policy(PolicyTarget::Backup, PolicyAction::Archive, RESERVE_ALL).await;
        f.policy(PolicyTarget::Backup, PolicyAction::Delete, RESERVE_NONE).await;
        let records = f.backups(&[0, 10]).await;
        f.archive.fail_submissions(true);

        let report = f.evaluator.run_once().await.unwrap();

        assert_eq!(report.policies_evaluated, 2);
        assert!(report.count("failed") >= 1);
        // The delete policy still ran
        assert_eq!(report.count("deleted"), 1);
        assert!(!f.exists(&records[1]).await);
        assert!(
            !f.db.archival_jobs()
                .has_pending(records[0].id, JobType::PullFromColdArchive)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn test_storage_failure_keeps_record() {
        let f = fixture().await;
        f.policy(PolicyTarget::Backup, PolicyAction::Delete, RESERVE_NONE).await;
        let records = f.backups(&[0, 10, 20]).await;
        f.storage.fail(true);

        let report = f.evaluator.run_once().await.unwrap();

        assert_eq!(report.count("failed"), 2);
        for record in &records {
            assert!(f.exists(record).await);
        }
    }

    #[tokio::test]
    async fn test_delete_waits_for_pending_archive_job() {
        let f = fixture().await;
        f.policy(PolicyTarget::Backup, PolicyAction::Delete, RESERVE_NONE).await;
        let records = f.backups(&[0, 10]).await;
        f.db.archival_jobs()
            .create(NewArchivalJob {
                vault_id: f.inventory.vault_id,
                request_id: "req-1".into(),
                job_id: "remote-1".into(),
                job_type: JobType::PullFromColdArchive,
                record_id: Some(records[1].id),
            })
            .await
            .unwrap();

        let report = f.evaluator.run_once().await.unwrap();

        assert_eq!(
            report.outcomes_for(records[1].id),
            vec![&RecordOutcome::skipped("archive job pending")]
        );
        assert!(f.storage.deleted().is_empty());
        assert!(f.exists(&records[1]).await);
    }

    #[tokio::test]
    async fn test_missing_object_storage_fails_deletes() {
        let f = fixture().await;
        let evaluator = PolicyEvaluator::new(
            f.db.clone(),
            FakeConnector::new(f.archive.clone()),
            None,
            ManualClock::new(at(100_000)),
        );
        f.policy(PolicyTarget::Backup, PolicyAction::Delete, RESERVE_NONE).await;
        let records = f.backups(&[0, 10]).await;

        let report = evaluator.run_once().await.unwrap();

        assert!(matches!(
            report.outcomes_for(records[1].id)[..],
            [RecordOutcome::Failed { .. }]
        ));
        assert!(f.exists(&records[1]).await);
    }

    #[test]
    fn test_filter_combinations() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let h = Uuid::new_v4();
        let policy = Policy {
            id: Uuid::new_v4(),
            name: "p".into(),
            target: PolicyTarget::Backup,
            action: PolicyAction::Delete,
            target_start: 0,
            target_end: UNBOUNDED_PAST,
            step: 0,
            backup_set_id: Uuid::new_v4(),
            app_set_ids: vec![a, b],
            host_ids: vec![h],
            path_ids: vec![],
            created_at: Utc::now(),
        };
        assert_eq!(
            filter_combinations(&policy),
            vec![(Some(a), Some(h), None), (Some(b), Some(h), None)]
        );
    }
}
