//! Shared tests for ArchivalJobRepo implementations

use chrono::Utc;

use super::harness::Inventory;
use crate::{
    db::{DbPool, error::DbError},
    models::{JobStatus, JobType, NewArchivalJob},
};

fn job_input(inv: &Inventory, job_type: JobType, record_id: Option<uuid::Uuid>) -> NewArchivalJob {
    NewArchivalJob {
        vault_id: inv.vault_id,
        request_id: "req-1".into(),
        job_id: format!("job-{}", uuid::Uuid::new_v4().simple()),
        job_type,
        record_id,
    }
}

pub async fn test_create_and_list_by_vault(db: &DbPool, inv: &Inventory) {
    let record = inv.create_backup(db, "a.tar", Utc::now()).await;
    let repo = db.archival_jobs();

    let first = repo
        .create(job_input(inv, JobType::PullFromColdArchive, Some(record.id)))
        .await
        .unwrap();
    let second = repo
        .create(job_input(inv, JobType::InventoryRetrieval, None))
        .await
        .unwrap();

    assert_eq!(first.status, JobStatus::Incomplete);

    let jobs = repo.list_by_vault(inv.vault_id).await.unwrap();
    let ids: Vec<_> = jobs.iter().map(|j| j.id).collect();
    assert_eq!(ids.len(), 2);
    assert!(ids.contains(&first.id));
    assert!(ids.contains(&second.id));

    let fetched = repo.get_by_id(first.id).await.unwrap().unwrap();
    assert_eq!(fetched.job_type, JobType::PullFromColdArchive);
    assert_eq!(fetched.record_id, Some(record.id));
}

pub async fn test_has_pending_tracks_completion(db: &DbPool, inv: &Inventory) {
    let record = inv.create_backup(db, "a.tar", Utc::now()).await;
    let repo = db.archival_jobs();

    assert!(!repo
        .has_pending(record.id, JobType::PullFromColdArchive)
        .await
        .unwrap());

    let job = repo
        .create(job_input(inv, JobType::PullFromColdArchive, Some(record.id)))
        .await
        .unwrap();
    assert!(repo
        .has_pending(record.id, JobType::PullFromColdArchive)
        .await
        .unwrap());
    assert!(!repo.has_pending(record.id, JobType::DeleteArchive).await.unwrap());

    repo.mark_complete(job.id).await.unwrap();
    assert!(!repo
        .has_pending(record.id, JobType::PullFromColdArchive)
        .await
        .unwrap());
}

pub async fn test_mark_complete_only_once(db: &DbPool, inv: &Inventory) {
    let repo = db.archival_jobs();
    let job = repo
        .create(job_input(inv, JobType::PushToOss, None))
        .await
        .unwrap();

    assert!(repo.mark_complete(job.id).await.unwrap());
    assert!(!repo.mark_complete(job.id).await.unwrap());
    assert!(repo.get_by_id(job.id).await.unwrap().unwrap().is_complete());

    let missing = repo.mark_complete(uuid::Uuid::new_v4()).await;
    assert!(matches!(missing, Err(DbError::NotFound)));
}

pub async fn test_record_delete_detaches_jobs(db: &DbPool, inv: &Inventory) {
    let record = inv.create_archive(db, "a.tar", Utc::now(), "arc-1").await;
    let job = db
        .archival_jobs()
        .create(job_input(inv, JobType::DeleteArchive, Some(record.id)))
        .await
        .unwrap();

    db.records().delete(record.id).await.unwrap();

    let job = db.archival_jobs().get_by_id(job.id).await.unwrap().unwrap();
    assert_eq!(job.record_id, None);
}

pub async fn test_delete(db: &DbPool, inv: &Inventory) {
    let job = db
        .archival_jobs()
        .create(job_input(inv, JobType::DeleteArchive, None))
        .await
        .unwrap();
    db.archival_jobs().delete(job.id).await.unwrap();
    assert!(matches!(
        db.archival_jobs().delete(job.id).await,
        Err(DbError::NotFound)
    ));
}

mod sqlite_tests {
    use crate::db::tests::harness::{create_test_db, seed_inventory};

    macro_rules! sqlite_test {
        ($name:ident) => {
            #[tokio::test]
            async fn $name() {
                let db = create_test_db().await;
                let inv = seed_inventory(&db).await;
                super::$name(&db, &inv).await;
            }
        };
    }

    sqlite_test!(test_create_and_list_by_vault);
    sqlite_test!(test_has_pending_tracks_completion);
    sqlite_test!(test_mark_complete_only_once);
    sqlite_test!(test_record_delete_detaches_jobs);
    sqlite_test!(test_delete);
}
