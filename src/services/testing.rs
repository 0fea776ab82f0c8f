//! In-memory fakes for the external archive and storage services.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, AtomicU64, Ordering},
    },
};

use async_trait::async_trait;
use parking_lot::Mutex;

use super::{
    ColdArchive, ColdArchiveConnector, ColdArchiveError, ColdArchiveResult, JobHandle, JobInfo,
    JobStatusCode, ObjectStorage, ObjectStorageError, ObjectStorageResult,
};

/// A call made against [`FakeColdArchive`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArchiveCall {
    Archive { vault_id: String, object: String },
    Recover { vault_id: String, archive_id: String, object: String },
    Delete { vault_id: String, archive_id: String },
    JobInfo { vault_id: String, job_id: String },
}

/// Records submissions and answers job polls from a scripted table.
/// Unscripted jobs report `InProgress`.
#[derive(Default)]
pub struct FakeColdArchive {
    calls: Mutex<Vec<ArchiveCall>>,
    jobs: Mutex<HashMap<String, JobInfo>>,
    vaults: Mutex<HashMap<String, String>>,
    next_job: AtomicU64,
    fail_submissions: AtomicBool,
    fail_polls: AtomicBool,
}

impl FakeColdArchive {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn calls(&self) -> Vec<ArchiveCall> {
        self.calls.lock().clone()
    }

    pub fn submissions(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|c| !matches!(c, ArchiveCall::JobInfo { .. }))
            .count()
    }

    pub fn polls(&self) -> usize {
        let total = self.calls.lock().len();
        total - self.submissions()
    }

    pub fn fail_submissions(&self, fail: bool) {
        self.fail_submissions.store(fail, Ordering::SeqCst);
    }

    pub fn fail_polls(&self, fail: bool) {
        self.fail_polls.store(fail, Ordering::SeqCst);
    }

    /// Make `name` resolvable to `vault_id`.
    pub fn add_vault(&self, name: &str, vault_id: &str) {
        self.vaults
            .lock()
            .insert(name.to_string(), vault_id.to_string());
    }

    /// Script the remote state of `job_id`.
    pub fn set_job(&self, job_id: &str, status: JobStatusCode, archive_id: &str) {
        let completed = status != JobStatusCode::InProgress;
        self.jobs.lock().insert(
            job_id.to_string(),
            JobInfo {
                action: String::new(),
                archive_id: archive_id.to_string(),
                archive_size_in_bytes: 0,
                completed,
                completion_date: None,
                creation_date: None,
                job_description: String::new(),
                job_id: job_id.to_string(),
                status_code: status,
                status_message: String::new(),
            },
        );
    }

    fn submit(&self, call: ArchiveCall) -> ColdArchiveResult<JobHandle> {
        if self.fail_submissions.load(Ordering::SeqCst) {
            return Err(ColdArchiveError::Status {
                status: 503,
                body: "unavailable".into(),
            });
        }
        self.calls.lock().push(call);
        let n = self.next_job.fetch_add(1, Ordering::SeqCst) + 1;
        Ok(JobHandle {
            request_id: format!("req-{n}"),
            job_id: format!("job-{n}"),
        })
    }
}

#[async_trait]
impl ColdArchive for FakeColdArchive {
    async fn archive_to_oas(
        &self,
        vault_id: &str,
        _source_endpoint: &str,
        _bucket: &str,
        object: &str,
        _description: &str,
    ) -> ColdArchiveResult<JobHandle> {
        self.submit(ArchiveCall::Archive {
            vault_id: vault_id.into(),
            object: object.into(),
        })
    }

    async fn recover_to_oss(
        &self,
        vault_id: &str,
        archive_id: &str,
        _dest_endpoint: &str,
        _bucket: &str,
        object: &str,
        _description: &str,
    ) -> ColdArchiveResult<JobHandle> {
        self.submit(ArchiveCall::Recover {
            vault_id: vault_id.into(),
            archive_id: archive_id.into(),
            object: object.into(),
        })
    }

    async fn delete_archive(
        &self,
        vault_id: &str,
        archive_id: &str,
    ) -> ColdArchiveResult<JobHandle> {
        self.submit(ArchiveCall::Delete {
            vault_id: vault_id.into(),
            archive_id: archive_id.into(),
        })
    }

    async fn get_job_info(&self, vault_id: &str, job_id: &str) -> ColdArchiveResult<JobInfo> {
        if self.fail_polls.load(Ordering::SeqCst) {
            return Err(ColdArchiveError::Status {
                status: 500,
                body: "boom".into(),
            });
        }
        self.calls.lock().push(ArchiveCall::JobInfo {
            vault_id: vault_id.into(),
            job_id: job_id.into(),
        });
        if let Some(info) = self.jobs.lock().get(job_id) {
            return Ok(info.clone());
        }
        Ok(JobInfo {
            action: String::new(),
            archive_id: String::new(),
            archive_size_in_bytes: 0,
            completed: false,
            completion_date: None,
            creation_date: None,
            job_description: String::new(),
            job_id: job_id.to_string(),
            status_code: JobStatusCode::InProgress,
            status_message: String::new(),
        })
    }

    async fn find_vault_id(&self, name: &str) -> ColdArchiveResult<String> {
        self.vaults
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| ColdArchiveError::VaultNotFound(name.to_string()))
    }
}

/// Hands out the same [`FakeColdArchive`] for every endpoint.
pub struct FakeConnector {
    archive: Arc<FakeColdArchive>,
    endpoints: Mutex<Vec<String>>,
}

impl FakeConnector {
    pub fn new(archive: Arc<FakeColdArchive>) -> Arc<Self> {
        Arc::new(Self {
            archive,
            endpoints: Mutex::new(Vec::new()),
        })
    }

    pub fn endpoints(&self) -> Vec<String> {
        self.endpoints.lock().clone()
    }
}

impl ColdArchiveConnector for FakeConnector {
    fn connect(&self, endpoint: &str) -> ColdArchiveResult<Arc<dyn ColdArchive>> {
        self.endpoints.lock().push(endpoint.to_string());
        Ok(self.archive.clone())
    }
}

/// Records deleted objects as `(endpoint, bucket, key)`.
#[derive(Default)]
pub struct FakeObjectStorage {
    deleted: Mutex<Vec<(String, String, String)>>,
    fail: AtomicBool,
}

impl FakeObjectStorage {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn deleted(&self) -> Vec<(String, String, String)> {
        self.deleted.lock().clone()
    }

    pub fn fail(&self, fail: bool) {
        self.fail.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ObjectStorage for FakeObjectStorage {
    async fn delete_object(
        &self,
        endpoint: &str,
        bucket: &str,
        key: &str,
    ) -> ObjectStorageResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(ObjectStorageError::S3("access denied".into()));
        }
        self.deleted
            .lock()
            .push((endpoint.into(), bucket.into(), key.into()));
        Ok(())
    }
}
