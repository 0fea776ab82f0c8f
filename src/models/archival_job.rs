use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Kind of asynchronous operation running on the cold archive service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    ArchiveRetrieval,
    InventoryRetrieval,
    /// Copy an object-storage object into cold archive.
    PullFromColdArchive,
    /// Restore an archive back into object storage.
    PushToOss,
    DeleteArchive,
}

impl JobType {
    /// Storage code. `0` is reserved as a query wildcard and never stored.
    pub fn code(self) -> i64 {
        match self {
            JobType::ArchiveRetrieval => 1,
            JobType::InventoryRetrieval => 2,
            JobType::PullFromColdArchive => 3,
            JobType::PushToOss => 4,
            JobType::DeleteArchive => 5,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(JobType::ArchiveRetrieval),
            2 => Some(JobType::InventoryRetrieval),
            3 => Some(JobType::PullFromColdArchive),
            4 => Some(JobType::PushToOss),
            5 => Some(JobType::DeleteArchive),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobType::ArchiveRetrieval => "archive_retrieval",
            JobType::InventoryRetrieval => "inventory_retrieval",
            JobType::PullFromColdArchive => "pull_from_cold_archive",
            JobType::PushToOss => "push_to_oss",
            JobType::DeleteArchive => "delete_archive",
        }
    }
}

impl fmt::Display for JobType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    #[default]
    Incomplete,
    Complete,
}

/// Local handle to one cold archive job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchivalJob {
    pub id: Uuid,
    /// Local vault the job runs in.
    pub vault_id: Uuid,
    pub request_id: String,
    /// Job id assigned by the cold archive service.
    pub job_id: String,
    pub job_type: JobType,
    pub status: JobStatus,
    pub record_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl ArchivalJob {
    pub fn is_complete(&self) -> bool {
        self.status == JobStatus::Complete
    }
}

#[derive(Debug, Clone)]
pub struct NewArchivalJob {
    pub vault_id: Uuid,
    pub request_id: String,
    pub job_id: String,
    pub job_type: JobType,
    pub record_id: Option<Uuid>,
}
