//! Cold archive service abstraction.
//!
//! The cold archive service runs long asynchronous jobs (archive an object,
//! restore it, delete it) inside vaults. Every submission returns a job
//! handle that is polled later with [`ColdArchive::get_job_info`].

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ColdArchiveError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Unexpected HTTP status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Cold archive error {code} ({kind}): {message}")]
    Service {
        code: String,
        message: String,
        kind: String,
    },

    #[error("Missing response header: {0}")]
    MissingHeader(&'static str),

    #[error("Invalid response body: {0}")]
    Decode(String),

    #[error("Vault not found: {0}")]
    VaultNotFound(String),
}

pub type ColdArchiveResult<T> = Result<T, ColdArchiveError>;

/// Identifiers returned when a job is accepted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    pub request_id: String,
    pub job_id: String,
}

/// Remote job state code.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub enum JobStatusCode {
    Succeeded,
    InProgress,
    Failed,
    #[serde(other)]
    Unknown,
}

impl JobStatusCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatusCode::Succeeded => "Succeeded",
            JobStatusCode::InProgress => "InProgress",
            JobStatusCode::Failed => "Failed",
            JobStatusCode::Unknown => "Unknown",
        }
    }
}

/// Job description as reported by the cold archive service.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct JobInfo {
    #[serde(rename = "Action", default)]
    pub action: String,
    #[serde(rename = "ArchiveId", default)]
    pub archive_id: String,
    #[serde(rename = "ArchiveSizeInBytes", default)]
    pub archive_size_in_bytes: i64,
    #[serde(rename = "Completed")]
    pub completed: bool,
    #[serde(rename = "CompletionDate", default)]
    pub completion_date: Option<String>,
    // The service spells this field "CreationsDate".
    #[serde(rename = "CreationsDate", default)]
    pub creation_date: Option<String>,
    #[serde(rename = "JobDescription", default)]
    pub job_description: String,
    #[serde(rename = "JobId")]
    pub job_id: String,
    #[serde(rename = "StatusCode")]
    pub status_code: JobStatusCode,
    #[serde(rename = "StatusMessage", default)]
    pub status_message: String,
}

impl JobInfo {
    pub fn succeeded(&self) -> bool {
        self.status_code == JobStatusCode::Succeeded
    }
}

/// Operations against one cold archive endpoint.
#[async_trait]
pub trait ColdArchive: Send + Sync {
    /// Copy `object` from the object-storage bucket into the vault.
    async fn archive_to_oas(
        &self,
        vault_id: &str,
        source_endpoint: &str,
        bucket: &str,
        object: &str,
        description: &str,
    ) -> ColdArchiveResult<JobHandle>;

    /// Restore an archive back into the object-storage bucket.
    async fn recover_to_oss(
        &self,
        vault_id: &str,
        archive_id: &str,
        dest_endpoint: &str,
        bucket: &str,
        object: &str,
        description: &str,
    ) -> ColdArchiveResult<JobHandle>;

    async fn delete_archive(&self, vault_id: &str, archive_id: &str)
    -> ColdArchiveResult<JobHandle>;

    async fn get_job_info(&self, vault_id: &str, job_id: &str) -> ColdArchiveResult<JobInfo>;

    /// Resolve a vault name to its service-side id.
    async fn find_vault_id(&self, name: &str) -> ColdArchiveResult<String>;
}

/// Opens a [`ColdArchive`] client for a vault endpoint.
pub trait ColdArchiveConnector: Send + Sync {
    fn connect(&self, endpoint: &str) -> ColdArchiveResult<Arc<dyn ColdArchive>>;
}
