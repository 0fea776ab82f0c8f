use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Whether a record's primary copy lives in object storage or in cold archive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordType {
    Backup,
    Archive,
}

impl RecordType {
    /// Storage code.
    pub fn code(self) -> i64 {
        match self {
            RecordType::Backup => 1,
            RecordType::Archive => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(RecordType::Backup),
            2 => Some(RecordType::Archive),
            _ => None,
        }
    }
}

/// One materialized backup artifact.
///
/// A record carrying an `archive_id` has a cold-archive copy even while its
/// type is still `Backup`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: Uuid,
    pub host_id: Uuid,
    pub app_set_id: Uuid,
    pub backup_set_id: Uuid,
    pub path_id: Uuid,
    pub filename: String,
    pub record_type: RecordType,
    pub backup_time: DateTime<Utc>,
    pub archived_time: Option<DateTime<Utc>>,
    pub archive_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Record {
    pub fn has_archive_copy(&self) -> bool {
        self.archive_id.as_deref().is_some_and(|id| !id.is_empty())
    }

    /// Timestamp the retention window is measured against for this record type.
    pub fn retention_time(&self, record_type: RecordType) -> Option<DateTime<Utc>> {
        match record_type {
            RecordType::Backup => Some(self.backup_time),
            RecordType::Archive => self.archived_time,
        }
    }
}

/// Input for registering a completed backup.
#[derive(Debug, Clone, Deserialize)]
pub struct CreateRecord {
    pub host_id: Uuid,
    pub app_set_id: Uuid,
    pub backup_set_id: Uuid,
    pub path_id: Uuid,
    pub filename: String,
    #[serde(default = "default_record_type")]
    pub record_type: RecordType,
    pub backup_time: DateTime<Utc>,
    #[serde(default)]
    pub archived_time: Option<DateTime<Utc>>,
    #[serde(default)]
    pub archive_id: Option<String>,
}

fn default_record_type() -> RecordType {
    RecordType::Backup
}

/// Cold archive vault a backup set archives into.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VaultRef {
    /// Local vault id.
    pub id: Uuid,
    /// Vault id on the cold archive service.
    pub vault_id: String,
    pub endpoint: String,
}

/// Where a record's copies live, resolved through its backup set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordLocation {
    pub host_name: String,
    pub app_set_name: String,
    pub path: String,
    pub oss_endpoint: String,
    pub bucket: String,
    pub vault: Option<VaultRef>,
}

/// A record joined with its storage location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordDetail {
    #[serde(flatten)]
    pub record: Record,
    pub location: RecordLocation,
}

impl RecordDetail {
    /// Object key of the live copy, also used as archive description and
    /// download path: `{app_set}/{host}{path}/{filename}`.
    pub fn full_path(&self) -> String {
        format!(
            "{}/{}{}/{}",
            self.location.app_set_name,
            self.location.host_name,
            self.location.path,
            self.record.filename
        )
    }
}

/// Filter for the records a policy evaluates.
#[derive(Debug, Clone)]
pub struct RecordQuery {
    pub record_type: RecordType,
    pub backup_set_id: Uuid,
    pub app_set_id: Option<Uuid>,
    pub host_id: Option<Uuid>,
    pub path_id: Option<Uuid>,
    /// Inclusive lower bound, `None` for unbounded past.
    pub window_start: Option<DateTime<Utc>>,
    /// Inclusive upper bound.
    pub window_end: DateTime<Utc>,
}
