//! Registered resources records and policies refer to.
//!
//! These are managed by the surrounding control plane; the engine reads
//! them and tests create them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Host {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppSet {
    pub id: Uuid,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A directory on a host that is backed up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupPath {
    pub id: Uuid,
    pub host_id: Uuid,
    pub path: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OssBucket {
    pub id: Uuid,
    pub endpoint: String,
    pub bucket: String,
    pub created_at: DateTime<Utc>,
}

/// A cold archive vault.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vault {
    pub id: Uuid,
    pub name: String,
    /// Vault id on the cold archive service.
    pub vault_id: String,
    pub endpoint: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateVault {
    pub name: String,
    pub vault_id: String,
    pub endpoint: String,
}

/// Destination pair for a family of backups: a bucket for live copies and an
/// optional vault for archives.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupSet {
    pub id: Uuid,
    pub name: String,
    pub bucket_id: Uuid,
    pub vault_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}
