use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::RecordType;

/// `step` value that keeps every record.
pub const RESERVE_ALL: i64 = -1;
/// `step` value that keeps only the first record of a window.
pub const RESERVE_NONE: i64 = 0;
/// `target_end` value for an unbounded past.
pub const UNBOUNDED_PAST: i64 = -1;

/// Which record type a policy evaluates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyTarget {
    Backup,
    Archive,
}

impl PolicyTarget {
    pub fn code(self) -> i64 {
        match self {
            PolicyTarget::Backup => 1,
            PolicyTarget::Archive => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(PolicyTarget::Backup),
            2 => Some(PolicyTarget::Archive),
            _ => None,
        }
    }

    pub fn record_type(self) -> RecordType {
        match self {
            PolicyTarget::Backup => RecordType::Backup,
            PolicyTarget::Archive => RecordType::Archive,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyAction {
    Archive,
    Delete,
}

impl PolicyAction {
    pub fn code(self) -> i64 {
        match self {
            PolicyAction::Archive => 1,
            PolicyAction::Delete => 2,
        }
    }

    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(PolicyAction::Archive),
            2 => Some(PolicyAction::Delete),
            _ => None,
        }
    }
}

/// A retention rule.
///
/// `target_start` and `target_end` are offsets in seconds before "now".
/// Empty filter sets match anything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Policy {
    pub id: Uuid,
    pub name: String,
    pub target: PolicyTarget,
    pub action: PolicyAction,
    pub target_start: i64,
    pub target_end: i64,
    /// Thinning interval in seconds, or [`RESERVE_ALL`] / [`RESERVE_NONE`].
    pub step: i64,
    pub backup_set_id: Uuid,
    pub app_set_ids: Vec<Uuid>,
    pub host_ids: Vec<Uuid>,
    pub path_ids: Vec<Uuid>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatePolicy {
    pub name: String,
    pub target: PolicyTarget,
    pub action: PolicyAction,
    #[serde(default)]
    pub target_start: i64,
    #[serde(default = "default_target_end")]
    pub target_end: i64,
    #[serde(default = "default_step")]
    pub step: i64,
    pub backup_set_id: Uuid,
    #[serde(default)]
    pub app_set_ids: Vec<Uuid>,
    #[serde(default)]
    pub host_ids: Vec<Uuid>,
    #[serde(default)]
    pub path_ids: Vec<Uuid>,
}

fn default_target_end() -> i64 {
    UNBOUNDED_PAST
}

fn default_step() -> i64 {
    RESERVE_ALL
}
