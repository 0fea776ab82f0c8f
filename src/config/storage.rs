use serde::{Deserialize, Serialize};

use super::ConfigError;

/// Object storage configuration.
///
/// Live backup copies sit in object storage. Bucket names and endpoints come
/// from each record's backup set; this section supplies credentials.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(tag = "type", rename_all = "snake_case")]
#[serde(deny_unknown_fields)]
pub enum ObjectStorageConfig {
    /// No object storage client. Deletions of live copies fail per record.
    #[default]
    None,

    /// S3-compatible object storage.
    S3(S3StorageConfig),
}

impl ObjectStorageConfig {
    pub fn is_none(&self) -> bool {
        matches!(self, ObjectStorageConfig::None)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        match self {
            ObjectStorageConfig::None => Ok(()),
            ObjectStorageConfig::S3(c) => c.validate(),
        }
    }
}

/// S3 credentials and addressing.
#[derive(Clone, Serialize, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct S3StorageConfig {
    /// Region name. For non-AWS S3-compatible services, use their region name.
    #[serde(default)]
    pub region: Option<String>,

    /// Endpoint used when a backup set carries none.
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Access key ID.
    /// If not specified, uses environment variables or IAM role.
    #[serde(default)]
    pub access_key_id: Option<String>,

    /// Secret access key.
    /// If not specified, uses environment variables or IAM role.
    #[serde(default)]
    pub secret_access_key: Option<String>,

    /// Use path-style URLs instead of virtual-hosted style.
    #[serde(default)]
    pub force_path_style: bool,
}

impl S3StorageConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.access_key_id.is_some() != self.secret_access_key.is_some() {
            return Err(ConfigError::Validation(
                "object_storage access_key_id and secret_access_key must be set together".into(),
            ));
        }
        Ok(())
    }
}

impl std::fmt::Debug for S3StorageConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("S3StorageConfig")
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field(
                "access_key_id",
                &self.access_key_id.as_ref().map(|_| "****"),
            )
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "****"),
            )
            .field("force_path_style", &self.force_path_style)
            .finish()
    }
}
