//! Object storage holding the live copies of backups.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::config::ObjectStorageConfig;

#[derive(Debug, Error)]
pub enum ObjectStorageError {
    #[error("Object storage not configured")]
    NotConfigured,

    #[error("S3 error: {0}")]
    S3(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

pub type ObjectStorageResult<T> = Result<T, ObjectStorageError>;

#[async_trait]
pub trait ObjectStorage: Send + Sync {
    /// Delete `key` from `bucket` at `endpoint`. Deleting a missing object succeeds.
    async fn delete_object(&self, endpoint: &str, bucket: &str, key: &str)
    -> ObjectStorageResult<()>;
}

/// Build the configured object storage client, or `None` when disabled.
pub async fn from_config(
    config: &ObjectStorageConfig,
) -> ObjectStorageResult<Option<Arc<dyn ObjectStorage>>> {
    match config {
        ObjectStorageConfig::None => Ok(None),
        #[cfg(feature = "s3-storage")]
        ObjectStorageConfig::S3(c) => Ok(Some(Arc::new(s3::S3ObjectStorage::new(c.clone()).await))),
        #[cfg(not(feature = "s3-storage"))]
        ObjectStorageConfig::S3(_) => Err(ObjectStorageError::Internal(
            "S3 object storage requires the 's3-storage' feature".to_string(),
        )),
    }
}

#[cfg(feature = "s3-storage")]
mod s3 {
    use async_trait::async_trait;
    use dashmap::DashMap;
    use tracing::{debug, error, info, instrument};

    use super::{ObjectStorage, ObjectStorageError, ObjectStorageResult};
    use crate::config::S3StorageConfig;

    /// S3-compatible object storage.
    ///
    /// Backup sets name their own endpoint, so one client is built per
    /// endpoint and cached.
    pub struct S3ObjectStorage {
        config: S3StorageConfig,
        sdk_config: aws_config::SdkConfig,
        clients: DashMap<String, aws_sdk_s3::Client>,
    }

    impl S3ObjectStorage {
        pub async fn new(config: S3StorageConfig) -> Self {
            info!(region = ?config.region, "Initializing S3 object storage");

            let mut sdk_config_builder =
                aws_config::defaults(aws_config::BehaviorVersion::latest());

            if let Some(region) = &config.region {
                sdk_config_builder =
                    sdk_config_builder.region(aws_config::Region::new(region.clone()));
            }

            if let (Some(access_key), Some(secret_key)) =
                (&config.access_key_id, &config.secret_access_key)
            {
                let credentials = aws_credential_types::Credentials::new(
                    access_key.clone(),
                    secret_key.clone(),
                    None,
                    None,
                    "archivist-config",
                );
                sdk_config_builder = sdk_config_builder.credentials_provider(credentials);
            }

            Self {
                sdk_config: sdk_config_builder.load().await,
                config,
                clients: DashMap::new(),
            }
        }

        fn client(&self, endpoint: &str) -> aws_sdk_s3::Client {
            let endpoint = if endpoint.is_empty() {
                self.config.endpoint.clone().unwrap_or_default()
            } else {
                endpoint_url(endpoint)
            };

            self.clients
                .entry(endpoint.clone())
                .or_insert_with(|| {
                    let mut builder = aws_sdk_s3::config::Builder::from(&self.sdk_config);
                    if !endpoint.is_empty() {
                        builder = builder.endpoint_url(&endpoint);
                    }
                    if self.config.force_path_style {
                        builder = builder.force_path_style(true);
                    }
                    aws_sdk_s3::Client::from_conf(builder.build())
                })
                .clone()
        }
    }

    /// Backup sets store bare hostnames; the SDK wants a URL.
    fn endpoint_url(endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else {
            format!("https://{}", endpoint)
        }
    }

    #[async_trait]
    impl ObjectStorage for S3ObjectStorage {
        #[instrument(skip(self))]
        async fn delete_object(
            &self,
            endpoint: &str,
            bucket: &str,
            key: &str,
        ) -> ObjectStorageResult<()> {
            debug!("Deleting object from S3");

            self.client(endpoint)
                .delete_object()
                .bucket(bucket)
                .key(key)
                .send()
                .await
                .map_err(|e| {
                    error!(error = %e, "Failed to delete from S3");
                    ObjectStorageError::S3(e.to_string())
                })?;

            info!(key, bucket, "Object deleted from S3");
            Ok(())
        }
    }

}
