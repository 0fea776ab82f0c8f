use std::sync::Arc;

use thiserror::Error;
use tracing::{info, instrument};
use uuid::Uuid;

use super::{ColdArchiveConnector, ColdArchiveError};
use crate::{
    db::{DbError, DbPool},
    models::{JobType, NewArchivalJob, RecordType, Signal},
    signals::{SignalError, SignalService},
};

#[derive(Debug, Error)]
pub enum RecoveryError {
    #[error("Record not found: {0}")]
    RecordNotFound(Uuid),

    #[error("Archive record {0} has no archive id")]
    MissingArchiveId(Uuid),

    #[error("Backup set of record {0} has no vault")]
    NoVault(Uuid),

    #[error(transparent)]
    Archive(#[from] ColdArchiveError),

    #[error(transparent)]
    Db(#[from] DbError),

    #[error(transparent)]
    Signal(#[from] SignalError),
}

pub type RecoveryResult<T> = Result<T, RecoveryError>;

/// How a recovery request was fulfilled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoverOutcome {
    /// The archive is being restored into object storage; the agent is
    /// signalled once the tracking job completes.
    Restoring { job_id: Uuid },
    /// The object is already in storage; the agent was signalled directly.
    Downloading { signal_id: String },
}

/// Brings a record's object back to its host.
#[derive(Clone)]
pub struct RecoveryService {
    db: Arc<DbPool>,
    connector: Arc<dyn ColdArchiveConnector>,
    signals: Arc<SignalService>,
}

impl RecoveryService {
    pub fn new(
        db: Arc<DbPool>,
        connector: Arc<dyn ColdArchiveConnector>,
        signals: Arc<SignalService>,
    ) -> Self {
        Self {
            db,
            connector,
            signals,
        }
    }

    #[instrument(skip(self))]
    pub async fn recover(&self, record_id: Uuid) -> RecoveryResult<RecoverOutcome> {
        let detail = self
            .db
            .records()
            .get_detail(record_id)
            .await?
            .ok_or(RecoveryError::RecordNotFound(record_id))?;
        let record = &detail.record;
        let location = &detail.location;
        let full_path = detail.full_path();

        match record.record_type {
            RecordType::Archive => {
                let archive_id = record
                    .archive_id
                    .as_deref()
                    .filter(|id| !id.is_empty())
                    .ok_or(RecoveryError::MissingArchiveId(record.id))?;
                let vault = location
                    .vault
                    .as_ref()
                    .ok_or(RecoveryError::NoVault(record.id))?;

                let client = self.connector.connect(&vault.endpoint)?;
                let handle = client
                    .recover_to_oss(
                        &vault.vault_id,
                        archive_id,
                        &location.oss_endpoint,
                        &location.bucket,
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
                        job_type: JobType::PushToOss,
                        record_id: Some(record.id),
                    })
                    .await?;

                info!(job_id = %job.id, remote_job_id = %job.job_id, "Archive restore submitted");
                Ok(RecoverOutcome::Restoring { job_id: job.id })
            }
            RecordType::Backup => {
                let host_id = record.host_id.to_string();
                let signal =
                    Signal::download(&full_path, &location.oss_endpoint, &location.bucket);
                let signal_id = self.signals.add_signal(&host_id, signal).await?;
                // An offline host gets the durable copy replayed when it connects
                if self.signals.status().is_online(&host_id) {
                    self.signals.notify_signal(&host_id, &signal_id).await?;
                }

                info!(signal_id = %signal_id, host_id = %host_id, "Download signal sent");
                Ok(RecoverOutcome::Downloading { signal_id })
            }
        }
    }
}
