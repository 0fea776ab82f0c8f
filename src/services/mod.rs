mod cold_archive;
mod oas;
mod object_storage;
mod recovery;
#[cfg(test)]
pub mod testing;

pub use cold_archive::{
    ColdArchive, ColdArchiveConnector, ColdArchiveError, ColdArchiveResult, JobHandle, JobInfo,
    JobStatusCode,
};
pub use oas::OasConnector;
pub use object_storage::{
    ObjectStorage, ObjectStorageError, ObjectStorageResult, from_config as object_storage_from_config,
};
pub use recovery::{RecoverOutcome, RecoveryError, RecoveryResult, RecoveryService};
