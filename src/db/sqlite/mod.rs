mod archival_jobs;
mod common;
mod inventory;
mod policies;
mod records;

pub use archival_jobs::SqliteArchivalJobRepo;
pub use inventory::SqliteInventoryRepo;
pub use policies::SqlitePolicyRepo;
pub use records::SqliteRecordRepo;
