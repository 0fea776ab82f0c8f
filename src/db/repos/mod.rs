mod archival_jobs;
mod inventory;
mod policies;
mod records;

pub use archival_jobs::*;
pub use inventory::*;
pub use policies::*;
pub use records::*;
