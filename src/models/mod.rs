mod archival_job;
mod inventory;
mod policy;
mod record;
mod signal;

pub use archival_job::*;
pub use inventory::*;
pub use policy::*;
pub use record::*;
pub use signal::*;
