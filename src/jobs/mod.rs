//! Periodic background work.
//!
//! - **Policy evaluation** runs on a cron schedule (see `retention`).
//! - **Job reconciliation** polls outstanding cold-archive jobs on a fixed
//!   interval and applies their effects once they complete.
//!
//! Both run as [`PeriodicWorker`]s with an injectable [`Clock`] so a single
//! tick can be driven from tests or the CLI.

mod reconciler;
mod scheduler;

pub use reconciler::{JobOutcome, JobReconciler, ReconcileReport};
#[cfg(test)]
pub use scheduler::ManualClock;
pub use scheduler::{
    Clock, PeriodicTask, PeriodicWorker, SchedulerError, SystemClock, Trigger,
};
