//! Retention policy evaluation.
//!
//! Each policy names a record type, a time window relative to now, a thinning
//! step and an action. Records inside the window are thinned into kept
//! generational samples and disposable ones:
//! - `Archive` promotes kept backups into the cold archive
//! - `Delete` removes disposable backups from object storage (keeping the
//!   record as archive-only when it has a cold copy) and deletes disposable
//!   archives from their vault

mod evaluator;
mod thinning;
mod window;

pub use evaluator::{PolicyEvaluator, PolicyRunReport, RecordOutcome};
