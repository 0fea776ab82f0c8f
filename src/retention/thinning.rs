//! Generational thinning.
//!
//! Walks records in ascending time order keeping a moving baseline. A record
//! at least `step` seconds after the baseline becomes the new baseline and is
//! kept; everything in between is disposable. The first record is always the
//! initial baseline.

use chrono::{DateTime, Utc};

use crate::models::{RESERVE_ALL, RESERVE_NONE};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sample {
    Kept,
    Disposable,
}

/// Classify each timestamp. `times` must be ascending.
pub fn plan(times: &[DateTime<Utc>], step: i64) -> Vec<Sample> {
    let mut samples = Vec::with_capacity(times.len());
    let Some(mut baseline) = times.first().copied() else {
        return samples;
    };
    samples.push(Sample::Kept);

    for &time in &times[1..] {
        let elapsed = (time - baseline).num_seconds();
        if (elapsed >= step || step == RESERVE_ALL) && step != RESERVE_NONE {
            baseline = time;
            samples.push(Sample::Kept);
        } else {
            samples.push(Sample::Disposable);
        }
    }
    samples
}
