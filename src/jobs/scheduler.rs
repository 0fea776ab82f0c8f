//! Periodic task scheduling.
//!
//! Workers are explicit long-lived tasks: they start when spawned, stop when
//! their [`CancellationToken`] fires and read time through an injectable
//! [`Clock`]. One worker never overlaps its own ticks.

use std::{fmt, str::FromStr, sync::Arc, time::Duration};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    #[error("Invalid schedule '{expression}': {reason}")]
    InvalidSchedule { expression: String, reason: String },
}

/// Source of wall-clock time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[cfg(test)]
pub struct ManualClock(parking_lot::Mutex<DateTime<Utc>>);

#[cfg(test)]
impl ManualClock {
    pub fn new(now: DateTime<Utc>) -> Arc<Self> {
        Arc::new(Self(parking_lot::Mutex::new(now)))
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.0.lock() = now;
    }

    pub fn advance(&self, by: chrono::Duration) {
        let mut now = self.0.lock();
        *now += by;
    }
}

#[cfg(test)]
impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.0.lock()
    }
}

/// When a worker fires.
#[derive(Clone)]
pub enum Trigger {
    /// Immediately on start, then after every interval.
    Interval(Duration),
    /// At every fire time of a cron schedule (seconds field first, UTC).
    Cron(Box<cron::Schedule>),
}

impl Trigger {
    pub fn cron(expression: &str) -> Result<Self, SchedulerError> {
        cron::Schedule::from_str(expression)
            .map(|schedule| Trigger::Cron(Box::new(schedule)))
            .map_err(|e| SchedulerError::InvalidSchedule {
                expression: expression.to_string(),
                reason: e.to_string(),
            })
    }

    /// Time to wait from `now` until the next fire, `None` when the schedule
    /// never fires again.
    pub fn next_delay(&self, now: DateTime<Utc>) -> Option<Duration> {
        match self {
            Trigger::Interval(interval) => Some(*interval),
            Trigger::Cron(schedule) => {
                let next = schedule.after(&now).next()?;
                Some((next - now).to_std().unwrap_or(Duration::ZERO))
            }
        }
    }
}

impl fmt::Display for Trigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Trigger::Interval(d) => write!(f, "every {}s", d.as_secs()),
            Trigger::Cron(schedule) => write!(f, "cron '{schedule}'"),
        }
    }
}

/// One unit of periodic work. Failures are contained inside `tick`.
#[async_trait]
pub trait PeriodicTask: Send + Sync {
    fn name(&self) -> &'static str;

    async fn tick(&self);
}

pub struct PeriodicWorker {
    task: Arc<dyn PeriodicTask>,
    trigger: Trigger,
    clock: Arc<dyn Clock>,
}

impl PeriodicWorker {
    pub fn new(task: Arc<dyn PeriodicTask>, trigger: Trigger, clock: Arc<dyn Clock>) -> Self {
        Self {
            task,
            trigger,
            clock,
        }
    }

    /// Run until cancelled. A tick in progress is allowed to finish.
    pub async fn run(self, cancel: CancellationToken) {
        let name = self.task.name();
        tracing::info!(worker = name, trigger = %self.trigger, "Starting worker");

        let mut immediate = matches!(self.trigger, Trigger::Interval(_));
        loop {
            if !immediate {
                let Some(delay) = self.trigger.next_delay(self.clock.now()) else {
                    tracing::warn!(worker = name, "Schedule has no upcoming fire time");
                    break;
                };
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            immediate = false;

            if cancel.is_cancelled() {
                break;
            }
            self.task.tick().await;
        }

        tracing::info!(worker = name, "Worker stopped");
    }
}
