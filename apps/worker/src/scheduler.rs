//! Daily job runner
//!
//! A [`JobRunner`] owns a clock and a list of jobs, each registered with the
//! wall-clock time of day it should fire at. `start` spawns one loop per job;
//! `stop` cancels the loops and waits for them, including any fire that is
//! still in progress.
//!
//! A job's fire is awaited inside its own loop, so a slow run delays that
//! job's next tick instead of overlapping with it. Ticks missed while a run
//! was in progress are skipped.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::window::DailyTime;

/// Source of the current instant
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Something the runner can trigger
///
/// `fire` must not fail: a job is responsible for logging its own errors so
/// the runner keeps ticking.
#[async_trait]
pub trait ScheduledJob: Send + Sync {
    fn name(&self) -> &'static str;

    async fn fire(&self, now: DateTime<Utc>);
}

struct Registration {
    job: Arc<dyn ScheduledJob>,
    at: DailyTime,
}

/// Fires registered jobs once a day at their configured time
pub struct JobRunner {
    clock: Arc<dyn Clock>,
    registrations: Vec<Registration>,
    cancel: CancellationToken,
    handles: Vec<JoinHandle<()>>,
}

impl JobRunner {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            clock,
            registrations: Vec::new(),
            cancel: CancellationToken::new(),
            handles: Vec::new(),
        }
    }

    /// Register `job` to fire daily at `at`. Takes effect on the next `start`.
    pub fn register(&mut self, job: Arc<dyn ScheduledJob>, at: DailyTime) -> &mut Self {
        tracing::info!(job = job.name(), at = %at, "Registered scheduled job");
        self.registrations.push(Registration { job, at });
        self
    }

    /// Spawn one loop per registered job
    pub fn start(&mut self) {
        if !self.handles.is_empty() {
            tracing::warn!("Job runner already started");
            return;
        }

        for registration in &self.registrations {
            let job = Arc::clone(&registration.job);
            let at = registration.at;
            let clock = Arc::clone(&self.clock);
            let cancel = self.cancel.clone();

            self.handles
                .push(tokio::spawn(run_daily(job, at, clock, cancel)));
        }
    }

    /// Cancel all loops and wait for them to finish
    pub async fn stop(self) {
        self.cancel.cancel();
        for handle in self.handles {
            if let Err(e) = handle.await {
                tracing::error!(error = %e, "Scheduled job loop panicked");
            }
        }
        tracing::info!("Job runner stopped");
    }

    /// Token cancelled by [`stop`](Self::stop); useful to tie other shutdown work to the runner
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }
}

async fn run_daily(
    job: Arc<dyn ScheduledJob>,
    at: DailyTime,
    clock: Arc<dyn Clock>,
    cancel: CancellationToken,
) {
    let mut next = at.next_after(clock.now());
    tracing::info!(job = job.name(), next = %next, "Scheduled job loop started");

    loop {
        let wait = time_until(next, clock.now());
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!(job = job.name(), "Scheduled job loop stopped");
                break;
            }
            _ = tokio::time::sleep(wait) => {}
        }

        let now = clock.now();
        if now < next {
            // Woke early relative to the clock
            continue;
        }

        tracing::info!(job = job.name(), scheduled_for = %next, "Firing scheduled job");
        job.fire(now).await;

        next = at.next_after(now.max(next));
        tracing::debug!(job = job.name(), next = %next, "Next fire scheduled");
    }
}

fn time_until(target: DateTime<Utc>, now: DateTime<Utc>) -> Duration {
    (target - now).to_std().unwrap_or(Duration::ZERO)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_time_until() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 12, 0, 0).unwrap();
        let later = now + chrono::Duration::minutes(90);

        assert_eq!(time_until(later, now), Duration::from_secs(5400));
        assert_eq!(time_until(now, later), Duration::ZERO);
        assert_eq!(time_until(now, now), Duration::ZERO);
    }
}
