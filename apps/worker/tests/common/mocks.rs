//! Mock jobs for scheduler tests

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use dailyjam_worker::scheduler::ScheduledJob;

/// Records the instant of every fire
#[derive(Debug, Default)]
pub struct RecordingJob {
    fired: Mutex<Vec<DateTime<Utc>>>,
    /// Simulated run time (tokio time)
    run_time: Option<Duration>,
}

impl RecordingJob {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn taking(run_time: Duration) -> Arc<Self> {
        Arc::new(Self {
            run_time: Some(run_time),
            ..Self::default()
        })
    }

    pub fn fired(&self) -> Vec<DateTime<Utc>> {
        self.fired.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl ScheduledJob for RecordingJob {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn fire(&self, now: DateTime<Utc>) {
        if let Some(run_time) = self.run_time {
            tokio::time::sleep(run_time).await;
        }
        self.fired
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(now);
    }
}
