//! Time trigger driven by a directory's cron schedule.

use std::future::Future;
use std::time::Duration;

use chrono::{DateTime, Local};
use mva_config::Schedule;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Fires a callback at each occurrence of a schedule, in local time.
#[derive(Debug, Clone)]
pub struct ScheduleTrigger {
    schedule: Schedule,
}

impl ScheduleTrigger {
    pub fn new(schedule: Schedule) -> Self {
        Self { schedule }
    }

    /// Next occurrence strictly after `after`.
    pub fn next_fire(&self, after: &DateTime<Local>) -> Option<DateTime<Local>> {
        self.schedule.next_after(after)
    }

    /// Run until `cancel` fires or the schedule has no further occurrences.
    ///
    /// `on_fire` runs to completion once started; cancellation is observed
    /// only while waiting.
    pub async fn run<F, Fut>(self, cancel: CancellationToken, mut on_fire: F)
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ()>,
    {
        let mut last_fired: Option<DateTime<Local>> = None;

        loop {
            let now = Local::now();
            // Never compute from before the last fire, or a timer that woke
            // early would fire the same occurrence twice
            let from = match last_fired {
                Some(last) if last > now => last,
                _ => now,
            };

            let Some(next) = self.next_fire(&from) else {
                warn!(schedule = %self.schedule, "schedule has no further occurrences");
                return;
            };
            let wait = (next - now).to_std().unwrap_or(Duration::ZERO);
            debug!(schedule = %self.schedule, next = %next, "waiting for next scheduled sweep");

            tokio::select! {
                _ = cancel.cancelled() => {
                    debug!(schedule = %self.schedule, "schedule cancelled");
                    return;
                }
                _ = tokio::time::sleep(wait) => {}
            }

            last_fired = Some(next);
            on_fire().await;
        }
    }
}
