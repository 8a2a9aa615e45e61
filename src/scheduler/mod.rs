//! Daily generation scheduler
//!
//! A single background loop wakes every `poll_interval` and runs one
//! generation cycle when the configured wall-clock time has passed.
//! Missed days are not caught up: after a run the next due time is the
//! following occurrence of `at` strictly after the run finished.

use crate::config::ScheduleConfig;
use crate::error::Result;
use crate::pipeline::Pipeline;
use chrono::{Days, Local, NaiveDateTime, NaiveTime};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Once-a-day trigger at a fixed local time
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    at: NaiveTime,
}

impl DailySchedule {
    pub fn new(at: NaiveTime) -> Self {
        Self { at }
    }

    pub fn at(&self) -> NaiveTime {
        self.at
    }

    /// First occurrence of `at` strictly after `now`
    pub fn next_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        let today = now.date().and_time(self.at);
        if today > now {
            today
        } else {
            now.date()
                .checked_add_days(Days::new(1))
                .map(|d| d.and_time(self.at))
                .unwrap_or(NaiveDateTime::MAX)
        }
    }
}

/// Background task running the daily cycle
pub struct DailyScheduler {
    schedule: DailySchedule,
    poll_interval: Duration,
    cancel: CancellationToken,
}

impl DailyScheduler {
    pub fn new(schedule: DailySchedule, poll_interval: Duration) -> Self {
        Self {
            schedule,
            poll_interval,
            cancel: CancellationToken::new(),
        }
    }

    pub fn from_config(config: &ScheduleConfig) -> Result<Self> {
        Ok(Self::new(
            DailySchedule::new(config.time()?),
            Duration::from_secs(config.poll_interval_secs.max(1)),
        ))
    }

    pub fn schedule(&self) -> DailySchedule {
        self.schedule
    }

    /// Spawn the polling loop. Cycles run inline, so at most one scheduled
    /// cycle is in flight at a time.
    pub fn spawn(&self, pipeline: Arc<Pipeline>) -> JoinHandle<()> {
        let schedule = self.schedule;
        let poll_interval = self.poll_interval;
        let cancel = self.cancel.clone();

        tokio::spawn(async move {
            let mut next_run = schedule.next_after(Local::now().naive_local());
            tracing::info!(next_run = %next_run, "Daily scheduler started");

            let mut ticker = tokio::time::interval(poll_interval);
            loop {
                tokio::select! {
                    _ = cancel.cancelled() => break,
                    _ = ticker.tick() => {}
                }

                if Local::now().naive_local() < next_run {
                    continue;
                }

                daily_job(&pipeline).await;
                next_run = schedule.next_after(Local::now().naive_local());
                tracing::info!(next_run = %next_run, "Next scheduled generation");
            }

            tracing::info!("Daily scheduler stopped");
        })
    }

    /// Signal the loop to exit after any in-flight cycle.
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

/// One scheduled cycle; failures are logged, never propagated.
pub async fn daily_job(pipeline: &Pipeline) {
    tracing::info!("Running scheduled content generation");
    match pipeline.run_cycle().await {
        Ok(outcome) if outcome.saved.is_some() => {
            tracing::info!(topic = %outcome.topic, "Scheduled generation complete")
        }
        Ok(outcome) => {
            tracing::warn!(topic = %outcome.topic, "Scheduled generation produced no file")
        }
        Err(e) => tracing::error!(error = %e, "Scheduled generation failed"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generation::test_support::CannedBackend;
    use crate::pipeline::test_support::{pipeline, single_pools};
    use chrono::NaiveDate;
    use tempfile::TempDir;

    fn at(h: u32, m: u32) -> NaiveTime {
        NaiveTime::from_hms_opt(h, m, 0).unwrap()
    }

    fn day(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 5, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn test_next_after_later_today() {
        let schedule = DailySchedule::new(at(9, 0));
        assert_eq!(schedule.next_after(day(1, 8, 30)), day(1, 9, 0));
    }

    #[test]
    fn test_next_after_already_passed() {
        let schedule = DailySchedule::new(at(9, 0));
        assert_eq!(schedule.next_after(day(1, 10, 0)), day(2, 9, 0));
    }

    #[test]
    fn test_next_after_exact_time_is_tomorrow() {
        let schedule = DailySchedule::new(at(9, 0));
        assert_eq!(schedule.next_after(day(1, 9, 0)), day(2, 9, 0));
    }

    #[test]
    fn test_next_after_month_rollover() {
        let schedule = DailySchedule::new(at(0, 15));
        let now = NaiveDate::from_ymd_opt(2024, 5, 31)
            .unwrap()
            .and_hms_opt(23, 0, 0)
            .unwrap();
        let expected = NaiveDate::from_ymd_opt(2024, 6, 1)
            .unwrap()
            .and_hms_opt(0, 15, 0)
            .unwrap();
        assert_eq!(schedule.next_after(now), expected);
    }

    #[test]
    fn test_from_config() {
        let config = ScheduleConfig {
            at: "21:30".to_string(),
            ..Default::default()
        };
        let scheduler = DailyScheduler::from_config(&config).unwrap();
        assert_eq!(scheduler.schedule().at(), at(21, 30));
    }

    #[test]
    fn test_from_config_invalid_time() {
        let config = ScheduleConfig {
            at: "late".to_string(),
            ..Default::default()
        };
        assert!(DailyScheduler::from_config(&config).is_err());
    }

    #[tokio::test]
    async fn test_daily_job_writes_artifact() {
        let dir = TempDir::new().unwrap();
        let pipeline = pipeline(
            dir.path(),
            CannedBackend::failing(),
            single_pools("science", "blog post"),
        );
        daily_job(&pipeline).await;
        assert_eq!(pipeline.store().list_latest(5).await.len(), 1);
    }

    #[tokio::test]
    async fn test_stop_ends_loop() {
        let dir = TempDir::new().unwrap();
        let pipeline = Arc::new(pipeline(
            dir.path(),
            CannedBackend::failing(),
            single_pools("science", "blog post"),
        ));
        let scheduler = DailyScheduler::new(
            DailySchedule::new(at(9, 0)),
            Duration::from_millis(10),
        );

        let handle = scheduler.spawn(pipeline);
        scheduler.stop();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
