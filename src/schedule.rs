//! # Daily Timer
//!
//! Fires the orchestrator once a day at a fixed UTC time (07:00 by default,
//! cron `0 0 7 * * *`). Invocations never overlap: the next fire time is only
//! computed after the previous run has finished.

use crate::constants::{
    DEFAULT_SCHEDULE_HOUR_UTC, DEFAULT_SCHEDULE_MINUTE_UTC, PAST_DUE_THRESHOLD_SECS,
};
use chrono::{DateTime, Days, NaiveTime, Utc};
use std::future::Future;
use tracing::{info, warn};

/// Fixed daily fire time in UTC
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailySchedule {
    time: NaiveTime,
}

impl Default for DailySchedule {
    fn default() -> Self {
        Self {
            time: NaiveTime::from_hms_opt(DEFAULT_SCHEDULE_HOUR_UTC, DEFAULT_SCHEDULE_MINUTE_UTC, 0)
                .unwrap_or(NaiveTime::MIN),
        }
    }
}

impl DailySchedule {
    /// Schedule at `hour:minute` UTC, `None` if the time is out of range
    #[must_use]
    pub fn at(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(|time| Self { time })
    }

    /// First fire time strictly after `now`
    #[must_use]
    pub fn next_after(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        let today = now.date_naive().and_time(self.time).and_utc();
        if today > now {
            today
        } else {
            today
                .checked_add_days(Days::new(1))
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
        }
    }

    /// Six-field cron expression for this schedule
    #[must_use]
    pub fn cron_expression(&self) -> String {
        use chrono::Timelike;
        format!("0 {} {} * * *", self.time.minute(), self.time.hour())
    }
}

/// Details of one timer invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimerInfo {
    pub scheduled: DateTime<Utc>,
    pub fired: DateTime<Utc>,
    pub past_due: bool,
}

impl TimerInfo {
    #[must_use]
    pub fn new(scheduled: DateTime<Utc>, fired: DateTime<Utc>) -> Self {
        let late_by = fired.signed_duration_since(scheduled).num_seconds();
        Self {
            scheduled,
            fired,
            past_due: late_by > PAST_DUE_THRESHOLD_SECS,
        }
    }
}

/// Run `job` on `schedule` until `shutdown` completes
///
/// With `run_on_startup` the job also runs once immediately. Returns the
/// number of invocations.
pub async fn run_schedule<F, Fut, S>(
    schedule: DailySchedule,
    run_on_startup: bool,
    mut job: F,
    shutdown: S,
) -> usize
where
    F: FnMut(TimerInfo) -> Fut,
    Fut: Future<Output = ()>,
    S: Future<Output = ()>,
{
    tokio::pin!(shutdown);
    let mut invocations = 0;

    info!("Timer schedule: {} (UTC)", schedule.cron_expression());
    if run_on_startup {
        let now = Utc::now();
        invocations += 1;
        job(TimerInfo::new(now, now)).await;
    }

    loop {
        let scheduled = schedule.next_after(Utc::now());
        info!("Next run scheduled at {}", scheduled.to_rfc3339());
        let wait = scheduled
            .signed_duration_since(Utc::now())
            .to_std()
            .unwrap_or_default();

        tokio::select! {
            () = tokio::time::sleep(wait) => {}
            () = &mut shutdown => {
                info!("Shutdown requested, stopping timer");
                return invocations;
            }
        }

        let timer = TimerInfo::new(scheduled, Utc::now());
        if timer.past_due {
            warn!("The timer is past due!");
        }
        info!("Timer trigger started at {}", timer.fired.to_rfc3339());
        invocations += 1;
        job(timer).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn utc(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 10, h, m, s).unwrap()
    }

    #[test]
    fn test_next_after_same_day() {
        let schedule = DailySchedule::default();
        assert_eq!(schedule.next_after(utc(6, 59, 0)), utc(7, 0, 0));
    }

    #[test]
    fn test_next_after_rolls_to_next_day() {
        let schedule = DailySchedule::default();
        let next_day = Utc.with_ymd_and_hms(2024, 3, 11, 7, 0, 0).unwrap();
        assert_eq!(schedule.next_after(utc(7, 0, 0)), next_day);
        assert_eq!(schedule.next_after(utc(23, 30, 0)), next_day);
    }

    #[test]
    fn test_cron_expression() {
        assert_eq!(DailySchedule::default().cron_expression(), "0 0 7 * * *");
        assert_eq!(
            DailySchedule::at(18, 45).expect("valid").cron_expression(),
            "0 45 18 * * *"
        );
        assert!(DailySchedule::at(24, 0).is_none());
    }

    #[test]
    fn test_timer_past_due() {
        assert!(!TimerInfo::new(utc(7, 0, 0), utc(7, 0, 30)).past_due);
        assert!(TimerInfo::new(utc(7, 0, 0), utc(7, 5, 0)).past_due);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_on_startup_then_shutdown() {
        let (tx, rx) = tokio::sync::oneshot::channel::<()>();
        let mut tx = Some(tx);
        let mut seen = Vec::new();

        let invocations = run_schedule(
            DailySchedule::default(),
            true,
            |timer| {
                seen.push(timer);
                if let Some(tx) = tx.take() {
                    let _ = tx.send(());
                }
                async {}
            },
            async {
                let _ = rx.await;
            },
        )
        .await;

        assert_eq!(invocations, 1);
        assert_eq!(seen.len(), 1);
        assert!(!seen[0].past_due);
    }
}
