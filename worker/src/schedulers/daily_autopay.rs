use anyhow::Result;
use backend::usecases::daily_autopay::DailyAutopayUseCase;
use chrono::{DateTime, NaiveTime, TimeDelta, Utc};
use crates::domain::value_objects::civil_time::{self, IST_OFFSET_SECONDS};
use std::sync::Arc;
use tracing::{error, info, warn};

pub struct DailyAutopayScheduler {
    daily: Arc<DailyAutopayUseCase>,
    run_at: NaiveTime,
}

impl DailyAutopayScheduler {
    pub fn new(daily: Arc<DailyAutopayUseCase>, run_at: NaiveTime) -> Self {
        Self { daily, run_at }
    }

    pub async fn run(&self) -> Result<()> {
        info!(run_at_ist = %self.run_at, "daily_autopay: starting scheduler");
        loop {
            let now = Utc::now();
            let next = next_run_after(now, self.run_at);
            let wait = (next - now).to_std().unwrap_or_default();
            info!(next_run = %next, wait_secs = wait.as_secs(), "daily_autopay: sleeping until next run");
            tokio::time::sleep(wait).await;

            self.tick().await;
        }
    }

    /// One charge run. Errors are logged; the next day's run acts as the retry.
    pub async fn tick(&self) {
        match self.daily.run_daily_autopay_charges().await {
            Ok(summary) if summary.failed > 0 => warn!(
                date = %summary.date,
                selected = summary.selected,
                charged = summary.charged,
                pending = summary.pending,
                failed = summary.failed,
                "daily_autopay: run finished with failures"
            ),
            Ok(summary) => info!(
                date = %summary.date,
                selected = summary.selected,
                charged = summary.charged,
                pending = summary.pending,
                skipped = summary.skipped_already_charged + summary.skipped_ineligible,
                "daily_autopay: run finished"
            ),
            Err(e) => error!(error = %e, "daily_autopay: run failed"),
        }
    }
}

/// The first instant strictly after `now` whose IST wall-clock time is `run_at`.
pub fn next_run_after(now: DateTime<Utc>, run_at: NaiveTime) -> DateTime<Utc> {
    let today_ist = civil_time::civil_date(now);
    let local = today_ist.and_time(run_at);
    let candidate = (local - TimeDelta::seconds(i64::from(IST_OFFSET_SECONDS))).and_utc();

    if candidate > now {
        candidate
    } else {
        candidate + TimeDelta::days(1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn nine_am() -> NaiveTime {
        NaiveTime::from_hms_opt(9, 0, 0).unwrap()
    }

    #[test]
    fn runs_later_the_same_ist_morning() {
        // 07:30 IST
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 2, 0, 0).unwrap();
        assert_eq!(
            next_run_after(now, nine_am()),
            Utc.with_ymd_and_hms(2026, 10, 18, 3, 30, 0).unwrap()
        );
    }

    #[test]
    fn rolls_to_tomorrow_once_the_time_has_passed() {
        // 09:30 IST
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 4, 0, 0).unwrap();
        assert_eq!(
            next_run_after(now, nine_am()),
            Utc.with_ymd_and_hms(2026, 10, 19, 3, 30, 0).unwrap()
        );
    }

    #[test]
    fn exact_run_time_schedules_the_next_day() {
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 3, 30, 0).unwrap();
        assert_eq!(
            next_run_after(now, nine_am()),
            Utc.with_ymd_and_hms(2026, 10, 19, 3, 30, 0).unwrap()
        );
    }

    #[test]
    fn uses_the_ist_date_after_utc_evening() {
        // 00:30 IST on the 19th
        let now = Utc.with_ymd_and_hms(2026, 10, 18, 19, 0, 0).unwrap();
        assert_eq!(
            next_run_after(now, nine_am()),
            Utc.with_ymd_and_hms(2026, 10, 19, 3, 30, 0).unwrap()
        );
    }
}
