use anyhow::{Context, anyhow};
use chrono::{
    Datelike, Duration as ChronoDuration, FixedOffset, NaiveDateTime, NaiveTime, Utc, Weekday,
};
use tracing::{info, warn};

use crate::service::LottoService;

/// Draws and sale windows are defined in Korean time; the offset is fixed,
/// KST has no daylight saving.
const KST_OFFSET_SECS: i32 = 9 * 3600;

/// A weekly trigger: weekday plus wall-clock time, KST.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schedule {
    pub weekday: Weekday,
    pub time: NaiveTime,
}

impl Schedule {
    /// Parses `"Sat 13:00"` style strings (weekday name, then HH:MM).
    pub fn parse(input: &str) -> anyhow::Result<Schedule> {
        let (day, time) = input
            .trim()
            .split_once(' ')
            .with_context(|| format!("expected \"<weekday> <HH:MM>\", got {input:?}"))?;
        let weekday: Weekday = day
            .parse()
            .map_err(|_| anyhow!("unknown weekday: {day:?}"))?;
        let time = NaiveTime::parse_from_str(time.trim(), "%H:%M")
            .with_context(|| format!("bad time of day: {time:?}"))?;
        Ok(Schedule { weekday, time })
    }

    /// First occurrence strictly after `now`.
    pub fn next_after(&self, now: NaiveDateTime) -> NaiveDateTime {
        let days_ahead = (self.weekday.num_days_from_monday() as i64
            - now.weekday().num_days_from_monday() as i64)
            .rem_euclid(7);
        let mut candidate = (now.date() + ChronoDuration::days(days_ahead)).and_time(self.time);
        if candidate <= now {
            candidate += ChronoDuration::days(7);
        }
        candidate
    }
}

pub fn now_kst() -> NaiveDateTime {
    let kst = FixedOffset::east_opt(KST_OFFSET_SECS).unwrap();
    Utc::now().with_timezone(&kst).naive_local()
}

pub fn today_kst() -> String {
    now_kst().format("%Y%m%d").to_string()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Job {
    Buy,
    WinnerCheck,
}

/// Single dispatch loop for both triggers. Running them from one task is
/// what keeps a buy cycle and a winner check from ever overlapping.
pub async fn run(service: LottoService, buy: Schedule, check: Schedule) {
    loop {
        let now = now_kst();
        let next_buy = buy.next_after(now);
        let next_check = check.next_after(now);
        let (when, job) = if next_buy <= next_check {
            (next_buy, Job::Buy)
        } else {
            (next_check, Job::WinnerCheck)
        };

        let wait = match (when - now).to_std() {
            Ok(wait) => wait,
            Err(_) => {
                warn!("schedule produced a past trigger, retrying in 60s");
                std::time::Duration::from_secs(60)
            }
        };
        info!("next job {job:?} at {when} KST ({}s away)", wait.as_secs());
        tokio::time::sleep(wait).await;

        match job {
            Job::Buy => service.run_buy_cycle().await,
            Job::WinnerCheck => service.run_winner_check().await,
        }
    }
}
