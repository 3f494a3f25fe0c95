use std::sync::{Arc, Mutex};

use anyhow::{Result, anyhow};
use chrono::{DateTime, Local, NaiveDateTime, TimeDelta, TimeZone};

use crate::alarm::model::minutes_of;

pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Local>;
    fn label(&self) -> &'static str;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Local> {
        Local::now()
    }

    fn label(&self) -> &'static str {
        "system"
    }
}

/// A clock that only moves when told to.
pub struct FixedClock {
    now: Mutex<DateTime<Local>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Local>) -> Self {
        Self {
            now: Mutex::new(now),
        }
    }

    pub fn advance(&self, delta: TimeDelta) {
        if let Ok(mut guard) = self.now.lock() {
            *guard = *guard + delta;
        }
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Local> {
        match self.now.lock() {
            Ok(guard) => *guard,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn label(&self) -> &'static str {
        "fixed"
    }
}

pub fn select_clock(frozen_at: Option<NaiveDateTime>) -> Result<Arc<dyn Clock>> {
    match frozen_at {
        None => Ok(Arc::new(SystemClock)),
        Some(naive) => {
            let now = Local
                .from_local_datetime(&naive)
                .earliest()
                .ok_or_else(|| anyhow!("{naive} does not exist in the local time zone"))?;
            Ok(Arc::new(FixedClock::new(now)))
        }
    }
}

pub fn parse_local_datetime(input: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M:%S")
        .or_else(|_| NaiveDateTime::parse_from_str(input, "%Y-%m-%dT%H:%M"))
        .map_err(|_| anyhow!("invalid local datetime '{input}', expected YYYY-MM-DDTHH:MM[:SS]"))
}

pub fn minute_of_day<Tz: TimeZone>(now: &DateTime<Tz>) -> u16 {
    minutes_of(now.time())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixed_clock_moves_only_when_advanced() {
        let start = Local
            .with_ymd_and_hms(2026, 1, 5, 8, 0, 0)
            .single()
            .expect("valid");
        let clock = FixedClock::new(start);
        assert_eq!(clock.now(), start);
        clock.advance(TimeDelta::minutes(90));
        assert_eq!(clock.now(), start + TimeDelta::minutes(90));
        assert_eq!(minute_of_day(&clock.now()), 9 * 60 + 30);
    }

    #[test]
    fn frozen_selection_reports_fixed_clock() {
        let naive = parse_local_datetime("2026-01-05T08:00").expect("parse");
        let clock = select_clock(Some(naive)).expect("clock");
        assert_eq!(clock.label(), "fixed");
        assert_eq!(clock.now().naive_local(), naive);
        assert_eq!(select_clock(None).expect("clock").label(), "system");
    }

    #[test]
    fn rejects_garbled_datetime() {
        let err = parse_local_datetime("monday at eight").expect_err("should fail");
        assert!(err.to_string().contains("invalid local datetime"));
    }
}
