//! Next trigger instant for a time of day and a repeat mask.

use chrono::{
    DateTime, Datelike, Days, LocalResult, NaiveDate, NaiveDateTime, TimeDelta, TimeZone,
};

use crate::alarm::days::DayBitmask;
use crate::alarm::model::{Alarm, AlarmId, time_of_day};

#[derive(Debug, Clone)]
pub struct NextAlarm<Tz: TimeZone> {
    pub alarm_id: AlarmId,
    pub at: DateTime<Tz>,
}

// `Local` has no `PartialEq`, so compare the instants instead of deriving.
impl<Tz: TimeZone> PartialEq for NextAlarm<Tz> {
    fn eq(&self, other: &Self) -> bool {
        self.alarm_id == other.alarm_id && self.at == other.at
    }
}

impl<Tz: TimeZone> Eq for NextAlarm<Tz> {}

/// Resolves the next instant an alarm set for `time_in_minutes` on `days`
/// should ring, relative to `now`.
///
/// `TODAY` always resolves to today, even when that instant has passed, and
/// `TOMORROW` always resolves to tomorrow. Weekday masks scan forward from
/// today; today only qualifies when its instant lies strictly after `now`.
/// An empty mask matches any day. Seconds and sub-seconds are zero.
pub fn next_trigger<Tz>(
    now: &DateTime<Tz>,
    time_in_minutes: u16,
    days: DayBitmask,
) -> DateTime<Tz>
where
    Tz: TimeZone,
    Tz::Offset: Copy,
{
    let timezone = now.timezone();
    let today = now.date_naive();
    let time = time_of_day(time_in_minutes);
    let at_day = |date: NaiveDate| local_instant(&timezone, date.and_time(time));

    if days == DayBitmask::TODAY {
        return at_day(today);
    }
    if days == DayBitmask::TOMORROW {
        return at_day(add_days(today, 1));
    }

    for offset in 0_u64..=7 {
        let date = add_days(today, offset);
        if !days.matches(date.weekday()) {
            continue;
        }
        let candidate = at_day(date);
        if candidate > *now {
            return candidate;
        }
    }

    at_day(add_days(today, 7))
}

pub fn next_alarm_trigger<Tz>(now: &DateTime<Tz>, alarm: &Alarm) -> DateTime<Tz>
where
    Tz: TimeZone,
    Tz::Offset: Copy,
{
    next_trigger(now, alarm.time_in_minutes, alarm.days)
}

/// Earliest trigger strictly after `now` among `alarms`. Passed `TODAY`
/// alarms never qualify.
pub fn closest_trigger<Tz>(alarms: &[Alarm], now: &DateTime<Tz>) -> Option<NextAlarm<Tz>>
where
    Tz: TimeZone,
    Tz::Offset: Copy,
{
    alarms
        .iter()
        .map(|alarm| NextAlarm {
            alarm_id: alarm.id,
            at: next_alarm_trigger(now, alarm),
        })
        .filter(|next| next.at > *now)
        .min_by(|a, b| a.at.cmp(&b.at).then_with(|| a.alarm_id.cmp(&b.alarm_id)))
}

fn add_days(date: NaiveDate, days: u64) -> NaiveDate {
    date.checked_add_days(Days::new(days)).unwrap_or(NaiveDate::MAX)
}

/// Maps a wall-clock time to an instant. Ambiguous times take the earlier
/// instance; times skipped by a forward transition move one hour later.
pub(crate) fn local_instant<Tz>(timezone: &Tz, naive: NaiveDateTime) -> DateTime<Tz>
where
    Tz: TimeZone,
    Tz::Offset: Copy,
{
    match timezone.from_local_datetime(&naive) {
        LocalResult::Single(dt) => dt,
        LocalResult::Ambiguous(first, _second) => first,
        LocalResult::None => match timezone.from_local_datetime(&(naive + TimeDelta::hours(1))) {
            LocalResult::Single(dt) => dt,
            LocalResult::Ambiguous(first, _second) => first,
            LocalResult::None => timezone.from_utc_datetime(&naive),
        },
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Timelike, Utc, Weekday};
    use chrono_tz::America::New_York;

    use super::*;
    use crate::alarm::model::Sound;

    // 2026-01-05 is a Monday.
    fn monday_at(hour: u32, minute: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 5, hour, minute, 0)
            .single()
            .expect("valid")
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    #[test]
    fn passed_slot_rolls_to_next_week() {
        let monday = DayBitmask::from_weekdays([Weekday::Mon]);
        let next = next_trigger(&monday_at(8, 0), 7 * 60, monday);
        assert_eq!(next.date_naive(), date(2026, 1, 12));
        assert_eq!((next.hour(), next.minute()), (7, 0));
    }

    #[test]
    fn upcoming_slot_rings_today() {
        let monday = DayBitmask::from_weekdays([Weekday::Mon]);
        let next = next_trigger(&monday_at(8, 0), 9 * 60, monday);
        assert_eq!(next, monday_at(9, 0));
    }

    #[test]
    fn slot_equal_to_now_is_not_today() {
        let next = next_trigger(&monday_at(9, 0), 9 * 60, DayBitmask::EVERY_DAY);
        assert_eq!(next.date_naive(), date(2026, 1, 6));
    }

    #[test]
    fn today_sentinel_keeps_past_instant() {
        let next = next_trigger(&monday_at(20, 0), 6 * 60 + 30, DayBitmask::TODAY);
        assert_eq!(next, monday_at(6, 30));
    }

    #[test]
    fn tomorrow_sentinel_is_unconditional() {
        let next = next_trigger(&monday_at(5, 0), 23 * 60, DayBitmask::TOMORROW);
        assert_eq!(next.date_naive(), date(2026, 1, 6));
        assert_eq!((next.hour(), next.minute()), (23, 0));
    }

    #[test]
    fn every_day_picks_today_or_tomorrow() {
        let before = next_trigger(&monday_at(6, 0), 7 * 60, DayBitmask::EVERY_DAY);
        assert_eq!(before, monday_at(7, 0));
        let after = next_trigger(&monday_at(8, 0), 7 * 60, DayBitmask::EVERY_DAY);
        assert_eq!(after.date_naive(), date(2026, 1, 6));
    }

    #[test]
    fn empty_mask_matches_any_day() {
        let next = next_trigger(&monday_at(8, 0), 7 * 60, DayBitmask::NONE);
        assert_eq!(next.date_naive(), date(2026, 1, 6));
    }

    #[test]
    fn single_weekday_always_lands_on_that_weekday_in_the_future() {
        let now = Utc
            .with_ymd_and_hms(2026, 1, 7, 13, 17, 42)
            .single()
            .expect("valid");
        for day in [
            Weekday::Mon,
            Weekday::Tue,
            Weekday::Wed,
            Weekday::Thu,
            Weekday::Fri,
            Weekday::Sat,
            Weekday::Sun,
        ] {
            for minutes in (0_u16..1_440).step_by(37) {
                let next = next_trigger(&now, minutes, DayBitmask::from_weekdays([day]));
                assert_eq!(next.weekday(), day);
                assert_eq!((next.hour() * 60 + next.minute()) as u16, minutes);
                assert_eq!(next.second(), 0);
                assert_eq!(next.nanosecond(), 0);
                assert!(next > now);
                assert!(next - now <= TimeDelta::days(7));
            }
        }
    }

    #[test]
    fn resolution_ignores_seconds_of_now() {
        let now = Utc
            .with_ymd_and_hms(2026, 1, 5, 6, 59, 59)
            .single()
            .expect("valid");
        let next = next_trigger(&now, 7 * 60, DayBitmask::EVERY_DAY);
        assert_eq!(next, monday_at(7, 0));
    }

    #[test]
    fn nonexistent_local_time_moves_past_the_gap() {
        let now = New_York
            .with_ymd_and_hms(2026, 3, 8, 0, 30, 0)
            .single()
            .expect("valid");
        let sunday = DayBitmask::from_weekdays([Weekday::Sun]);
        let next = next_trigger(&now, 2 * 60 + 30, sunday);
        assert_eq!(next.date_naive(), date(2026, 3, 8));
        assert_eq!((next.hour(), next.minute()), (3, 30));
    }

    #[test]
    fn ambiguous_local_time_uses_first_instance() {
        let now = New_York
            .with_ymd_and_hms(2026, 11, 1, 0, 0, 0)
            .single()
            .expect("valid");
        let next = next_trigger(&now, 90, DayBitmask::TODAY);
        let naive = date(2026, 11, 1).and_hms_opt(1, 30, 0).expect("time");
        let expected = match New_York.from_local_datetime(&naive) {
            LocalResult::Ambiguous(first, _second) => first,
            _ => panic!("expected ambiguous local time"),
        };
        assert_eq!(next, expected);
    }

    #[test]
    fn closest_trigger_skips_passed_one_shots() {
        let sound = Sound::silent();
        let mut passed = Alarm::new(6 * 60, DayBitmask::TODAY, &sound).expect("alarm");
        passed.id = 1;
        let mut weekly = Alarm::new(7 * 60, DayBitmask::from_weekdays([Weekday::Wed]), &sound)
            .expect("alarm");
        weekly.id = 2;
        let mut tomorrow = Alarm::new(6 * 60, DayBitmask::TOMORROW, &sound).expect("alarm");
        tomorrow.id = 3;

        let now = monday_at(8, 0);
        let closest = closest_trigger(&[passed, weekly, tomorrow], &now).expect("closest");
        assert_eq!(closest.alarm_id, 3);
        assert_eq!(closest.at.date_naive(), date(2026, 1, 6));

        assert!(closest_trigger::<Utc>(&[], &now).is_none());
    }
}
