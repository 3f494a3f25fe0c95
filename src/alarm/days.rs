//! Weekday repeat masks.
//!
//! Bit 0 is Monday and bit 6 is Sunday. Two negative sentinels stand for a
//! single ring today or tomorrow and never combine with weekday bits.

use std::fmt;
use std::str::FromStr;

use chrono::Weekday;
use thiserror::Error;

const WEEK: [Weekday; 7] = [
    Weekday::Mon,
    Weekday::Tue,
    Weekday::Wed,
    Weekday::Thu,
    Weekday::Fri,
    Weekday::Sat,
    Weekday::Sun,
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DayBitmask(i32);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DayKind {
    Today,
    Tomorrow,
    EveryDay,
    /// No weekday bits: rings at the next matching time of day, once.
    Once,
    Weekly,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseDaysError {
    #[error("unknown day '{0}', expected mon..sun, today, tomorrow, every-day or once")]
    UnknownDay(String),
    #[error("day {0} listed more than once")]
    Duplicate(String),
}

impl DayBitmask {
    pub const TODAY: Self = Self(-1);
    pub const TOMORROW: Self = Self(-2);
    pub const NONE: Self = Self(0);
    pub const WORKDAYS: Self = Self(0b001_1111);
    pub const WEEKEND: Self = Self(0b110_0000);
    pub const EVERY_DAY: Self = Self(0b111_1111);

    pub fn from_weekdays<I>(days: I) -> Self
    where
        I: IntoIterator<Item = Weekday>,
    {
        Self(days.into_iter().fold(0, |acc, day| acc | weekday_bit(day)))
    }

    pub fn bits(self) -> i32 {
        self.0
    }

    pub fn is_sentinel(self) -> bool {
        self.0 < 0
    }

    /// Whether the alarm comes back after it rings.
    pub fn is_repeating(self) -> bool {
        self.0 > 0
    }

    pub fn contains(self, day: Weekday) -> bool {
        !self.is_sentinel() && self.0 & weekday_bit(day) != 0
    }

    /// Empty and sentinel masks behave as "any day" for weekday scans.
    pub fn matches(self, day: Weekday) -> bool {
        self.0 == 0 || self.contains(day)
    }

    pub fn weekdays(self) -> Vec<Weekday> {
        WEEK.into_iter().filter(|day| self.contains(*day)).collect()
    }

    pub fn kind(self) -> DayKind {
        match self {
            Self::TODAY => DayKind::Today,
            Self::TOMORROW => DayKind::Tomorrow,
            Self::EVERY_DAY => DayKind::EveryDay,
            Self::NONE => DayKind::Once,
            _ => DayKind::Weekly,
        }
    }

    /// Ordering key for alarm lists: today first, then tomorrow, then weekly
    /// masks by the first set day in the configured week.
    pub fn sort_key(self, first_day: Weekday) -> i32 {
        match self {
            Self::TODAY => -2,
            Self::TOMORROW => -1,
            _ => display_order(first_day)
                .iter()
                .position(|day| self.contains(*day))
                .map_or(self.0, |position| 1 << position),
        }
    }
}

impl Default for DayBitmask {
    fn default() -> Self {
        Self::NONE
    }
}

pub fn weekday_bit(day: Weekday) -> i32 {
    1 << day.num_days_from_monday()
}

/// The seven weekdays starting at `first_day`.
pub fn display_order(first_day: Weekday) -> [Weekday; 7] {
    let offset = first_day.num_days_from_monday() as usize;
    std::array::from_fn(|index| WEEK[(index + offset) % WEEK.len()])
}

impl fmt::Display for DayBitmask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind() {
            DayKind::Today => f.write_str("today"),
            DayKind::Tomorrow => f.write_str("tomorrow"),
            DayKind::EveryDay => f.write_str("every-day"),
            DayKind::Once => f.write_str("once"),
            DayKind::Weekly => {
                let tokens = self
                    .weekdays()
                    .iter()
                    .map(|day| day_token(*day))
                    .collect::<Vec<_>>();
                f.write_str(&tokens.join(","))
            }
        }
    }
}

impl FromStr for DayBitmask {
    type Err = ParseDaysError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let trimmed = input.trim().to_ascii_lowercase();
        match trimmed.as_str() {
            "today" => return Ok(Self::TODAY),
            "tomorrow" => return Ok(Self::TOMORROW),
            "every-day" | "everyday" | "daily" => return Ok(Self::EVERY_DAY),
            "once" | "none" | "" => return Ok(Self::NONE),
            _ => {}
        }

        let mut bits = 0;
        for token in trimmed.split(',').map(str::trim) {
            let day = WEEK
                .into_iter()
                .find(|day| day_token(*day) == token)
                .ok_or_else(|| ParseDaysError::UnknownDay(token.to_string()))?;
            if bits & weekday_bit(day) != 0 {
                return Err(ParseDaysError::Duplicate(token.to_string()));
            }
            bits |= weekday_bit(day);
        }
        Ok(Self(bits))
    }
}

fn day_token(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "mon",
        Weekday::Tue => "tue",
        Weekday::Wed => "wed",
        Weekday::Thu => "thu",
        Weekday::Fri => "fri",
        Weekday::Sat => "sat",
        Weekday::Sun => "sun",
    }
}
