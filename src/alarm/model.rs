use chrono::{DateTime, Local, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::alarm::days::DayBitmask;
use crate::error::AlarmError;

pub type AlarmId = u32;

pub const MINUTES_PER_DAY: u16 = 24 * 60;

/// Sound URI meaning "play nothing".
pub const SILENT_URI: &str = "silent";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sound {
    pub title: String,
    pub uri: String,
}

impl Sound {
    pub fn new(title: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            uri: uri.into(),
        }
    }

    pub fn silent() -> Self {
        Self::new("Silent", SILENT_URI)
    }
}

pub fn is_silent_uri(uri: &str) -> bool {
    uri == SILENT_URI
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alarm {
    /// Zero until the alarm is persisted.
    pub id: AlarmId,
    /// Minutes since local midnight.
    pub time_in_minutes: u16,
    pub days: DayBitmask,
    pub enabled: bool,
    pub vibrate: bool,
    pub sound_title: String,
    pub sound_uri: String,
    pub label: String,
    /// Pending snooze ring; takes precedence over the next regular trigger.
    pub snoozed_until: Option<DateTime<Local>>,
}

impl Alarm {
    /// Unsaved, disabled alarm ringing with `default_sound`.
    pub fn new(
        time_in_minutes: u32,
        days: DayBitmask,
        default_sound: &Sound,
    ) -> Result<Self, AlarmError> {
        Ok(Self {
            id: 0,
            time_in_minutes: checked_minutes(time_in_minutes)?,
            days,
            enabled: false,
            vibrate: false,
            sound_title: default_sound.title.clone(),
            sound_uri: default_sound.uri.clone(),
            label: String::new(),
            snoozed_until: None,
        })
    }

    pub fn is_saved(&self) -> bool {
        self.id != 0
    }

    pub fn time_local(&self) -> NaiveTime {
        time_of_day(self.time_in_minutes)
    }

    pub fn sound(&self) -> Sound {
        Sound::new(self.sound_title.clone(), self.sound_uri.clone())
    }

    pub fn set_sound(&mut self, sound: &Sound) {
        self.sound_title = sound.title.clone();
        self.sound_uri = sound.uri.clone();
    }

    /// `None` when the label is empty so callers can substitute their own title.
    pub fn label(&self) -> Option<&str> {
        (!self.label.is_empty()).then_some(self.label.as_str())
    }

    /// Snooze instant still ahead of (or at) `now`.
    pub fn pending_snooze(&self, now: DateTime<Local>) -> Option<DateTime<Local>> {
        self.snoozed_until.filter(|at| *at >= now)
    }
}

pub fn checked_minutes(time_in_minutes: u32) -> Result<u16, AlarmError> {
    u16::try_from(time_in_minutes)
        .ok()
        .filter(|minutes| *minutes < MINUTES_PER_DAY)
        .ok_or(AlarmError::TimeOutOfRange(time_in_minutes))
}

pub fn minutes_of(time: NaiveTime) -> u16 {
    use chrono::Timelike;
    // hour < 24 and minute < 60, so this stays below MINUTES_PER_DAY
    (time.hour() * 60 + time.minute()) as u16
}

/// Out-of-range input wraps around midnight.
pub fn time_of_day(time_in_minutes: u16) -> NaiveTime {
    let minutes = u32::from(time_in_minutes % MINUTES_PER_DAY);
    NaiveTime::from_hms_opt(minutes / 60, minutes % 60, 0).unwrap_or(NaiveTime::MIN)
}
