use chrono::Weekday;
use serde::{Deserialize, Serialize};

use crate::alarm::model::Sound;

pub const DEFAULT_TIMER_SECONDS: u32 = 300;
pub const DEFAULT_SNOOZE_MINUTES: u32 = 10;

/// Read-only defaults consumed by the scheduling core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub timer_seconds: u32,
    pub timer_vibrate: bool,
    pub timer_sound: Sound,
    pub timer_label: String,
    /// Device default used for new alarms and for alarms whose sound was removed.
    pub alarm_sound: Sound,
    /// Deliver snooze to the background service instead of the snooze screen.
    pub use_same_snooze: bool,
    pub snooze_minutes: u32,
    pub first_day_of_week: Weekday,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            timer_seconds: DEFAULT_TIMER_SECONDS,
            timer_vibrate: false,
            timer_sound: default_sound(),
            timer_label: String::new(),
            alarm_sound: default_sound(),
            use_same_snooze: false,
            snooze_minutes: DEFAULT_SNOOZE_MINUTES,
            first_day_of_week: Weekday::Mon,
        }
    }
}

fn default_sound() -> Sound {
    Sound::new("Default", "default")
}
