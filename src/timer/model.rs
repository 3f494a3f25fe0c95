use chrono::{DateTime, Local, TimeDelta};
use serde::{Deserialize, Serialize};

use crate::config::Settings;

pub type TimerId = u32;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum TimerState {
    Idle,
    /// Counting down `remaining_ms` from `since`.
    Running {
        remaining_ms: i64,
        since: DateTime<Local>,
    },
    Paused {
        remaining_ms: i64,
    },
    Expired,
}

impl TimerState {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Running { .. } => "running",
            Self::Paused { .. } => "paused",
            Self::Expired => "expired",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Timer {
    /// `None` until first persisted.
    pub id: Option<TimerId>,
    pub seconds: u32,
    pub state: TimerState,
    pub vibrate: bool,
    pub sound_uri: String,
    pub sound_title: String,
    #[serde(default)]
    pub label: String,
    pub created_at: DateTime<Local>,
    /// Assigned on the first notification and kept afterwards.
    #[serde(default)]
    pub channel_id: Option<String>,
}

impl Timer {
    pub fn from_settings(settings: &Settings, now: DateTime<Local>) -> Self {
        Self {
            id: None,
            seconds: settings.timer_seconds,
            state: TimerState::Idle,
            vibrate: settings.timer_vibrate,
            sound_uri: settings.timer_sound.uri.clone(),
            sound_title: settings.timer_sound.title.clone(),
            label: settings.timer_label.clone(),
            created_at: now,
            channel_id: None,
        }
    }

    pub fn label(&self) -> Option<&str> {
        (!self.label.is_empty()).then_some(self.label.as_str())
    }

    pub fn duration(&self) -> TimeDelta {
        TimeDelta::seconds(i64::from(self.seconds))
    }

    pub fn remaining(&self, now: DateTime<Local>) -> TimeDelta {
        match &self.state {
            TimerState::Idle => self.duration(),
            TimerState::Running {
                remaining_ms,
                since,
            } => (TimeDelta::milliseconds(*remaining_ms) - (now - *since)).max(TimeDelta::zero()),
            TimerState::Paused { remaining_ms } => TimeDelta::milliseconds(*remaining_ms),
            TimerState::Expired => TimeDelta::zero(),
        }
    }

    pub fn expires_at(&self) -> Option<DateTime<Local>> {
        match &self.state {
            TimerState::Running {
                remaining_ms,
                since,
            } => Some(*since + TimeDelta::milliseconds(*remaining_ms)),
            _ => None,
        }
    }
}
