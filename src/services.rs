//! Narrow interfaces to everything the scheduling core does not own.

use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Local};

use crate::alarm::model::{Alarm, AlarmId};
use crate::clock::Clock;
use crate::config::Settings;
use crate::error::{NotifyError, StoreError, WakeError};
use crate::notification::{Channel, Notification};
use crate::timer::model::{Timer, TimerId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WakeKey {
    /// The ring itself.
    Alarm(AlarmId),
    /// Pre-notification that lets the user dismiss ahead of time.
    EarlyDismissal(AlarmId),
    Timer(TimerId),
}

impl fmt::Display for WakeKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alarm(id) => write!(f, "alarm:{id}"),
            Self::EarlyDismissal(id) => write!(f, "early-dismissal:{id}"),
            Self::Timer(id) => write!(f, "timer:{id}"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WakePayload {
    Alarm(AlarmId),
    EarlyDismissal(AlarmId),
    Timer(TimerId),
}

/// One-shot device wake-ups. Arming an already armed key replaces it;
/// cancelling an unarmed key does nothing.
pub trait WakeService: Send + Sync {
    fn arm_exact_wake(
        &self,
        key: WakeKey,
        at: DateTime<Local>,
        payload: WakePayload,
    ) -> Result<(), WakeError>;

    fn cancel_wake(&self, key: WakeKey);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NotificationId {
    Alarm(AlarmId),
    UpcomingAlarm(AlarmId),
    Timer(TimerId),
}

impl fmt::Display for NotificationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Alarm(id) => write!(f, "alarm:{id}"),
            Self::UpcomingAlarm(id) => write!(f, "upcoming-alarm:{id}"),
            Self::Timer(id) => write!(f, "timer:{id}"),
        }
    }
}

pub trait NotificationService: Send + Sync {
    fn show(&self, id: NotificationId, notification: &Notification) -> Result<(), NotifyError>;
    fn cancel(&self, id: NotificationId);
    fn create_channel(&self, channel: &Channel) -> Result<(), NotifyError>;
    fn delete_channel(&self, channel_id: &str) -> Result<(), NotifyError>;
}

/// Persistent alarm and timer records. Reads may block.
pub trait Storage: Send + Sync {
    fn enabled_alarms(&self) -> Result<Vec<Alarm>, StoreError>;
    fn alarm(&self, id: AlarmId) -> Result<Option<Alarm>, StoreError>;
    fn alarms_by_sound_uri(&self, uri: &str) -> Result<Vec<Alarm>, StoreError>;
    /// Assigns the next free id when `alarm.id` is zero.
    fn insert_alarm(&self, alarm: Alarm) -> Result<Alarm, StoreError>;
    fn update_alarm(&self, alarm: &Alarm) -> Result<(), StoreError>;
    fn delete_alarm(&self, id: AlarmId) -> Result<(), StoreError>;

    fn timer(&self, id: TimerId) -> Result<Option<Timer>, StoreError>;
    /// Returns the id the timer is stored under.
    fn insert_or_update_timer(&self, timer: &Timer) -> Result<TimerId, StoreError>;
    fn delete_timer(&self, id: TimerId) -> Result<(), StoreError>;
}

/// Transient user-facing messages, such as toasts.
pub trait UserMessages: Send + Sync {
    fn remaining_time(&self, total_minutes: i64);
    fn error(&self, message: &str);
}

/// Handles shared by the alarm scheduler and the timer engine.
#[derive(Clone)]
pub struct Services {
    pub clock: Arc<dyn Clock>,
    pub wake: Arc<dyn WakeService>,
    pub notifications: Arc<dyn NotificationService>,
    pub storage: Arc<dyn Storage>,
    pub messages: Arc<dyn UserMessages>,
    pub settings: Arc<Settings>,
}
