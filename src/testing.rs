//! Recording collaborators for unit tests.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Local, TimeZone};

use crate::alarm::days::DayBitmask;
use crate::alarm::model::{Alarm, AlarmId};
use crate::clock::{Clock, FixedClock};
use crate::config::Settings;
use crate::error::{NotifyError, WakeError};
use crate::notification::{Channel, Notification};
use crate::services::{
    NotificationId, NotificationService, Services, Storage, UserMessages, WakeKey, WakePayload,
    WakeService,
};
use crate::store::{JsonStore, StoreDocument};
use crate::timer::model::{Timer, TimerId};

/// Monday 2026-01-05 at the given local time.
pub fn monday_at(hour: u32, minute: u32) -> DateTime<Local> {
    Local
        .with_ymd_and_hms(2026, 1, 5, hour, minute, 0)
        .earliest()
        .expect("valid local time")
}

#[derive(Default)]
pub struct RecordingWake {
    armed: Mutex<HashMap<WakeKey, (DateTime<Local>, WakePayload)>>,
    cancelled: Mutex<Vec<WakeKey>>,
    deny: AtomicBool,
}

impl RecordingWake {
    pub fn armed_at(&self, key: WakeKey) -> Option<DateTime<Local>> {
        self.armed.lock().expect("lock").get(&key).map(|(at, _)| *at)
    }

    pub fn payload(&self, key: WakeKey) -> Option<WakePayload> {
        self.armed.lock().expect("lock").get(&key).map(|(_, p)| *p)
    }

    pub fn armed_count(&self) -> usize {
        self.armed.lock().expect("lock").len()
    }

    pub fn cancelled(&self) -> Vec<WakeKey> {
        self.cancelled.lock().expect("lock").clone()
    }

    pub fn deny_arming(&self) {
        self.deny.store(true, Ordering::SeqCst);
    }
}

impl WakeService for RecordingWake {
    fn arm_exact_wake(
        &self,
        key: WakeKey,
        at: DateTime<Local>,
        payload: WakePayload,
    ) -> Result<(), WakeError> {
        if self.deny.load(Ordering::SeqCst) {
            return Err(WakeError::PermissionDenied);
        }
        self.armed.lock().expect("lock").insert(key, (at, payload));
        Ok(())
    }

    fn cancel_wake(&self, key: WakeKey) {
        self.armed.lock().expect("lock").remove(&key);
        self.cancelled.lock().expect("lock").push(key);
    }
}

#[derive(Default)]
pub struct RecordingNotifications {
    shown: Mutex<HashMap<NotificationId, Notification>>,
    channels: Mutex<Vec<Channel>>,
    deleted: Mutex<Vec<String>>,
    fail_deletes: AtomicBool,
    fail_shows: AtomicBool,
}

impl RecordingNotifications {
    pub fn last_channel(&self) -> Option<Channel> {
        self.channels.lock().expect("lock").last().cloned()
    }

    pub fn is_shown(&self, id: NotificationId) -> bool {
        self.shown.lock().expect("lock").contains_key(&id)
    }

    pub fn shown(&self, id: NotificationId) -> Option<Notification> {
        self.shown.lock().expect("lock").get(&id).cloned()
    }

    pub fn deleted_channels(&self) -> Vec<String> {
        self.deleted.lock().expect("lock").clone()
    }

    pub fn fail_channel_deletes(&self) {
        self.fail_deletes.store(true, Ordering::SeqCst);
    }

    pub fn fail_shows(&self) {
        self.fail_shows.store(true, Ordering::SeqCst);
    }
}

impl NotificationService for RecordingNotifications {
    fn show(&self, id: NotificationId, notification: &Notification) -> Result<(), NotifyError> {
        if self.fail_shows.load(Ordering::SeqCst) {
            return Err(NotifyError::UnknownChannel(notification.channel_id.clone()));
        }
        self.shown
            .lock()
            .expect("lock")
            .insert(id, notification.clone());
        Ok(())
    }

    fn cancel(&self, id: NotificationId) {
        self.shown.lock().expect("lock").remove(&id);
    }

    fn create_channel(&self, channel: &Channel) -> Result<(), NotifyError> {
        self.channels.lock().expect("lock").push(channel.clone());
        Ok(())
    }

    fn delete_channel(&self, channel_id: &str) -> Result<(), NotifyError> {
        if self.fail_deletes.load(Ordering::SeqCst) {
            return Err(NotifyError::UnknownChannel(channel_id.to_string()));
        }
        self.deleted
            .lock()
            .expect("lock")
            .push(channel_id.to_string());
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingMessages {
    remaining: Mutex<Vec<i64>>,
    errors: Mutex<Vec<String>>,
}

impl RecordingMessages {
    pub fn remaining(&self) -> Vec<i64> {
        self.remaining.lock().expect("lock").clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().expect("lock").clone()
    }
}

impl UserMessages for RecordingMessages {
    fn remaining_time(&self, total_minutes: i64) {
        self.remaining.lock().expect("lock").push(total_minutes);
    }

    fn error(&self, message: &str) {
        self.errors.lock().expect("lock").push(message.to_string());
    }
}

pub struct Harness {
    pub clock: Arc<FixedClock>,
    pub wake: Arc<RecordingWake>,
    pub notifications: Arc<RecordingNotifications>,
    pub messages: Arc<RecordingMessages>,
    pub store: Arc<JsonStore>,
    settings: Arc<Settings>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_settings(Settings::default())
    }

    pub fn with_settings(settings: Settings) -> Self {
        let document = StoreDocument {
            settings: settings.clone(),
            ..StoreDocument::default()
        };
        Self {
            clock: Arc::new(FixedClock::new(monday_at(8, 0))),
            wake: Arc::new(RecordingWake::default()),
            notifications: Arc::new(RecordingNotifications::default()),
            messages: Arc::new(RecordingMessages::default()),
            store: Arc::new(JsonStore::in_memory(document)),
            settings: Arc::new(settings),
        }
    }

    pub fn services(&self) -> Services {
        Services {
            clock: self.clock.clone(),
            wake: self.wake.clone(),
            notifications: self.notifications.clone(),
            storage: self.store.clone(),
            messages: self.messages.clone(),
            settings: self.settings.clone(),
        }
    }

    pub fn now(&self) -> DateTime<Local> {
        self.clock.now()
    }

    /// Persists an enabled alarm and returns it with its assigned id.
    pub fn add_alarm(&self, time_in_minutes: u32, days: DayBitmask) -> Alarm {
        let mut alarm =
            Alarm::new(time_in_minutes, days, &self.settings.alarm_sound).expect("valid time");
        alarm.enabled = true;
        self.store.insert_alarm(alarm).expect("insert")
    }

    pub fn stored_alarm(&self, id: AlarmId) -> Option<Alarm> {
        self.store.alarm(id).expect("read alarm")
    }

    pub fn stored_timer(&self, id: TimerId) -> Option<Timer> {
        self.store.timer(id).expect("read timer")
    }
}
