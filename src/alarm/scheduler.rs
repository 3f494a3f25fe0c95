use std::sync::mpsc::{self, Receiver};
use std::thread;

use chrono::{DateTime, Local, TimeDelta};
use log::{debug, info, warn};

use crate::alarm::days::DayBitmask;
use crate::alarm::model::{Alarm, AlarmId};
use crate::alarm::resolver::{NextAlarm, closest_trigger, next_alarm_trigger, next_trigger};
use crate::clock::minute_of_day;
use crate::error::{AlarmError, NotifyError, StoreError, WakeError};
use crate::notification::{alarm_notification, upcoming_alarm_channel, upcoming_alarm_notification};
use crate::services::{NotificationId, Services, WakeKey, WakePayload, WakeService};
use crate::snooze::snooze_until;

/// How long before the ring the early-dismissal wake fires.
pub const EARLY_DISMISSAL_LEAD_MINUTES: i64 = 10;
/// Floor that keeps the early-dismissal wake out of the past.
pub const MIN_WAKE_DELAY_MS: i64 = 500;

/// The main wake and the early-dismissal wake of one alarm. Both are armed
/// together and cancelled together.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TriggerPair {
    pub alarm_id: AlarmId,
    pub main_at: DateTime<Local>,
    pub early_dismissal_at: DateTime<Local>,
}

impl TriggerPair {
    pub fn plan(alarm_id: AlarmId, main_at: DateTime<Local>, now: DateTime<Local>) -> Self {
        let lead = main_at - TimeDelta::minutes(EARLY_DISMISSAL_LEAD_MINUTES);
        let floor = now + TimeDelta::milliseconds(MIN_WAKE_DELAY_MS);
        Self {
            alarm_id,
            main_at,
            early_dismissal_at: lead.max(floor),
        }
    }

    pub fn keys(alarm_id: AlarmId) -> [WakeKey; 2] {
        [WakeKey::Alarm(alarm_id), WakeKey::EarlyDismissal(alarm_id)]
    }

    fn arm(&self, wake: &dyn WakeService) -> Result<(), WakeError> {
        let id = self.alarm_id;
        wake.arm_exact_wake(WakeKey::Alarm(id), self.main_at, WakePayload::Alarm(id))?;
        wake.arm_exact_wake(
            WakeKey::EarlyDismissal(id),
            self.early_dismissal_at,
            WakePayload::EarlyDismissal(id),
        )
    }

    /// Safe on pairs that were never armed or already fired.
    pub fn cancel(alarm_id: AlarmId, wake: &dyn WakeService) {
        for key in Self::keys(alarm_id) {
            wake.cancel_wake(key);
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RescheduleSummary {
    pub scheduled: usize,
    pub skipped: usize,
    pub failed: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FireOutcome {
    /// Repeating alarm armed for its next occurrence.
    Rearmed(TriggerPair),
    /// Repeating alarm whose next occurrence could not be armed.
    Unarmed,
    /// One-shot alarm switched off after ringing.
    Disabled,
    /// The alarm was deleted or switched off before its wake arrived.
    Ignored,
}

/// Result of an enabled-alarm read running on a worker thread.
pub struct PendingAlarms {
    receiver: Receiver<Result<Vec<Alarm>, StoreError>>,
}

impl PendingAlarms {
    pub fn wait(self) -> Result<Vec<Alarm>, StoreError> {
        self.receiver.recv().unwrap_or(Err(StoreError::WorkerGone))
    }
}

pub struct AlarmScheduler {
    services: Services,
}

impl AlarmScheduler {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    /// Arms both wakes for the alarm's next trigger, or for its pending
    /// snooze. Returns `None` when the wake service refused; the failure is
    /// reported to the user and nothing stays armed.
    pub fn schedule(&self, alarm: &Alarm, notify_user: bool) -> Option<TriggerPair> {
        let now = self.services.clock.now();
        let main_at = upcoming_trigger(alarm, now);
        self.arm_at(alarm, main_at, now, notify_user)
    }

    pub fn cancel(&self, alarm: &Alarm) {
        TriggerPair::cancel(alarm.id, self.services.wake.as_ref());
        debug!("cancelled wakes for alarm {}", alarm.id);
    }

    /// Re-arms every enabled alarm, skipping `TODAY` alarms whose time has
    /// already passed.
    pub fn reschedule_all_enabled(&self) -> Result<RescheduleSummary, AlarmError> {
        let alarms = self.request_enabled_alarms().wait()?;
        let now = self.services.clock.now();
        let current_minute = minute_of_day(&now);

        let mut summary = RescheduleSummary::default();
        for alarm in &alarms {
            if alarm.days == DayBitmask::TODAY
                && alarm.time_in_minutes <= current_minute
                && alarm.pending_snooze(now).is_none()
            {
                debug!("alarm {} already passed today, not rescheduling", alarm.id);
                summary.skipped += 1;
                continue;
            }
            match self.schedule(alarm, false) {
                Some(_) => summary.scheduled += 1,
                None => summary.failed += 1,
            }
        }
        info!(
            "rescheduled {} alarm(s), skipped {}, failed {}",
            summary.scheduled, summary.skipped, summary.failed
        );
        Ok(summary)
    }

    /// Reads the enabled alarms off the calling thread.
    pub fn request_enabled_alarms(&self) -> PendingAlarms {
        let (sender, receiver) = mpsc::channel();
        let storage = self.services.storage.clone();
        thread::spawn(move || {
            let _ = sender.send(storage.enabled_alarms());
        });
        PendingAlarms { receiver }
    }

    pub fn closest_enabled_alarm(&self) -> Result<Option<NextAlarm<Local>>, AlarmError> {
        let alarms = self.services.storage.enabled_alarms()?;
        Ok(closest_trigger(&alarms, &self.services.clock.now()))
    }

    /// Persists the alarm and arms it when enabled.
    pub fn save(&self, alarm: Alarm) -> Result<(Alarm, Option<TriggerPair>), AlarmError> {
        let alarm = self.services.storage.insert_alarm(alarm)?;
        let pair = if alarm.enabled {
            self.schedule(&alarm, true)
        } else {
            self.cancel(&alarm);
            None
        };
        Ok((alarm, pair))
    }

    /// Handles the main wake: rings, then arms the next occurrence of a
    /// repeating alarm or switches a one-shot off. A failure to show the
    /// ringing notification is reported but does not stop either.
    pub fn on_alarm_fired(&self, id: AlarmId) -> Result<FireOutcome, AlarmError> {
        let Some(mut alarm) = self.services.storage.alarm(id)? else {
            warn!("wake for unknown alarm {id}");
            return Ok(FireOutcome::Ignored);
        };
        if !alarm.enabled {
            debug!("alarm {id} is disabled, ignoring its wake");
            self.cancel(&alarm);
            return Ok(FireOutcome::Ignored);
        }

        if let Err(err) = self.ring(&alarm) {
            warn!("unable to show alarm {id}: {err}");
            self.services.messages.error(&err.to_string());
        }

        let was_snoozed = alarm.snoozed_until.take().is_some();
        if alarm.days.is_repeating() {
            if was_snoozed {
                self.services.storage.update_alarm(&alarm)?;
            }
            return Ok(match self.schedule(&alarm, false) {
                Some(pair) => FireOutcome::Rearmed(pair),
                None => FireOutcome::Unarmed,
            });
        }
        self.cancel(&alarm);
        alarm.enabled = false;
        self.services.storage.update_alarm(&alarm)?;
        debug!("one-shot alarm {id} disabled");
        Ok(FireOutcome::Disabled)
    }

    /// Handles the early-dismissal wake by offering to dismiss the upcoming
    /// ring.
    pub fn on_early_dismissal(&self, id: AlarmId) -> Result<(), AlarmError> {
        let Some(alarm) = self.services.storage.alarm(id)? else {
            return Ok(());
        };
        if !alarm.enabled {
            return Ok(());
        }
        let at = upcoming_trigger(&alarm, self.services.clock.now());
        let notifications = &self.services.notifications;
        notifications.create_channel(&upcoming_alarm_channel())?;
        notifications.show(
            NotificationId::UpcomingAlarm(id),
            &upcoming_alarm_notification(&alarm, at),
        )?;
        debug!("alarm {id} upcoming at {at}");
        Ok(())
    }

    /// Skips the upcoming ring, snoozed or regular. A repeating alarm is armed
    /// for its next regular occurrence; a one-shot is switched off.
    pub fn dismiss_upcoming(&self, id: AlarmId) -> Result<Option<TriggerPair>, AlarmError> {
        let Some(mut alarm) = self.services.storage.alarm(id)? else {
            return Ok(None);
        };
        self.cancel(&alarm);
        self.services
            .notifications
            .cancel(NotificationId::UpcomingAlarm(id));

        let now = self.services.clock.now();
        let snoozed = alarm.snoozed_until.take();
        if alarm.enabled && alarm.days.is_repeating() {
            if snoozed.is_some() {
                self.services.storage.update_alarm(&alarm)?;
            }
            // a snoozed ring is not a regular occurrence
            let main_at = match snoozed.filter(|at| *at >= now) {
                Some(skipped) => {
                    info!("alarm {id} dismissed ahead of snoozed ring at {skipped}");
                    next_alarm_trigger(&now, &alarm)
                }
                None => {
                    let skipped = next_alarm_trigger(&now, &alarm);
                    info!("alarm {id} dismissed ahead of {skipped}");
                    next_trigger(&skipped, alarm.time_in_minutes, alarm.days)
                }
            };
            return Ok(self.arm_at(&alarm, main_at, now, false));
        }
        if alarm.enabled || snoozed.is_some() {
            alarm.enabled = false;
            self.services.storage.update_alarm(&alarm)?;
        }
        info!("one-shot alarm {id} dismissed ahead of time");
        Ok(None)
    }

    /// Silences the ringing alarm and rings it again after the configured
    /// snooze delay. The snooze instant is persisted and keeps a one-shot
    /// alarm enabled until that ring.
    pub fn snooze(&self, id: AlarmId) -> Result<Option<TriggerPair>, AlarmError> {
        let Some(mut alarm) = self.services.storage.alarm(id)? else {
            return Ok(None);
        };
        self.services.notifications.cancel(NotificationId::Alarm(id));
        let now = self.services.clock.now();
        let main_at = snooze_until(now, &self.services.settings);
        alarm.snoozed_until = Some(main_at);
        alarm.enabled = true;
        self.services.storage.update_alarm(&alarm)?;
        debug!("alarm {id} snoozed until {main_at}");
        Ok(self.arm_at(&alarm, main_at, now, false))
    }

    pub fn delete_alarm(&self, alarm: &Alarm) -> Result<(), AlarmError> {
        self.cancel(alarm);
        let notifications = &self.services.notifications;
        notifications.cancel(NotificationId::Alarm(alarm.id));
        notifications.cancel(NotificationId::UpcomingAlarm(alarm.id));
        self.services.storage.delete_alarm(alarm.id)?;
        info!("alarm {} deleted", alarm.id);
        Ok(())
    }

    /// Points alarms using a removed sound back at the default alarm sound.
    pub fn replace_deleted_sound(&self, uri: &str) -> Result<usize, AlarmError> {
        let default_sound = &self.services.settings.alarm_sound;
        let affected = self.services.storage.alarms_by_sound_uri(uri)?;
        for mut alarm in affected.iter().cloned() {
            alarm.set_sound(default_sound);
            self.services.storage.update_alarm(&alarm)?;
        }
        if !affected.is_empty() {
            info!(
                "{} alarm(s) switched from deleted sound {uri} to {}",
                affected.len(),
                default_sound.uri
            );
        }
        Ok(affected.len())
    }

    fn ring(&self, alarm: &Alarm) -> Result<(), NotifyError> {
        let notifications = &self.services.notifications;
        notifications.cancel(NotificationId::UpcomingAlarm(alarm.id));
        let (channel, notification) = alarm_notification(alarm, &self.services.settings);
        notifications.create_channel(&channel)?;
        notifications.show(NotificationId::Alarm(alarm.id), &notification)?;
        info!("alarm {} ringing on {}", alarm.id, channel.id);
        Ok(())
    }

    fn arm_at(
        &self,
        alarm: &Alarm,
        main_at: DateTime<Local>,
        now: DateTime<Local>,
        notify_user: bool,
    ) -> Option<TriggerPair> {
        let pair = TriggerPair::plan(alarm.id, main_at, now);
        if notify_user {
            let total_minutes = (main_at - now).num_milliseconds().div_euclid(60_000);
            self.services.messages.remaining_time(total_minutes);
        }

        let wake = self.services.wake.as_ref();
        match pair.arm(wake) {
            Ok(()) => {
                info!(
                    "alarm {} armed for {}, early dismissal at {}",
                    alarm.id, pair.main_at, pair.early_dismissal_at
                );
                Some(pair)
            }
            Err(err) => {
                warn!("unable to arm alarm {}: {err}", alarm.id);
                TriggerPair::cancel(alarm.id, wake);
                self.services.messages.error(&err.to_string());
                None
            }
        }
    }
}

fn upcoming_trigger(alarm: &Alarm, now: DateTime<Local>) -> DateTime<Local> {
    alarm
        .pending_snooze(now)
        .unwrap_or_else(|| next_alarm_trigger(&now, alarm))
}
