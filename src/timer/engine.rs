use log::{debug, info, warn};

use crate::error::TimerError;
use crate::notification::{timer_channel_id, timer_notification};
use crate::services::{NotificationId, Services, WakeKey, WakePayload};
use crate::timer::model::{Timer, TimerId, TimerState};

/// Drives timer state transitions and their notifications.
///
/// `Idle -> Running -> {Paused <-> Running, Expired}`, and any state back to
/// `Idle` through [`TimerEngine::reset`].
pub struct TimerEngine {
    services: Services,
}

impl TimerEngine {
    pub fn new(services: Services) -> Self {
        Self { services }
    }

    pub fn create_timer(&self) -> Timer {
        Timer::from_settings(&self.services.settings, self.services.clock.now())
    }

    /// Idle or Paused to Running. The timer is persisted first so the wake
    /// can be keyed by its id.
    pub fn start(&self, timer: &mut Timer) -> Result<(), TimerError> {
        let remaining_ms = match &timer.state {
            TimerState::Idle => {
                if timer.seconds == 0 {
                    return Err(TimerError::ZeroDuration);
                }
                timer.duration().num_milliseconds()
            }
            TimerState::Paused { remaining_ms } => *remaining_ms,
            other => return Err(invalid("start", other)),
        };

        timer.state = TimerState::Running {
            remaining_ms,
            since: self.services.clock.now(),
        };
        let id = self.persist(timer)?;
        self.arm_expiry(id, timer);
        info!("timer {id} running, {remaining_ms} ms left");
        Ok(())
    }

    pub fn resume(&self, timer: &mut Timer) -> Result<(), TimerError> {
        if !matches!(timer.state, TimerState::Paused { .. }) {
            return Err(invalid("resume", &timer.state));
        }
        self.start(timer)
    }

    pub fn pause(&self, timer: &mut Timer) -> Result<(), TimerError> {
        if !matches!(timer.state, TimerState::Running { .. }) {
            return Err(invalid("pause", &timer.state));
        }
        let remaining = timer.remaining(self.services.clock.now());
        timer.state = TimerState::Paused {
            remaining_ms: remaining.num_milliseconds(),
        };
        let id = self.persist(timer)?;
        self.services.wake.cancel_wake(WakeKey::Timer(id));
        debug!("timer {id} paused with {} ms left", remaining.num_milliseconds());
        Ok(())
    }

    /// Running to Expired, then shows the expiry notification. Calling it
    /// again on an expired timer re-notifies on the same channel.
    pub fn expire(&self, timer: &mut Timer) -> Result<(), TimerError> {
        if !matches!(
            timer.state,
            TimerState::Running { .. } | TimerState::Expired
        ) {
            return Err(invalid("expire", &timer.state));
        }
        timer.state = TimerState::Expired;

        let channel_id = match &timer.channel_id {
            Some(channel_id) => channel_id.clone(),
            None => {
                let channel_id = timer_channel_id(&timer.sound_uri, self.services.clock.now());
                timer.channel_id = Some(channel_id.clone());
                channel_id
            }
        };
        let id = self.persist(timer)?;

        let notifications = &self.services.notifications;
        // recreated so edits to sound or vibration take effect
        if let Err(err) = notifications.delete_channel(&channel_id) {
            debug!("no previous channel {channel_id}: {err}");
        }
        let (channel, notification) = timer_notification(timer, id, &channel_id);
        notifications.create_channel(&channel)?;
        notifications.show(NotificationId::Timer(id), &notification)?;
        info!("timer {id} expired, notified on {channel_id}");
        Ok(())
    }

    /// Any state to Idle. Clears the shown notification and its channel.
    pub fn reset(&self, timer: &mut Timer) -> Result<(), TimerError> {
        timer.state = TimerState::Idle;
        let id = self.persist(timer)?;
        self.release(id, timer);
        debug!("timer {id} reset");
        Ok(())
    }

    pub fn delete(&self, timer: &Timer) -> Result<(), TimerError> {
        let Some(id) = timer.id else {
            return Ok(());
        };
        self.release(id, timer);
        self.services.storage.delete_timer(id)?;
        info!("timer {id} deleted");
        Ok(())
    }

    fn persist(&self, timer: &mut Timer) -> Result<TimerId, TimerError> {
        let id = self.services.storage.insert_or_update_timer(timer)?;
        timer.id = Some(id);
        Ok(id)
    }

    fn arm_expiry(&self, id: TimerId, timer: &Timer) {
        let Some(at) = timer.expires_at() else {
            return;
        };
        let key = WakeKey::Timer(id);
        if let Err(err) = self
            .services
            .wake
            .arm_exact_wake(key, at, WakePayload::Timer(id))
        {
            warn!("unable to arm {key}: {err}");
            self.services.messages.error(&err.to_string());
        }
    }

    fn release(&self, id: TimerId, timer: &Timer) {
        self.services.wake.cancel_wake(WakeKey::Timer(id));
        self.services.notifications.cancel(NotificationId::Timer(id));
        if let Some(channel_id) = &timer.channel_id
            && let Err(err) = self.services.notifications.delete_channel(channel_id)
        {
            debug!("ignoring channel cleanup failure for {channel_id}: {err}");
        }
    }
}

fn invalid(action: &'static str, state: &TimerState) -> TimerError {
    TimerError::InvalidTransition {
        action,
        state: state.name(),
    }
}
