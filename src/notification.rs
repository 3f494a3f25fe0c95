//! Notification and channel descriptors handed to the notification service.

use chrono::{DateTime, Local};

use crate::alarm::model::{Alarm, AlarmId, is_silent_uri};
use crate::config::Settings;
use crate::snooze::{SnoozeTarget, resolve_snooze_target};
use crate::timer::model::{Timer, TimerId};

pub const UPCOMING_ALARM_CHANNEL_ID: &str = "early_alarm_dismissal";
pub const VIBRATE_PATTERN_MS: [u64; 2] = [500, 500];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Channel {
    pub id: String,
    /// `None` lets the notification service pick its own localized name.
    pub name: Option<String>,
    /// `None` means the channel plays nothing.
    pub sound_uri: Option<String>,
    pub vibrate: bool,
    pub bypass_dnd: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationKind {
    AlarmRinging { alarm_id: AlarmId },
    UpcomingAlarm { alarm_id: AlarmId, at: DateTime<Local> },
    TimerExpired { timer_id: TimerId },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationAction {
    Snooze(SnoozeTarget),
    DismissAlarm(AlarmId),
    DismissUpcoming(AlarmId),
    HideTimer(TimerId),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub kind: NotificationKind,
    pub channel_id: String,
    pub title: Option<String>,
    pub sound_uri: Option<String>,
    pub vibrate_pattern: Option<[u64; 2]>,
    /// Keeps sounding until the user reacts.
    pub insistent: bool,
    pub actions: Vec<NotificationAction>,
}

pub fn alarm_channel_id(alarm: &Alarm) -> String {
    format!("simple_alarm_channel_{}_{}", alarm.sound_uri, alarm.vibrate)
}

pub fn alarm_notification(alarm: &Alarm, settings: &Settings) -> (Channel, Notification) {
    let sound_uri = audible_uri(&alarm.sound_uri);
    let channel = Channel {
        id: alarm_channel_id(alarm),
        name: alarm.label().map(str::to_string),
        sound_uri: sound_uri.clone(),
        vibrate: alarm.vibrate,
        bypass_dnd: true,
    };
    let notification = Notification {
        kind: NotificationKind::AlarmRinging { alarm_id: alarm.id },
        channel_id: channel.id.clone(),
        title: alarm.label().map(str::to_string),
        sound_uri,
        vibrate_pattern: alarm.vibrate.then_some(VIBRATE_PATTERN_MS),
        insistent: true,
        actions: vec![
            NotificationAction::Snooze(resolve_snooze_target(alarm, settings)),
            NotificationAction::DismissAlarm(alarm.id),
        ],
    };
    (channel, notification)
}

pub fn upcoming_alarm_channel() -> Channel {
    Channel {
        id: UPCOMING_ALARM_CHANNEL_ID.to_string(),
        name: None,
        sound_uri: None,
        vibrate: false,
        bypass_dnd: false,
    }
}

pub fn upcoming_alarm_notification(alarm: &Alarm, at: DateTime<Local>) -> Notification {
    Notification {
        kind: NotificationKind::UpcomingAlarm {
            alarm_id: alarm.id,
            at,
        },
        channel_id: UPCOMING_ALARM_CHANNEL_ID.to_string(),
        title: alarm.label().map(str::to_string),
        sound_uri: None,
        vibrate_pattern: None,
        insistent: false,
        actions: vec![NotificationAction::DismissUpcoming(alarm.id)],
    }
}

/// Fresh channel id for a timer's first notification. A silent sound
/// contributes an empty URI.
pub fn timer_channel_id(sound_uri: &str, now: DateTime<Local>) -> String {
    let uri = audible_uri(sound_uri).unwrap_or_default();
    format!("simple_timer_channel_{uri}_{}", now.timestamp_millis())
}

pub fn timer_notification(
    timer: &Timer,
    timer_id: TimerId,
    channel_id: &str,
) -> (Channel, Notification) {
    let sound_uri = audible_uri(&timer.sound_uri);
    let channel = Channel {
        id: channel_id.to_string(),
        name: None,
        sound_uri: sound_uri.clone(),
        vibrate: timer.vibrate,
        bypass_dnd: true,
    };
    let notification = Notification {
        kind: NotificationKind::TimerExpired { timer_id },
        channel_id: channel_id.to_string(),
        title: timer.label().map(str::to_string),
        sound_uri,
        vibrate_pattern: timer.vibrate.then_some(VIBRATE_PATTERN_MS),
        insistent: true,
        actions: vec![NotificationAction::HideTimer(timer_id)],
    };
    (channel, notification)
}

fn audible_uri(uri: &str) -> Option<String> {
    (!is_silent_uri(uri) && !uri.is_empty()).then(|| uri.to_string())
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::alarm::days::DayBitmask;
    use crate::alarm::model::Sound;
    use crate::snooze::SnoozeHandler;

    fn alarm(sound: Sound, vibrate: bool) -> Alarm {
        let mut alarm = Alarm::new(7 * 60, DayBitmask::WORKDAYS, &sound).expect("alarm");
        alarm.id = 4;
        alarm.vibrate = vibrate;
        alarm
    }

    #[test]
    fn alarm_channel_depends_on_sound_and_vibration() {
        let sound = Sound::new("Cesium", "content://cesium");
        assert_eq!(
            alarm_channel_id(&alarm(sound.clone(), true)),
            "simple_alarm_channel_content://cesium_true"
        );
        assert_ne!(
            alarm_channel_id(&alarm(sound.clone(), true)),
            alarm_channel_id(&alarm(sound, false))
        );
    }

    #[test]
    fn silent_alarm_attaches_no_sound() {
        let silent = alarm(Sound::silent(), false);
        let (channel, notification) = alarm_notification(&silent, &Settings::default());
        assert_eq!(channel.sound_uri, None);
        assert_eq!(notification.sound_uri, None);
        assert_eq!(notification.vibrate_pattern, None);
        assert!(notification.insistent);
    }

    #[test]
    fn alarm_notification_offers_snooze_and_dismiss() {
        let settings = Settings {
            use_same_snooze: true,
            ..Settings::default()
        };
        let (_, notification) = alarm_notification(&alarm(Sound::silent(), true), &settings);
        assert_eq!(notification.vibrate_pattern, Some(VIBRATE_PATTERN_MS));
        match &notification.actions[..] {
            [NotificationAction::Snooze(target), NotificationAction::DismissAlarm(4)] => {
                assert_eq!(target.handler, SnoozeHandler::Service);
                assert_eq!(target.action.alarm_id, 4);
            }
            other => panic!("unexpected actions {other:?}"),
        }
    }

    #[test]
    fn timer_channel_id_drops_silent_uri() {
        let now = Local
            .with_ymd_and_hms(2026, 1, 5, 8, 0, 0)
            .single()
            .expect("valid");
        let millis = now.timestamp_millis();
        assert_eq!(
            timer_channel_id("silent", now),
            format!("simple_timer_channel__{millis}")
        );
        assert_eq!(
            timer_channel_id("content://beep", now),
            format!("simple_timer_channel_content://beep_{millis}")
        );
    }
}
