//! Collaborators that report to stdout instead of a device.

use chrono::{DateTime, Local};
use log::warn;

use crate::error::{NotifyError, WakeError};
use crate::notification::{Channel, Notification};
use crate::services::{
    NotificationId, NotificationService, UserMessages, WakeKey, WakePayload, WakeService,
};

pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub struct ConsoleWake;

impl WakeService for ConsoleWake {
    fn arm_exact_wake(
        &self,
        key: WakeKey,
        at: DateTime<Local>,
        _payload: WakePayload,
    ) -> Result<(), WakeError> {
        println!("armed {key} at {}", at.format(TIME_FORMAT));
        Ok(())
    }

    fn cancel_wake(&self, key: WakeKey) {
        println!("cancelled {key}");
    }
}

pub struct ConsoleNotifications;

impl NotificationService for ConsoleNotifications {
    fn show(&self, id: NotificationId, notification: &Notification) -> Result<(), NotifyError> {
        let title = notification.title.as_deref().unwrap_or("(no label)");
        let sound = notification.sound_uri.as_deref().unwrap_or("silent");
        println!(
            "notify {id} on {}: {title} [sound {sound}]",
            notification.channel_id
        );
        Ok(())
    }

    fn cancel(&self, id: NotificationId) {
        println!("hid {id}");
    }

    fn create_channel(&self, channel: &Channel) -> Result<(), NotifyError> {
        println!("channel {}", channel.id);
        Ok(())
    }

    fn delete_channel(&self, channel_id: &str) -> Result<(), NotifyError> {
        println!("deleted channel {channel_id}");
        Ok(())
    }
}

pub struct ConsoleMessages;

impl UserMessages for ConsoleMessages {
    fn remaining_time(&self, total_minutes: i64) {
        println!("{}", format_remaining(total_minutes));
    }

    fn error(&self, message: &str) {
        warn!("{message}");
        eprintln!("error: {message}");
    }
}

/// "Alarm set for 1 day, 2 hours and 5 minutes from now."
pub fn format_remaining(total_minutes: i64) -> String {
    if total_minutes < 1 {
        return "Alarm set for less than a minute from now.".to_string();
    }
    let days = total_minutes / (24 * 60);
    let hours = total_minutes / 60 % 24;
    let minutes = total_minutes % 60;

    let parts: Vec<String> = [(days, "day"), (hours, "hour"), (minutes, "minute")]
        .into_iter()
        .filter(|(value, _)| *value > 0)
        .map(|(value, unit)| {
            let plural = if value == 1 { "" } else { "s" };
            format!("{value} {unit}{plural}")
        })
        .collect();

    let joined = match parts.split_last() {
        Some((last, rest)) if !rest.is_empty() => format!("{} and {last}", rest.join(", ")),
        Some((last, _)) => last.clone(),
        None => String::new(),
    };
    format!("Alarm set for {joined} from now.")
}
