//! Which execution path receives a snooze request.

use chrono::{DateTime, Local, TimeDelta};

use crate::alarm::model::{Alarm, AlarmId};
use crate::config::Settings;

pub const SNOOZE_ACTION: &str = "Snooze";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SnoozeHandler {
    /// Background service, snoozes without UI.
    Service,
    /// Foreground screen that lets the user pick a delay.
    Activity,
}

/// A deferred action keyed by `request_code`; issuing another one with the
/// same code replaces the previous one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingAction {
    pub request_code: AlarmId,
    pub action: &'static str,
    pub alarm_id: AlarmId,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnoozeTarget {
    pub handler: SnoozeHandler,
    pub action: PendingAction,
}

pub fn resolve_snooze_target(alarm: &Alarm, settings: &Settings) -> SnoozeTarget {
    let handler = if settings.use_same_snooze {
        SnoozeHandler::Service
    } else {
        SnoozeHandler::Activity
    };
    SnoozeTarget {
        handler,
        action: PendingAction {
            request_code: alarm.id,
            action: SNOOZE_ACTION,
            alarm_id: alarm.id,
        },
    }
}

pub fn snooze_until(now: DateTime<Local>, settings: &Settings) -> DateTime<Local> {
    now + TimeDelta::minutes(i64::from(settings.snooze_minutes))
}
