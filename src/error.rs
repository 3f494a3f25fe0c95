use std::path::PathBuf;

use thiserror::Error;

use crate::alarm::model::AlarmId;
use crate::timer::model::TimerId;

#[derive(Debug, Error)]
pub enum WakeError {
    #[error("exact wake-ups are not permitted on this device")]
    PermissionDenied,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("notification channel '{0}' does not exist")]
    UnknownChannel(String),
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("alarm {0} not found")]
    AlarmNotFound(AlarmId),
    #[error("timer {0} not found")]
    TimerNotFound(TimerId),
    #[error("unable to write store {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("store document is invalid: {0}")]
    Invalid(String),
    #[error("store lock poisoned")]
    Poisoned,
    #[error("storage worker stopped before replying")]
    WorkerGone,
}

#[derive(Debug, Error)]
pub enum AlarmError {
    #[error("time of day {0} is outside 0..=1439 minutes")]
    TimeOutOfRange(u32),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Notify(#[from] NotifyError),
}

#[derive(Debug, Error)]
pub enum TimerError {
    #[error("cannot {action} a timer that is {state}")]
    InvalidTransition {
        action: &'static str,
        state: &'static str,
    },
    #[error("timer duration must be greater than zero")]
    ZeroDuration,
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Notify(#[from] NotifyError),
}
