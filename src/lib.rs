pub mod alarm;
pub mod clock;
pub mod config;
pub mod console;
pub mod error;
pub mod notification;
pub mod services;
pub mod snooze;
pub mod store;
pub mod timer;

#[cfg(test)]
mod testing;
