use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use chrono::{NaiveDateTime, NaiveTime};
use clap::{Parser, Subcommand};
use log::info;

use wakeclock::alarm::days::DayBitmask;
use wakeclock::alarm::model::{Alarm, AlarmId, minutes_of};
use wakeclock::alarm::resolver::next_trigger;
use wakeclock::alarm::scheduler::{AlarmScheduler, FireOutcome, TriggerPair};
use wakeclock::clock::{parse_local_datetime, select_clock};
use wakeclock::console::{ConsoleMessages, ConsoleNotifications, ConsoleWake, TIME_FORMAT};
use wakeclock::error::StoreError;
use wakeclock::services::{Services, Storage};
use wakeclock::store::JsonStore;
use wakeclock::timer::engine::TimerEngine;
use wakeclock::timer::model::{Timer, TimerId};

#[derive(Parser, Debug)]
#[command(
    name = "wakeclock",
    version,
    about = "Alarm and timer scheduling over a JSON store"
)]
struct Cli {
    #[arg(long, default_value = "clock.json")]
    store: PathBuf,

    /// Freeze the clock at a local time, YYYY-MM-DDTHH:MM[:SS].
    #[arg(long, value_parser = parse_now)]
    now: Option<NaiveDateTime>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Resolve the next trigger for a time and day set without a store.
    Next {
        #[arg(long, value_parser = parse_time_of_day)]
        time: u16,
        #[arg(long, default_value = "every-day")]
        days: DayBitmask,
    },
    /// Save a new alarm and arm it.
    Add {
        #[arg(long, value_parser = parse_time_of_day)]
        time: u16,
        #[arg(long, default_value = "once")]
        days: DayBitmask,
        #[arg(long)]
        label: Option<String>,
        #[arg(long)]
        vibrate: bool,
        #[arg(long)]
        disabled: bool,
    },
    List,
    /// Re-arm every enabled alarm, as after a restart.
    Reschedule,
    Closest,
    /// Deliver the main wake of an alarm.
    Fire { id: AlarmId },
    /// Deliver the early-dismissal wake of an alarm.
    Early { id: AlarmId },
    /// Dismiss the upcoming ring of an alarm.
    Dismiss { id: AlarmId },
    Snooze { id: AlarmId },
    Delete { id: AlarmId },
    /// Move alarms off a sound that no longer exists.
    SoundDeleted { uri: String },
    Timer {
        #[command(subcommand)]
        action: TimerCommand,
    },
}

#[derive(Subcommand, Debug)]
enum TimerCommand {
    Create {
        #[arg(long)]
        seconds: Option<u32>,
        #[arg(long)]
        label: Option<String>,
    },
    List,
    Start { id: TimerId },
    Pause { id: TimerId },
    Resume { id: TimerId },
    Expire { id: TimerId },
    Reset { id: TimerId },
    Delete { id: TimerId },
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();
    if let Err(err) = run() {
        eprintln!("error: {err:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let cli = Cli::parse();
    let clock = select_clock(cli.now)?;

    if let Command::Next { time, days } = &cli.command {
        let at = next_trigger(&clock.now(), *time, *days);
        println!("next trigger {}", at.format(TIME_FORMAT));
        return Ok(());
    }

    let store = Arc::new(
        JsonStore::open(&cli.store)
            .with_context(|| format!("failed to load {}", cli.store.display()))?,
    );
    let services = Services {
        clock,
        wake: Arc::new(ConsoleWake),
        notifications: Arc::new(ConsoleNotifications),
        storage: store.clone(),
        messages: Arc::new(ConsoleMessages),
        settings: Arc::new(store.settings()?),
    };
    info!("using {} clock", services.clock.label());

    match cli.command {
        Command::Timer { action } => run_timer(action, &store, TimerEngine::new(services)),
        command => run_alarm(command, &store, AlarmScheduler::new(services)),
    }
}

fn run_alarm(command: Command, store: &JsonStore, scheduler: AlarmScheduler) -> Result<()> {
    match command {
        Command::Add {
            time,
            days,
            label,
            vibrate,
            disabled,
        } => {
            let settings = store.settings()?;
            let mut alarm = Alarm::new(u32::from(time), days, &settings.alarm_sound)?;
            alarm.enabled = !disabled;
            alarm.vibrate = vibrate;
            alarm.label = label.unwrap_or_default();
            let (alarm, _) = scheduler.save(alarm)?;
            println!(
                "saved alarm {} at {} ({})",
                alarm.id,
                alarm.time_local().format("%H:%M"),
                alarm.days
            );
        }
        Command::List => {
            let first_day = store.settings()?.first_day_of_week;
            let mut alarms = store.alarms()?;
            alarms.sort_by_key(|alarm| (alarm.days.sort_key(first_day), alarm.time_in_minutes));
            for alarm in alarms {
                println!(
                    "{:>3} {} {:<3} {} {}",
                    alarm.id,
                    alarm.time_local().format("%H:%M"),
                    if alarm.enabled { "on" } else { "off" },
                    alarm.days,
                    alarm.label
                );
            }
        }
        Command::Reschedule => {
            let summary = scheduler.reschedule_all_enabled()?;
            println!(
                "scheduled {}, skipped {}, failed {}",
                summary.scheduled, summary.skipped, summary.failed
            );
        }
        Command::Closest => match scheduler.closest_enabled_alarm()? {
            Some(next) => println!(
                "closest alarm {} at {}",
                next.alarm_id,
                next.at.format(TIME_FORMAT)
            ),
            None => println!("no upcoming alarms"),
        },
        Command::Fire { id } => match scheduler.on_alarm_fired(id)? {
            FireOutcome::Rearmed(pair) => print_pair("rearmed", &pair),
            FireOutcome::Unarmed => println!("alarm {id} could not be re-armed"),
            FireOutcome::Disabled => println!("alarm {id} disabled"),
            FireOutcome::Ignored => println!("alarm {id} ignored"),
        },
        Command::Early { id } => scheduler.on_early_dismissal(id)?,
        Command::Dismiss { id } => {
            require_alarm(store, id)?;
            match scheduler.dismiss_upcoming(id)? {
                Some(pair) => print_pair("rearmed", &pair),
                None => println!("alarm {id} dismissed"),
            }
        }
        Command::Snooze { id } => {
            require_alarm(store, id)?;
            if let Some(pair) = scheduler.snooze(id)? {
                print_pair("snoozed", &pair);
            }
        }
        Command::Delete { id } => {
            let alarm = require_alarm(store, id)?;
            scheduler.delete_alarm(&alarm)?;
        }
        Command::SoundDeleted { uri } => {
            let count = scheduler.replace_deleted_sound(&uri)?;
            println!("updated {count} alarm(s)");
        }
        Command::Next { .. } | Command::Timer { .. } => {}
    }
    Ok(())
}

fn run_timer(action: TimerCommand, store: &JsonStore, engine: TimerEngine) -> Result<()> {
    let load = |id: TimerId| -> Result<Timer> {
        Ok(store.timer(id)?.ok_or(StoreError::TimerNotFound(id))?)
    };

    let timer = match action {
        TimerCommand::Create { seconds, label } => {
            let mut timer = engine.create_timer();
            if let Some(seconds) = seconds {
                timer.seconds = seconds;
            }
            if let Some(label) = label {
                timer.label = label;
            }
            let id = store.insert_or_update_timer(&timer)?;
            println!("created timer {id} ({}s)", timer.seconds);
            return Ok(());
        }
        TimerCommand::List => {
            for timer in store.timers()? {
                let id = timer.id.unwrap_or_default();
                println!("{id:>3} {:>6}s {} {}", timer.seconds, timer.state.name(), timer.label);
            }
            return Ok(());
        }
        TimerCommand::Start { id } => {
            let mut timer = load(id)?;
            engine.start(&mut timer)?;
            timer
        }
        TimerCommand::Pause { id } => {
            let mut timer = load(id)?;
            engine.pause(&mut timer)?;
            timer
        }
        TimerCommand::Resume { id } => {
            let mut timer = load(id)?;
            engine.resume(&mut timer)?;
            timer
        }
        TimerCommand::Expire { id } => {
            let mut timer = load(id)?;
            engine.expire(&mut timer)?;
            timer
        }
        TimerCommand::Reset { id } => {
            let mut timer = load(id)?;
            engine.reset(&mut timer)?;
            timer
        }
        TimerCommand::Delete { id } => {
            engine.delete(&load(id)?)?;
            println!("deleted timer {id}");
            return Ok(());
        }
    };

    let id = timer.id.unwrap_or_default();
    println!("timer {id} {}", timer.state.name());
    Ok(())
}

fn require_alarm(store: &JsonStore, id: AlarmId) -> Result<Alarm> {
    store
        .alarm(id)?
        .ok_or_else(|| anyhow!("alarm {id} not found"))
}

fn print_pair(verb: &str, pair: &TriggerPair) {
    println!(
        "alarm {} {verb} for {}",
        pair.alarm_id,
        pair.main_at.format(TIME_FORMAT)
    );
}

fn parse_now(input: &str) -> Result<NaiveDateTime, String> {
    parse_local_datetime(input).map_err(|err| err.to_string())
}

fn parse_time_of_day(input: &str) -> Result<u16, String> {
    NaiveTime::parse_from_str(input, "%H:%M")
        .map(minutes_of)
        .map_err(|_| format!("invalid time '{input}', expected HH:MM"))
}
