use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Local, NaiveTime, Weekday};
use log::debug;
use serde::Deserialize;
use serde_json::{Map, Value, json};

use crate::alarm::days::DayBitmask;
use crate::alarm::model::{Alarm, AlarmId, minutes_of};
use crate::config::Settings;
use crate::error::StoreError;
use crate::services::Storage;
use crate::timer::model::{Timer, TimerId};

pub const STORE_VERSION: u32 = 1;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreDocument {
    pub settings: Settings,
    pub alarms: Vec<Alarm>,
    pub timers: Vec<Timer>,
}

/// A missing file is an empty store.
pub fn load_store(path: &Path) -> Result<StoreDocument> {
    if !path.exists() {
        debug!("{} does not exist, starting empty", path.display());
        return Ok(StoreDocument::default());
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("unable to read store file {}", path.display()))?;
    parse_store_text(&content)
}

pub fn parse_store_text(content: &str) -> Result<StoreDocument> {
    let raw = serde_json::from_str::<StoreFile>(content).map_err(|err| {
        let line = err.line();
        let column = err.column();
        anyhow::anyhow!("invalid JSON at line {line}, column {column}: {err}")
    })?;

    if raw.version != STORE_VERSION {
        bail!(
            "unsupported store version {}; expected version {STORE_VERSION}",
            raw.version
        );
    }

    let mut ids = HashSet::new();
    let mut alarms = Vec::with_capacity(raw.alarms.len());
    for alarm in raw.alarms {
        if alarm.id == 0 {
            bail!("stored alarms must have a non-zero id");
        }
        if !ids.insert(alarm.id) {
            bail!("duplicate alarm id found: {}", alarm.id);
        }

        let days = match alarm.days {
            DaysFile::Sentinel(SentinelToken::Today) => DayBitmask::TODAY,
            DaysFile::Sentinel(SentinelToken::Tomorrow) => DayBitmask::TOMORROW,
            DaysFile::Weekdays(days) => {
                DayBitmask::from_weekdays(days.into_iter().map(WeekdayToken::to_chrono))
            }
        };
        let (sound_title, sound_uri) = if alarm.sound_uri.is_empty() {
            (
                raw.settings.alarm_sound.title.clone(),
                raw.settings.alarm_sound.uri.clone(),
            )
        } else {
            (alarm.sound_title, alarm.sound_uri)
        };

        alarms.push(Alarm {
            id: alarm.id,
            time_in_minutes: minutes_of(parse_time_local(&alarm.time_local)?),
            days,
            enabled: alarm.enabled,
            vibrate: alarm.vibrate,
            sound_title,
            sound_uri,
            label: alarm.label,
            snoozed_until: alarm.snoozed_until,
        });
    }

    let mut timer_ids = HashSet::new();
    for timer in &raw.timers {
        let Some(id) = timer.id else {
            bail!("stored timers must have an id");
        };
        if !timer_ids.insert(id) {
            bail!("duplicate timer id found: {id}");
        }
    }

    Ok(StoreDocument {
        settings: raw.settings,
        alarms,
        timers: raw.timers,
    })
}

pub fn render_store(document: &StoreDocument) -> serde_json::Result<String> {
    let mut serialized_alarms = Vec::with_capacity(document.alarms.len());
    for alarm in &document.alarms {
        let mut alarm_obj = Map::new();
        alarm_obj.insert("id".to_string(), Value::Number(alarm.id.into()));
        alarm_obj.insert("enabled".to_string(), Value::Bool(alarm.enabled));
        alarm_obj.insert(
            "time_local".to_string(),
            Value::String(alarm.time_local().format("%H:%M").to_string()),
        );
        alarm_obj.insert("days".to_string(), days_value(alarm.days));
        alarm_obj.insert("vibrate".to_string(), Value::Bool(alarm.vibrate));
        alarm_obj.insert(
            "sound_title".to_string(),
            Value::String(alarm.sound_title.clone()),
        );
        alarm_obj.insert(
            "sound_uri".to_string(),
            Value::String(alarm.sound_uri.clone()),
        );
        alarm_obj.insert("label".to_string(), Value::String(alarm.label.clone()));
        if let Some(at) = alarm.snoozed_until {
            alarm_obj.insert("snoozed_until".to_string(), serde_json::to_value(at)?);
        }
        serialized_alarms.push(Value::Object(alarm_obj));
    }

    let payload = json!({
        "version": STORE_VERSION,
        "settings": serde_json::to_value(&document.settings)?,
        "alarms": serialized_alarms,
        "timers": serde_json::to_value(&document.timers)?,
    });
    let text = serde_json::to_string_pretty(&payload)?;
    Ok(format!("{text}\n"))
}

pub fn save_store(path: &Path, document: &StoreDocument) -> Result<()> {
    let text = render_store(document)?;
    fs::write(path, text)
        .with_context(|| format!("unable to write store file {}", path.display()))?;
    Ok(())
}

fn days_value(days: DayBitmask) -> Value {
    match days {
        DayBitmask::TODAY => Value::String("today".to_string()),
        DayBitmask::TOMORROW => Value::String("tomorrow".to_string()),
        _ => Value::Array(
            days.weekdays()
                .into_iter()
                .map(|day| Value::String(weekday_to_token(day).to_string()))
                .collect(),
        ),
    }
}

fn parse_time_local(input: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(input, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(input, "%H:%M:%S"))
        .with_context(|| format!("invalid time_local '{input}', expected HH:MM"))
}

/// Storage over a JSON document, flushed to disk after every change when
/// backed by a file.
pub struct JsonStore {
    path: Option<PathBuf>,
    document: Mutex<StoreDocument>,
}

impl JsonStore {
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            path: Some(path.to_path_buf()),
            document: Mutex::new(load_store(path)?),
        })
    }

    pub fn in_memory(document: StoreDocument) -> Self {
        Self {
            path: None,
            document: Mutex::new(document),
        }
    }

    pub fn settings(&self) -> Result<Settings, StoreError> {
        Ok(self.lock()?.settings.clone())
    }

    pub fn alarms(&self) -> Result<Vec<Alarm>, StoreError> {
        Ok(self.lock()?.alarms.clone())
    }

    pub fn timers(&self) -> Result<Vec<Timer>, StoreError> {
        Ok(self.lock()?.timers.clone())
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreDocument>, StoreError> {
        self.document.lock().map_err(|_| StoreError::Poisoned)
    }

    fn flush(&self, document: &StoreDocument) -> Result<(), StoreError> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        let text = render_store(document).map_err(|err| StoreError::Invalid(err.to_string()))?;
        fs::write(path, text).map_err(|source| StoreError::Io {
            path: path.clone(),
            source,
        })
    }
}

impl Storage for JsonStore {
    fn enabled_alarms(&self) -> Result<Vec<Alarm>, StoreError> {
        let document = self.lock()?;
        Ok(document
            .alarms
            .iter()
            .filter(|alarm| alarm.enabled)
            .cloned()
            .collect())
    }

    fn alarm(&self, id: AlarmId) -> Result<Option<Alarm>, StoreError> {
        let document = self.lock()?;
        Ok(document.alarms.iter().find(|alarm| alarm.id == id).cloned())
    }

    fn alarms_by_sound_uri(&self, uri: &str) -> Result<Vec<Alarm>, StoreError> {
        let document = self.lock()?;
        Ok(document
            .alarms
            .iter()
            .filter(|alarm| alarm.sound_uri == uri)
            .cloned()
            .collect())
    }

    fn insert_alarm(&self, mut alarm: Alarm) -> Result<Alarm, StoreError> {
        let mut document = self.lock()?;
        if !alarm.is_saved() {
            alarm.id = next_id(document.alarms.iter().map(|a| a.id))?;
        }
        match document.alarms.iter_mut().find(|a| a.id == alarm.id) {
            Some(existing) => *existing = alarm.clone(),
            None => document.alarms.push(alarm.clone()),
        }
        self.flush(&document)?;
        Ok(alarm)
    }

    fn update_alarm(&self, alarm: &Alarm) -> Result<(), StoreError> {
        let mut document = self.lock()?;
        let existing = document
            .alarms
            .iter_mut()
            .find(|a| a.id == alarm.id)
            .ok_or(StoreError::AlarmNotFound(alarm.id))?;
        *existing = alarm.clone();
        self.flush(&document)
    }

    fn delete_alarm(&self, id: AlarmId) -> Result<(), StoreError> {
        let mut document = self.lock()?;
        document.alarms.retain(|alarm| alarm.id != id);
        self.flush(&document)
    }

    fn timer(&self, id: TimerId) -> Result<Option<Timer>, StoreError> {
        let document = self.lock()?;
        Ok(document
            .timers
            .iter()
            .find(|timer| timer.id == Some(id))
            .cloned())
    }

    fn insert_or_update_timer(&self, timer: &Timer) -> Result<TimerId, StoreError> {
        let mut document = self.lock()?;
        let id = match timer.id {
            Some(id) => id,
            None => next_id(document.timers.iter().filter_map(|t| t.id))?,
        };
        let mut record = timer.clone();
        record.id = Some(id);
        match document.timers.iter_mut().find(|t| t.id == Some(id)) {
            Some(existing) => *existing = record,
            None => document.timers.push(record),
        }
        self.flush(&document)?;
        Ok(id)
    }

    fn delete_timer(&self, id: TimerId) -> Result<(), StoreError> {
        let mut document = self.lock()?;
        document.timers.retain(|timer| timer.id != Some(id));
        self.flush(&document)
    }
}

fn next_id(ids: impl Iterator<Item = u32>) -> Result<u32, StoreError> {
    ids.max()
        .unwrap_or(0)
        .checked_add(1)
        .ok_or_else(|| StoreError::Invalid("no free record id left".to_string()))
}

#[derive(Debug, Deserialize)]
struct StoreFile {
    version: u32,
    #[serde(default)]
    settings: Settings,
    #[serde(default)]
    alarms: Vec<AlarmFile>,
    #[serde(default)]
    timers: Vec<Timer>,
}

#[derive(Debug, Deserialize)]
struct AlarmFile {
    id: AlarmId,
    #[serde(default = "default_enabled")]
    enabled: bool,
    time_local: String,
    #[serde(default)]
    days: DaysFile,
    #[serde(default)]
    vibrate: bool,
    #[serde(default)]
    sound_title: String,
    #[serde(default)]
    sound_uri: String,
    #[serde(default)]
    label: String,
    #[serde(default)]
    snoozed_until: Option<DateTime<Local>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum DaysFile {
    Sentinel(SentinelToken),
    Weekdays(Vec<WeekdayToken>),
}

impl Default for DaysFile {
    fn default() -> Self {
        Self::Weekdays(Vec::new())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "snake_case")]
enum SentinelToken {
    Today,
    Tomorrow,
}

#[derive(Debug, Deserialize)]
enum WeekdayToken {
    Mon,
    Tue,
    Wed,
    Thu,
    Fri,
    Sat,
    Sun,
}

impl WeekdayToken {
    fn to_chrono(self) -> Weekday {
        match self {
            WeekdayToken::Mon => Weekday::Mon,
            WeekdayToken::Tue => Weekday::Tue,
            WeekdayToken::Wed => Weekday::Wed,
            WeekdayToken::Thu => Weekday::Thu,
            WeekdayToken::Fri => Weekday::Fri,
            WeekdayToken::Sat => Weekday::Sat,
            WeekdayToken::Sun => Weekday::Sun,
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn weekday_to_token(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Mon",
        Weekday::Tue => "Tue",
        Weekday::Wed => "Wed",
        Weekday::Thu => "Thu",
        Weekday::Fri => "Fri",
        Weekday::Sat => "Sat",
        Weekday::Sun => "Sun",
    }
}
