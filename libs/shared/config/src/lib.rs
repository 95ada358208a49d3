use std::env;
use std::path::PathBuf;

use chrono::{FixedOffset, NaiveTime};
use tracing::warn;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_DATA_DIR: &str = "data";
const PRESCRIPTIONS_FILE_NAME: &str = "prescriptions.json";

/// Daily working window a doctor's slots are cut from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleConfig {
    /// First slot start.
    pub day_start: NaiveTime,
    /// Exclusive end of the working day; the last slot ends here.
    pub day_end: NaiveTime,
    pub slot_minutes: u32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            day_start: NaiveTime::from_hms_opt(9, 0, 0).unwrap_or(NaiveTime::MIN),
            day_end: NaiveTime::from_hms_opt(18, 0, 0).unwrap_or(NaiveTime::MIN),
            slot_minutes: 30,
        }
    }
}

impl ScheduleConfig {
    pub fn is_valid(&self) -> bool {
        self.slot_minutes > 0 && self.slot_minutes <= 24 * 60 && self.day_start < self.day_end
    }
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub data_dir: PathBuf,
    pub prescriptions_file: PathBuf,
    /// When unset, appointments live only for the process lifetime.
    pub appointments_file: Option<PathBuf>,
    pub clinic_utc_offset_minutes: i32,
    pub schedule: ScheduleConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        let data_dir = PathBuf::from(DEFAULT_DATA_DIR);
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            prescriptions_file: data_dir.join(PRESCRIPTIONS_FILE_NAME),
            data_dir,
            appointments_file: None,
            clinic_utc_offset_minutes: 0,
            schedule: ScheduleConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_vars(|key| env::var(key).ok())
    }

    /// Builds the config from an arbitrary variable source. Unset or
    /// malformed values fall back to defaults with a warning.
    pub fn from_vars<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let host = lookup("HOST").unwrap_or_else(|| {
            warn!("HOST not set, using default {}", DEFAULT_HOST);
            DEFAULT_HOST.to_string()
        });

        let port = parse_or_default(&lookup, "PORT", DEFAULT_PORT);

        let data_dir = lookup("DATA_DIR").map(PathBuf::from).unwrap_or_else(|| {
            warn!("DATA_DIR not set, using default {}", DEFAULT_DATA_DIR);
            defaults.data_dir.clone()
        });

        let prescriptions_file = lookup("PRESCRIPTIONS_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join(PRESCRIPTIONS_FILE_NAME));

        let appointments_file = lookup("APPOINTMENTS_FILE")
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        let clinic_utc_offset_minutes = parse_or_default(&lookup, "CLINIC_UTC_OFFSET_MINUTES", 0i32);

        let schedule = ScheduleConfig {
            day_start: parse_time_or_default(&lookup, "SLOT_DAY_START", defaults.schedule.day_start),
            day_end: parse_time_or_default(&lookup, "SLOT_DAY_END", defaults.schedule.day_end),
            slot_minutes: parse_or_default(&lookup, "SLOT_MINUTES", defaults.schedule.slot_minutes),
        };

        let schedule = if schedule.is_valid() {
            schedule
        } else {
            warn!("Slot schedule {:?} is invalid, using default working hours", schedule);
            ScheduleConfig::default()
        };

        let config = Self {
            host,
            port,
            data_dir,
            prescriptions_file,
            appointments_file,
            clinic_utc_offset_minutes,
            schedule,
        };

        if config.clinic_offset().is_none() {
            warn!(
                "CLINIC_UTC_OFFSET_MINUTES={} is out of range, clinic time falls back to UTC",
                config.clinic_utc_offset_minutes
            );
        }

        config
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Offset used to decide what "today" and "now" mean for the clinic.
    pub fn clinic_offset(&self) -> Option<FixedOffset> {
        FixedOffset::east_opt(self.clinic_utc_offset_minutes.checked_mul(60)?)
    }

    pub fn persists_appointments(&self) -> bool {
        self.appointments_file.is_some()
    }
}

fn parse_or_default<F, T>(lookup: &F, key: &str, default: T) -> T
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + std::fmt::Display + Copy,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!("{}={} is not valid, using default {}", key, raw, default);
            default
        }),
        None => default,
    }
}

fn parse_time_or_default<F>(lookup: &F, key: &str, default: NaiveTime) -> NaiveTime
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => NaiveTime::parse_from_str(raw.trim(), "%H:%M").unwrap_or_else(|_| {
            warn!("{}={} is not an HH:MM time, using default {}", key, raw, default.format("%H:%M"));
            default
        }),
        None => default,
    }
}
