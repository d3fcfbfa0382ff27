use std::path::PathBuf;
use std::sync::OnceLock;

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;

use crate::recurrence::RecurrenceMode;

#[derive(Deserialize, Debug)]
pub struct StorageSettings {
    pub timetable_file: PathBuf,
    pub alarm_file: PathBuf,
}

#[derive(Deserialize, Debug)]
pub struct SchedulerSettings {
    pub timezone: chrono_tz::Tz,
    pub recurrence: RecurrenceMode,
}

#[derive(Deserialize, Debug)]
pub struct AppSettings {
    pub storage: StorageSettings,
    pub scheduler: SchedulerSettings,
}

impl AppSettings {
    fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("appsettings").required(true))
            .add_source(File::with_name("appsettings.local").required(false))
            .add_source(Environment::with_prefix("APP"))
            .build()?;

        settings.try_deserialize()
    }
}

pub fn get() -> &'static AppSettings {
    static APPSETTINGS: OnceLock<AppSettings> = OnceLock::new();
    APPSETTINGS.get_or_init(|| AppSettings::new().unwrap())
}
