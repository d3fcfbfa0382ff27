use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::ScheduledAlarm;
use crate::class_event::ClassId;

const STORE_VERSION: u32 = 1;

/// Flat-file home of the alarm registry: the whole map is rewritten after
/// every mutation and read back in one piece on startup. No journal and no
/// atomic rename, so a crash mid-write can corrupt the file.
pub struct AlarmStore {
    path: PathBuf,
}

#[derive(Serialize)]
struct AlarmFileWriteModel<'a> {
    version: u32,
    saved_at: DateTime<Utc>,
    alarms: &'a HashMap<ClassId, ScheduledAlarm>,
}

#[derive(Deserialize)]
struct AlarmFileModel {
    version: u32,
    #[allow(dead_code)]
    saved_at: DateTime<Utc>,
    alarms: HashMap<ClassId, ScheduledAlarm>,
}

impl AlarmStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// A missing file is an empty registry.
    pub fn load(&self) -> anyhow::Result<HashMap<ClassId, ScheduledAlarm>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let raw = fs::read_to_string(&self.path)?;
        let model: AlarmFileModel = serde_json::from_str(&raw)?;
        if model.version != STORE_VERSION {
            log::warn!(
                "Alarm file carries an unexpected version, loading anyway. [version = {}]",
                model.version
            );
        }
        Ok(model.alarms)
    }

    pub fn save(&self, alarms: &HashMap<ClassId, ScheduledAlarm>) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let model = AlarmFileWriteModel {
            version: STORE_VERSION,
            saved_at: Utc::now(),
            alarms,
        };
        fs::write(&self.path, serde_json::to_string_pretty(&model)?)?;
        Ok(())
    }
}
