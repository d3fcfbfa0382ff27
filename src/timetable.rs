use std::fs;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::class_event::ClassEvent;

const TIMETABLE_VERSION: &str = "1.0";

/// The presentation layer's persisted timetable. The daemon reads it on
/// startup to rebuild alarms, because the alarm registry file may be stale
/// after the process was away for a while.
pub struct TimetableStore {
    path: PathBuf,
}

#[derive(Debug, Serialize, Deserialize)]
struct TimetableMetadata {
    version: String,
    last_saved: DateTime<Utc>,
}

#[derive(Serialize)]
struct TimetableWriteModel<'a> {
    metadata: TimetableMetadata,
    classes: &'a [ClassEvent],
}

/// Older app versions wrote a bare class list with no metadata envelope;
/// both forms still load.
#[derive(Deserialize)]
#[serde(untagged)]
enum TimetableOnDisk {
    Versioned {
        metadata: TimetableMetadata,
        classes: Vec<ClassEvent>,
    },
    Bare(Vec<ClassEvent>),
}

impl TimetableStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn load(&self) -> anyhow::Result<Vec<ClassEvent>> {
        if !self.path.exists() {
            log::info!("No timetable file yet. [path = {}]", self.path.display());
            return Ok(Vec::new());
        }
        let raw = fs::read_to_string(&self.path)?;
        let classes = match serde_json::from_str(&raw)? {
            TimetableOnDisk::Versioned { metadata, classes } => {
                log::debug!(
                    "Loaded timetable. [classes = {}, last_saved = {}]",
                    classes.len(),
                    metadata.last_saved
                );
                classes
            }
            TimetableOnDisk::Bare(classes) => classes,
        };
        Ok(classes)
    }

    pub fn save(&self, classes: &[ClassEvent]) -> anyhow::Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let model = TimetableWriteModel {
            metadata: TimetableMetadata {
                version: TIMETABLE_VERSION.to_string(),
                last_saved: Utc::now(),
            },
            classes,
        };
        fs::write(&self.path, serde_json::to_string_pretty(&model)?)?;
        Ok(())
    }
}
