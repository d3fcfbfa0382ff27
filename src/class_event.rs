use std::fmt;
use std::str::FromStr;

use chrono::{NaiveTime, Timelike, Weekday};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ScheduleError;

pub type ClassId = i64;

/// Reminder lead applied when a stored record carries none.
pub const DEFAULT_LEAD_MINUTES: u32 = 5;

/// A teaching day. Timetables only carry Monday through Friday; labels are
/// accepted in English and in the Korean set used by older data files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ClassDay {
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
}

impl ClassDay {
    pub fn parse(label: &str) -> Result<Self, ScheduleError> {
        match label.trim() {
            "Monday" | "월요일" => Ok(Self::Monday),
            "Tuesday" | "화요일" => Ok(Self::Tuesday),
            "Wednesday" | "수요일" => Ok(Self::Wednesday),
            "Thursday" | "목요일" => Ok(Self::Thursday),
            "Friday" | "금요일" => Ok(Self::Friday),
            other => Err(ScheduleError::UnknownDay(other.to_string())),
        }
    }

    pub fn weekday(self) -> Weekday {
        match self {
            Self::Monday => Weekday::Mon,
            Self::Tuesday => Weekday::Tue,
            Self::Wednesday => Weekday::Wed,
            Self::Thursday => Weekday::Thu,
            Self::Friday => Weekday::Fri,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Monday => "Monday",
            Self::Tuesday => "Tuesday",
            Self::Wednesday => "Wednesday",
            Self::Thursday => "Thursday",
            Self::Friday => "Friday",
        }
    }
}

impl FromStr for ClassDay {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ClassDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl Serialize for ClassDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.label())
    }
}

impl<'de> Deserialize<'de> for ClassDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let label = String::deserialize(deserializer)?;
        Self::parse(&label).map_err(D::Error::custom)
    }
}

/// A wall-clock hour:minute, seconds always zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TimeOfDay(NaiveTime);

impl TimeOfDay {
    pub fn new(inner: NaiveTime) -> Self {
        let normalized = inner
            .with_second(0)
            .and_then(|t| t.with_nanosecond(0))
            .expect("Will never fail.");
        Self(normalized)
    }

    /// Parses an `"HH:MM"` string. Anything else is rejected.
    pub fn parse(raw: &str) -> Result<Self, ScheduleError> {
        NaiveTime::parse_from_str(raw.trim(), "%H:%M")
            .map(Self::new)
            .map_err(|_| ScheduleError::InvalidTime(raw.to_string()))
    }

    pub fn time(&self) -> NaiveTime {
        self.0
    }
}

impl FromStr for TimeOfDay {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.format("%H:%M"))
    }
}

impl Serialize for TimeOfDay {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for TimeOfDay {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Self::parse(&raw).map_err(D::Error::custom)
    }
}

/// One weekly recurring class entry. The presentation layer owns these; the
/// alarm registry receives them on every create/update/delete.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassEvent {
    pub id: ClassId,
    pub name: String,
    pub room: String,
    pub professor: String,
    pub day: ClassDay,
    pub start_time: TimeOfDay,
    pub end_time: TimeOfDay,
    #[serde(default = "default_lead_minutes")]
    pub lead_minutes: u32,
}

fn default_lead_minutes() -> u32 {
    DEFAULT_LEAD_MINUTES
}

impl ClassEvent {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: ClassId,
        name: impl Into<String>,
        room: impl Into<String>,
        professor: impl Into<String>,
        day: ClassDay,
        start_time: TimeOfDay,
        end_time: TimeOfDay,
        lead_minutes: u32,
    ) -> Result<Self, ScheduleError> {
        let event = Self {
            id,
            name: name.into(),
            room: room.into(),
            professor: professor.into(),
            day,
            start_time,
            end_time,
            lead_minutes,
        };
        event.validate()?;
        Ok(event)
    }

    /// A class must end after it starts. Checked again at schedule time so
    /// records deserialized from disk get the same gate.
    pub fn validate(&self) -> Result<(), ScheduleError> {
        if self.start_time < self.end_time {
            Ok(())
        } else {
            Err(ScheduleError::InvalidTimeRange { id: self.id })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event_json(lead: Option<u32>) -> String {
        let lead_field = lead
            .map(|l| format!(r#","lead_minutes":{l}"#))
            .unwrap_or_default();
        format!(
            r#"{{"id":3,"name":"Databases","room":"310","professor":"Seo",
                "day":"Wednesday","start_time":"10:30","end_time":"12:00"{lead_field}}}"#
        )
    }

    #[test]
    fn parses_english_and_localized_day_labels() {
        assert_eq!(ClassDay::parse("Monday").unwrap(), ClassDay::Monday);
        assert_eq!(ClassDay::parse("월요일").unwrap(), ClassDay::Monday);
        assert_eq!(ClassDay::parse("금요일").unwrap(), ClassDay::Friday);
        assert_eq!(ClassDay::parse(" Friday ").unwrap(), ClassDay::Friday);
    }

    #[test]
    fn rejects_unknown_day_label() {
        let err = ClassDay::parse("Caturday").unwrap_err();
        assert!(matches!(err, ScheduleError::UnknownDay(label) if label == "Caturday"));
    }

    #[test]
    fn parses_well_formed_times() {
        let t = TimeOfDay::parse("09:05").unwrap();
        assert_eq!(t.to_string(), "09:05");
    }

    #[test]
    fn rejects_malformed_times() {
        for raw in ["", "nine", "25:00", "09:60", "09:00:30", "9h30"] {
            let err = TimeOfDay::parse(raw).unwrap_err();
            assert!(
                matches!(err, ScheduleError::InvalidTime(_)),
                "{raw:?} should be rejected"
            );
        }
    }

    #[test]
    fn time_of_day_drops_seconds() {
        let t = TimeOfDay::new(NaiveTime::from_hms_opt(9, 0, 42).unwrap());
        assert_eq!(t.time(), NaiveTime::from_hms_opt(9, 0, 0).unwrap());
    }

    #[test]
    fn event_must_end_after_it_starts() {
        let start = TimeOfDay::parse("10:00").unwrap();
        let result = ClassEvent::new(1, "OS", "201", "Kim", ClassDay::Monday, start, start, 5);
        assert!(matches!(
            result,
            Err(ScheduleError::InvalidTimeRange { id: 1 })
        ));
    }

    #[test]
    fn deserializes_with_explicit_lead() {
        let event: ClassEvent = serde_json::from_str(&event_json(Some(15))).unwrap();
        assert_eq!(event.lead_minutes, 15);
        assert_eq!(event.day, ClassDay::Wednesday);
        assert_eq!(event.start_time.to_string(), "10:30");
    }

    #[test]
    fn missing_lead_defaults_to_five_minutes() {
        let event: ClassEvent = serde_json::from_str(&event_json(None)).unwrap();
        assert_eq!(event.lead_minutes, DEFAULT_LEAD_MINUTES);
    }

    #[test]
    fn event_round_trips_through_json() {
        let event = ClassEvent::new(
            7,
            "Compilers",
            "B104",
            "Park",
            ClassDay::Friday,
            TimeOfDay::parse("14:00").unwrap(),
            TimeOfDay::parse("15:30").unwrap(),
            10,
        )
        .unwrap();

        let json = serde_json::to_string(&event).unwrap();
        let restored: ClassEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(restored, event);
    }
}
