pub mod day;
pub mod preset;
pub mod time;

use serde::{Deserialize, Serialize};

use crate::error::DomainError;
use crate::ids::AlarmId;
use crate::text;

pub use day::Day;
pub use preset::DayPreset;
pub use time::AlarmTime;

fn enabled_by_default() -> bool {
    true
}

/// One weekly recurrence point inside an event.
///
/// `day` and `time` are kept exactly as persisted; the typed accessors
/// validate them. Records read back from storage may hold values the
/// domain would reject, and those instances are skipped when scheduling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlarmInstance {
    id: AlarmId,
    day: String,
    time: String,
    #[serde(default, with = "text::optional")]
    description: Option<String>,
    #[serde(default = "enabled_by_default")]
    enabled: bool,
}

impl AlarmInstance {
    pub(crate) fn new(day: Day, time: AlarmTime, description: Option<String>) -> Self {
        Self {
            id: AlarmId::new(),
            day: day.to_string(),
            time: time.to_string(),
            description: text::normalize(description),
            enabled: true,
        }
    }

    /// Rebuilds an instance from stored fields without validating them.
    pub fn restore(
        id: AlarmId,
        day: impl Into<String>,
        time: impl Into<String>,
        description: Option<String>,
        enabled: bool,
    ) -> Self {
        Self {
            id,
            day: day.into(),
            time: time.into(),
            description: text::normalize(description),
            enabled,
        }
    }

    pub fn id(&self) -> &AlarmId {
        &self.id
    }

    pub fn day(&self) -> Result<Day, DomainError> {
        Day::parse(&self.day)
    }

    pub fn time(&self) -> Result<AlarmTime, DomainError> {
        AlarmTime::parse(&self.time)
    }

    pub fn day_name(&self) -> &str {
        &self.day
    }

    pub fn time_str(&self) -> &str {
        &self.time
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// The `(day, time)` pair used for duplicate detection.
    pub fn slot(&self) -> Result<(Day, AlarmTime), DomainError> {
        Ok((self.day()?, self.time()?))
    }

    pub(crate) fn occupies(&self, day: Day, time: AlarmTime) -> bool {
        match self.slot() {
            Ok(slot) => slot == (day, time),
            Err(_) => self.day == day.as_str() && self.time == time.to_string(),
        }
    }

    pub(crate) fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    pub(crate) fn set_schedule(&mut self, day: Day, time: AlarmTime) {
        self.day = day.to_string();
        self.time = time.to_string();
    }
}

/// Input for one alarm instance when creating an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmDraft {
    pub day: Day,
    pub time: AlarmTime,
    pub description: Option<String>,
}

impl AlarmDraft {
    pub fn new(day: Day, time: AlarmTime) -> Self {
        Self {
            day,
            time,
            description: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn six_am() -> AlarmTime {
        AlarmTime::new(6, 0).unwrap()
    }

    #[test]
    fn new_instance_is_enabled_with_fresh_id() {
        let a = AlarmInstance::new(Day::Monday, six_am(), None);
        let b = AlarmInstance::new(Day::Monday, six_am(), None);
        assert!(a.is_enabled());
        assert_ne!(a.id(), b.id());
        assert_eq!(a.day_name(), "Monday");
        assert_eq!(a.time_str(), "06:00");
    }

    #[test]
    fn restored_instance_with_bad_day_reports_invalid_day() {
        let a = AlarmInstance::restore(AlarmId::new(), "Someday", "06:00", None, true);
        assert_eq!(a.day(), Err(DomainError::InvalidDay("Someday".into())));
        assert!(a.slot().is_err());
    }

    #[test]
    fn occupies_compares_parsed_values() {
        let a = AlarmInstance::restore(AlarmId::new(), "monday", "6:00", None, true);
        assert!(a.occupies(Day::Monday, six_am()));
        assert!(!a.occupies(Day::Tuesday, six_am()));
    }

    #[test]
    fn deserializes_stored_record() {
        let json = r#"{"id":"alarm_1","day":"Friday","time":"17:30","description":"","enabled":false}"#;
        let a: AlarmInstance = serde_json::from_str(json).unwrap();
        assert_eq!(a.day(), Ok(Day::Friday));
        assert_eq!(a.time(), AlarmTime::new(17, 30));
        assert_eq!(a.description(), None);
        assert!(!a.is_enabled());
    }

    #[test]
    fn missing_enabled_defaults_to_true() {
        let json = r#"{"id":"alarm_2","day":"Monday","time":"06:00"}"#;
        let a: AlarmInstance = serde_json::from_str(json).unwrap();
        assert!(a.is_enabled());
    }
}
