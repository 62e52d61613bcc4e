use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alarm::{AlarmDraft, AlarmInstance, AlarmTime, Day, DayPreset};
use crate::error::DomainError;
use crate::ids::{AlarmId, EventId};
use crate::text;

fn enabled_by_default() -> bool {
    true
}

/// A named group of weekly alarm instances sharing a sound and an on/off
/// switch.
///
/// Every mutation returns a new `Event`; the receiver is never modified.
/// Field names on the wire follow the layout the device store has always
/// used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    id: EventId,
    #[serde(rename = "eventName")]
    name: String,
    #[serde(default, with = "text::optional")]
    description: Option<String>,
    #[serde(rename = "ringtone")]
    sound_ref: String,
    #[serde(rename = "isEnabled", default = "enabled_by_default")]
    enabled: bool,
    #[serde(rename = "createdAt")]
    created_at: DateTime<Utc>,
    #[serde(default)]
    alarms: Vec<AlarmInstance>,
}

impl Event {
    pub fn create(
        name: &str,
        description: Option<String>,
        sound_ref: impl Into<String>,
        drafts: Vec<AlarmDraft>,
        now: DateTime<Utc>,
    ) -> Result<Self, DomainError> {
        let name = validate_name(name)?;
        if drafts.is_empty() {
            return Err(DomainError::Validation(
                "event requires at least one alarm".into(),
            ));
        }

        let mut alarms: Vec<AlarmInstance> = Vec::with_capacity(drafts.len());
        for draft in drafts {
            ensure_free(&alarms, draft.day, draft.time, None)?;
            alarms.push(AlarmInstance::new(draft.day, draft.time, draft.description));
        }

        Ok(Self {
            id: EventId::new(),
            name,
            description: text::normalize(description),
            sound_ref: sound_ref.into(),
            enabled: true,
            created_at: now,
            alarms,
        })
    }

    pub fn with_alarm(
        &self,
        day: Day,
        time: AlarmTime,
        description: Option<String>,
    ) -> Result<(Self, AlarmId), DomainError> {
        ensure_free(&self.alarms, day, time, None)?;
        let alarm = AlarmInstance::new(day, time, description);
        let id = alarm.id().clone();
        let mut next = self.clone();
        next.alarms.push(alarm);
        Ok((next, id))
    }

    /// Adds one instance per preset day. Rejected as a whole if any day
    /// already has an alarm at `time`.
    pub fn with_alarms_for(
        &self,
        preset: &DayPreset,
        time: AlarmTime,
        description: Option<String>,
    ) -> Result<(Self, Vec<AlarmId>), DomainError> {
        let days = preset.days();
        if days.is_empty() {
            return Err(DomainError::Validation("no days selected".into()));
        }

        let mut next = self.clone();
        let mut ids = Vec::with_capacity(days.len());
        for day in days {
            ensure_free(&next.alarms, day, time, None)?;
            let alarm = AlarmInstance::new(day, time, description.clone());
            ids.push(alarm.id().clone());
            next.alarms.push(alarm);
        }
        Ok((next, ids))
    }

    /// Unknown ids leave the event unchanged.
    pub fn without_alarm(&self, alarm_id: &AlarmId) -> Self {
        let mut next = self.clone();
        next.alarms.retain(|a| a.id() != alarm_id);
        next
    }

    pub fn with_alarm_rescheduled(
        &self,
        alarm_id: &AlarmId,
        day: Day,
        time: AlarmTime,
    ) -> Result<Self, DomainError> {
        if self.alarm(alarm_id).is_none() {
            return Err(DomainError::AlarmNotFound(alarm_id.to_string()));
        }
        ensure_free(&self.alarms, day, time, Some(alarm_id))?;

        let mut next = self.clone();
        if let Some(alarm) = next.alarms.iter_mut().find(|a| a.id() == alarm_id) {
            alarm.set_schedule(day, time);
        }
        Ok(next)
    }

    pub fn with_enabled(&self, enabled: bool) -> Self {
        let mut next = self.clone();
        next.enabled = enabled;
        next
    }

    pub fn with_alarm_enabled(&self, alarm_id: &AlarmId, enabled: bool) -> Self {
        let mut next = self.clone();
        if let Some(alarm) = next.alarms.iter_mut().find(|a| a.id() == alarm_id) {
            alarm.set_enabled(enabled);
        }
        next
    }

    pub fn renamed(&self, name: &str) -> Result<Self, DomainError> {
        let mut next = self.clone();
        next.name = validate_name(name)?;
        Ok(next)
    }

    pub fn with_details(&self, description: Option<String>, sound_ref: impl Into<String>) -> Self {
        let mut next = self.clone();
        next.description = text::normalize(description);
        next.sound_ref = sound_ref.into();
        next
    }

    pub fn id(&self) -> &EventId {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn sound_ref(&self) -> &str {
        &self.sound_ref
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn alarms(&self) -> &[AlarmInstance] {
        &self.alarms
    }

    pub fn alarm(&self, alarm_id: &AlarmId) -> Option<&AlarmInstance> {
        self.alarms.iter().find(|a| a.id() == alarm_id)
    }

    /// Effective armed state: both the event and the instance are on.
    pub fn is_alarm_armed(&self, alarm: &AlarmInstance) -> bool {
        self.enabled && alarm.is_enabled()
    }
}

fn validate_name(name: &str) -> Result<String, DomainError> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(DomainError::Validation("event name must not be blank".into()));
    }
    Ok(trimmed.to_string())
}

fn ensure_free(
    alarms: &[AlarmInstance],
    day: Day,
    time: AlarmTime,
    ignore: Option<&AlarmId>,
) -> Result<(), DomainError> {
    let taken = alarms
        .iter()
        .filter(|a| Some(a.id()) != ignore)
        .any(|a| a.occupies(day, time));
    if taken {
        return Err(DomainError::DuplicateAlarm {
            day: day.to_string(),
            time: time.to_string(),
        });
    }
    Ok(())
}
