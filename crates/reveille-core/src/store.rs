//! Authoritative in-memory list of events.
//!
//! Every mutation returns a fresh `EventStore` so the caller can hand the
//! same value to persistence and to the scheduler without copying state
//! between screens. Nothing here performs I/O.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::alarm::{AlarmDraft, AlarmInstance, AlarmTime, Day, DayPreset};
use crate::error::DomainError;
use crate::event::Event;
use crate::ids::{AlarmId, EventId};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new(events: Vec<Event>) -> Self {
        Self { events }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn find(&self, event_id: &EventId) -> Option<&Event> {
        self.events.iter().find(|e| e.id() == event_id)
    }

    pub fn find_alarm(
        &self,
        event_id: &EventId,
        alarm_id: &AlarmId,
    ) -> Option<(&Event, &AlarmInstance)> {
        let event = self.find(event_id)?;
        let alarm = event.alarm(alarm_id)?;
        Some((event, alarm))
    }

    pub fn create_event(
        &self,
        name: &str,
        description: Option<String>,
        sound_ref: impl Into<String>,
        drafts: Vec<AlarmDraft>,
        now: DateTime<Utc>,
    ) -> Result<(Self, EventId), DomainError> {
        let event = Event::create(name, description, sound_ref, drafts, now)?;
        let id = event.id().clone();
        let mut events = self.events.clone();
        events.push(event);
        Ok((Self { events }, id))
    }

    pub fn add_alarm_instance(
        &self,
        event_id: &EventId,
        day: Day,
        time: AlarmTime,
        description: Option<String>,
    ) -> Result<(Self, AlarmId), DomainError> {
        let mut added = None;
        let store = self.update(event_id, |event| {
            let (next, id) = event.with_alarm(day, time, description)?;
            added = Some(id);
            Ok(next)
        })?;
        let id = added.ok_or_else(|| DomainError::EventNotFound(event_id.to_string()))?;
        Ok((store, id))
    }

    pub fn add_alarm_instances(
        &self,
        event_id: &EventId,
        preset: &DayPreset,
        time: AlarmTime,
        description: Option<String>,
    ) -> Result<(Self, Vec<AlarmId>), DomainError> {
        let mut added = Vec::new();
        let store = self.update(event_id, |event| {
            let (next, ids) = event.with_alarms_for(preset, time, description)?;
            added = ids;
            Ok(next)
        })?;
        Ok((store, added))
    }

    /// Removing an alarm id the event does not have is not an error.
    pub fn remove_alarm_instance(
        &self,
        event_id: &EventId,
        alarm_id: &AlarmId,
    ) -> Result<Self, DomainError> {
        self.update(event_id, |event| Ok(event.without_alarm(alarm_id)))
    }

    pub fn reschedule_alarm_instance(
        &self,
        event_id: &EventId,
        alarm_id: &AlarmId,
        day: Day,
        time: AlarmTime,
    ) -> Result<Self, DomainError> {
        self.update(event_id, |event| {
            event.with_alarm_rescheduled(alarm_id, day, time)
        })
    }

    pub fn set_event_enabled(&self, event_id: &EventId, enabled: bool) -> Result<Self, DomainError> {
        self.update(event_id, |event| Ok(event.with_enabled(enabled)))
    }

    pub fn set_alarm_enabled(
        &self,
        event_id: &EventId,
        alarm_id: &AlarmId,
        enabled: bool,
    ) -> Result<Self, DomainError> {
        self.update(event_id, |event| {
            Ok(event.with_alarm_enabled(alarm_id, enabled))
        })
    }

    pub fn rename_event(&self, event_id: &EventId, name: &str) -> Result<Self, DomainError> {
        self.update(event_id, |event| event.renamed(name))
    }

    pub fn update_event_details(
        &self,
        event_id: &EventId,
        description: Option<String>,
        sound_ref: &str,
    ) -> Result<Self, DomainError> {
        self.update(event_id, |event| {
            Ok(event.with_details(description, sound_ref))
        })
    }

    /// Deleting an unknown event leaves the store unchanged.
    pub fn delete_event(&self, event_id: &EventId) -> Self {
        let events = self
            .events
            .iter()
            .filter(|e| e.id() != event_id)
            .cloned()
            .collect();
        Self { events }
    }

    fn update<F>(&self, event_id: &EventId, f: F) -> Result<Self, DomainError>
    where
        F: FnOnce(&Event) -> Result<Event, DomainError>,
    {
        let pos = self
            .events
            .iter()
            .position(|e| e.id() == event_id)
            .ok_or_else(|| DomainError::EventNotFound(event_id.to_string()))?;

        let updated = f(&self.events[pos])?;
        let mut events = self.events.clone();
        events[pos] = updated;
        Ok(Self { events })
    }
}
