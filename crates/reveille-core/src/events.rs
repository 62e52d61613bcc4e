use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::ids::{AlarmId, EventId};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum DomainEvent {
    EventCreated(EventCreated),
    EventUpdated(EventUpdated),
    EventDeleted(EventDeleted),
    AlarmArmed(AlarmArmed),
    TriggersCancelled(TriggersCancelled),
    AlarmSchedulingFailed(AlarmSchedulingFailed),
    AlarmFired(AlarmFired),
    AlarmSnoozed(AlarmSnoozed),
}

impl DomainEvent {
    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Self::EventCreated(e) => e.occurred_at,
            Self::EventUpdated(e) => e.occurred_at,
            Self::EventDeleted(e) => e.occurred_at,
            Self::AlarmArmed(e) => e.occurred_at,
            Self::TriggersCancelled(e) => e.occurred_at,
            Self::AlarmSchedulingFailed(e) => e.occurred_at,
            Self::AlarmFired(e) => e.occurred_at,
            Self::AlarmSnoozed(e) => e.occurred_at,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::EventCreated(_) => "event.created",
            Self::EventUpdated(_) => "event.updated",
            Self::EventDeleted(_) => "event.deleted",
            Self::AlarmArmed(_) => "alarm.armed",
            Self::TriggersCancelled(_) => "alarm.cancelled",
            Self::AlarmSchedulingFailed(_) => "alarm.scheduling_failed",
            Self::AlarmFired(_) => "alarm.fired",
            Self::AlarmSnoozed(_) => "alarm.snoozed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventCreated {
    pub event_id: EventId,
    pub name: String,
    pub alarm_count: usize,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventUpdated {
    pub event_id: EventId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EventDeleted {
    pub event_id: EventId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlarmArmed {
    pub event_id: EventId,
    pub alarm_id: AlarmId,
    pub first_fire_at: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

/// `alarm_id` is `None` when every trigger of the event was cancelled.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TriggersCancelled {
    pub event_id: EventId,
    pub alarm_id: Option<AlarmId>,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlarmSchedulingFailed {
    pub event_id: EventId,
    pub alarm_id: Option<AlarmId>,
    pub reason: String,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlarmFired {
    pub event_id: EventId,
    pub alarm_id: AlarmId,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlarmSnoozed {
    pub event_id: EventId,
    pub alarm_id: AlarmId,
    pub until: DateTime<Utc>,
    pub occurred_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        chrono::DateTime::parse_from_rfc3339("2025-01-13T06:00:00Z")
            .unwrap()
            .with_timezone(&Utc)
    }

    #[test]
    fn event_types_are_unique_strings() {
        let event_id = EventId::new();
        let alarm_id = AlarmId::new();
        let events = [
            DomainEvent::EventCreated(EventCreated {
                event_id: event_id.clone(),
                name: "GYM".into(),
                alarm_count: 1,
                occurred_at: now(),
            }),
            DomainEvent::EventUpdated(EventUpdated {
                event_id: event_id.clone(),
                occurred_at: now(),
            }),
            DomainEvent::EventDeleted(EventDeleted {
                event_id: event_id.clone(),
                occurred_at: now(),
            }),
            DomainEvent::AlarmArmed(AlarmArmed {
                event_id: event_id.clone(),
                alarm_id: alarm_id.clone(),
                first_fire_at: now(),
                occurred_at: now(),
            }),
            DomainEvent::TriggersCancelled(TriggersCancelled {
                event_id: event_id.clone(),
                alarm_id: None,
                occurred_at: now(),
            }),
            DomainEvent::AlarmSchedulingFailed(AlarmSchedulingFailed {
                event_id: event_id.clone(),
                alarm_id: Some(alarm_id.clone()),
                reason: "permission denied".into(),
                occurred_at: now(),
            }),
            DomainEvent::AlarmFired(AlarmFired {
                event_id: event_id.clone(),
                alarm_id: alarm_id.clone(),
                occurred_at: now(),
            }),
            DomainEvent::AlarmSnoozed(AlarmSnoozed {
                event_id,
                alarm_id,
                until: now(),
                occurred_at: now(),
            }),
        ];

        let mut unique = std::collections::HashSet::new();
        for event in &events {
            assert!(
                unique.insert(event.event_type()),
                "duplicate event type: {}",
                event.event_type()
            );
            assert_eq!(event.occurred_at(), now());
        }
    }
}
