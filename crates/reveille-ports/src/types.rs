use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use reveille_core::alarm::AlarmDraft;
use reveille_core::ids::{AlarmId, EventId};

use crate::error::SchedulingError;

/// Correlation data attached to every armed trigger.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CorrelationId {
    pub event_id: EventId,
    pub alarm_id: AlarmId,
}

impl CorrelationId {
    pub fn new(event_id: EventId, alarm_id: AlarmId) -> Self {
        Self { event_id, alarm_id }
    }
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.event_id, self.alarm_id)
    }
}

/// Selects the triggers a cancel request applies to.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TriggerFilter {
    Event(EventId),
    Alarm(CorrelationId),
}

impl TriggerFilter {
    pub fn matches(&self, correlation: &CorrelationId) -> bool {
        match self {
            Self::Event(event_id) => &correlation.event_id == event_id,
            Self::Alarm(target) => target == correlation,
        }
    }

    pub fn event_id(&self) -> &EventId {
        match self {
            Self::Event(event_id) => event_id,
            Self::Alarm(correlation) => &correlation.event_id,
        }
    }

    pub fn alarm_id(&self) -> Option<&AlarmId> {
        match self {
            Self::Event(_) => None,
            Self::Alarm(correlation) => Some(&correlation.alarm_id),
        }
    }
}

/// What the user sees and hears when a trigger goes off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TriggerContent {
    pub title: String,
    pub body: String,
    pub sound_ref: String,
}

/// Request to arm a trigger repeating every week.
///
/// `weekday` uses the platform convention: 1 = Sunday .. 7 = Saturday.
/// `first_fire_at` is the next occurrence, already pushed past the
/// look-ahead buffer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklyTrigger {
    pub correlation: CorrelationId,
    pub weekday: u32,
    pub hour: u32,
    pub minute: u32,
    pub content: TriggerContent,
    pub first_fire_at: DateTime<Utc>,
}

impl WeeklyTrigger {
    pub fn spec(&self) -> TriggerSpec {
        TriggerSpec::Weekly {
            weekday: self.weekday,
            hour: self.hour,
            minute: self.minute,
        }
    }

    /// True if `armed` already delivers exactly this trigger.
    pub fn is_satisfied_by(&self, armed: &ArmedTrigger) -> bool {
        armed.correlation == self.correlation
            && armed.spec == self.spec()
            && armed.content == self.content
    }
}

/// Request to arm a trigger that fires once, used for snoozing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OneShotTrigger {
    pub correlation: CorrelationId,
    pub fire_at: DateTime<Utc>,
    pub content: TriggerContent,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriggerSpec {
    Weekly { weekday: u32, hour: u32, minute: u32 },
    Once { fire_at: DateTime<Utc> },
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TriggerHandle(pub String);

impl std::fmt::Display for TriggerHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A trigger the scheduler currently holds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArmedTrigger {
    pub handle: TriggerHandle,
    pub correlation: CorrelationId,
    pub spec: TriggerSpec,
    pub content: TriggerContent,
}

impl ArmedTrigger {
    pub fn repeats(&self) -> bool {
        matches!(self.spec, TriggerSpec::Weekly { .. })
    }
}

/// Display record for a trigger that just went off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FiredAlarm {
    pub correlation: CorrelationId,
    pub name: String,
    pub description: Option<String>,
    pub sound_ref: String,
    pub day: String,
    pub time: String,
}

/// Input for creating an event through the inbound port.
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub name: String,
    pub description: Option<String>,
    pub sound_ref: String,
    pub alarms: Vec<AlarmDraft>,
}

/// Why a single alarm instance could not be brought in line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlarmFailureReason {
    InvalidSchedule(String),
    Scheduling(SchedulingError),
    CancelFailed(SchedulingError),
}

impl std::fmt::Display for AlarmFailureReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidSchedule(msg) => write!(f, "invalid schedule: {msg}"),
            Self::Scheduling(err) => write!(f, "arming failed: {err}"),
            Self::CancelFailed(err) => write!(f, "cancel failed: {err}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlarmFailure {
    pub event_id: EventId,
    pub alarm_id: Option<AlarmId>,
    pub reason: AlarmFailureReason,
}

/// Outcome of one reconciliation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcileReport {
    pub armed: Vec<WeeklyTrigger>,
    pub cancelled: Vec<TriggerFilter>,
    pub failures: Vec<AlarmFailure>,
}

impl ReconcileReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn is_noop(&self) -> bool {
        self.armed.is_empty() && self.cancelled.is_empty() && self.failures.is_empty()
    }
}

/// Result of an edit plus the reconciliation it caused.
#[derive(Debug, Clone)]
pub struct Edit<T> {
    pub value: T,
    pub report: ReconcileReport,
}
