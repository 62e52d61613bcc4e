use async_trait::async_trait;
use chrono::{DateTime, Utc};

use reveille_core::alarm::DayPreset;
use reveille_core::event::Event;
use reveille_core::ids::{AlarmId, EventId};

use crate::types::{CorrelationId, Edit, FiredAlarm, NewEvent, ReconcileReport, TriggerHandle};

/// Entry point for screens: every edit goes through here so there is a
/// single writer of the event list.
#[async_trait]
pub trait AlarmManager: Send + Sync {
    type Error: std::error::Error + Send + Sync + 'static;

    async fn load(&self, now: DateTime<Utc>) -> Result<ReconcileReport, Self::Error>;
    async fn list_events(&self) -> Vec<Event>;
    async fn create_event(
        &self,
        request: NewEvent,
        now: DateTime<Utc>,
    ) -> Result<Edit<EventId>, Self::Error>;
    async fn add_alarm(
        &self,
        event_id: &str,
        day: &str,
        time: &str,
        description: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Edit<AlarmId>, Self::Error>;
    async fn add_alarms(
        &self,
        event_id: &str,
        preset: DayPreset,
        time: &str,
        description: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Edit<Vec<AlarmId>>, Self::Error>;
    async fn remove_alarm(
        &self,
        event_id: &str,
        alarm_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Edit<()>, Self::Error>;
    async fn reschedule_alarm(
        &self,
        event_id: &str,
        alarm_id: &str,
        day: &str,
        time: &str,
        now: DateTime<Utc>,
    ) -> Result<Edit<()>, Self::Error>;
    async fn set_event_enabled(
        &self,
        event_id: &str,
        enabled: bool,
        now: DateTime<Utc>,
    ) -> Result<Edit<()>, Self::Error>;
    async fn set_alarm_enabled(
        &self,
        event_id: &str,
        alarm_id: &str,
        enabled: bool,
        now: DateTime<Utc>,
    ) -> Result<Edit<()>, Self::Error>;
    async fn rename_event(
        &self,
        event_id: &str,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<Edit<()>, Self::Error>;
    async fn update_event_details(
        &self,
        event_id: &str,
        description: Option<String>,
        sound_ref: &str,
        now: DateTime<Utc>,
    ) -> Result<Edit<()>, Self::Error>;
    async fn delete_event(&self, event_id: &str, now: DateTime<Utc>)
        -> Result<Edit<()>, Self::Error>;
    async fn handle_fired(
        &self,
        correlation: &CorrelationId,
        now: DateTime<Utc>,
    ) -> Result<FiredAlarm, Self::Error>;
    async fn snooze(
        &self,
        correlation: &CorrelationId,
        now: DateTime<Utc>,
    ) -> Result<TriggerHandle, Self::Error>;
}
