use async_trait::async_trait;

use reveille_core::event::Event;
use reveille_core::events::DomainEvent;

use crate::error::{PortError, SchedulingError};
use crate::types::{ArmedTrigger, OneShotTrigger, TriggerFilter, TriggerHandle, WeeklyTrigger};

/// Device notification scheduler. It owns weekly repetition once a
/// trigger is armed; moving a trigger means cancelling and re-arming it.
#[async_trait]
pub trait TriggerScheduler: Send + Sync {
    async fn arm_weekly(&self, trigger: &WeeklyTrigger) -> Result<TriggerHandle, SchedulingError>;
    async fn arm_once(&self, trigger: &OneShotTrigger) -> Result<TriggerHandle, SchedulingError>;
    /// Cancelling when nothing matches succeeds.
    async fn cancel(&self, filter: &TriggerFilter) -> Result<(), SchedulingError>;
    async fn list_armed(&self) -> Result<Vec<ArmedTrigger>, SchedulingError>;
}

/// Whole-list persistence; both calls are atomic from the caller's view.
#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn load(&self) -> Result<Vec<Event>, PortError>;
    async fn save(&self, events: &[Event]) -> Result<(), PortError>;
}

#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, events: Vec<DomainEvent>) -> Result<(), PortError>;
}
