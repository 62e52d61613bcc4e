//! Mock adapters shared by the service and reconciler tests.

use std::collections::HashSet;
use std::sync::Mutex;

use async_trait::async_trait;

use reveille_core::event::Event;
use reveille_core::events::DomainEvent;
use reveille_core::ids::AlarmId;
use reveille_ports::error::{PortError, SchedulingError};
use reveille_ports::outbound::{EventPublisher, EventRepository, TriggerScheduler};
use reveille_ports::types::{
    ArmedTrigger, OneShotTrigger, TriggerFilter, TriggerHandle, TriggerSpec, WeeklyTrigger,
};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ArmWeekly(WeeklyTrigger),
    ArmOnce(OneShotTrigger),
    Cancel(TriggerFilter),
    List,
}

#[derive(Default)]
pub struct MockScheduler {
    pub armed: Mutex<Vec<ArmedTrigger>>,
    pub calls: Mutex<Vec<Call>>,
    pub deny_alarms: Mutex<HashSet<AlarmId>>,
    pub fail_cancel: Mutex<bool>,
    pub fail_list: Mutex<bool>,
    next_handle: Mutex<u64>,
}

impl MockScheduler {
    pub fn arm_calls(&self) -> usize {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|c| matches!(c, Call::ArmWeekly(_) | Call::ArmOnce(_)))
            .count()
    }

    pub fn cancel_calls(&self) -> Vec<TriggerFilter> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                Call::Cancel(f) => Some(f.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn armed_weekly(&self) -> Vec<ArmedTrigger> {
        self.armed
            .lock()
            .unwrap()
            .iter()
            .filter(|t| t.repeats())
            .cloned()
            .collect()
    }

    fn handle(&self) -> TriggerHandle {
        let mut next = self.next_handle.lock().unwrap();
        *next += 1;
        TriggerHandle(format!("mock-{}", *next))
    }
}

#[async_trait]
impl TriggerScheduler for MockScheduler {
    async fn arm_weekly(&self, trigger: &WeeklyTrigger) -> Result<TriggerHandle, SchedulingError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::ArmWeekly(trigger.clone()));
        if self
            .deny_alarms
            .lock()
            .unwrap()
            .contains(&trigger.correlation.alarm_id)
        {
            return Err(SchedulingError::PermissionDenied);
        }
        let handle = self.handle();
        self.armed.lock().unwrap().push(ArmedTrigger {
            handle: handle.clone(),
            correlation: trigger.correlation.clone(),
            spec: trigger.spec(),
            content: trigger.content.clone(),
        });
        Ok(handle)
    }

    async fn arm_once(&self, trigger: &OneShotTrigger) -> Result<TriggerHandle, SchedulingError> {
        self.calls
            .lock()
            .unwrap()
            .push(Call::ArmOnce(trigger.clone()));
        let handle = self.handle();
        self.armed.lock().unwrap().push(ArmedTrigger {
            handle: handle.clone(),
            correlation: trigger.correlation.clone(),
            spec: TriggerSpec::Once {
                fire_at: trigger.fire_at,
            },
            content: trigger.content.clone(),
        });
        Ok(handle)
    }

    async fn cancel(&self, filter: &TriggerFilter) -> Result<(), SchedulingError> {
        self.calls.lock().unwrap().push(Call::Cancel(filter.clone()));
        if *self.fail_cancel.lock().unwrap() {
            return Err(SchedulingError::Unavailable("cancel refused".into()));
        }
        self.armed
            .lock()
            .unwrap()
            .retain(|t| !filter.matches(&t.correlation));
        Ok(())
    }

    async fn list_armed(&self) -> Result<Vec<ArmedTrigger>, SchedulingError> {
        self.calls.lock().unwrap().push(Call::List);
        if *self.fail_list.lock().unwrap() {
            return Err(SchedulingError::Unavailable("listing failed".into()));
        }
        Ok(self.armed.lock().unwrap().clone())
    }
}

#[derive(Default)]
pub struct MockEventRepo {
    pub events: Mutex<Vec<Event>>,
    pub saves: Mutex<usize>,
    pub fail_save: Mutex<bool>,
}

#[async_trait]
impl EventRepository for MockEventRepo {
    async fn load(&self) -> Result<Vec<Event>, PortError> {
        Ok(self.events.lock().unwrap().clone())
    }

    async fn save(&self, events: &[Event]) -> Result<(), PortError> {
        if *self.fail_save.lock().unwrap() {
            return Err(PortError::Persistence("disk full".into()));
        }
        *self.events.lock().unwrap() = events.to_vec();
        *self.saves.lock().unwrap() += 1;
        Ok(())
    }
}

#[derive(Default)]
pub struct MockEventPublisher {
    pub events: Mutex<Vec<DomainEvent>>,
}

impl MockEventPublisher {
    pub fn types(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.event_type())
            .collect()
    }
}

#[async_trait]
impl EventPublisher for MockEventPublisher {
    async fn publish(&self, events: Vec<DomainEvent>) -> Result<(), PortError> {
        self.events.lock().unwrap().extend(events);
        Ok(())
    }
}
