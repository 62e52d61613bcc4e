use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tracing::{info, warn};

use reveille_core::alarm::{AlarmTime, Day, DayPreset};
use reveille_core::error::DomainError;
use reveille_core::event::Event;
use reveille_core::events::{
    AlarmArmed, AlarmFired, AlarmSchedulingFailed, AlarmSnoozed, DomainEvent, EventCreated,
    EventDeleted, EventUpdated, TriggersCancelled,
};
use reveille_core::ids::{AlarmId, EventId};
use reveille_core::schedule::snooze_until;
use reveille_core::store::EventStore;
use reveille_ports::error::PortError;
use reveille_ports::inbound::AlarmManager;
use reveille_ports::outbound::{EventPublisher, EventRepository, TriggerScheduler};
use reveille_ports::types::{
    AlarmFailure, AlarmFailureReason, CorrelationId, Edit, FiredAlarm, NewEvent, OneShotTrigger,
    ReconcileReport, TriggerContent, TriggerFilter, TriggerHandle,
};

use crate::error::AppError;
use crate::reconciler::Reconciler;

/// Single writer of the event store.
///
/// Every edit runs under one lock: mutate, persist, swap the in-memory
/// store, reconcile. A failed save leaves the in-memory store untouched.
pub struct AlarmService<R, N, EP>
where
    R: EventRepository,
    N: TriggerScheduler,
    EP: EventPublisher,
{
    repository: R,
    scheduler: N,
    events: EP,
    reconciler: Reconciler,
    store: Mutex<EventStore>,
}

impl<R, N, EP> AlarmService<R, N, EP>
where
    R: EventRepository,
    N: TriggerScheduler,
    EP: EventPublisher,
{
    pub fn new(repository: R, scheduler: N, events: EP, reconciler: Reconciler) -> Self {
        Self {
            repository,
            scheduler,
            events,
            reconciler,
            store: Mutex::new(EventStore::default()),
        }
    }

    pub fn scheduler(&self) -> &N {
        &self.scheduler
    }

    /// Replaces the in-memory store with the persisted events and arms
    /// whatever they call for.
    pub async fn load(&self, now: DateTime<Utc>) -> Result<ReconcileReport, AppError> {
        let events = self.repository.load().await?;
        let mut store = self.store.lock().await;
        *store = EventStore::new(events);
        info!(events = store.len(), "event store loaded");

        let report = self.reconciler.reconcile(&self.scheduler, &store, now).await;
        self.publish(report_events(&report, now)).await;
        Ok(report)
    }

    /// Runs a reconciliation pass without changing the store.
    pub async fn reconcile(&self, now: DateTime<Utc>) -> ReconcileReport {
        let store = self.store.lock().await;
        let report = self.reconciler.reconcile(&self.scheduler, &store, now).await;
        self.publish(report_events(&report, now)).await;
        report
    }

    pub async fn list_events(&self) -> Vec<Event> {
        self.store.lock().await.events().to_vec()
    }

    pub async fn create_event(
        &self,
        request: NewEvent,
        now: DateTime<Utc>,
    ) -> Result<Edit<EventId>, AppError> {
        self.apply(now, move |store| {
            let alarm_count = request.alarms.len();
            let (next, id) = store.create_event(
                &request.name,
                request.description,
                request.sound_ref,
                request.alarms,
                now,
            )?;
            let created = DomainEvent::EventCreated(EventCreated {
                event_id: id.clone(),
                name: request.name.trim().to_string(),
                alarm_count,
                occurred_at: now,
            });
            Ok((next, id, vec![created]))
        })
        .await
    }

    pub async fn add_alarm(
        &self,
        event_id: &str,
        day: &str,
        time: &str,
        description: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Edit<AlarmId>, AppError> {
        let event_id = EventId::parse(event_id)?;
        let day = Day::parse(day)?;
        let time = AlarmTime::parse(time)?;
        self.apply(now, move |store| {
            let (next, alarm_id) = store.add_alarm_instance(&event_id, day, time, description)?;
            Ok((next, alarm_id, vec![updated(event_id, now)]))
        })
        .await
    }

    pub async fn add_alarms(
        &self,
        event_id: &str,
        preset: DayPreset,
        time: &str,
        description: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Edit<Vec<AlarmId>>, AppError> {
        let event_id = EventId::parse(event_id)?;
        let time = AlarmTime::parse(time)?;
        self.apply(now, move |store| {
            let (next, ids) = store.add_alarm_instances(&event_id, &preset, time, description)?;
            Ok((next, ids, vec![updated(event_id, now)]))
        })
        .await
    }

    pub async fn remove_alarm(
        &self,
        event_id: &str,
        alarm_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Edit<()>, AppError> {
        let event_id = EventId::parse(event_id)?;
        let alarm_id = AlarmId::parse(alarm_id)?;
        self.apply(now, move |store| {
            let next = store.remove_alarm_instance(&event_id, &alarm_id)?;
            Ok((next, (), vec![updated(event_id, now)]))
        })
        .await
    }

    pub async fn reschedule_alarm(
        &self,
        event_id: &str,
        alarm_id: &str,
        day: &str,
        time: &str,
        now: DateTime<Utc>,
    ) -> Result<Edit<()>, AppError> {
        let event_id = EventId::parse(event_id)?;
        let alarm_id = AlarmId::parse(alarm_id)?;
        let day = Day::parse(day)?;
        let time = AlarmTime::parse(time)?;
        self.apply(now, move |store| {
            let next = store.reschedule_alarm_instance(&event_id, &alarm_id, day, time)?;
            Ok((next, (), vec![updated(event_id, now)]))
        })
        .await
    }

    pub async fn set_event_enabled(
        &self,
        event_id: &str,
        enabled: bool,
        now: DateTime<Utc>,
    ) -> Result<Edit<()>, AppError> {
        let event_id = EventId::parse(event_id)?;
        self.apply(now, move |store| {
            let next = store.set_event_enabled(&event_id, enabled)?;
            Ok((next, (), vec![updated(event_id, now)]))
        })
        .await
    }

    pub async fn set_alarm_enabled(
        &self,
        event_id: &str,
        alarm_id: &str,
        enabled: bool,
        now: DateTime<Utc>,
    ) -> Result<Edit<()>, AppError> {
        let event_id = EventId::parse(event_id)?;
        let alarm_id = AlarmId::parse(alarm_id)?;
        self.apply(now, move |store| {
            let next = store.set_alarm_enabled(&event_id, &alarm_id, enabled)?;
            Ok((next, (), vec![updated(event_id, now)]))
        })
        .await
    }

    pub async fn rename_event(
        &self,
        event_id: &str,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<Edit<()>, AppError> {
        let event_id = EventId::parse(event_id)?;
        self.apply(now, move |store| {
            let next = store.rename_event(&event_id, name)?;
            Ok((next, (), vec![updated(event_id, now)]))
        })
        .await
    }

    pub async fn update_event_details(
        &self,
        event_id: &str,
        description: Option<String>,
        sound_ref: &str,
        now: DateTime<Utc>,
    ) -> Result<Edit<()>, AppError> {
        let event_id = EventId::parse(event_id)?;
        self.apply(now, move |store| {
            let next = store.update_event_details(&event_id, description, sound_ref)?;
            Ok((next, (), vec![updated(event_id, now)]))
        })
        .await
    }

    /// Cancels every trigger of the event before dropping it. If that
    /// cancel fails the event is still deleted; the next pass sees the
    /// leftover triggers and cancels them as orphans. If the save fails
    /// the event stays and its triggers are armed again.
    pub async fn delete_event(
        &self,
        event_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Edit<()>, AppError> {
        let event_id = EventId::parse(event_id)?;
        let mut store = self.store.lock().await;
        if store.find(&event_id).is_none() {
            return Err(DomainError::EventNotFound(event_id.to_string()).into());
        }

        let filter = TriggerFilter::Event(event_id.clone());
        let cancel = self.scheduler.cancel(&filter).await;

        let next = store.delete_event(&event_id);
        if let Err(err) = self.repository.save(next.events()).await {
            warn!(event_id = %event_id, error = %err, "saving after delete failed, re-arming event");
            let report = self.reconciler.reconcile(&self.scheduler, &store, now).await;
            self.publish(report_events(&report, now)).await;
            return Err(err.into());
        }
        *store = next;

        let mut report = self.reconciler.reconcile(&self.scheduler, &store, now).await;
        match cancel {
            Ok(()) => report.cancelled.insert(0, filter),
            Err(err) => {
                warn!(event_id = %event_id, error = %err, "cancelling triggers of deleted event failed");
                report.failures.push(AlarmFailure {
                    event_id: event_id.clone(),
                    alarm_id: None,
                    reason: AlarmFailureReason::CancelFailed(err),
                });
            }
        }

        let mut events = vec![DomainEvent::EventDeleted(EventDeleted {
            event_id,
            occurred_at: now,
        })];
        events.extend(report_events(&report, now));
        self.publish(events).await;

        Ok(Edit { value: (), report })
    }

    /// Maps a fired trigger back to what should be shown to the user.
    pub async fn handle_fired(
        &self,
        correlation: &CorrelationId,
        now: DateTime<Utc>,
    ) -> Result<FiredAlarm, AppError> {
        let fired = {
            let store = self.store.lock().await;
            let (event, alarm) = store
                .find_alarm(&correlation.event_id, &correlation.alarm_id)
                .ok_or(PortError::NotFound)?;
            FiredAlarm {
                correlation: correlation.clone(),
                name: event.name().to_string(),
                description: alarm
                    .description()
                    .or(event.description())
                    .map(str::to_string),
                sound_ref: event.sound_ref().to_string(),
                day: alarm.day_name().to_string(),
                time: alarm.time_str().to_string(),
            }
        };

        info!(
            event_id = %correlation.event_id,
            alarm_id = %correlation.alarm_id,
            name = %fired.name,
            "alarm fired"
        );
        self.publish(vec![DomainEvent::AlarmFired(AlarmFired {
            event_id: correlation.event_id.clone(),
            alarm_id: correlation.alarm_id.clone(),
            occurred_at: now,
        })])
        .await;

        Ok(fired)
    }

    /// Arms a one-shot repeat of a fired alarm.
    pub async fn snooze(
        &self,
        correlation: &CorrelationId,
        now: DateTime<Utc>,
    ) -> Result<TriggerHandle, AppError> {
        let settings = self.reconciler.settings();
        let trigger = {
            let store = self.store.lock().await;
            let (event, alarm) = store
                .find_alarm(&correlation.event_id, &correlation.alarm_id)
                .ok_or(PortError::NotFound)?;
            let detail = alarm
                .description()
                .or(event.description())
                .unwrap_or(settings.fallback_body.as_str());
            OneShotTrigger {
                correlation: correlation.clone(),
                fire_at: snooze_until(&now, settings.snooze),
                content: TriggerContent {
                    title: event.name().to_string(),
                    body: format!("Snoozed - {detail}"),
                    sound_ref: event.sound_ref().to_string(),
                },
            }
        };

        let handle = self.scheduler.arm_once(&trigger).await?;
        info!(
            event_id = %correlation.event_id,
            alarm_id = %correlation.alarm_id,
            until = %trigger.fire_at,
            "alarm snoozed"
        );
        self.publish(vec![DomainEvent::AlarmSnoozed(AlarmSnoozed {
            event_id: correlation.event_id.clone(),
            alarm_id: correlation.alarm_id.clone(),
            until: trigger.fire_at,
            occurred_at: now,
        })])
        .await;

        Ok(handle)
    }

    async fn apply<T, F>(&self, now: DateTime<Utc>, edit: F) -> Result<Edit<T>, AppError>
    where
        T: Send,
        F: FnOnce(&EventStore) -> Result<(EventStore, T, Vec<DomainEvent>), DomainError> + Send,
    {
        let mut store = self.store.lock().await;
        let (next, value, mut events) = edit(&*store)?;

        self.repository.save(next.events()).await?;
        *store = next;

        let report = self.reconciler.reconcile(&self.scheduler, &store, now).await;
        if !report.is_clean() {
            warn!(failures = report.failures.len(), "reconcile finished with failures");
        }
        events.extend(report_events(&report, now));
        self.publish(events).await;

        Ok(Edit { value, report })
    }

    // The event log is best effort; losing an entry must not undo an edit.
    async fn publish(&self, events: Vec<DomainEvent>) {
        if events.is_empty() {
            return;
        }
        if let Err(err) = self.events.publish(events).await {
            warn!(error = %err, "failed to publish domain events");
        }
    }
}

fn updated(event_id: EventId, now: DateTime<Utc>) -> DomainEvent {
    DomainEvent::EventUpdated(EventUpdated {
        event_id,
        occurred_at: now,
    })
}

fn report_events(report: &ReconcileReport, now: DateTime<Utc>) -> Vec<DomainEvent> {
    let cancelled = report.cancelled.iter().map(|filter| {
        DomainEvent::TriggersCancelled(TriggersCancelled {
            event_id: filter.event_id().clone(),
            alarm_id: filter.alarm_id().cloned(),
            occurred_at: now,
        })
    });
    let armed = report.armed.iter().map(|trigger| {
        DomainEvent::AlarmArmed(AlarmArmed {
            event_id: trigger.correlation.event_id.clone(),
            alarm_id: trigger.correlation.alarm_id.clone(),
            first_fire_at: trigger.first_fire_at,
            occurred_at: now,
        })
    });
    let failed = report.failures.iter().map(|failure| {
        DomainEvent::AlarmSchedulingFailed(AlarmSchedulingFailed {
            event_id: failure.event_id.clone(),
            alarm_id: failure.alarm_id.clone(),
            reason: failure.reason.to_string(),
            occurred_at: now,
        })
    });
    cancelled.chain(armed).chain(failed).collect()
}

#[async_trait]
impl<R, N, EP> AlarmManager for AlarmService<R, N, EP>
where
    R: EventRepository,
    N: TriggerScheduler,
    EP: EventPublisher,
{
    type Error = AppError;

    async fn load(&self, now: DateTime<Utc>) -> Result<ReconcileReport, AppError> {
        AlarmService::load(self, now).await
    }

    async fn list_events(&self) -> Vec<Event> {
        AlarmService::list_events(self).await
    }

    async fn create_event(
        &self,
        request: NewEvent,
        now: DateTime<Utc>,
    ) -> Result<Edit<EventId>, AppError> {
        AlarmService::create_event(self, request, now).await
    }

    async fn add_alarm(
        &self,
        event_id: &str,
        day: &str,
        time: &str,
        description: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Edit<AlarmId>, AppError> {
        AlarmService::add_alarm(self, event_id, day, time, description, now).await
    }

    async fn add_alarms(
        &self,
        event_id: &str,
        preset: DayPreset,
        time: &str,
        description: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<Edit<Vec<AlarmId>>, AppError> {
        AlarmService::add_alarms(self, event_id, preset, time, description, now).await
    }

    async fn remove_alarm(
        &self,
        event_id: &str,
        alarm_id: &str,
        now: DateTime<Utc>,
    ) -> Result<Edit<()>, AppError> {
        AlarmService::remove_alarm(self, event_id, alarm_id, now).await
    }

    async fn reschedule_alarm(
        &self,
        event_id: &str,
        alarm_id: &str,
        day: &str,
        time: &str,
        now: DateTime<Utc>,
    ) -> Result<Edit<()>, AppError> {
        AlarmService::reschedule_alarm(self, event_id, alarm_id, day, time, now).await
    }

    async fn set_event_enabled(
        &self,
        event_id: &str,
        enabled: bool,
        now: DateTime<Utc>,
    ) -> Result<Edit<()>, AppError> {
        AlarmService::set_event_enabled(self, event_id, enabled, now).await
    }

    async fn set_alarm_enabled(
        &self,
        event_id: &str,
        alarm_id: &str,
        enabled: bool,
        now: DateTime<Utc>,
    ) -> Result<Edit<()>, AppError> {
        AlarmService::set_alarm_enabled(self, event_id, alarm_id, enabled, now).await
    }

    async fn rename_event(
        &self,
        event_id: &str,
        name: &str,
        now: DateTime<Utc>,
    ) -> Result<Edit<()>, AppError> {
        AlarmService::rename_event(self, event_id, name, now).await
    }

    async fn update_event_details(
        &self,
        event_id: &str,
        description: Option<String>,
        sound_ref: &str,
        now: DateTime<Utc>,
    ) -> Result<Edit<()>, AppError> {
        AlarmService::update_event_details(self, event_id, description, sound_ref, now).await
    }

    async fn delete_event(&self, event_id: &str, now: DateTime<Utc>) -> Result<Edit<()>, AppError> {
        AlarmService::delete_event(self, event_id, now).await
    }

    async fn handle_fired(
        &self,
        correlation: &CorrelationId,
        now: DateTime<Utc>,
    ) -> Result<FiredAlarm, AppError> {
        AlarmService::handle_fired(self, correlation, now).await
    }

    async fn snooze(
        &self,
        correlation: &CorrelationId,
        now: DateTime<Utc>,
    ) -> Result<TriggerHandle, AppError> {
        AlarmService::snooze(self, correlation, now).await
    }
}
