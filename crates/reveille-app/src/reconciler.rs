//! Keeps the scheduler's armed triggers in line with the event store.
//!
//! Every pass recomputes the desired weekly triggers from the store and
//! diffs them against what the scheduler reports as armed. Running a pass
//! twice without a store change issues no calls the second time.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use tracing::{debug, info, warn};

use reveille_core::alarm::{AlarmInstance, Day};
use reveille_core::event::Event;
use reveille_core::ids::EventId;
use reveille_core::schedule::next_fire_time;
use reveille_core::store::EventStore;
use reveille_ports::outbound::TriggerScheduler;
use reveille_ports::types::{
    AlarmFailure, AlarmFailureReason, ArmedTrigger, CorrelationId, ReconcileReport,
    TriggerContent, TriggerFilter, WeeklyTrigger,
};

use crate::settings::AlarmSettings;

/// Calls needed to bring the scheduler in line, before execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReconcilePlan {
    pub cancels: Vec<TriggerFilter>,
    pub arms: Vec<WeeklyTrigger>,
    pub skipped: Vec<AlarmFailure>,
}

pub struct Reconciler {
    settings: AlarmSettings,
}

impl Reconciler {
    pub fn new(settings: AlarmSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &AlarmSettings {
        &self.settings
    }

    /// Weekly triggers that should be armed right now, plus the enabled
    /// instances that had to be skipped because their day or time is
    /// malformed.
    pub fn desired(
        &self,
        store: &EventStore,
        now: DateTime<Utc>,
    ) -> (Vec<WeeklyTrigger>, Vec<AlarmFailure>) {
        let local_now = now.with_timezone(&self.settings.timezone);
        let mut wanted = Vec::new();
        let mut skipped = Vec::new();

        for event in store.events() {
            for alarm in event.alarms() {
                if !event.is_alarm_armed(alarm) {
                    continue;
                }

                let (day, time) = match alarm.slot() {
                    Ok(slot) => slot,
                    Err(err) => {
                        warn!(
                            event_id = %event.id(),
                            alarm_id = %alarm.id(),
                            error = %err,
                            "skipping alarm with invalid schedule"
                        );
                        skipped.push(AlarmFailure {
                            event_id: event.id().clone(),
                            alarm_id: Some(alarm.id().clone()),
                            reason: AlarmFailureReason::InvalidSchedule(err.to_string()),
                        });
                        continue;
                    }
                };

                let first_fire_at =
                    next_fire_time(day, time, &local_now, self.settings.look_ahead)
                        .with_timezone(&Utc);

                wanted.push(WeeklyTrigger {
                    correlation: CorrelationId::new(event.id().clone(), alarm.id().clone()),
                    weekday: day.platform_weekday(),
                    hour: time.hour(),
                    minute: time.minute(),
                    content: trigger_content(event, alarm, day, &self.settings.fallback_body),
                    first_fire_at,
                });
            }
        }

        (wanted, skipped)
    }

    /// Diffs desired against armed. Only repeating triggers take part;
    /// one-shot snoozes are left to expire on their own.
    pub fn plan(
        &self,
        store: &EventStore,
        armed: &[ArmedTrigger],
        now: DateTime<Utc>,
    ) -> ReconcilePlan {
        let (wanted, skipped) = self.desired(store, now);
        let wanted: BTreeMap<CorrelationId, WeeklyTrigger> = wanted
            .into_iter()
            .map(|t| (t.correlation.clone(), t))
            .collect();

        let mut current: BTreeMap<&CorrelationId, Vec<&ArmedTrigger>> = BTreeMap::new();
        for trigger in armed.iter().filter(|t| t.repeats()) {
            current.entry(&trigger.correlation).or_default().push(trigger);
        }

        let mut cancels = Vec::new();
        let mut satisfied = BTreeSet::new();
        let mut orphaned_events: BTreeSet<EventId> = BTreeSet::new();

        for (correlation, triggers) in current {
            match wanted.get(correlation) {
                Some(want) if triggers.len() == 1 && want.is_satisfied_by(triggers[0]) => {
                    satisfied.insert(correlation.clone());
                }
                Some(_) => cancels.push(TriggerFilter::Alarm(correlation.clone())),
                None if store.find(&correlation.event_id).is_none() => {
                    orphaned_events.insert(correlation.event_id.clone());
                }
                None => cancels.push(TriggerFilter::Alarm(correlation.clone())),
            }
        }
        cancels.extend(orphaned_events.into_iter().map(TriggerFilter::Event));

        let arms = wanted
            .into_iter()
            .filter(|(correlation, _)| !satisfied.contains(correlation))
            .map(|(_, trigger)| trigger)
            .collect();

        ReconcilePlan {
            cancels,
            arms,
            skipped,
        }
    }

    /// Runs one pass. Failures are collected per alarm; nothing here
    /// aborts the pass early except a failed listing, which leaves the
    /// scheduler untouched.
    pub async fn reconcile<N>(
        &self,
        scheduler: &N,
        store: &EventStore,
        now: DateTime<Utc>,
    ) -> ReconcileReport
    where
        N: TriggerScheduler + ?Sized,
    {
        let armed = match scheduler.list_armed().await {
            Ok(armed) => armed,
            Err(err) => {
                warn!(error = %err, "could not list armed triggers");
                let (wanted, mut failures) = self.desired(store, now);
                failures.extend(wanted.into_iter().map(|t| AlarmFailure {
                    event_id: t.correlation.event_id,
                    alarm_id: Some(t.correlation.alarm_id),
                    reason: AlarmFailureReason::Scheduling(err.clone()),
                }));
                return ReconcileReport {
                    failures,
                    ..ReconcileReport::default()
                };
            }
        };

        let plan = self.plan(store, &armed, now);
        debug!(
            cancels = plan.cancels.len(),
            arms = plan.arms.len(),
            skipped = plan.skipped.len(),
            "reconcile plan"
        );

        let mut report = ReconcileReport {
            failures: plan.skipped,
            ..ReconcileReport::default()
        };

        let cancelled = join_all(plan.cancels.into_iter().map(|filter| async move {
            let result = scheduler.cancel(&filter).await;
            (filter, result)
        }))
        .await;

        let mut blocked = Vec::new();
        for (filter, result) in cancelled {
            match result {
                Ok(()) => {
                    info!(
                        event_id = %filter.event_id(),
                        alarm_id = ?filter.alarm_id().map(|id| id.to_string()),
                        "triggers cancelled"
                    );
                    report.cancelled.push(filter);
                }
                Err(err) => {
                    warn!(event_id = %filter.event_id(), error = %err, "cancel failed");
                    report.failures.push(AlarmFailure {
                        event_id: filter.event_id().clone(),
                        alarm_id: filter.alarm_id().cloned(),
                        reason: AlarmFailureReason::CancelFailed(err),
                    });
                    blocked.push(filter);
                }
            }
        }

        // Arming on top of a trigger we failed to cancel would duplicate it.
        let arms = plan
            .arms
            .into_iter()
            .filter(|t| !blocked.iter().any(|f| f.matches(&t.correlation)));

        let armed = join_all(arms.map(|trigger| async move {
            let result = scheduler.arm_weekly(&trigger).await;
            (trigger, result)
        }))
        .await;

        for (trigger, result) in armed {
            match result {
                Ok(handle) => {
                    info!(
                        event_id = %trigger.correlation.event_id,
                        alarm_id = %trigger.correlation.alarm_id,
                        handle = %handle,
                        first_fire_at = %trigger.first_fire_at,
                        "trigger armed"
                    );
                    report.armed.push(trigger);
                }
                Err(err) => {
                    warn!(
                        event_id = %trigger.correlation.event_id,
                        alarm_id = %trigger.correlation.alarm_id,
                        error = %err,
                        "arming failed"
                    );
                    report.failures.push(AlarmFailure {
                        event_id: trigger.correlation.event_id,
                        alarm_id: Some(trigger.correlation.alarm_id),
                        reason: AlarmFailureReason::Scheduling(err),
                    });
                }
            }
        }

        report
    }
}

/// Title is the event name; the body names the day and the most specific
/// description available.
pub fn trigger_content(
    event: &Event,
    alarm: &AlarmInstance,
    day: Day,
    fallback_body: &str,
) -> TriggerContent {
    let detail = alarm
        .description()
        .or(event.description())
        .unwrap_or(fallback_body);
    TriggerContent {
        title: event.name().to_string(),
        body: format!("{day} - {detail}"),
        sound_ref: event.sound_ref().to_string(),
    }
}
