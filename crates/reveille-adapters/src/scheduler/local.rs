//! In-process notification scheduler backed by tokio timers.
//!
//! Each armed trigger owns one task that sleeps until its next instant,
//! reports the correlation id on the fired channel, and for weekly
//! triggers recomputes the following occurrence on local wall-clock
//! fields.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use reveille_core::alarm::{AlarmTime, Day};
use reveille_core::schedule::next_fire_time;
use reveille_ports::error::SchedulingError;
use reveille_ports::outbound::TriggerScheduler;
use reveille_ports::types::{
    ArmedTrigger, CorrelationId, OneShotTrigger, TriggerFilter, TriggerHandle, TriggerSpec,
    WeeklyTrigger,
};

struct Entry {
    trigger: ArmedTrigger,
    task: JoinHandle<()>,
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    entries: HashMap<TriggerHandle, Entry>,
}

impl Registry {
    fn allocate(&mut self) -> TriggerHandle {
        self.next_id += 1;
        TriggerHandle(format!("local-{}", self.next_id))
    }
}

pub struct LocalTriggerScheduler {
    timezone: Tz,
    registry: Arc<Mutex<Registry>>,
    fired: mpsc::UnboundedSender<CorrelationId>,
    permission: AtomicBool,
}

impl LocalTriggerScheduler {
    /// Returns the scheduler and the receiving end of its fired channel.
    pub fn new(timezone: Tz) -> (Self, mpsc::UnboundedReceiver<CorrelationId>) {
        let (fired, receiver) = mpsc::unbounded_channel();
        let scheduler = Self {
            timezone,
            registry: Arc::new(Mutex::new(Registry::default())),
            fired,
            permission: AtomicBool::new(true),
        };
        (scheduler, receiver)
    }

    /// While revoked, every arm request fails with `PermissionDenied`.
    pub fn set_permission_granted(&self, granted: bool) {
        self.permission.store(granted, Ordering::SeqCst);
    }

    pub fn armed_count(&self) -> usize {
        lock(&self.registry).entries.len()
    }

    fn check_permission(&self) -> Result<(), SchedulingError> {
        if self.permission.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(SchedulingError::PermissionDenied)
        }
    }

    fn register<S, T>(&self, spawn: S, trigger_for: T) -> TriggerHandle
    where
        S: FnOnce(TriggerHandle) -> JoinHandle<()>,
        T: FnOnce(TriggerHandle) -> ArmedTrigger,
    {
        // Held across spawn: a task firing at once must find its entry.
        let mut registry = lock(&self.registry);
        let handle = registry.allocate();
        let task = spawn(handle.clone());
        let trigger = trigger_for(handle.clone());
        registry.entries.insert(handle.clone(), Entry { trigger, task });
        handle
    }
}

impl Drop for LocalTriggerScheduler {
    fn drop(&mut self) {
        for (_, entry) in lock(&self.registry).entries.drain() {
            entry.task.abort();
        }
    }
}

#[async_trait]
impl TriggerScheduler for LocalTriggerScheduler {
    async fn arm_weekly(&self, trigger: &WeeklyTrigger) -> Result<TriggerHandle, SchedulingError> {
        self.check_permission()?;
        let day = Day::from_platform_weekday(trigger.weekday).ok_or_else(|| {
            SchedulingError::Rejected(format!("weekday {} out of range", trigger.weekday))
        })?;
        let time = AlarmTime::new(trigger.hour, trigger.minute)
            .map_err(|e| SchedulingError::Rejected(e.to_string()))?;

        let correlation = trigger.correlation.clone();
        let first = trigger.first_fire_at;
        let timezone = self.timezone;
        let fired = self.fired.clone();
        let registry = Arc::clone(&self.registry);

        let handle = self.register(
            |handle| {
                tokio::spawn(async move {
                    let mut next = first;
                    loop {
                        sleep_until(next).await;
                        debug!(correlation = %correlation, "weekly trigger fired");
                        if fired.send(correlation.clone()).is_err() {
                            warn!("fired channel closed, dropping weekly trigger");
                            break;
                        }
                        // Occurrences missed while the host slept are skipped.
                        let local = next.max(Utc::now()).with_timezone(&timezone);
                        next = next_fire_time(day, time, &local, Duration::zero())
                            .with_timezone(&Utc);
                    }
                    lock(&registry).entries.remove(&handle);
                })
            },
            |handle| ArmedTrigger {
                handle,
                correlation: trigger.correlation.clone(),
                spec: trigger.spec(),
                content: trigger.content.clone(),
            },
        );

        info!(
            correlation = %trigger.correlation,
            handle = %handle,
            first_fire_at = %trigger.first_fire_at,
            "weekly trigger armed"
        );
        Ok(handle)
    }

    async fn arm_once(&self, trigger: &OneShotTrigger) -> Result<TriggerHandle, SchedulingError> {
        self.check_permission()?;

        let correlation = trigger.correlation.clone();
        let fire_at = trigger.fire_at;
        let fired = self.fired.clone();
        let registry = Arc::clone(&self.registry);

        let handle = self.register(
            |handle| {
                tokio::spawn(async move {
                    sleep_until(fire_at).await;
                    debug!(correlation = %correlation, "one-shot trigger fired");
                    if fired.send(correlation).is_err() {
                        warn!("fired channel closed");
                    }
                    lock(&registry).entries.remove(&handle);
                })
            },
            |handle| ArmedTrigger {
                handle,
                correlation: trigger.correlation.clone(),
                spec: TriggerSpec::Once { fire_at },
                content: trigger.content.clone(),
            },
        );

        info!(
            correlation = %trigger.correlation,
            handle = %handle,
            fire_at = %fire_at,
            "one-shot trigger armed"
        );
        Ok(handle)
    }

    async fn cancel(&self, filter: &TriggerFilter) -> Result<(), SchedulingError> {
        let mut registry = lock(&self.registry);
        let matching: Vec<TriggerHandle> = registry
            .entries
            .iter()
            .filter(|(_, entry)| filter.matches(&entry.trigger.correlation))
            .map(|(handle, _)| handle.clone())
            .collect();

        for handle in &matching {
            if let Some(entry) = registry.entries.remove(handle) {
                entry.task.abort();
            }
        }
        debug!(event_id = %filter.event_id(), cancelled = matching.len(), "triggers cancelled");
        Ok(())
    }

    async fn list_armed(&self) -> Result<Vec<ArmedTrigger>, SchedulingError> {
        let registry = lock(&self.registry);
        let mut armed: Vec<ArmedTrigger> = registry
            .entries
            .values()
            .map(|entry| entry.trigger.clone())
            .collect();
        armed.sort_by(|a, b| a.handle.cmp(&b.handle));
        Ok(armed)
    }
}

fn lock(registry: &Mutex<Registry>) -> MutexGuard<'_, Registry> {
    registry.lock().unwrap_or_else(PoisonError::into_inner)
}

async fn sleep_until(at: DateTime<Utc>) {
    let delay = (at - Utc::now()).to_std().unwrap_or_default();
    tokio::time::sleep(delay).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use reveille_core::ids::{AlarmId, EventId};
    use reveille_ports::types::TriggerContent;
    use std::time::Duration as StdDuration;

    fn zurich() -> Tz {
        "Europe/Zurich".parse().unwrap()
    }

    fn content() -> TriggerContent {
        TriggerContent {
            title: "GYM".into(),
            body: "Monday - training".into(),
            sound_ref: "Bell Hammer.mp3".into(),
        }
    }

    fn weekly(correlation: CorrelationId, first_fire_at: DateTime<Utc>) -> WeeklyTrigger {
        WeeklyTrigger {
            correlation,
            weekday: 2,
            hour: 6,
            minute: 0,
            content: content(),
            first_fire_at,
        }
    }

    fn correlation() -> CorrelationId {
        CorrelationId::new(EventId::new(), AlarmId::new())
    }

    #[tokio::test]
    async fn armed_triggers_are_listed() {
        let (scheduler, _rx) = LocalTriggerScheduler::new(zurich());
        let far = Utc::now() + Duration::days(3);
        let c = correlation();

        let handle = scheduler.arm_weekly(&weekly(c.clone(), far)).await.unwrap();
        let armed = scheduler.list_armed().await.unwrap();

        assert_eq!(armed.len(), 1);
        assert_eq!(armed[0].handle, handle);
        assert_eq!(armed[0].correlation, c);
        assert!(armed[0].repeats());
    }

    #[tokio::test]
    async fn cancel_by_event_removes_all_its_triggers() {
        let (scheduler, _rx) = LocalTriggerScheduler::new(zurich());
        let far = Utc::now() + Duration::days(3);
        let a = correlation();
        let b = CorrelationId::new(a.event_id.clone(), AlarmId::new());
        let other = correlation();

        for c in [&a, &b, &other] {
            scheduler.arm_weekly(&weekly(c.clone(), far)).await.unwrap();
        }
        scheduler
            .cancel(&TriggerFilter::Event(a.event_id.clone()))
            .await
            .unwrap();

        let armed = scheduler.list_armed().await.unwrap();
        assert_eq!(armed.len(), 1);
        assert_eq!(armed[0].correlation, other);
    }

    #[tokio::test]
    async fn cancel_without_match_is_ok() {
        let (scheduler, _rx) = LocalTriggerScheduler::new(zurich());
        scheduler
            .cancel(&TriggerFilter::Alarm(correlation()))
            .await
            .unwrap();
        assert_eq!(scheduler.armed_count(), 0);
    }

    #[tokio::test]
    async fn revoked_permission_denies_arming() {
        let (scheduler, _rx) = LocalTriggerScheduler::new(zurich());
        scheduler.set_permission_granted(false);

        let err = scheduler
            .arm_weekly(&weekly(correlation(), Utc::now() + Duration::days(1)))
            .await
            .unwrap_err();
        assert_eq!(err, SchedulingError::PermissionDenied);
        assert_eq!(scheduler.armed_count(), 0);
    }

    #[tokio::test]
    async fn out_of_range_weekday_is_rejected() {
        let (scheduler, _rx) = LocalTriggerScheduler::new(zurich());
        let mut trigger = weekly(correlation(), Utc::now() + Duration::days(1));
        trigger.weekday = 0;
        let err = scheduler.arm_weekly(&trigger).await.unwrap_err();
        assert!(matches!(err, SchedulingError::Rejected(_)));
    }

    #[tokio::test]
    async fn one_shot_fires_and_deregisters() {
        let (scheduler, mut rx) = LocalTriggerScheduler::new(zurich());
        let c = correlation();
        scheduler
            .arm_once(&OneShotTrigger {
                correlation: c.clone(),
                fire_at: Utc::now() + Duration::milliseconds(20),
                content: content(),
            })
            .await
            .unwrap();

        let got = tokio::time::timeout(StdDuration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got, c);

        tokio::time::sleep(StdDuration::from_millis(20)).await;
        assert!(scheduler.list_armed().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn weekly_trigger_fires_and_stays_armed() {
        let (scheduler, mut rx) = LocalTriggerScheduler::new(zurich());
        let c = correlation();
        scheduler
            .arm_weekly(&weekly(c.clone(), Utc::now() + Duration::milliseconds(20)))
            .await
            .unwrap();

        let got = tokio::time::timeout(StdDuration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got, c);
        assert_eq!(scheduler.armed_count(), 1);
    }

    #[tokio::test]
    async fn stale_weekly_trigger_fires_once_and_skips_missed_weeks() {
        let (scheduler, mut rx) = LocalTriggerScheduler::new(zurich());
        let c = correlation();
        scheduler
            .arm_weekly(&weekly(c.clone(), Utc::now() - Duration::weeks(3)))
            .await
            .unwrap();

        let got = tokio::time::timeout(StdDuration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(got, c);

        let again = tokio::time::timeout(StdDuration::from_millis(200), rx.recv()).await;
        assert!(again.is_err());
        assert_eq!(scheduler.armed_count(), 1);
    }

    #[tokio::test]
    async fn weekly_trigger_deregisters_when_nobody_listens() {
        let (scheduler, rx) = LocalTriggerScheduler::new(zurich());
        drop(rx);
        scheduler
            .arm_weekly(&weekly(correlation(), Utc::now() + Duration::milliseconds(20)))
            .await
            .unwrap();

        tokio::time::sleep(StdDuration::from_millis(200)).await;
        assert!(scheduler.list_armed().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn cancelled_trigger_never_fires() {
        let (scheduler, mut rx) = LocalTriggerScheduler::new(zurich());
        let c = correlation();
        scheduler
            .arm_once(&OneShotTrigger {
                correlation: c.clone(),
                fire_at: Utc::now() + Duration::milliseconds(50),
                content: content(),
            })
            .await
            .unwrap();
        scheduler.cancel(&TriggerFilter::Alarm(c)).await.unwrap();

        let got = tokio::time::timeout(StdDuration::from_millis(200), rx.recv()).await;
        assert!(got.is_err());
    }
}
