mod common;
mod store;

pub use common::{RegistryEvent, RegistryEventSender};
pub use store::AlarmStore;

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use tokio::sync::{RwLock, mpsc};

use crate::class_event::{ClassEvent, ClassId};
use crate::error::ScheduleError;
use crate::occurrence::{plan_reminder, resolve_local};
use crate::recurrence::{ArmedAlarm, RecurrencePolicy};

/// One active reminder. `fire_time` is strictly in the future when the
/// record is created; the event snapshot renders the notification body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduledAlarm {
    pub fire_time: DateTime<Utc>,
    pub class_event: ClassEvent,
}

struct AlarmEntry {
    alarm: ScheduledAlarm,
    armed: ArmedAlarm,
}

type AlarmMap = HashMap<ClassId, AlarmEntry>;

struct RegistryInner {
    alarms: RwLock<AlarmMap>,
    policy: Arc<dyn RecurrencePolicy>,
    store: AlarmStore,
    timezone: Tz,
    events: RegistryEventSender,
}

/// Owns every [`ScheduledAlarm`]: at most one per class id, persisted after
/// every mutation. The presentation layer reports each create/update/delete
/// through [`schedule`](Self::schedule) and [`cancel`](Self::cancel).
pub struct AlarmRegistry {
    inner: Arc<RegistryInner>,
}

impl AlarmRegistry {
    pub fn create(policy: Arc<dyn RecurrencePolicy>, store: AlarmStore, timezone: Tz) -> Self {
        let (sender, receiver) = mpsc::channel(64);
        let inner = Arc::new(RegistryInner {
            alarms: RwLock::new(HashMap::new()),
            policy,
            store,
            timezone,
            events: RegistryEventSender::new(sender),
        });

        tokio::spawn(handle_events(receiver, Arc::clone(&inner)));

        Self { inner }
    }

    /// Re-creates alarms persisted by a previous run. Entries whose fire
    /// time is still ahead are armed exactly as stored; stale ones are
    /// planned afresh from their event snapshot. Returns how many alarms
    /// ended up armed.
    pub async fn restore(&self) -> usize {
        let persisted = match self.inner.store.load() {
            Ok(alarms) => alarms,
            Err(error) => {
                log::error!(
                    "Could not load persisted alarms, starting empty. [error = {:#}]",
                    error
                );
                return 0;
            }
        };

        let mut restored = 0;
        for (class_id, alarm) in persisted {
            let result = if alarm.fire_time > Utc::now() {
                self.inner.install(alarm).await.map(|_| ())
            } else {
                self.inner.schedule(alarm.class_event).await.map(|_| ())
            };
            match result {
                Ok(()) => restored += 1,
                Err(error) => log::error!(
                    "Could not restore alarm. [class_id = {}, error = {}]",
                    class_id,
                    error
                ),
            }
        }
        restored
    }

    /// Registers the reminder for a class, replacing any alarm already held
    /// under the same id.
    pub async fn schedule(&self, event: ClassEvent) -> Result<ScheduledAlarm, ScheduleError> {
        self.inner.schedule(event).await
    }

    /// Fails on an unknown id and leaves the other entries untouched.
    pub async fn cancel(&self, class_id: ClassId) -> Result<(), ScheduleError> {
        self.inner.cancel(class_id).await
    }

    pub async fn list_active(&self) -> Vec<ScheduledAlarm> {
        let alarms = self.inner.alarms.read().await;
        let mut active: Vec<_> = alarms.values().map(|entry| entry.alarm.clone()).collect();
        active.sort_by_key(|alarm| alarm.fire_time);
        active
    }
}

impl RegistryInner {
    async fn schedule(&self, event: ClassEvent) -> Result<ScheduledAlarm, ScheduleError> {
        event.validate()?;

        let now = Utc::now();
        let local_now = now.with_timezone(&self.timezone).naive_local();
        let plan = plan_reminder(
            event.day.weekday(),
            event.start_time.time(),
            event.lead_minutes,
            local_now,
        );
        let fire_time = resolve_local(self.timezone, plan.fire_time);

        self.install(ScheduledAlarm {
            fire_time,
            class_event: event,
        })
        .await
    }

    /// Cancels any alarm already held for the id, then arms and records the
    /// new one. Cancel-first keeps facility trigger identities from
    /// colliding when an unchanged event is re-registered; if arming then
    /// fails, nothing stays armed for the id.
    async fn install(&self, alarm: ScheduledAlarm) -> Result<ScheduledAlarm, ScheduleError> {
        let class_id = alarm.class_event.id;
        let mut alarms = self.alarms.write().await;

        if let Some(existing) = alarms.remove(&class_id) {
            self.disarm_quietly(existing.armed, class_id).await;
        }

        match self.policy.arm(&alarm, self.events.clone()).await {
            Ok(armed) => {
                alarms.insert(
                    class_id,
                    AlarmEntry {
                        alarm: alarm.clone(),
                        armed,
                    },
                );
                self.persist(&alarms);
                log::info!(
                    "Reminder armed. [class_id = {}, fire_time = {}]",
                    class_id,
                    alarm.fire_time
                );
                Ok(alarm)
            }
            Err(source) => {
                self.persist(&alarms);
                Err(ScheduleError::Registration {
                    id: class_id,
                    source,
                })
            }
        }
    }

    async fn cancel(&self, class_id: ClassId) -> Result<(), ScheduleError> {
        let mut alarms = self.alarms.write().await;
        let Some(entry) = alarms.remove(&class_id) else {
            return Err(ScheduleError::UnknownClass(class_id));
        };

        self.disarm_quietly(entry.armed, class_id).await;
        self.persist(&alarms);
        log::info!("Reminder cancelled. [class_id = {}]", class_id);
        Ok(())
    }

    async fn disarm_quietly(&self, armed: ArmedAlarm, class_id: ClassId) {
        if let Err(error) = self.policy.disarm(armed).await {
            log::warn!(
                "Could not disarm alarm. [class_id = {}, error = {:#}]",
                class_id,
                error
            );
        }
    }

    /// Persistence is best-effort: a failed write is logged and the
    /// in-memory registry stays authoritative until the next mutation.
    fn persist(&self, alarms: &AlarmMap) {
        let snapshot: HashMap<ClassId, ScheduledAlarm> = alarms
            .iter()
            .map(|(class_id, entry)| (*class_id, entry.alarm.clone()))
            .collect();
        if let Err(error) = self.store.save(&snapshot) {
            log::error!("Could not persist alarm registry. [error = {:#}]", error);
        }
    }
}

/// Fired alarms come back through here so next week's occurrence gets armed
/// right after the notification goes out.
async fn handle_events(mut receiver: mpsc::Receiver<RegistryEvent>, inner: Arc<RegistryInner>) {
    while let Some(event) = receiver.recv().await {
        match event {
            RegistryEvent::Fired(class_id) => {
                let snapshot = {
                    let alarms = inner.alarms.read().await;
                    alarms
                        .get(&class_id)
                        .map(|entry| entry.alarm.class_event.clone())
                };
                let Some(class_event) = snapshot else {
                    log::warn!(
                        "Fired alarm is no longer registered. [class_id = {}]",
                        class_id
                    );
                    continue;
                };
                if let Err(error) = inner.schedule(class_event).await {
                    log::error!(
                        "Could not re-arm fired alarm. [class_id = {}, error = {}]",
                        class_id,
                        error
                    );
                }
            }
        }
    }
}
