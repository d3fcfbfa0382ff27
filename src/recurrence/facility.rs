use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use super::{DISARM_TIMEOUT, ScheduledTask};
use crate::class_event::{ClassEvent, ClassId};
use crate::notify::NotificationSink;
use crate::registry::ScheduledAlarm;

pub const WEEKLY_PERIOD: Duration = Duration::from_secs(7 * 24 * 60 * 60);

const TRIGGER_REQUESTER: &str = "classbell/reminder";

/// Identifies one repeating trigger to the facility. Cancellation matches
/// on the whole triple; a registration made under a different signature is
/// a distinct trigger and survives the cancel.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TriggerIdentity {
    pub requester: String,
    pub alarm_id: ClassId,
    pub signature: String,
}

impl TriggerIdentity {
    pub fn for_alarm(alarm: &ScheduledAlarm) -> Self {
        let event = &alarm.class_event;
        Self {
            requester: TRIGGER_REQUESTER.to_string(),
            alarm_id: event.id,
            signature: format!(
                "{}|{}|{}|{}",
                event.name, event.room, event.start_time, event.professor
            ),
        }
    }
}

/// External repeating-trigger scheduler: fires the registered payload at
/// `first_fire` and every `period` after, with no help from the caller.
#[async_trait]
pub trait AlarmFacility: Send + Sync + 'static {
    /// Registering again under an identical identity replaces the existing
    /// trigger.
    async fn register_repeating(
        &self,
        identity: TriggerIdentity,
        payload: ClassEvent,
        first_fire: DateTime<Utc>,
        period: Duration,
    ) -> anyhow::Result<()>;

    /// Removes the trigger whose identity matches exactly. A near-miss
    /// matches nothing and the call still succeeds, so callers must hold on
    /// to the identity they registered with.
    async fn cancel(&self, identity: &TriggerIdentity) -> anyhow::Result<()>;
}

/// In-process facility backing the daemon: one tokio task per trigger,
/// sleeping to the first fire and then ticking on the period.
pub struct TokioAlarmFacility {
    sink: Arc<dyn NotificationSink>,
    triggers: RwLock<HashMap<TriggerIdentity, ScheduledTask>>,
}

impl TokioAlarmFacility {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self {
            sink,
            triggers: RwLock::new(HashMap::new()),
        }
    }

    #[cfg(test)]
    pub(crate) async fn trigger_count(&self) -> usize {
        self.triggers.read().await.len()
    }
}

#[async_trait]
impl AlarmFacility for TokioAlarmFacility {
    async fn register_repeating(
        &self,
        identity: TriggerIdentity,
        payload: ClassEvent,
        first_fire: DateTime<Utc>,
        period: Duration,
    ) -> anyhow::Result<()> {
        let cancellation_token = CancellationToken::new();
        let task_token = cancellation_token.child_token();
        let sink = Arc::clone(&self.sink);

        let first_delay = (first_fire - Utc::now()).to_std().unwrap_or(Duration::ZERO);
        let task_handle = tokio::spawn(async move {
            let mut delay = first_delay;
            loop {
                tokio::select! {
                    _ = task_token.cancelled() => {
                        log::debug!("Repeating trigger cancelled. [class_id = {}]", payload.id);
                        break;
                    }
                    _ = tokio::time::sleep(delay) => {
                        sink.notify(&payload).await;
                        delay = period;
                    }
                }
            }
        });

        let mut triggers = self.triggers.write().await;
        if let Some(previous) =
            triggers.insert(identity, ScheduledTask::new(task_handle, cancellation_token))
        {
            previous.cancel(DISARM_TIMEOUT).await;
        }
        Ok(())
    }

    async fn cancel(&self, identity: &TriggerIdentity) -> anyhow::Result<()> {
        let removed = self.triggers.write().await.remove(identity);
        match removed {
            Some(task) => {
                task.cancel(DISARM_TIMEOUT).await;
                Ok(())
            }
            None => {
                log::warn!(
                    "No repeating trigger matches the requested identity, nothing cancelled. [alarm_id = {}, signature = {}]",
                    identity.alarm_id,
                    identity.signature
                );
                Ok(())
            }
        }
    }
}
