use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;

use super::{ArmedAlarm, DISARM_TIMEOUT, RecurrencePolicy, ScheduledTask};
use crate::notify::NotificationSink;
use crate::registry::{RegistryEventSender, ScheduledAlarm};

/// Keeps repetition alive inside the process: each armed alarm is a tokio
/// task sleeping until its fire time. After notifying the sink it reports
/// back to the registry, which schedules next week's occurrence. Killing
/// the process loses every armed task until the next restore.
pub struct SelfRearmPolicy {
    sink: Arc<dyn NotificationSink>,
}

impl SelfRearmPolicy {
    pub fn new(sink: Arc<dyn NotificationSink>) -> Self {
        Self { sink }
    }
}

#[async_trait]
impl RecurrencePolicy for SelfRearmPolicy {
    async fn arm(
        &self,
        alarm: &ScheduledAlarm,
        events: RegistryEventSender,
    ) -> anyhow::Result<ArmedAlarm> {
        let cancellation_token = CancellationToken::new();
        let task_token = cancellation_token.child_token();

        let delay = (alarm.fire_time - Utc::now())
            .to_std()
            .unwrap_or(Duration::ZERO);

        let sink = Arc::clone(&self.sink);
        let alarm = alarm.clone();
        let task_handle = tokio::spawn(async move {
            let class_id = alarm.class_event.id;
            tokio::select! {
                _ = task_token.cancelled() => {
                    log::debug!("Alarm task cancelled. [class_id = {}]", class_id);
                }
                _ = tokio::time::sleep(delay) => {
                    sink.notify(&alarm.class_event).await;
                    if let Err(error) = events.notify_fired(class_id).await {
                        log::error!(
                            "Could not report fired alarm to the registry. [class_id = {}, error = {:#}]",
                            class_id,
                            error
                        );
                    }
                }
            }
        });

        Ok(ArmedAlarm::Task(ScheduledTask::new(
            task_handle,
            cancellation_token,
        )))
    }

    async fn disarm(&self, armed: ArmedAlarm) -> anyhow::Result<()> {
        match armed {
            ArmedAlarm::Task(task) => {
                task.cancel(DISARM_TIMEOUT).await;
                Ok(())
            }
            ArmedAlarm::Trigger(_) => anyhow::bail!("armed handle does not belong to this policy"),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use chrono::TimeDelta;
    use tokio::sync::mpsc;

    use super::*;
    use crate::class_event::{ClassDay, ClassEvent, TimeOfDay};
    use crate::recurrence::TriggerIdentity;
    use crate::registry::RegistryEvent;

    type FiredClasses = Arc<Mutex<Vec<String>>>;

    struct RecordingSink {
        fired: FiredClasses,
    }

    #[async_trait]
    impl NotificationSink for RecordingSink {
        async fn notify(&self, event: &ClassEvent) {
            self.fired.lock().unwrap().push(event.name.clone());
        }
    }

    fn alarm_in(delta: TimeDelta) -> ScheduledAlarm {
        let event = ClassEvent::new(
            1,
            "Operating Systems",
            "201",
            "Kim",
            ClassDay::Monday,
            TimeOfDay::parse("09:00").unwrap(),
            TimeOfDay::parse("10:30").unwrap(),
            5,
        )
        .unwrap();
        ScheduledAlarm {
            fire_time: Utc::now() + delta,
            class_event: event,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn fires_through_the_sink_and_reports_back() {
        let fired: FiredClasses = Arc::new(Mutex::new(Vec::new()));
        let policy = SelfRearmPolicy::new(Arc::new(RecordingSink {
            fired: Arc::clone(&fired),
        }));
        let (tx, mut rx) = mpsc::channel(8);

        policy
            .arm(&alarm_in(TimeDelta::minutes(30)), RegistryEventSender::new(tx))
            .await
            .unwrap();

        tokio::time::sleep(Duration::from_secs(31 * 60)).await;

        assert_eq!(&*fired.lock().unwrap(), &["Operating Systems".to_string()]);
        assert!(matches!(rx.recv().await, Some(RegistryEvent::Fired(1))));
    }

    #[tokio::test(start_paused = true)]
    async fn disarmed_alarm_never_fires() {
        let fired: FiredClasses = Arc::new(Mutex::new(Vec::new()));
        let policy = SelfRearmPolicy::new(Arc::new(RecordingSink {
            fired: Arc::clone(&fired),
        }));
        let (tx, mut rx) = mpsc::channel(8);

        let armed = policy
            .arm(&alarm_in(TimeDelta::minutes(30)), RegistryEventSender::new(tx))
            .await
            .unwrap();
        policy.disarm(armed).await.unwrap();

        tokio::time::sleep(Duration::from_secs(60 * 60)).await;

        assert!(fired.lock().unwrap().is_empty());
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn rejects_a_foreign_handle() {
        let policy = SelfRearmPolicy::new(Arc::new(RecordingSink {
            fired: Arc::new(Mutex::new(Vec::new())),
        }));
        let foreign = ArmedAlarm::Trigger(TriggerIdentity {
            requester: "elsewhere".to_string(),
            alarm_id: 9,
            signature: "x".to_string(),
        });
        assert!(policy.disarm(foreign).await.is_err());
    }
}
