use std::sync::Arc;

use async_trait::async_trait;

use super::{AlarmFacility, ArmedAlarm, RecurrencePolicy, TriggerIdentity, WEEKLY_PERIOD};
use crate::registry::{RegistryEventSender, ScheduledAlarm};

/// Hands weekly repetition to an external repeating-trigger facility: one
/// registration covers every future firing, so the process can die without
/// losing the alarm. The armed handle records the exact trigger identity
/// because that is the only thing the facility will cancel by.
pub struct OsDelegatedPolicy {
    facility: Arc<dyn AlarmFacility>,
}

impl OsDelegatedPolicy {
    pub fn new(facility: Arc<dyn AlarmFacility>) -> Self {
        Self { facility }
    }
}

#[async_trait]
impl RecurrencePolicy for OsDelegatedPolicy {
    async fn arm(
        &self,
        alarm: &ScheduledAlarm,
        _events: RegistryEventSender,
    ) -> anyhow::Result<ArmedAlarm> {
        let identity = TriggerIdentity::for_alarm(alarm);
        self.facility
            .register_repeating(
                identity.clone(),
                alarm.class_event.clone(),
                alarm.fire_time,
                WEEKLY_PERIOD,
            )
            .await?;
        Ok(ArmedAlarm::Trigger(identity))
    }

    async fn disarm(&self, armed: ArmedAlarm) -> anyhow::Result<()> {
        match armed {
            ArmedAlarm::Trigger(identity) => self.facility.cancel(&identity).await,
            ArmedAlarm::Task(_) => anyhow::bail!("armed handle does not belong to this policy"),
        }
    }
}
