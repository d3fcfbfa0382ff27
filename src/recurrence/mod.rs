mod facility;
mod os_delegated;
mod self_rearm;

pub use facility::{AlarmFacility, TokioAlarmFacility, TriggerIdentity, WEEKLY_PERIOD};
pub use os_delegated::OsDelegatedPolicy;
pub use self_rearm::SelfRearmPolicy;

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tokio::{task::JoinHandle, time};
use tokio_util::sync::CancellationToken;

use crate::registry::{RegistryEventSender, ScheduledAlarm};

/// How long a disarm waits for the underlying task to wind down.
pub(crate) const DISARM_TIMEOUT: Duration = Duration::from_secs(5);

/// Which strategy keeps weekly repetition going. Selected in
/// `appsettings.toml`, never hard-coded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceMode {
    SelfRearm,
    OsDelegated,
}

/// One strategy for keeping a weekly reminder alive: arm the next firing,
/// disarm it when the class is cancelled or replaced.
#[async_trait]
pub trait RecurrencePolicy: Send + Sync + 'static {
    async fn arm(
        &self,
        alarm: &ScheduledAlarm,
        events: RegistryEventSender,
    ) -> anyhow::Result<ArmedAlarm>;

    async fn disarm(&self, armed: ArmedAlarm) -> anyhow::Result<()>;
}

/// Handle to whatever a policy armed. A policy only knows how to disarm its
/// own kind of handle.
pub enum ArmedAlarm {
    /// An in-process timer task (self-re-arming variant).
    Task(ScheduledTask),
    /// A repeating trigger registered with an external facility, recorded
    /// under the exact identity used at registration.
    Trigger(TriggerIdentity),
}

pub struct ScheduledTask {
    task_handle: JoinHandle<()>,
    cancellation_token: CancellationToken,
}

impl ScheduledTask {
    pub fn new(task_handle: JoinHandle<()>, cancellation_token: CancellationToken) -> Self {
        Self {
            task_handle,
            cancellation_token,
        }
    }

    pub async fn cancel(self, timeout: Duration) {
        self.cancellation_token.cancel();
        let cancel_with_timeout = time::timeout(timeout, self.task_handle);
        let _ = cancel_with_timeout.await;
    }
}
