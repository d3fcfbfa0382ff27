use tokio::sync::mpsc;

use crate::class_event::ClassId;

#[derive(Debug)]
pub enum RegistryEvent {
    Fired(ClassId),
}

/// Handle timer tasks use to call back into the registry's event loop.
#[derive(Clone)]
pub struct RegistryEventSender(mpsc::Sender<RegistryEvent>);

impl RegistryEventSender {
    pub fn new(inner: mpsc::Sender<RegistryEvent>) -> Self {
        Self(inner)
    }

    pub async fn notify_fired(&self, class_id: ClassId) -> anyhow::Result<()> {
        self.0.send(RegistryEvent::Fired(class_id)).await?;
        Ok(())
    }
}
