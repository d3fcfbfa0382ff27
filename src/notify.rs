use async_trait::async_trait;

use crate::class_event::ClassEvent;

/// Where fired reminders go. Injected into the recurrence policies at
/// construction; the scheduler never touches a platform notification
/// service directly. Fire-and-forget, no result consulted.
#[async_trait]
pub trait NotificationSink: Send + Sync + 'static {
    async fn notify(&self, event: &ClassEvent);
}

/// Renders reminders into the service log.
pub struct LogNotificationSink;

#[async_trait]
impl NotificationSink for LogNotificationSink {
    async fn notify(&self, event: &ClassEvent) {
        log::info!(
            "Class reminder: {}. [starts = {}, room = {}, professor = {}]",
            event.name,
            event.start_time,
            event.room,
            event.professor
        );
    }
}
