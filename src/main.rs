use std::sync::Arc;

use classbell::{
    AlarmFacility, AlarmRegistry, AlarmStore, LogNotificationSink, NotificationSink,
    OsDelegatedPolicy, RecurrenceMode, RecurrencePolicy, SelfRearmPolicy, TimetableStore,
    TokioAlarmFacility, appsettings,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    pretty_env_logger::init();

    let settings = appsettings::get();
    log::info!(
        "Starting class reminder service. [recurrence = {:?}, timezone = {}]",
        settings.scheduler.recurrence,
        settings.scheduler.timezone
    );

    let sink: Arc<dyn NotificationSink> = Arc::new(LogNotificationSink);
    let policy: Arc<dyn RecurrencePolicy> = match settings.scheduler.recurrence {
        RecurrenceMode::SelfRearm => Arc::new(SelfRearmPolicy::new(sink)),
        RecurrenceMode::OsDelegated => {
            let facility: Arc<dyn AlarmFacility> = Arc::new(TokioAlarmFacility::new(sink));
            Arc::new(OsDelegatedPolicy::new(facility))
        }
    };

    let registry = AlarmRegistry::create(
        policy,
        AlarmStore::new(&settings.storage.alarm_file),
        settings.scheduler.timezone,
    );

    let restored = registry.restore().await;
    log::info!("Restored persisted alarms. [count = {}]", restored);

    // The timetable is the source of truth after a restart; rescheduling
    // from it replaces any stale restored entry.
    let timetable = TimetableStore::new(&settings.storage.timetable_file);
    match timetable.load() {
        Ok(classes) => {
            for event in classes {
                let class_id = event.id;
                if let Err(error) = registry.schedule(event).await {
                    log::error!(
                        "Could not schedule class reminder. [class_id = {}, error = {}]",
                        class_id,
                        error
                    );
                }
            }
        }
        Err(error) => log::error!("Could not load the timetable. [error = {:#}]", error),
    }

    for alarm in registry.list_active().await {
        log::info!(
            "Active reminder. [class_id = {}, class = {}, fire_time = {}]",
            alarm.class_event.id,
            alarm.class_event.name,
            alarm.fire_time
        );
    }

    tokio::signal::ctrl_c().await?;
    log::info!("Shutting down.");
    Ok(())
}
