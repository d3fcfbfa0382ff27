pub mod appsettings;
mod class_event;
mod error;
mod notify;
mod occurrence;
mod recurrence;
mod registry;
mod timetable;

pub use class_event::{ClassDay, ClassEvent, ClassId, DEFAULT_LEAD_MINUTES, TimeOfDay};
pub use error::ScheduleError;
pub use notify::{LogNotificationSink, NotificationSink};
pub use occurrence::{ReminderPlan, next_occurrence, plan_reminder, resolve_local};
pub use recurrence::{
    AlarmFacility, ArmedAlarm, OsDelegatedPolicy, RecurrenceMode, RecurrencePolicy, ScheduledTask,
    SelfRearmPolicy, TokioAlarmFacility, TriggerIdentity, WEEKLY_PERIOD,
};
pub use registry::{AlarmRegistry, AlarmStore, RegistryEvent, RegistryEventSender, ScheduledAlarm};
pub use timetable::TimetableStore;
