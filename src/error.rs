use thiserror::Error;

use crate::class_event::ClassId;

/// Errors surfaced by the scheduling layer. Persistence I/O failures are
/// deliberately absent: those are logged and the operation proceeds in
/// memory.
#[derive(Debug, Error)]
pub enum ScheduleError {
    #[error("malformed time of day: {0:?}")]
    InvalidTime(String),

    #[error("unknown weekday label: {0:?}")]
    UnknownDay(String),

    #[error("class {id} ends at or before it starts")]
    InvalidTimeRange { id: ClassId },

    #[error("no active alarm for class {0}")]
    UnknownClass(ClassId),

    #[error("could not arm alarm for class {id}")]
    Registration {
        id: ClassId,
        #[source]
        source: anyhow::Error,
    },
}
