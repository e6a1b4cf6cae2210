//! Event consumers: the recurrence worker (successor creation) and the
//! notification worker (reminder delivery), plus their subscription
//! routers and the outbound email capability.

pub mod email;
pub mod notification;
pub mod recurrence;
pub mod routes;
pub mod taskcore_client;

/// What a handler tells the bus about one delivery.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Disposition {
    /// Handled (or safely skipped); do not redeliver.
    Ack,
    /// Transient failure; redeliver later.
    Retry,
}

pub use email::{EmailError, EmailSender, LogEmailSender, OutboundEmail, RecordingEmailSender};
pub use notification::NotificationWorker;
pub use recurrence::RecurrenceWorker;
pub use routes::{notification_router, recurrence_router};
pub use taskcore_client::{HttpTaskCore, LocalTaskCore, TaskCoreApi, ACTING_USER_HEADER};
