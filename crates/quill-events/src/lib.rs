//! Event fabric capability: the wire envelope shared by producers and
//! consumers, the `EventBus` trait, the HTTP sidecar publisher, and an
//! in-process bus for tests.

pub mod bus;
pub mod envelope;
pub mod memory;
pub mod sidecar;

pub use bus::{EventBus, NoopBus};
pub use envelope::{
    EventEnvelope, EventType, ReminderDuePayload, TaskCompletedPayload, REMINDERS_TOPIC,
    TASK_EVENTS_TOPIC,
};
pub use memory::InMemoryBus;
pub use sidecar::SidecarBus;
