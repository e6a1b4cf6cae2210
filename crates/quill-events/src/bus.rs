use async_trait::async_trait;

use quill_core::CoreError;

use crate::envelope::EventEnvelope;

/// Outbound topic publisher. Delivery is at-least-once and may be
/// reordered; consumers rely on the envelope's event-id for idempotency,
/// never on ordering.
#[async_trait]
pub trait EventBus: Send + Sync {
    async fn publish(&self, topic: &str, envelope: &EventEnvelope) -> Result<(), CoreError>;
}

/// Bus used when eventing is disabled: publishes succeed and go nowhere,
/// so completion and reminders degrade gracefully.
pub struct NoopBus;

#[async_trait]
impl EventBus for NoopBus {
    async fn publish(&self, topic: &str, envelope: &EventEnvelope) -> Result<(), CoreError> {
        tracing::debug!(topic, event_id = %envelope.event_id, "event bus disabled, dropping event");
        Ok(())
    }
}
