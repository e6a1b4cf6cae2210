//! Recurrence worker: consumes `task.completed` and creates exactly one
//! successor per completion event.
//!
//! Idempotency comes from the processed-events set keyed by event-id:
//! redelivery of an already-handled event acknowledges without touching
//! task state. Fresh task state is always re-read through TaskCore, never
//! trusted from the (possibly stale, possibly reordered) event payload.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use quill_core::recurrence::next_occurrence;
use quill_core::CoreError;
use quill_events::{EventEnvelope, EventType, TaskCompletedPayload};
use quill_store::processed::ProcessedEventRepo;
use quill_store::Database;
use quill_tasks::CreateTask;

use crate::taskcore_client::TaskCoreApi;
use crate::Disposition;

const CONSUMER: &str = "recurrence";

pub struct RecurrenceWorker {
    db: Database,
    api: Arc<dyn TaskCoreApi>,
}

impl RecurrenceWorker {
    pub fn new(db: Database, api: Arc<dyn TaskCoreApi>) -> Self {
        Self { db, api }
    }

    pub async fn handle(&self, envelope: &EventEnvelope) -> Disposition {
        if envelope.event_type != EventType::TaskCompleted {
            info!(event_id = %envelope.event_id, "ignoring non-completion event");
            return Disposition::Ack;
        }

        match self.seen(envelope) {
            Ok(true) => {
                info!(event_id = %envelope.event_id, "duplicate delivery, acknowledging");
                return Disposition::Ack;
            }
            Ok(false) => {}
            Err(e) => {
                warn!(event_id = %envelope.event_id, error = %e, "dedup check failed");
                return Disposition::Retry;
            }
        }

        let payload: TaskCompletedPayload = match serde_json::from_value(envelope.payload.clone())
        {
            Ok(payload) => payload,
            Err(e) => {
                // Malformed payloads are acknowledged so a poison message
                // cannot wedge the topic.
                warn!(event_id = %envelope.event_id, error = %e, "malformed payload, dropping");
                return Disposition::Ack;
            }
        };

        let source = match self.api.get_task(payload.owner_id, payload.task_id).await {
            Ok(Some(task)) => task,
            Ok(None) => {
                info!(event_id = %envelope.event_id, task_id = %payload.task_id, "source task gone");
                return self.record_and_ack(envelope);
            }
            Err(e) if e.is_retryable() => {
                warn!(event_id = %envelope.event_id, error = %e, "task core unavailable");
                return Disposition::Retry;
            }
            Err(e) => {
                warn!(event_id = %envelope.event_id, error = %e, "permanent fetch failure");
                return self.record_and_ack(envelope);
            }
        };

        if !source.recurrence.is_recurring() {
            info!(event_id = %envelope.event_id, task_id = %source.id, "task is not recurring");
            return self.record_and_ack(envelope);
        }

        let now = Utc::now();
        let Some(next) = next_occurrence(
            source.recurrence,
            source.due_at,
            source.remind_at,
            payload.completed_at,
            now,
        ) else {
            return self.record_and_ack(envelope);
        };

        // A preserved reminder offset can land in the past when the
        // successor is close; such reminders are dropped, not backdated.
        let remind_at = next.remind_at.filter(|r| *r > now);

        let successor = CreateTask {
            title: source.title.clone(),
            description: source.description.clone(),
            priority: Some(source.priority),
            due_at: Some(next.due_at),
            remind_at,
            recurrence: Some(source.recurrence),
            parent_task_id: Some(source.id),
            tags: source.tags.clone(),
        };

        match self.api.create_task(payload.owner_id, successor).await {
            Ok(created) => {
                info!(
                    event_id = %envelope.event_id,
                    source_task_id = %source.id,
                    successor_task_id = %created.id,
                    next_due = %next.due_at,
                    "successor task created"
                );
                self.record_and_ack(envelope)
            }
            Err(e) if e.is_retryable() => {
                warn!(event_id = %envelope.event_id, error = %e, "successor creation failed, retrying");
                Disposition::Retry
            }
            Err(e) => {
                warn!(event_id = %envelope.event_id, error = %e, "successor creation rejected");
                self.record_and_ack(envelope)
            }
        }
    }

    fn seen(&self, envelope: &EventEnvelope) -> Result<bool, CoreError> {
        Ok(self
            .db
            .with_conn(|conn| ProcessedEventRepo::contains(conn, CONSUMER, envelope.event_id))?)
    }

    fn record_and_ack(&self, envelope: &EventEnvelope) -> Disposition {
        if let Err(e) = self
            .db
            .with_conn(|conn| ProcessedEventRepo::record(conn, CONSUMER, envelope.event_id))
        {
            // The ack itself prevents redelivery; failing to record is
            // logged but must not trigger a duplicate-creating retry.
            warn!(event_id = %envelope.event_id, error = %e, "failed to record processed event");
        }
        Disposition::Ack
    }
}
