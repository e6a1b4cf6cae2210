//! Notification worker: consumes `reminder.due` and hands a rendered
//! message to the `EmailSender` capability.
//!
//! Deliveries to the same mailbox are serialized so retries and bursts
//! cannot reorder a recipient's notifications.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{info, warn};

use quill_core::CoreError;
use quill_events::{EventEnvelope, EventType, ReminderDuePayload};
use quill_store::processed::ProcessedEventRepo;
use quill_store::Database;

use crate::email::{EmailError, EmailSender, OutboundEmail};
use crate::Disposition;

const CONSUMER: &str = "notification";

pub struct NotificationWorker {
    db: Database,
    sender: Arc<dyn EmailSender>,
    recipient_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl NotificationWorker {
    pub fn new(db: Database, sender: Arc<dyn EmailSender>) -> Self {
        Self {
            db,
            sender,
            recipient_locks: Mutex::new(HashMap::new()),
        }
    }

    pub async fn handle(&self, envelope: &EventEnvelope) -> Disposition {
        if envelope.event_type != EventType::ReminderDue {
            info!(event_id = %envelope.event_id, "ignoring non-reminder event");
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

        let payload: ReminderDuePayload = match serde_json::from_value(envelope.payload.clone()) {
            Ok(payload) => payload,
            Err(e) => {
                warn!(event_id = %envelope.event_id, error = %e, "malformed payload, dropping");
                return Disposition::Ack;
            }
        };

        let email = render(&payload);
        let result = {
            let lock = self.recipient_lock(&email.to);
            let _guard = lock.lock().await;
            self.sender.send(&email).await
        };

        match result {
            Ok(()) => {
                info!(
                    event_id = %envelope.event_id,
                    task_id = %payload.task_id,
                    to = %email.to,
                    "reminder notification delivered"
                );
                self.record_and_ack(envelope)
            }
            Err(EmailError::Transient(detail)) => {
                warn!(event_id = %envelope.event_id, detail = %detail, "email provider unavailable, retrying");
                Disposition::Retry
            }
            Err(EmailError::Permanent(detail)) => {
                warn!(event_id = %envelope.event_id, detail = %detail, "email permanently rejected, dropping");
                self.record_and_ack(envelope)
            }
        }
    }

    fn recipient_lock(&self, recipient: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.recipient_locks.lock();
        Arc::clone(
            locks
                .entry(recipient.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(()))),
        )
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
            warn!(event_id = %envelope.event_id, error = %e, "failed to record processed event");
        }
        Disposition::Ack
    }
}

fn render(payload: &ReminderDuePayload) -> OutboundEmail {
    let due_line = match payload.due_at {
        Some(due) => format!("It is due {}.", due.format("%A, %B %d at %H:%M UTC")),
        None => "It has no due date.".to_string(),
    };
    OutboundEmail {
        to: payload.owner_email.clone(),
        subject: format!("Reminder: {}", payload.title),
        body: format!(
            "This is your reminder for \"{}\". {due_line}\n",
            payload.title
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::RecordingEmailSender;
    use chrono::Utc;
    use quill_core::ids::{TaskId, UserId};

    fn setup() -> (NotificationWorker, Arc<RecordingEmailSender>) {
        let db = Database::in_memory().unwrap();
        let sender = Arc::new(RecordingEmailSender::new());
        (
            NotificationWorker::new(db, Arc::clone(&sender) as Arc<dyn EmailSender>),
            sender,
        )
    }

    fn reminder_envelope(email: &str) -> EventEnvelope {
        let payload = ReminderDuePayload {
            task_id: TaskId::new(),
            owner_id: UserId::new(),
            owner_email: email.to_string(),
            title: "water plants".into(),
            remind_at: Utc::now(),
            due_at: Some(Utc::now() + chrono::Duration::hours(1)),
        };
        EventEnvelope::reminder_due(payload.owner_id, &payload)
    }

    #[tokio::test]
    async fn delivers_and_dedups_redelivery() {
        let (worker, sender) = setup();
        let envelope = reminder_envelope("a@x.y");

        assert_eq!(worker.handle(&envelope).await, Disposition::Ack);
        assert_eq!(worker.handle(&envelope).await, Disposition::Ack);
        assert_eq!(worker.handle(&envelope).await, Disposition::Ack);

        let sent = sender.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "a@x.y");
        assert!(sent[0].subject.contains("water plants"));
    }

    #[tokio::test]
    async fn transient_failure_requests_redelivery_then_delivers() {
        let (worker, sender) = setup();
        let envelope = reminder_envelope("a@x.y");

        sender.fail_with(EmailError::Transient("smtp down".into()));
        assert_eq!(worker.handle(&envelope).await, Disposition::Retry);
        assert!(sender.sent().is_empty());

        sender.clear_failure();
        assert_eq!(worker.handle(&envelope).await, Disposition::Ack);
        assert_eq!(sender.sent().len(), 1);
    }

    #[tokio::test]
    async fn permanent_failure_is_acked_and_not_retried() {
        let (worker, sender) = setup();
        let envelope = reminder_envelope("not-an-address");

        sender.fail_with(EmailError::Permanent("invalid address".into()));
        assert_eq!(worker.handle(&envelope).await, Disposition::Ack);

        sender.clear_failure();
        // Redelivery is deduped; the bad notification never sends.
        assert_eq!(worker.handle(&envelope).await, Disposition::Ack);
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn malformed_payload_is_acked() {
        let (worker, sender) = setup();
        let envelope = EventEnvelope {
            event_id: quill_core::ids::EventId::new(),
            event_type: EventType::ReminderDue,
            emitted_at: Utc::now(),
            owner_id: UserId::new(),
            payload: serde_json::json!({"garbage": true}),
        };
        assert_eq!(worker.handle(&envelope).await, Disposition::Ack);
        assert!(sender.sent().is_empty());
    }

    #[tokio::test]
    async fn body_mentions_due_date_when_present() {
        let (worker, sender) = setup();
        let envelope = reminder_envelope("a@x.y");
        worker.handle(&envelope).await;
        assert!(sender.sent()[0].body.contains("due"));
    }
}
