use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use quill_core::ids::{EventId, TaskId, UserId};
use quill_core::task::{Priority, Recurrence};

/// Topic carrying `task.completed` events.
pub const TASK_EVENTS_TOPIC: &str = "task-events";
/// Topic carrying `reminder.due` events.
pub const REMINDERS_TOPIC: &str = "reminders";

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "task.completed")]
    TaskCompleted,
    #[serde(rename = "reminder.due")]
    ReminderDue,
}

/// Framed wire envelope for both topics.
///
/// `event_id` is globally unique and is the consumer's idempotency key.
/// Consumers deserialize the payload leniently: unknown fields are
/// ignored for forward compatibility.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventEnvelope {
    pub event_id: EventId,
    pub event_type: EventType,
    pub emitted_at: DateTime<Utc>,
    pub owner_id: UserId,
    pub payload: serde_json::Value,
}

impl EventEnvelope {
    pub fn task_completed(owner_id: UserId, payload: &TaskCompletedPayload) -> Self {
        Self {
            event_id: EventId::new(),
            event_type: EventType::TaskCompleted,
            emitted_at: Utc::now(),
            owner_id,
            payload: serde_json::to_value(payload).unwrap_or_default(),
        }
    }

    pub fn reminder_due(owner_id: UserId, payload: &ReminderDuePayload) -> Self {
        Self {
            event_id: EventId::new(),
            event_type: EventType::ReminderDue,
            emitted_at: Utc::now(),
            owner_id,
            payload: serde_json::to_value(payload).unwrap_or_default(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskCompletedPayload {
    pub task_id: TaskId,
    pub owner_id: UserId,
    pub title: String,
    pub priority: Priority,
    pub completed_at: DateTime<Utc>,
    pub recurrence: Recurrence,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_task_id: Option<TaskId>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderDuePayload {
    pub task_id: TaskId,
    pub owner_id: UserId,
    pub owner_email: String,
    pub title: String,
    pub remind_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_task_payload() -> TaskCompletedPayload {
        TaskCompletedPayload {
            task_id: TaskId::new(),
            owner_id: UserId::new(),
            title: "water plants".into(),
            priority: Priority::Medium,
            completed_at: Utc::now(),
            recurrence: Recurrence::Weekly,
            due_at: None,
            parent_task_id: None,
        }
    }

    #[test]
    fn envelope_wire_shape() {
        let owner = UserId::new();
        let envelope = EventEnvelope::task_completed(owner, &sample_task_payload());
        let json = serde_json::to_value(&envelope).unwrap();

        assert!(json["eventId"].is_string());
        assert_eq!(json["eventType"], "task.completed");
        assert!(json["emittedAt"].is_string());
        assert_eq!(json["ownerId"], owner.to_string());
        assert!(json["payload"].is_object());
    }

    #[test]
    fn envelope_roundtrip() {
        let envelope = EventEnvelope::task_completed(UserId::new(), &sample_task_payload());
        let json = serde_json::to_string(&envelope).unwrap();
        let parsed: EventEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.event_id, envelope.event_id);
        assert_eq!(parsed.event_type, EventType::TaskCompleted);
    }

    #[test]
    fn each_envelope_gets_a_fresh_event_id() {
        let payload = sample_task_payload();
        let a = EventEnvelope::task_completed(payload.owner_id, &payload);
        let b = EventEnvelope::task_completed(payload.owner_id, &payload);
        assert_ne!(a.event_id, b.event_id);
    }

    #[test]
    fn payload_ignores_unknown_fields() {
        let raw = serde_json::json!({
            "taskId": TaskId::new().to_string(),
            "ownerId": UserId::new().to_string(),
            "title": "t",
            "priority": "high",
            "completedAt": "2025-01-06T09:00:00Z",
            "recurrence": "weekly",
            "someFutureField": {"nested": true},
        });
        let parsed: TaskCompletedPayload = serde_json::from_value(raw).unwrap();
        assert_eq!(parsed.priority, Priority::High);
        assert_eq!(parsed.recurrence, Recurrence::Weekly);
        assert!(parsed.due_at.is_none());
    }

    #[test]
    fn reminder_payload_roundtrip() {
        let payload = ReminderDuePayload {
            task_id: TaskId::new(),
            owner_id: UserId::new(),
            owner_email: "a@x.y".into(),
            title: "standup".into(),
            remind_at: Utc::now(),
            due_at: Some(Utc::now()),
        };
        let json = serde_json::to_string(&payload).unwrap();
        let parsed: ReminderDuePayload = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed.owner_email, "a@x.y");
        assert_eq!(parsed.task_id, payload.task_id);
    }
}
