//! Subscription endpoints: the bus delivers one event per request.
//! 2xx acknowledges, 5xx requests redelivery, and 4xx (including body
//! rejections) tells the bus to discard.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;

use quill_events::EventEnvelope;
use quill_store::Database;

use crate::notification::NotificationWorker;
use crate::recurrence::RecurrenceWorker;
use crate::Disposition;

pub fn recurrence_router(worker: Arc<RecurrenceWorker>, db: Database) -> Router {
    Router::new()
        .route("/events/task-completed", post(handle_task_completed))
        .route("/health", get(health))
        .with_state(RecurrenceState { worker, db })
}

pub fn notification_router(worker: Arc<NotificationWorker>, db: Database) -> Router {
    Router::new()
        .route("/events/reminder-due", post(handle_reminder_due))
        .route("/health", get(health_notification))
        .with_state(NotificationState { worker, db })
}

#[derive(Clone)]
struct RecurrenceState {
    worker: Arc<RecurrenceWorker>,
    db: Database,
}

#[derive(Clone)]
struct NotificationState {
    worker: Arc<NotificationWorker>,
    db: Database,
}

async fn handle_task_completed(
    State(state): State<RecurrenceState>,
    Json(envelope): Json<EventEnvelope>,
) -> impl IntoResponse {
    disposition_response(state.worker.handle(&envelope).await)
}

async fn handle_reminder_due(
    State(state): State<NotificationState>,
    Json(envelope): Json<EventEnvelope>,
) -> impl IntoResponse {
    disposition_response(state.worker.handle(&envelope).await)
}

fn disposition_response(disposition: Disposition) -> (StatusCode, Json<serde_json::Value>) {
    match disposition {
        Disposition::Ack => (StatusCode::OK, Json(json!({"status": "SUCCESS"}))),
        Disposition::Retry => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "RETRY"})),
        ),
    }
}

async fn health(State(state): State<RecurrenceState>) -> (StatusCode, Json<serde_json::Value>) {
    health_of(&state.db)
}

async fn health_notification(
    State(state): State<NotificationState>,
) -> (StatusCode, Json<serde_json::Value>) {
    health_of(&state.db)
}

fn health_of(db: &Database) -> (StatusCode, Json<serde_json::Value>) {
    match db.ping() {
        Ok(()) => (StatusCode::OK, Json(json!({"status": "healthy"}))),
        Err(e) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({"status": "unhealthy", "detail": e.to_string()})),
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::email::RecordingEmailSender;
    use crate::taskcore_client::LocalTaskCore;
    use axum::body::Body;
    use axum::http::Request;
    use quill_core::ids::{TaskId, UserId};
    use quill_events::ReminderDuePayload;
    use quill_tasks::TaskService;
    use tower::ServiceExt;

    fn notification_app() -> (Router, Arc<RecordingEmailSender>) {
        let db = Database::in_memory().unwrap();
        let sender = Arc::new(RecordingEmailSender::new());
        let worker = Arc::new(NotificationWorker::new(
            db.clone(),
            Arc::clone(&sender) as Arc<dyn crate::email::EmailSender>,
        ));
        (notification_router(worker, db), sender)
    }

    fn reminder_envelope() -> EventEnvelope {
        let payload = ReminderDuePayload {
            task_id: TaskId::new(),
            owner_id: UserId::new(),
            owner_email: "a@x.y".into(),
            title: "standup".into(),
            remind_at: chrono::Utc::now(),
            due_at: None,
        };
        EventEnvelope::reminder_due(payload.owner_id, &payload)
    }

    async fn post_json(app: Router, path: &str, body: String) -> StatusCode {
        let response = app
            .oneshot(
                Request::post(path)
                    .header("content-type", "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        response.status()
    }

    #[tokio::test]
    async fn reminder_endpoint_acks_valid_event() {
        let (app, sender) = notification_app();
        let body = serde_json::to_string(&reminder_envelope()).unwrap();
        let status = post_json(app, "/events/reminder-due", body).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(sender.sent().len(), 1);
    }

    #[tokio::test]
    async fn reminder_endpoint_returns_retryable_on_transient_failure() {
        let (app, sender) = notification_app();
        sender.fail_with(crate::email::EmailError::Transient("down".into()));
        let body = serde_json::to_string(&reminder_envelope()).unwrap();
        let status = post_json(app, "/events/reminder-due", body).await;
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    }

    #[tokio::test]
    async fn unparseable_body_is_a_client_error() {
        let (app, _sender) = notification_app();
        let status = post_json(app, "/events/reminder-due", "not json".into()).await;
        assert!(status.is_client_error());
    }

    #[tokio::test]
    async fn recurrence_endpoint_acks_and_health_reports() {
        let db = Database::in_memory().unwrap();
        let service = Arc::new(TaskService::new(db.clone()));
        let worker = Arc::new(RecurrenceWorker::new(
            db.clone(),
            Arc::new(LocalTaskCore::new(service)),
        ));
        let app = recurrence_router(worker, db);

        let health = app
            .clone()
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(health.status(), StatusCode::OK);

        // A reminder-typed event on the completion endpoint is ignored
        // politely (acked).
        let body = serde_json::to_string(&reminder_envelope()).unwrap();
        let status = post_json(app, "/events/task-completed", body).await;
        assert_eq!(status, StatusCode::OK);
    }
}
