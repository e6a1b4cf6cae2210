use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use quill_core::CoreError;

use crate::bus::EventBus;
use crate::envelope::EventEnvelope;

const PUBLISH_TIMEOUT: Duration = Duration::from_secs(10);

/// Publishes through a pub/sub sidecar's HTTP endpoint:
/// `POST {base_url}/v1.0/publish/{pubsub}/{topic}` with the envelope as
/// the JSON body. The sidecar owns broker connectivity and redelivery.
pub struct SidecarBus {
    client: reqwest::Client,
    base_url: String,
    pubsub_name: String,
}

impl SidecarBus {
    pub fn new(base_url: impl Into<String>, pubsub_name: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(PUBLISH_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into(),
            pubsub_name: pubsub_name.into(),
        }
    }
}

#[async_trait]
impl EventBus for SidecarBus {
    async fn publish(&self, topic: &str, envelope: &EventEnvelope) -> Result<(), CoreError> {
        let url = format!(
            "{}/v1.0/publish/{}/{topic}",
            self.base_url.trim_end_matches('/'),
            self.pubsub_name
        );

        let response = self
            .client
            .post(&url)
            .json(envelope)
            .send()
            .await
            .map_err(|e| {
                warn!(topic, error = %e, "sidecar publish failed");
                CoreError::UpstreamTransient(format!("sidecar publish: {e}"))
            })?;

        let status = response.status();
        if status.is_success() {
            debug!(topic, event_id = %envelope.event_id, "event published");
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        if status.is_client_error() {
            Err(CoreError::UpstreamPermanent(format!(
                "sidecar rejected publish ({status}): {body}"
            )))
        } else {
            Err(CoreError::UpstreamTransient(format!(
                "sidecar publish failed ({status}): {body}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::envelope::{TaskCompletedPayload, TASK_EVENTS_TOPIC};
    use quill_core::ids::{TaskId, UserId};
    use quill_core::task::{Priority, Recurrence};

    fn envelope() -> EventEnvelope {
        let payload = TaskCompletedPayload {
            task_id: TaskId::new(),
            owner_id: UserId::new(),
            title: "t".into(),
            priority: Priority::Medium,
            completed_at: chrono::Utc::now(),
            recurrence: Recurrence::None,
            due_at: None,
            parent_task_id: None,
        };
        EventEnvelope::task_completed(payload.owner_id, &payload)
    }

    #[tokio::test]
    async fn unreachable_sidecar_is_transient() {
        // Port 9 (discard) is not listening.
        let bus = SidecarBus::new("http://127.0.0.1:9", "pubsub");
        let err = bus.publish(TASK_EVENTS_TOPIC, &envelope()).await.unwrap_err();
        assert!(matches!(err, CoreError::UpstreamTransient(_)));
    }

    #[test]
    fn url_shape() {
        let bus = SidecarBus::new("http://localhost:3500/", "pubsub");
        assert_eq!(bus.base_url, "http://localhost:3500/");
        // trailing slash handled at publish time
        let url = format!(
            "{}/v1.0/publish/{}/{}",
            bus.base_url.trim_end_matches('/'),
            bus.pubsub_name,
            TASK_EVENTS_TOPIC
        );
        assert_eq!(url, "http://localhost:3500/v1.0/publish/pubsub/task-events");
    }
}
