use async_trait::async_trait;
use parking_lot::Mutex;

use quill_core::CoreError;

use crate::bus::EventBus;
use crate::envelope::EventEnvelope;

/// In-process bus for tests: records every publish and can be told to
/// fail the next N publishes to exercise retry paths.
#[derive(Default)]
pub struct InMemoryBus {
    published: Mutex<Vec<(String, EventEnvelope)>>,
    fail_next: Mutex<u32>,
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `n` publishes return a transient error.
    pub fn fail_next(&self, n: u32) {
        *self.fail_next.lock() = n;
    }

    /// Envelopes published to a topic, in publish order.
    pub fn published(&self, topic: &str) -> Vec<EventEnvelope> {
        self.published
            .lock()
            .iter()
            .filter(|(t, _)| t == topic)
            .map(|(_, e)| e.clone())
            .collect()
    }

    pub fn publish_count(&self) -> usize {
        self.published.lock().len()
    }

    /// Drain everything published so far.
    pub fn take_all(&self) -> Vec<(String, EventEnvelope)> {
        std::mem::take(&mut *self.published.lock())
    }
}

#[async_trait]
impl EventBus for InMemoryBus {
    async fn publish(&self, topic: &str, envelope: &EventEnvelope) -> Result<(), CoreError> {
        {
            let mut remaining = self.fail_next.lock();
            if *remaining > 0 {
                *remaining -= 1;
                return Err(CoreError::UpstreamTransient("injected bus failure".into()));
            }
        }
        self.published
            .lock()
            .push((topic.to_string(), envelope.clone()));
        Ok(())
    }
}
