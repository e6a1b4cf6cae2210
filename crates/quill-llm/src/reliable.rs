//! Retry and admission control around any `LlmClient`.
//!
//! Retryable failures back off exponentially up to a bounded attempt
//! count; a semaphore caps per-process in-flight calls so a burst of
//! agent turns cannot stampede the provider.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Semaphore;
use tracing::warn;

use crate::client::{ChatMessage, ChatOutcome, LlmClient, LlmError, ToolSpec};

pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_MAX_IN_FLIGHT: usize = 4;
const BASE_BACKOFF: Duration = Duration::from_millis(500);

pub struct ReliableLlm {
    inner: Arc<dyn LlmClient>,
    max_attempts: u32,
    permits: Arc<Semaphore>,
}

impl ReliableLlm {
    pub fn new(inner: Arc<dyn LlmClient>) -> Self {
        Self::with_limits(inner, DEFAULT_MAX_ATTEMPTS, DEFAULT_MAX_IN_FLIGHT)
    }

    pub fn with_limits(inner: Arc<dyn LlmClient>, max_attempts: u32, max_in_flight: usize) -> Self {
        Self {
            inner,
            max_attempts: max_attempts.max(1),
            permits: Arc::new(Semaphore::new(max_in_flight.max(1))),
        }
    }
}

#[async_trait]
impl LlmClient for ReliableLlm {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<ChatOutcome, LlmError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| LlmError::Cancelled)?;

        let mut attempt = 0;
        loop {
            attempt += 1;
            match self.inner.complete(messages, tools).await {
                Ok(outcome) => return Ok(outcome),
                Err(e) if e.is_retryable() && attempt < self.max_attempts => {
                    let backoff = BASE_BACKOFF * 2u32.saturating_pow(attempt - 1);
                    warn!(attempt, error = %e, backoff_ms = backoff.as_millis() as u64, "LLM call failed, retrying");
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockLlm, MockTurn};

    #[tokio::test]
    async fn retries_transient_then_succeeds() {
        let mock = Arc::new(MockLlm::new(vec![
            MockTurn::Error(LlmError::RateLimited),
            MockTurn::Message("recovered".into()),
        ]));
        let reliable = ReliableLlm::with_limits(mock.clone(), 3, 1);

        let outcome = reliable.complete(&[], &[]).await.unwrap();
        assert_eq!(outcome, ChatOutcome::Message("recovered".into()));
        assert_eq!(mock.call_count(), 2);
    }

    #[tokio::test]
    async fn fatal_error_not_retried() {
        let mock = Arc::new(MockLlm::new(vec![
            MockTurn::Error(LlmError::AuthenticationFailed("bad key".into())),
            MockTurn::Message("never reached".into()),
        ]));
        let reliable = ReliableLlm::with_limits(mock.clone(), 3, 1);

        let err = reliable.complete(&[], &[]).await.unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(mock.call_count(), 1);
    }

    #[tokio::test]
    async fn attempts_are_bounded() {
        let mock = Arc::new(MockLlm::new(vec![
            MockTurn::Error(LlmError::RateLimited),
            MockTurn::Error(LlmError::RateLimited),
            MockTurn::Error(LlmError::RateLimited),
        ]));
        let reliable = ReliableLlm::with_limits(mock.clone(), 3, 1);

        let err = reliable.complete(&[], &[]).await.unwrap_err();
        assert!(err.is_retryable());
        assert_eq!(mock.call_count(), 3);
    }

    #[tokio::test]
    async fn in_flight_is_bounded() {
        // One permit, two concurrent calls: they serialize rather than
        // overlap. Observable via the mock's strictly ordered script.
        let mock = Arc::new(MockLlm::new(vec![
            MockTurn::Message("first".into()),
            MockTurn::Message("second".into()),
        ]));
        let reliable = Arc::new(ReliableLlm::with_limits(mock.clone(), 1, 1));

        let a = {
            let reliable = Arc::clone(&reliable);
            tokio::spawn(async move { reliable.complete(&[], &[]).await })
        };
        let b = {
            let reliable = Arc::clone(&reliable);
            tokio::spawn(async move { reliable.complete(&[], &[]).await })
        };

        let results = [a.await.unwrap().unwrap(), b.await.unwrap().unwrap()];
        let texts: Vec<String> = results
            .iter()
            .map(|o| match o {
                ChatOutcome::Message(m) => m.clone(),
                ChatOutcome::ToolCalls(_) => panic!("unexpected tool calls"),
            })
            .collect();
        assert!(texts.contains(&"first".to_string()));
        assert!(texts.contains(&"second".to_string()));
    }
}
