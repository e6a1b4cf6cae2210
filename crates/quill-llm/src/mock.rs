use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::client::{ChatMessage, ChatOutcome, LlmClient, LlmError, ToolCallRequest, ToolSpec};

/// Pre-programmed outcomes for deterministic testing without API calls.
pub enum MockTurn {
    Message(String),
    ToolCalls(Vec<ToolCallRequest>),
    Error(LlmError),
}

/// Mock client that returns scripted outcomes in sequence and records
/// every transcript it was shown, so tests can assert exactly which tool
/// calls the agent dispatched.
#[derive(Default)]
pub struct MockLlm {
    script: Mutex<VecDeque<MockTurn>>,
    seen: Mutex<Vec<Vec<ChatMessage>>>,
}

impl MockLlm {
    pub fn new(turns: Vec<MockTurn>) -> Self {
        Self {
            script: Mutex::new(turns.into()),
            seen: Mutex::new(Vec::new()),
        }
    }

    /// Convenience: a single final message.
    pub fn replying(text: &str) -> Self {
        Self::new(vec![MockTurn::Message(text.to_string())])
    }

    /// Convenience: one batch of tool calls, then a final message.
    pub fn calling_then_replying(calls: Vec<ToolCallRequest>, text: &str) -> Self {
        Self::new(vec![
            MockTurn::ToolCalls(calls),
            MockTurn::Message(text.to_string()),
        ])
    }

    pub fn call_count(&self) -> usize {
        self.seen.lock().len()
    }

    /// Transcripts observed, one per `complete` call.
    pub fn transcripts(&self) -> Vec<Vec<ChatMessage>> {
        self.seen.lock().clone()
    }
}

/// Build a tool call request with a synthetic id.
pub fn tool_call(name: &str, arguments: serde_json::Value) -> ToolCallRequest {
    ToolCallRequest {
        id: format!("call_{name}_{}", uuid_fragment()),
        name: name.to_string(),
        arguments,
    }
}

fn uuid_fragment() -> String {
    quill_core::ids::EventId::new().to_string()[..8].to_string()
}

#[async_trait]
impl LlmClient for MockLlm {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        _tools: &[ToolSpec],
    ) -> Result<ChatOutcome, LlmError> {
        self.seen.lock().push(messages.to_vec());

        match self.script.lock().pop_front() {
            Some(MockTurn::Message(text)) => Ok(ChatOutcome::Message(text)),
            Some(MockTurn::ToolCalls(calls)) => Ok(ChatOutcome::ToolCalls(calls)),
            Some(MockTurn::Error(e)) => Err(e),
            None => Err(LlmError::InvalidRequest(
                "MockLlm: script exhausted".to_string(),
            )),
        }
    }
}
