//! `LlmClient` capability: the chat-completion trait the agent consumes,
//! an OpenAI-compatible HTTP implementation, a retry/admission wrapper,
//! and a scripted mock for tests.

pub mod client;
pub mod mock;
pub mod openai;
pub mod reliable;

pub use client::{
    ChatMessage, ChatOutcome, ChatRole, LlmClient, LlmError, ToolCallRequest, ToolSpec,
};
pub use mock::{tool_call, MockLlm, MockTurn};
pub use openai::OpenAiClient;
pub use reliable::ReliableLlm;
