//! OpenAI-compatible chat-completions client with function calling.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::client::{
    ChatMessage, ChatOutcome, ChatRole, LlmClient, LlmError, ToolCallRequest, ToolSpec,
};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
}

impl OpenAiClient {
    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .unwrap_or_default();
        Self {
            client,
            base_url: base_url.into(),
            api_key: api_key.into(),
            model: model.into(),
        }
    }

    fn wire_messages(messages: &[ChatMessage]) -> Vec<serde_json::Value> {
        messages
            .iter()
            .map(|m| match m.role {
                ChatRole::Tool => json!({
                    "role": "tool",
                    "tool_call_id": m.tool_call_id,
                    "content": m.content,
                }),
                ChatRole::Assistant if !m.tool_calls.is_empty() => json!({
                    "role": "assistant",
                    "content": m.content,
                    "tool_calls": m.tool_calls.iter().map(|c| json!({
                        "id": c.id,
                        "type": "function",
                        "function": {
                            "name": c.name,
                            "arguments": c.arguments.to_string(),
                        },
                    })).collect::<Vec<_>>(),
                }),
                role => json!({
                    "role": match role {
                        ChatRole::System => "system",
                        ChatRole::User => "user",
                        ChatRole::Assistant => "assistant",
                        ChatRole::Tool => unreachable!(),
                    },
                    "content": m.content,
                }),
            })
            .collect()
    }

    fn wire_tools(tools: &[ToolSpec]) -> Vec<serde_json::Value> {
        tools
            .iter()
            .map(|t| {
                json!({
                    "type": "function",
                    "function": {
                        "name": t.name,
                        "description": t.description,
                        "parameters": t.parameters,
                    },
                })
            })
            .collect()
    }
}

#[derive(Deserialize)]
struct WireResponse {
    choices: Vec<WireChoice>,
}

#[derive(Deserialize)]
struct WireChoice {
    message: WireMessage,
}

#[derive(Deserialize)]
struct WireMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<WireToolCall>,
}

#[derive(Deserialize)]
struct WireToolCall {
    id: String,
    function: WireFunction,
}

#[derive(Deserialize)]
struct WireFunction {
    name: String,
    arguments: String,
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(
        &self,
        messages: &[ChatMessage],
        tools: &[ToolSpec],
    ) -> Result<ChatOutcome, LlmError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let mut body = json!({
            "model": self.model,
            "messages": Self::wire_messages(messages),
        });
        if !tools.is_empty() {
            body["tools"] = serde_json::Value::Array(Self::wire_tools(tools));
            body["tool_choice"] = json!("auto");
        }

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::Timeout(REQUEST_TIMEOUT)
                } else {
                    LlmError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status != 200 {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::from_status(status, body));
        }

        let wire: WireResponse = response
            .json()
            .await
            .map_err(|e| LlmError::NetworkError(format!("decode response: {e}")))?;

        let choice = wire
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidRequest("response had no choices".into()))?;

        if choice.message.tool_calls.is_empty() {
            let content = choice.message.content.unwrap_or_default();
            debug!(chars = content.len(), "model returned final message");
            return Ok(ChatOutcome::Message(content));
        }

        let calls = choice
            .message
            .tool_calls
            .into_iter()
            .map(|c| {
                // The model sends arguments as a JSON-encoded string;
                // malformed arguments become an empty object and the
                // registry's schema validation reports the problem back.
                let arguments = serde_json::from_str(&c.function.arguments)
                    .unwrap_or_else(|_| json!({}));
                ToolCallRequest {
                    id: c.id,
                    name: c.function.name,
                    arguments,
                }
            })
            .collect();
        Ok(ChatOutcome::ToolCalls(calls))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wire_messages_shape() {
        let messages = vec![
            ChatMessage::system("be helpful"),
            ChatMessage::user("add milk"),
            ChatMessage::assistant_tool_calls(vec![ToolCallRequest {
                id: "call_1".into(),
                name: "add_task".into(),
                arguments: json!({"title": "milk"}),
            }]),
            ChatMessage::tool_result("call_1", r#"{"success":true}"#),
        ];
        let wire = OpenAiClient::wire_messages(&messages);

        assert_eq!(wire[0]["role"], "system");
        assert_eq!(wire[1]["role"], "user");
        assert_eq!(wire[2]["tool_calls"][0]["function"]["name"], "add_task");
        assert_eq!(
            wire[2]["tool_calls"][0]["function"]["arguments"],
            r#"{"title":"milk"}"#
        );
        assert_eq!(wire[3]["role"], "tool");
        assert_eq!(wire[3]["tool_call_id"], "call_1");
    }

    #[test]
    fn wire_tools_shape() {
        let tools = vec![ToolSpec {
            name: "list_tasks".into(),
            description: "List tasks".into(),
            parameters: json!({"type": "object", "properties": {}}),
        }];
        let wire = OpenAiClient::wire_tools(&tools);
        assert_eq!(wire[0]["type"], "function");
        assert_eq!(wire[0]["function"]["name"], "list_tasks");
    }

    #[test]
    fn parses_tool_call_response() {
        let raw = json!({
            "choices": [{
                "message": {
                    "content": null,
                    "tool_calls": [{
                        "id": "call_abc",
                        "type": "function",
                        "function": {"name": "add_task", "arguments": "{\"title\":\"milk\"}"}
                    }]
                }
            }]
        });
        let wire: WireResponse = serde_json::from_value(raw).unwrap();
        let call = &wire.choices[0].message.tool_calls[0];
        assert_eq!(call.function.name, "add_task");
    }

    #[tokio::test]
    async fn unreachable_endpoint_is_network_error() {
        let client = OpenAiClient::new("http://127.0.0.1:9", "key", "model");
        let err = client.complete(&[ChatMessage::user("hi")], &[]).await.unwrap_err();
        assert!(matches!(err, LlmError::NetworkError(_)));
    }
}
