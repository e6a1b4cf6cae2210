//! Turn-taking loop: one user utterance in, one assistant reply out,
//! with zero or more bounded tool invocations in between.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{info, warn};

use quill_core::conversation::{derive_title, Conversation, Message, Role};
use quill_core::ids::{ConversationId, UserId};
use quill_core::CoreError;
use quill_llm::{ChatMessage, ChatOutcome, LlmClient, ToolCallRequest};
use quill_store::conversations::{ConversationRepo, MessageRepo};
use quill_tasks::TaskService;

use crate::registry::{DispatchError, ToolRegistry};

/// Default bound on planning iterations per turn.
pub const DEFAULT_MAX_ITERATIONS: usize = 8;
/// Default wall-clock budget for a whole turn.
pub const DEFAULT_TURN_TIMEOUT: Duration = Duration::from_secs(120);

#[derive(Clone, Debug)]
pub struct AgentConfig {
    pub max_iterations: usize,
    pub turn_timeout: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: DEFAULT_MAX_ITERATIONS,
            turn_timeout: DEFAULT_TURN_TIMEOUT,
        }
    }
}

/// The reply produced by one turn.
#[derive(Clone, Debug)]
pub struct TurnResult {
    pub user_message: Message,
    pub assistant_message: Message,
}

pub struct Agent {
    service: Arc<TaskService>,
    registry: ToolRegistry,
    llm: Arc<dyn LlmClient>,
    config: AgentConfig,
}

impl Agent {
    pub fn new(service: Arc<TaskService>, llm: Arc<dyn LlmClient>, config: AgentConfig) -> Self {
        Self {
            registry: ToolRegistry::new(Arc::clone(&service)),
            service,
            llm,
            config,
        }
    }

    /// Process one user turn in a conversation owned by `owner`.
    ///
    /// Tool calls apply to TaskCore immediately and individually; if the
    /// turn deadline expires mid-loop the work already applied stays
    /// applied and the reply says the turn was cut short. The user and
    /// assistant messages commit to the store in one transaction at the
    /// end of the turn.
    pub async fn handle_turn(
        &self,
        owner: UserId,
        conversation_id: ConversationId,
        user_text: &str,
    ) -> Result<TurnResult, CoreError> {
        let user_text = user_text.trim();
        if user_text.is_empty() {
            return Err(CoreError::validation("message must not be empty"));
        }

        let db = self.service.database();
        let conversation = db
            .with_conn(|conn| ConversationRepo::get(conn, owner, conversation_id))?
            .ok_or(CoreError::NotFound)?;

        let history = db.with_conn(|conn| MessageRepo::list(conn, conversation_id))?;

        let mut transcript = Vec::with_capacity(history.len() + 2);
        transcript.push(ChatMessage::system(system_prompt()));
        for message in &history {
            transcript.push(match message.role {
                Role::User => ChatMessage::user(&message.content),
                Role::Assistant => ChatMessage::assistant(&message.content),
            });
        }
        transcript.push(ChatMessage::user(user_text));

        let reply = match tokio::time::timeout(
            self.config.turn_timeout,
            self.plan_and_dispatch(owner, &mut transcript),
        )
        .await
        {
            Ok(Ok(reply)) => reply,
            Ok(Err(e)) => {
                warn!(error = %e, kind = e.error_kind(), "turn failed");
                turn_error_reply(&e)
            }
            Err(_) => {
                warn!("turn deadline expired mid-loop");
                "I ran out of time processing that request. Some changes may \
                 already have been applied; please check your tasks."
                    .to_string()
            }
        };

        // Commit both sides of the turn atomically.
        let (user_message, assistant_message) = db.with_tx(|tx| {
            let user_message = MessageRepo::append(tx, conversation_id, Role::User, user_text)?;
            let assistant_message =
                MessageRepo::append(tx, conversation_id, Role::Assistant, &reply)?;
            if conversation.title.is_none() {
                ConversationRepo::set_title(tx, owner, conversation_id, &derive_title(user_text))?;
            }
            Ok((user_message, assistant_message))
        })?;

        Ok(TurnResult {
            user_message,
            assistant_message,
        })
    }

    /// Create a conversation for the owner (chat entry point).
    pub fn start_conversation(&self, owner: UserId) -> Result<Conversation, CoreError> {
        Ok(self
            .service
            .database()
            .with_conn(|conn| ConversationRepo::create(conn, owner, None))?)
    }

    async fn plan_and_dispatch(
        &self,
        owner: UserId,
        transcript: &mut Vec<ChatMessage>,
    ) -> Result<String, CoreError> {
        let tools = ToolRegistry::specs();

        for iteration in 0..self.config.max_iterations {
            let outcome = self
                .llm
                .complete(transcript, &tools)
                .await
                .map_err(CoreError::from)?;

            match outcome {
                ChatOutcome::Message(text) => {
                    info!(iteration, "model produced final reply");
                    return Ok(text);
                }
                ChatOutcome::ToolCalls(calls) => {
                    transcript.push(ChatMessage::assistant_tool_calls(calls.clone()));
                    for call in calls {
                        let result = self.dispatch_one(owner, &call)?;
                        transcript.push(ChatMessage::tool_result(call.id, result));
                    }
                }
            }
        }

        warn!(max = self.config.max_iterations, "turn exceeded iteration bound");
        Err(CoreError::validation(
            "I couldn't finish that request within the allowed number of steps. \
             Please try a simpler request.",
        ))
    }

    fn dispatch_one(&self, owner: UserId, call: &ToolCallRequest) -> Result<String, CoreError> {
        match self.registry.dispatch(owner, &call.name, &call.arguments) {
            Ok(output) => Ok(output.to_string()),
            Err(DispatchError::UnknownTool(name)) => Err(CoreError::validation(format!(
                "the model requested an unavailable operation ({name}); the request was refused"
            ))),
            Err(DispatchError::Internal(e)) => Err(e),
        }
    }
}

fn system_prompt() -> String {
    let today = Utc::now().format("%A, %B %d, %Y");
    format!(
        "You are a helpful task assistant. Today's date is {today}.\n\
         \n\
         When the user asks to create or change tasks, call the matching tool \
         immediately. Pass date expressions exactly as the user said them \
         (\"tomorrow\", \"next Friday\", \"in 3 days\"); the system resolves \
         them. For reminders like \"1 hour before\", pass the phrase through \
         to set_reminder. Refer to tasks by their title. Confirm what you did \
         in a friendly sentence once the tools succeed."
    )
}

fn turn_error_reply(error: &CoreError) -> String {
    match error {
        CoreError::Validation(msg) => format!("I couldn't complete that: {msg}"),
        CoreError::UpstreamTransient(_) | CoreError::DeadlineExceeded(_) => {
            "I'm having trouble reaching my tools right now. Please try again in a moment."
                .to_string()
        }
        _ => "Something went wrong handling that request. Please try again.".to_string(),
    }
}
