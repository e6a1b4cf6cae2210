use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use quill_core::conversation::{Conversation, Message};
use quill_core::ids::ConversationId;
use quill_core::CoreError;
use quill_store::conversations::{ConversationRepo, MessageRepo};

use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, CurrentUser};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/conversations", get(list_conversations).post(create_conversation))
        .route(
            "/conversations/{id}",
            axum::routing::delete(delete_conversation),
        )
        .route(
            "/conversations/{id}/messages",
            get(list_messages).post(send_message),
        )
}

#[derive(Deserialize)]
struct SendBody {
    content: String,
}

#[derive(Serialize)]
struct TurnResponse {
    user_message: Message,
    assistant_message: Message,
}

async fn create_conversation(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
) -> ApiResult<(StatusCode, Json<Conversation>)> {
    let conversation = state.agent.start_conversation(owner)?;
    Ok((StatusCode::CREATED, Json(conversation)))
}

async fn list_conversations(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
) -> ApiResult<Json<Vec<Conversation>>> {
    let conversations = state
        .db
        .with_conn(|conn| ConversationRepo::list(conn, owner))
        .map_err(CoreError::from)?;
    Ok(Json(conversations))
}

async fn delete_conversation(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    let id = parse_conversation_id(&id)?;
    let deleted = state
        .db
        .with_conn(|conn| ConversationRepo::delete(conn, owner, id))
        .map_err(CoreError::from)?;
    if !deleted {
        return Err(ApiError(CoreError::NotFound));
    }
    Ok(StatusCode::NO_CONTENT)
}

async fn list_messages(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Vec<Message>>> {
    let id = parse_conversation_id(&id)?;
    // Ownership check first; message listing is not owner-scoped.
    state
        .db
        .with_conn(|conn| ConversationRepo::get(conn, owner, id))
        .map_err(CoreError::from)?
        .ok_or(ApiError(CoreError::NotFound))?;

    let messages = state
        .db
        .with_conn(|conn| MessageRepo::list(conn, id))
        .map_err(CoreError::from)?;
    Ok(Json(messages))
}

/// One chat turn: the agent plans, dispatches tools, and replies.
async fn send_message(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<SendBody>,
) -> ApiResult<Json<TurnResponse>> {
    let id = parse_conversation_id(&id)?;
    let result = state.agent.handle_turn(owner, id, &body.content).await?;
    Ok(Json(TurnResponse {
        user_message: result.user_message,
        assistant_message: result.assistant_message,
    }))
}

fn parse_conversation_id(raw: &str) -> Result<ConversationId, ApiError> {
    raw.parse::<ConversationId>()
        .map_err(|_| ApiError(CoreError::NotFound))
}
