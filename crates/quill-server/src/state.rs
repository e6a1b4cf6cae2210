use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use quill_agent::Agent;
use quill_auth::{PasswordKdf, Principal, TokenSigner};
use quill_core::ids::UserId;
use quill_core::CoreError;
use quill_auth::ACTING_USER_HEADER;
use quill_store::Database;
use quill_tasks::TaskService;

use crate::error::ApiError;

/// Shared application state passed to Axum handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub service: Arc<TaskService>,
    pub signer: Arc<TokenSigner>,
    pub kdf: Arc<PasswordKdf>,
    pub agent: Arc<Agent>,
}

/// The authenticated principal of a request, resolved to the user the
/// operation acts for.
///
/// User tokens act for themselves. Service tokens (trusted workers) act
/// for the user named in the `x-acting-user-id` header.
pub struct CurrentUser(pub UserId);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .ok_or(ApiError(CoreError::Unauthorized))?;

        match state.signer.verify(token).map_err(CoreError::from)? {
            Principal::User(user_id) => Ok(Self(user_id)),
            Principal::Service => {
                let acting = parts
                    .headers
                    .get(ACTING_USER_HEADER)
                    .and_then(|value| value.to_str().ok())
                    .and_then(|value| value.parse::<UserId>().ok())
                    .ok_or(ApiError(CoreError::Unauthorized))?;
                Ok(Self(acting))
            }
        }
    }
}
