//! Authentication surface: register, login, introspect, logout.
//!
//! Login failures are uniform ("invalid credentials") whether the email
//! is unknown or the password wrong, so the endpoint cannot be used to
//! enumerate accounts.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use tracing::info;

use quill_core::user::User;
use quill_core::CoreError;
use quill_store::users::UserRepo;

use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, CurrentUser};

const PASSWORD_MIN_LEN: usize = 8;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/auth/register", post(register))
        .route("/auth/login", post(login))
        .route("/auth/me", get(me))
        .route("/auth/logout", post(logout))
}

#[derive(Deserialize)]
struct RegisterBody {
    email: String,
    password: String,
    display_name: String,
}

#[derive(Deserialize)]
struct LoginBody {
    email: String,
    password: String,
}

#[derive(Serialize)]
struct SessionResponse {
    token: String,
    user: User,
}

async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterBody>,
) -> ApiResult<(StatusCode, Json<SessionResponse>)> {
    let email = body.email.trim();
    if !email.contains('@') || email.len() < 3 {
        return Err(ApiError(CoreError::validation("invalid email address")));
    }
    if body.password.chars().count() < PASSWORD_MIN_LEN {
        return Err(ApiError(CoreError::validation(format!(
            "password must be at least {PASSWORD_MIN_LEN} characters"
        ))));
    }
    let display_name = body.display_name.trim();
    if display_name.is_empty() {
        return Err(ApiError(CoreError::validation("display name must not be empty")));
    }

    // The KDF is deliberately slow; keep it off the async runtime.
    let kdf = state.kdf.clone();
    let password = body.password.clone();
    let hash = tokio::task::spawn_blocking(move || kdf.hash(&password))
        .await
        .map_err(|e| CoreError::UpstreamTransient(e.to_string()))?
        .map_err(CoreError::from)?;

    let email = email.to_string();
    let display_name = display_name.to_string();
    let user = state
        .db
        .with_conn(|conn| UserRepo::create(conn, &email, &hash, &display_name))
        .map_err(CoreError::from)?;

    let token = state.signer.mint_user(user.id).map_err(CoreError::from)?;
    info!(user_id = %user.id, "user registered");
    Ok((StatusCode::CREATED, Json(SessionResponse { token, user })))
}

async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginBody>,
) -> ApiResult<Json<SessionResponse>> {
    let credentials = state
        .db
        .with_conn(|conn| UserRepo::get_by_email(conn, &body.email))
        .map_err(CoreError::from)?
        .ok_or(ApiError(CoreError::Unauthorized))?;

    let kdf = state.kdf.clone();
    let password = body.password.clone();
    let stored = credentials.password_hash.clone();
    let verified = tokio::task::spawn_blocking(move || kdf.verify(&password, &stored))
        .await
        .map_err(|e| CoreError::UpstreamTransient(e.to_string()))?
        .map_err(CoreError::from)?;

    if !verified {
        return Err(ApiError(CoreError::Unauthorized));
    }

    let token = state
        .signer
        .mint_user(credentials.user.id)
        .map_err(CoreError::from)?;
    info!(user_id = %credentials.user.id, "user logged in");
    Ok(Json(SessionResponse {
        token,
        user: credentials.user,
    }))
}

async fn me(State(state): State<AppState>, CurrentUser(user_id): CurrentUser) -> ApiResult<Json<User>> {
    let user = state
        .db
        .with_conn(|conn| UserRepo::get(conn, user_id))
        .map_err(CoreError::from)?
        .ok_or(ApiError(CoreError::Unauthorized))?;
    Ok(Json(user))
}

/// Credentials are stateless bearer tokens; logout is a client-side
/// discard. The endpoint exists so clients have a uniform surface.
async fn logout(CurrentUser(_user_id): CurrentUser) -> StatusCode {
    StatusCode::NO_CONTENT
}
