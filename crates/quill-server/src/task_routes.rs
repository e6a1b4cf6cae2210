use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer};

use quill_core::ids::TaskId;
use quill_core::task::{Priority, Task};
use quill_core::CoreError;
use quill_tasks::{CreateTask, SortDir, SortKey, TaskFilter, UpdateTask};

use crate::error::{ApiError, ApiResult};
use crate::state::{AppState, CurrentUser};

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route("/tasks/search", get(search_tasks))
        .route(
            "/tasks/{id}",
            get(get_task).patch(update_task).delete(delete_task),
        )
        .route("/tasks/{id}/toggle", post(toggle_complete))
        .route("/tasks/{id}/tags", post(add_tag))
        .route("/tasks/{id}/tags/{name}", axum::routing::delete(remove_tag))
        .route("/tasks/{id}/reminder", put(set_reminder))
}

#[derive(Deserialize)]
struct ListQuery {
    priority: Option<String>,
    tag: Option<String>,
    completed: Option<bool>,
    overdue: Option<bool>,
    sort_by: Option<String>,
    sort_order: Option<String>,
}

impl ListQuery {
    fn into_filter(self) -> Result<TaskFilter, CoreError> {
        let priority = self
            .priority
            .as_deref()
            .map(|raw| {
                raw.parse::<Priority>()
                    .map_err(|_| CoreError::validation(format!("unknown priority: {raw}")))
            })
            .transpose()?;
        let sort = self
            .sort_by
            .as_deref()
            .map(|raw| {
                raw.parse::<SortKey>()
                    .map_err(|_| CoreError::validation(format!("unknown sort key: {raw}")))
            })
            .transpose()?
            .unwrap_or_default();
        let dir = self
            .sort_order
            .as_deref()
            .map(|raw| {
                raw.parse::<SortDir>()
                    .map_err(|_| CoreError::validation(format!("unknown sort order: {raw}")))
            })
            .transpose()?
            .unwrap_or_default();

        Ok(TaskFilter {
            priority,
            tag: self.tag,
            completed: self.completed,
            overdue: self.overdue.unwrap_or(false),
            sort,
            dir,
        })
    }
}

/// `Option<Option<T>>` body fields: absent = leave unchanged,
/// null = clear, value = set.
fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Deserialize::deserialize(deserializer).map(Some)
}

#[derive(Default, Deserialize)]
#[serde(default)]
struct UpdateBody {
    title: Option<String>,
    #[serde(deserialize_with = "double_option")]
    description: Option<Option<String>>,
    priority: Option<Priority>,
    #[serde(deserialize_with = "double_option")]
    due_at: Option<Option<DateTime<Utc>>>,
    #[serde(deserialize_with = "double_option")]
    remind_at: Option<Option<DateTime<Utc>>>,
    recurrence: Option<quill_core::task::Recurrence>,
}

#[derive(Deserialize)]
struct TagBody {
    name: String,
}

#[derive(Deserialize)]
struct ReminderBody {
    remind_at: DateTime<Utc>,
}

#[derive(Deserialize)]
struct SearchQuery {
    q: String,
}

async fn create_task(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
    Json(body): Json<CreateTask>,
) -> ApiResult<(StatusCode, Json<Task>)> {
    let task = state.service.create_task(owner, body)?;
    Ok((StatusCode::CREATED, Json(task)))
}

async fn list_tasks(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
    Query(query): Query<ListQuery>,
) -> ApiResult<Json<Vec<Task>>> {
    let filter = query.into_filter()?;
    Ok(Json(state.service.list_tasks(owner, &filter)?))
}

async fn search_tasks(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
    Query(query): Query<SearchQuery>,
) -> ApiResult<Json<Vec<Task>>> {
    Ok(Json(state.service.search_tasks(owner, &query.q)?))
}

async fn get_task(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.service.get_task(owner, parse_task_id(&id)?)?))
}

async fn update_task(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<UpdateBody>,
) -> ApiResult<Json<Task>> {
    let update = UpdateTask {
        title: body.title,
        description: body.description,
        priority: body.priority,
        due_at: body.due_at,
        remind_at: body.remind_at,
        recurrence: body.recurrence,
    };
    Ok(Json(state.service.update_task(owner, parse_task_id(&id)?, update)?))
}

async fn delete_task(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.service.delete_task(owner, parse_task_id(&id)?)?;
    Ok(StatusCode::NO_CONTENT)
}

async fn toggle_complete(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.service.toggle_complete(owner, parse_task_id(&id)?)?))
}

async fn add_tag(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<TagBody>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.service.add_tag(owner, parse_task_id(&id)?, &body.name)?))
}

async fn remove_tag(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
    Path((id, name)): Path<(String, String)>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.service.remove_tag(owner, parse_task_id(&id)?, &name)?))
}

async fn set_reminder(
    State(state): State<AppState>,
    CurrentUser(owner): CurrentUser,
    Path(id): Path<String>,
    Json(body): Json<ReminderBody>,
) -> ApiResult<Json<Task>> {
    Ok(Json(state.service.set_reminder(owner, parse_task_id(&id)?, body.remind_at)?))
}

/// Unparseable ids collapse to NotFound, like tasks that don't exist:
/// the caller learns nothing about id validity.
fn parse_task_id(raw: &str) -> Result<TaskId, ApiError> {
    raw.parse::<TaskId>().map_err(|_| ApiError(CoreError::NotFound))
}
