//! Subtask handlers. Subtasks live under a task and carry their own
//! contiguous ordering.

use super::{ApiJson, AppState, Confirmation, Success, check_order, confirmation, ok};
use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::types::Subtask;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use tracing::info;

const TITLE_MAX: usize = 200;

#[derive(Debug, Deserialize)]
pub struct CreateSubtaskRequest {
    pub title: String,
    pub completed: Option<bool>,
    pub order: Option<i64>,
}

impl CreateSubtaskRequest {
    fn validate(&self) -> ApiResult<()> {
        let mut errors = FieldErrors::new();
        check_title(&mut errors, &self.title);
        check_order(&mut errors, self.order);
        errors.into_result()
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateSubtaskRequest {
    pub title: Option<String>,
    pub completed: Option<bool>,
    pub order: Option<i64>,
}

impl UpdateSubtaskRequest {
    fn validate(&self) -> ApiResult<()> {
        let mut errors = FieldErrors::new();
        if let Some(title) = &self.title {
            check_title(&mut errors, title);
        }
        check_order(&mut errors, self.order);
        errors.into_result()
    }
}

fn check_title(errors: &mut FieldErrors, title: &str) {
    if title.is_empty() {
        errors.push("title", "Title is required");
    } else if title.len() > TITLE_MAX {
        errors.push("title", "Title must be at most 200 characters");
    }
}

/// GET /tasks/{id}/subtasks.
pub async fn list_subtasks(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<String>,
) -> ApiResult<Json<Success<Vec<Subtask>>>> {
    let subtasks = state.db.list_subtasks(&user.user_id, &task_id)?;
    Ok(ok(subtasks))
}

/// POST /tasks/{id}/subtasks.
pub async fn create_subtask(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(task_id): Path<String>,
    ApiJson(req): ApiJson<CreateSubtaskRequest>,
) -> ApiResult<(StatusCode, Json<Success<Subtask>>)> {
    req.validate()?;

    let subtask = state.db.create_subtask(
        &user.user_id,
        &task_id,
        &req.title,
        req.completed,
        req.order,
    )?;

    info!(user_id = %user.user_id, subtask_id = %subtask.id, "subtask created");
    Ok((StatusCode::CREATED, ok(subtask)))
}

/// GET /subtasks/{id}.
pub async fn get_subtask(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Success<Subtask>>> {
    let subtask = state
        .db
        .get_subtask(&user.user_id, &id)?
        .ok_or_else(|| ApiError::not_found("Subtask"))?;
    Ok(ok(subtask))
}

/// PATCH /subtasks/{id}. Title, completion flag, and/or order.
pub async fn update_subtask(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateSubtaskRequest>,
) -> ApiResult<Json<Success<Subtask>>> {
    req.validate()?;

    let subtask =
        state
            .db
            .update_subtask(&user.user_id, &id, req.title, req.completed, req.order)?;
    Ok(ok(subtask))
}

/// DELETE /subtasks/{id}.
pub async fn delete_subtask(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Success<Confirmation>>> {
    state.db.delete_subtask(&user.user_id, &id)?;
    info!(user_id = %user.user_id, subtask_id = %id, "subtask deleted");
    Ok(confirmation("Subtask deleted successfully"))
}
