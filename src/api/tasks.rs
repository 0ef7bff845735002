//! Task handlers, including the move endpoint and label attach/detach.
//!
//! Field edits go through PATCH; changing a task's stage or position goes
//! through POST /tasks/{id}/move only, so every reorder runs the
//! reindexing transaction.

use super::{ApiJson, AppState, Confirmation, Success, check_order, confirmation, ok};
use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::types::TaskDetail;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use tracing::info;

const TITLE_MAX: usize = 200;
const DESCRIPTION_MAX: usize = 1000;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListTasksQuery {
    pub project_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub stage_id: Option<String>,
    pub order: Option<i64>,
}

impl CreateTaskRequest {
    fn validate(&self) -> ApiResult<()> {
        let mut errors = FieldErrors::new();
        check_title(&mut errors, &self.title);
        check_description(&mut errors, self.description.as_deref());
        if self.stage_id.as_deref().unwrap_or("").is_empty() {
            errors.push("stageId", "stageId is required");
        }
        check_order(&mut errors, self.order);
        errors.into_result()
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl UpdateTaskRequest {
    fn validate(&self) -> ApiResult<()> {
        let mut errors = FieldErrors::new();
        if let Some(title) = &self.title {
            check_title(&mut errors, title);
        }
        check_description(&mut errors, self.description.as_deref());
        errors.into_result()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveTaskRequest {
    pub stage_id: Option<String>,
    pub order: Option<i64>,
}

impl MoveTaskRequest {
    fn validate(&self) -> ApiResult<()> {
        let mut errors = FieldErrors::new();
        if self.stage_id.as_deref().unwrap_or("").is_empty() {
            errors.push("stageId", "stageId is required");
        }
        check_order(&mut errors, self.order);
        errors.into_result()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachLabelRequest {
    pub label_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetachLabelQuery {
    pub label_id: Option<String>,
}

fn check_title(errors: &mut FieldErrors, title: &str) {
    if title.is_empty() {
        errors.push("title", "Title is required");
    } else if title.len() > TITLE_MAX {
        errors.push("title", "Title must be at most 200 characters");
    }
}

fn check_description(errors: &mut FieldErrors, description: Option<&str>) {
    if let Some(description) = description
        && description.len() > DESCRIPTION_MAX
    {
        errors.push("description", "Description must be at most 1000 characters");
    }
}

/// GET /tasks?projectId=. Every task in the project, ordered by stage
/// position then task position; the client groups them into columns.
pub async fn list_tasks(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListTasksQuery>,
) -> ApiResult<Json<Success<Vec<TaskDetail>>>> {
    let project_id = query
        .project_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::validation("projectId is required"))?;

    let tasks = state.db.list_tasks_by_project(&user.user_id, &project_id)?;
    Ok(ok(tasks))
}

/// POST /tasks. Appends to the target stage unless an order is given.
pub async fn create_task(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<Success<TaskDetail>>)> {
    req.validate()?;
    let stage_id = req.stage_id.unwrap_or_default();

    let task = state.db.create_task(
        &user.user_id,
        &stage_id,
        &req.title,
        req.description,
        req.order,
    )?;

    info!(user_id = %user.user_id, task_id = %task.task.id, "task created");
    Ok((StatusCode::CREATED, ok(task)))
}

/// GET /tasks/{id}.
pub async fn get_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Success<TaskDetail>>> {
    let task = state
        .db
        .get_task(&user.user_id, &id)?
        .ok_or_else(|| ApiError::not_found("Task"))?;
    Ok(ok(task))
}

/// PATCH /tasks/{id}. Title and description only.
pub async fn update_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateTaskRequest>,
) -> ApiResult<Json<Success<TaskDetail>>> {
    req.validate()?;

    let task = state
        .db
        .update_task(&user.user_id, &id, req.title, req.description)?;
    Ok(ok(task))
}

/// POST /tasks/{id}/move. The destination stage must belong to the task's
/// project; omitted order appends.
pub async fn move_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<MoveTaskRequest>,
) -> ApiResult<Json<Success<TaskDetail>>> {
    req.validate()?;
    let stage_id = req.stage_id.unwrap_or_default();

    let task = state
        .db
        .move_task(&user.user_id, &id, &stage_id, req.order)?;

    info!(
        user_id = %user.user_id,
        task_id = %id,
        stage_id = %stage_id,
        "task moved"
    );
    Ok(ok(task))
}

/// DELETE /tasks/{id}. Subtasks and label links go with it.
pub async fn delete_task(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Success<Confirmation>>> {
    state.db.delete_task(&user.user_id, &id)?;
    info!(user_id = %user.user_id, task_id = %id, "task deleted");
    Ok(confirmation("Task deleted successfully"))
}

/// POST /tasks/{id}/labels. Attaching a label that is already attached is
/// a no-op success.
pub async fn attach_label(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<AttachLabelRequest>,
) -> ApiResult<Json<Success<Confirmation>>> {
    let label_id = req
        .label_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::validation("labelId is required"))?;

    state.db.add_task_label(&user.user_id, &id, &label_id)?;
    Ok(confirmation("Label added to task successfully"))
}

/// DELETE /tasks/{id}/labels?labelId=. Detaching a label that is not
/// attached is a 404.
pub async fn detach_label(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    Query(query): Query<DetachLabelQuery>,
) -> ApiResult<Json<Success<Confirmation>>> {
    let label_id = query
        .label_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::validation("labelId is required"))?;

    state.db.remove_task_label(&user.user_id, &id, &label_id)?;
    Ok(confirmation("Label removed from task successfully"))
}
