//! Label handlers. Labels belong to a project and can be attached to any
//! of its tasks; attach/detach itself lives on the task routes.

use super::{ApiJson, AppState, Confirmation, Success, confirmation, ok};
use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::types::Label;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use tracing::info;

const NAME_MAX: usize = 50;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListLabelsQuery {
    pub project_id: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLabelRequest {
    pub name: String,
    pub color: String,
    pub project_id: Option<String>,
}

impl CreateLabelRequest {
    fn validate(&self) -> ApiResult<()> {
        let mut errors = FieldErrors::new();
        check_name(&mut errors, &self.name);
        check_color(&mut errors, &self.color);
        if self.project_id.as_deref().unwrap_or("").is_empty() {
            errors.push("projectId", "projectId is required");
        }
        errors.into_result()
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateLabelRequest {
    pub name: Option<String>,
    pub color: Option<String>,
}

impl UpdateLabelRequest {
    fn validate(&self) -> ApiResult<()> {
        let mut errors = FieldErrors::new();
        if let Some(name) = &self.name {
            check_name(&mut errors, name);
        }
        if let Some(color) = &self.color {
            check_color(&mut errors, color);
        }
        errors.into_result()
    }
}

fn check_name(errors: &mut FieldErrors, name: &str) {
    if name.is_empty() {
        errors.push("name", "Name is required");
    } else if name.len() > NAME_MAX {
        errors.push("name", "Name must be at most 50 characters");
    }
}

/// `#RRGGBB`, case-insensitive hex digits.
fn check_color(errors: &mut FieldErrors, color: &str) {
    let valid = color.len() == 7
        && color.starts_with('#')
        && color[1..].chars().all(|c| c.is_ascii_hexdigit());
    if !valid {
        errors.push("color", "Color must be a hex value like #FF5733");
    }
}

/// GET /labels?projectId=. Oldest first.
pub async fn list_labels(
    State(state): State<AppState>,
    user: CurrentUser,
    Query(query): Query<ListLabelsQuery>,
) -> ApiResult<Json<Success<Vec<Label>>>> {
    let project_id = query
        .project_id
        .filter(|id| !id.is_empty())
        .ok_or_else(|| ApiError::validation("projectId is required"))?;

    let labels = state.db.list_labels(&user.user_id, &project_id)?;
    Ok(ok(labels))
}

/// POST /labels.
pub async fn create_label(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<CreateLabelRequest>,
) -> ApiResult<(StatusCode, Json<Success<Label>>)> {
    req.validate()?;
    let project_id = req.project_id.unwrap_or_default();

    let label = state
        .db
        .create_label(&user.user_id, &project_id, &req.name, &req.color)?;

    info!(user_id = %user.user_id, label_id = %label.id, "label created");
    Ok((StatusCode::CREATED, ok(label)))
}

/// GET /labels/{id}.
pub async fn get_label(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Success<Label>>> {
    let label = state
        .db
        .get_label(&user.user_id, &id)?
        .ok_or_else(|| ApiError::not_found("Label"))?;
    Ok(ok(label))
}

/// PATCH /labels/{id}.
pub async fn update_label(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateLabelRequest>,
) -> ApiResult<Json<Success<Label>>> {
    req.validate()?;

    let label = state
        .db
        .update_label(&user.user_id, &id, req.name, req.color)?;
    Ok(ok(label))
}

/// DELETE /labels/{id}. Links to tasks are removed with it.
pub async fn delete_label(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Success<Confirmation>>> {
    state.db.delete_label(&user.user_id, &id)?;
    info!(user_id = %user.user_id, label_id = %id, "label deleted");
    Ok(confirmation("Label deleted successfully"))
}
