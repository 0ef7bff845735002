//! Project handlers. Creating a project also seeds its four default
//! stages; deleting one cascades through stages, tasks, subtasks, and
//! labels.

use super::{ApiJson, AppState, Confirmation, Success, confirmation, ok};
use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::types::{ProjectDetail, ProjectSummary};
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use tracing::info;

const NAME_MAX: usize = 100;
const DESCRIPTION_MAX: usize = 500;

#[derive(Debug, Deserialize)]
pub struct CreateProjectRequest {
    pub name: String,
    pub description: Option<String>,
}

impl CreateProjectRequest {
    fn validate(&self) -> ApiResult<()> {
        let mut errors = FieldErrors::new();
        check_name(&mut errors, &self.name);
        check_description(&mut errors, self.description.as_deref());
        errors.into_result()
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateProjectRequest {
    pub name: Option<String>,
    pub description: Option<String>,
}

impl UpdateProjectRequest {
    fn validate(&self) -> ApiResult<()> {
        let mut errors = FieldErrors::new();
        if let Some(name) = &self.name {
            check_name(&mut errors, name);
        }
        check_description(&mut errors, self.description.as_deref());
        errors.into_result()
    }
}

fn check_name(errors: &mut FieldErrors, name: &str) {
    if name.is_empty() {
        errors.push("name", "Name is required");
    } else if name.len() > NAME_MAX {
        errors.push("name", "Name must be at most 100 characters");
    }
}

fn check_description(errors: &mut FieldErrors, description: Option<&str>) {
    if let Some(description) = description
        && description.len() > DESCRIPTION_MAX
    {
        errors.push("description", "Description must be at most 500 characters");
    }
}

/// GET /projects. Most recently updated first.
pub async fn list_projects(
    State(state): State<AppState>,
    user: CurrentUser,
) -> ApiResult<Json<Success<Vec<ProjectSummary>>>> {
    let projects = state.db.list_projects(&user.user_id)?;
    Ok(ok(projects))
}

/// POST /projects.
pub async fn create_project(
    State(state): State<AppState>,
    user: CurrentUser,
    ApiJson(req): ApiJson<CreateProjectRequest>,
) -> ApiResult<(StatusCode, Json<Success<ProjectSummary>>)> {
    req.validate()?;

    let project = state
        .db
        .create_project(&user.user_id, &req.name, req.description)?;

    info!(user_id = %user.user_id, project_id = %project.project.id, "project created");
    Ok((StatusCode::CREATED, ok(project)))
}

/// GET /projects/{id}. Fully nested: stages with their tasks, subtasks,
/// and labels.
pub async fn get_project(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Success<ProjectDetail>>> {
    let project = state
        .db
        .get_project(&user.user_id, &id)?
        .ok_or_else(|| ApiError::not_found("Project"))?;
    Ok(ok(project))
}

/// PATCH /projects/{id}. Omitted fields are left untouched.
pub async fn update_project(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateProjectRequest>,
) -> ApiResult<Json<Success<ProjectSummary>>> {
    req.validate()?;

    let project = state
        .db
        .update_project(&user.user_id, &id, req.name, req.description)?;
    Ok(ok(project))
}

/// DELETE /projects/{id}.
pub async fn delete_project(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Success<Confirmation>>> {
    state.db.delete_project(&user.user_id, &id)?;
    info!(user_id = %user.user_id, project_id = %id, "project deleted");
    Ok(confirmation("Project deleted successfully"))
}
