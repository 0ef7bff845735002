//! Stage handlers. New stages are appended to the end of the board unless
//! an explicit order is given; reorders keep every stage's order
//! contiguous.

use super::{ApiJson, AppState, Confirmation, Success, check_order, confirmation, ok};
use crate::auth::CurrentUser;
use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::types::StageDetail;
use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use serde::Deserialize;
use tracing::info;

const NAME_MAX: usize = 50;

#[derive(Debug, Deserialize)]
pub struct CreateStageRequest {
    pub name: String,
    pub order: Option<i64>,
}

impl CreateStageRequest {
    fn validate(&self) -> ApiResult<()> {
        let mut errors = FieldErrors::new();
        check_name(&mut errors, &self.name);
        check_order(&mut errors, self.order);
        errors.into_result()
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateStageRequest {
    pub name: Option<String>,
    pub order: Option<i64>,
}

impl UpdateStageRequest {
    fn validate(&self) -> ApiResult<()> {
        let mut errors = FieldErrors::new();
        if let Some(name) = &self.name {
            check_name(&mut errors, name);
        }
        check_order(&mut errors, self.order);
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

/// GET /projects/{id}/stages. Ordered by position, tasks expanded.
pub async fn list_stages(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(project_id): Path<String>,
) -> ApiResult<Json<Success<Vec<StageDetail>>>> {
    let stages = state.db.list_stages(&user.user_id, &project_id)?;
    Ok(ok(stages))
}

/// POST /projects/{id}/stages.
pub async fn create_stage(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(project_id): Path<String>,
    ApiJson(req): ApiJson<CreateStageRequest>,
) -> ApiResult<(StatusCode, Json<Success<StageDetail>>)> {
    req.validate()?;

    let stage = state
        .db
        .create_stage(&user.user_id, &project_id, &req.name, req.order)?;

    info!(user_id = %user.user_id, stage_id = %stage.stage.id, "stage created");
    Ok((StatusCode::CREATED, ok(stage)))
}

/// GET /stages/{id}.
pub async fn get_stage(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Success<StageDetail>>> {
    let stage = state
        .db
        .get_stage(&user.user_id, &id)?
        .ok_or_else(|| ApiError::not_found("Stage"))?;
    Ok(ok(stage))
}

/// PATCH /stages/{id}. Accepts a new name and/or a new order; an order
/// change reindexes the project's whole stage list.
pub async fn update_stage(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
    ApiJson(req): ApiJson<UpdateStageRequest>,
) -> ApiResult<Json<Success<StageDetail>>> {
    req.validate()?;

    let stage = state
        .db
        .update_stage(&user.user_id, &id, req.name, req.order)?;
    Ok(ok(stage))
}

/// DELETE /stages/{id}. Refused while the stage still holds tasks.
pub async fn delete_stage(
    State(state): State<AppState>,
    user: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Json<Success<Confirmation>>> {
    state.db.delete_stage(&user.user_id, &id)?;
    info!(user_id = %user.user_id, stage_id = %id, "stage deleted");
    Ok(confirmation("Stage deleted successfully"))
}
