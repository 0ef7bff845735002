//! HTTP API: routing, shared state, and the response envelope.
//!
//! Register/login/logout are public; every other route sits behind the
//! bearer-token middleware. All responses use the same envelope: success
//! responses wrap their payload in `{"success": true, "data": ...}` and
//! failures render through [`crate::error::ApiError`].

pub mod auth;
pub mod labels;
pub mod projects;
pub mod stages;
pub mod subtasks;
pub mod tasks;

use crate::auth::{AuthContext, auth_middleware};
use crate::db::Database;
use crate::error::{ApiError, FieldErrors};
use axum::extract::{FromRequest, Request};
use axum::routing::{get, post};
use axum::{Json, Router, middleware};
use serde::Serialize;
use serde::de::DeserializeOwned;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Shared application state, cloned per request.
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub auth: AuthContext,
}

/// Success envelope.
#[derive(Debug, Serialize)]
pub struct Success<T> {
    pub success: bool,
    pub data: T,
}

/// Wrap a payload in the success envelope.
pub(crate) fn ok<T: Serialize>(data: T) -> Json<Success<T>> {
    Json(Success {
        success: true,
        data,
    })
}

/// Payload for responses that carry only a confirmation message
/// (deletes, logout, label attach/detach).
#[derive(Debug, Serialize)]
pub struct Confirmation {
    pub message: &'static str,
}

pub(crate) fn confirmation(text: &'static str) -> Json<Success<Confirmation>> {
    ok(Confirmation { message: text })
}

/// Shared check for optional `order` fields. `None` means append and is
/// always fine; explicit positions must not be negative.
pub(crate) fn check_order(errors: &mut FieldErrors, order: Option<i64>) {
    if let Some(order) = order
        && order < 0
    {
        errors.push("order", "Order must be a non-negative integer");
    }
}

/// `Json` extractor whose rejection renders as the 400 failure envelope
/// instead of axum's plain-text default.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match Json::<T>::from_request(req, state).await {
            Ok(Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiError::validation(format!(
                "Invalid request body: {}",
                rejection.body_text()
            ))),
        }
    }
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/auth/register", post(auth::register))
        .route("/auth/login", post(auth::login))
        .route("/auth/logout", post(auth::logout));

    let protected = Router::new()
        .route(
            "/projects",
            get(projects::list_projects).post(projects::create_project),
        )
        .route(
            "/projects/{id}",
            get(projects::get_project)
                .patch(projects::update_project)
                .delete(projects::delete_project),
        )
        .route(
            "/projects/{id}/stages",
            get(stages::list_stages).post(stages::create_stage),
        )
        .route(
            "/stages/{id}",
            get(stages::get_stage)
                .patch(stages::update_stage)
                .delete(stages::delete_stage),
        )
        .route("/tasks", get(tasks::list_tasks).post(tasks::create_task))
        .route(
            "/tasks/{id}",
            get(tasks::get_task)
                .patch(tasks::update_task)
                .delete(tasks::delete_task),
        )
        .route("/tasks/{id}/move", post(tasks::move_task))
        .route(
            "/tasks/{id}/labels",
            post(tasks::attach_label).delete(tasks::detach_label),
        )
        .route(
            "/tasks/{id}/subtasks",
            get(subtasks::list_subtasks).post(subtasks::create_subtask),
        )
        .route(
            "/subtasks/{id}",
            get(subtasks::get_subtask)
                .patch(subtasks::update_subtask)
                .delete(subtasks::delete_subtask),
        )
        .route(
            "/labels",
            get(labels::list_labels).post(labels::create_label),
        )
        .route(
            "/labels/{id}",
            get(labels::get_label)
                .patch(labels::update_label)
                .delete(labels::delete_label),
        )
        .route_layer(middleware::from_fn_with_state(
            state.auth.clone(),
            auth_middleware,
        ));

    Router::new()
        .merge(public)
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
