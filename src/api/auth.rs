//! Registration, login, and logout handlers.

use super::{ApiJson, AppState, Confirmation, Success, confirmation, ok};
use crate::error::{ApiError, ApiResult, FieldErrors};
use crate::types::User;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use tracing::info;

const EMAIL_MAX: usize = 254;
const PASSWORD_MIN: usize = 6;
const NAME_MIN: usize = 2;

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    pub name: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// Token plus the user it was issued for.
#[derive(Debug, Serialize)]
pub struct AuthData {
    pub user: User,
    pub token: String,
}

/// Shape check, not RFC 5322: one `@`, non-empty local part, dotted
/// domain, no whitespace.
fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !email.contains(char::is_whitespace)
}

fn validate_credentials(email: &str, password: &str, name: Option<&str>) -> ApiResult<()> {
    let mut errors = FieldErrors::new();
    if email.is_empty() || email.len() > EMAIL_MAX || !is_valid_email(email) {
        errors.push("email", "Invalid email address");
    }
    if password.len() < PASSWORD_MIN {
        errors.push("password", "Password must be at least 6 characters");
    }
    if let Some(name) = name
        && name.len() < NAME_MIN
    {
        errors.push("name", "Name must be at least 2 characters");
    }
    errors.into_result()
}

/// POST /auth/register. Duplicate email is a 409; the token covers the
/// new account immediately.
pub async fn register(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<RegisterRequest>,
) -> ApiResult<(StatusCode, Json<Success<AuthData>>)> {
    let email = req.email.trim().to_lowercase();
    let name = req.name.map(|n| n.trim().to_string());
    validate_credentials(&email, &req.password, name.as_deref())?;

    let password_hash = state.auth.hash_password(&req.password)?;
    let user = state.db.create_user(&email, name, &password_hash)?;
    let token = state.auth.issue_token(&user.id, &user.email)?;

    info!(user_id = %user.id, "user registered");
    Ok((StatusCode::CREATED, ok(AuthData { user, token })))
}

/// POST /auth/login. Unknown email and wrong password produce the same
/// 401 so the endpoint cannot be used to probe for accounts.
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> ApiResult<Json<Success<AuthData>>> {
    let email = req.email.trim().to_lowercase();
    validate_credentials(&email, &req.password, None)?;

    let (user, password_hash) = state
        .db
        .find_user_by_email(&email)?
        .ok_or_else(|| ApiError::unauthorized("Invalid email or password"))?;

    if !state.auth.verify_password(&req.password, &password_hash)? {
        return Err(ApiError::unauthorized("Invalid email or password"));
    }

    let token = state.auth.issue_token(&user.id, &user.email)?;
    info!(user_id = %user.id, "user logged in");
    Ok(ok(AuthData { user, token }))
}

/// POST /auth/logout. Tokens are stateless; discarding the client copy is
/// the whole operation.
pub async fn logout() -> Json<Success<Confirmation>> {
    confirmation("Logged out successfully")
}
