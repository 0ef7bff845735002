//! Password hashing, JWT issue/verify, and the bearer-token middleware.

use crate::error::ApiError;
use axum::extract::{FromRequestParts, Request, State};
use axum::http::header;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

/// Claims carried in every issued token.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Claims {
    pub user_id: String,
    pub email: String,
    pub iat: i64,
    pub exp: i64,
}

/// Identity of the authenticated caller, injected by the middleware.
#[derive(Debug, Clone)]
pub struct CurrentUser {
    pub user_id: String,
    pub email: String,
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("Unauthorized"))
    }
}

/// Signing and verification context, derived from config at startup.
#[derive(Clone)]
pub struct AuthContext {
    encoding: EncodingKey,
    decoding: DecodingKey,
    expiry_hours: i64,
    bcrypt_cost: u32,
}

impl AuthContext {
    pub fn new(secret: &str, expiry_hours: i64, bcrypt_cost: u32) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            expiry_hours,
            bcrypt_cost,
        }
    }

    pub fn hash_password(&self, password: &str) -> Result<String, ApiError> {
        bcrypt::hash(password, self.bcrypt_cost).map_err(ApiError::internal)
    }

    pub fn verify_password(&self, password: &str, hash: &str) -> Result<bool, ApiError> {
        bcrypt::verify(password, hash).map_err(ApiError::internal)
    }

    /// Issue an HS256 token for the user.
    pub fn issue_token(&self, user_id: &str, email: &str) -> Result<String, ApiError> {
        let now = chrono::Utc::now();
        let claims = Claims {
            user_id: user_id.to_string(),
            email: email.to_string(),
            iat: now.timestamp(),
            exp: (now + chrono::Duration::hours(self.expiry_hours)).timestamp(),
        };

        encode(&Header::default(), &claims, &self.encoding).map_err(ApiError::internal)
    }

    /// Verify a token and return its claims. Expired and tampered tokens
    /// are both reported as unauthorized without further detail.
    pub fn verify_token(&self, token: &str) -> Result<Claims, ApiError> {
        decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| ApiError::unauthorized("Invalid or expired token"))
    }
}

/// Require a valid bearer token and expose the caller to handlers as
/// [`CurrentUser`]. Applied to every route except the auth endpoints.
pub async fn auth_middleware(
    State(auth): State<AuthContext>,
    mut request: Request,
    next: Next,
) -> Response {
    let bearer = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|v| v.trim().to_string());

    let Some(token) = bearer else {
        return ApiError::unauthorized("Unauthorized").into_response();
    };

    match auth.verify_token(&token) {
        Ok(claims) => {
            request.extensions_mut().insert(CurrentUser {
                user_id: claims.user_id,
                email: claims.email,
            });
            next.run(request).await
        }
        Err(err) => err.into_response(),
    }
}
