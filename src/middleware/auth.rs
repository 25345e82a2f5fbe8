//! Auth middleware: bearer-token extractor resolving the caller's principal.

use axum::http::header::AUTHORIZATION;

use crate::error::AppError;
use crate::handlers::http::AppState;
use crate::models::Principal;
use crate::repositories::UserRepository;

const BEARER_PREFIX: &str = "Bearer ";

/// Extractor: the authenticated principal from a JWT bearer token.
///
/// Validates the credential once and attaches identity; policy decisions
/// happen later in the authorization guard.
#[derive(Clone, Debug)]
pub struct AuthUser(pub Principal);

#[axum::async_trait]
impl axum::extract::FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| s.strip_prefix(BEARER_PREFIX));
        let token = auth.ok_or_else(|| {
            AppError::Unauthorized("Missing or invalid Authorization header".to_string())
        })?;
        let user_id = state.jwt_secret.validate(token)?;
        let user = state
            .users
            .find_by_id(user_id)
            .await?
            .ok_or_else(|| AppError::Unauthorized("Unknown user".to_string()))?;
        Ok(AuthUser(user.principal()))
    }
}
