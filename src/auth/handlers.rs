//! Auth HTTP handlers: register, login.

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::auth::AuthAppService;
use crate::error::{AppError, AppResult};
use crate::handlers::http::AppState;
use crate::models::{UserDto, UserRecord};
use crate::repositories::UserRepository;

#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    #[validate(length(min = 3, max = 30))]
    pub username: String,
    #[validate(length(min = 1, max = 255))]
    pub display_name: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: UserDto,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

/// POST /auth/register
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> AppResult<Json<AuthResponse>> {
    body.validate().map_err(AppError::Validation)?;
    AuthAppService::validate_email(&body.email)?;

    if state.users.find_by_email(&body.email).await?.is_some() {
        return Err(AppError::Conflict("Email already registered".to_string()));
    }
    if state
        .users
        .find_by_username(&body.username)
        .await?
        .is_some()
    {
        return Err(AppError::Conflict("Username already taken".to_string()));
    }

    let password_hash = AuthAppService::hash_password(&body.password)?;
    let user = UserRecord {
        id: Uuid::new_v4(),
        username: body.username,
        display_name: body.display_name,
        email: body.email,
        password_hash,
        bio: None,
        photos: vec![],
    };
    state.users.create(user.clone()).await?;
    let token = state.jwt_secret.issue(user.id)?;

    Ok(Json(AuthResponse {
        token,
        user: user.to_user_dto(),
    }))
}

/// POST /auth/login
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginRequest>,
) -> AppResult<Json<AuthResponse>> {
    let user = state
        .users
        .find_by_email(&body.email)
        .await?
        .ok_or_else(|| AppError::Unauthorized("Invalid email or password".to_string()))?;

    if !AuthAppService::verify_password(&body.password, &user.password_hash)? {
        return Err(AppError::Unauthorized(
            "Invalid email or password".to_string(),
        ));
    }

    let token = state.jwt_secret.issue(user.id)?;

    Ok(Json(AuthResponse {
        token,
        user: user.to_user_dto(),
    }))
}
