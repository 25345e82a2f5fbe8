//! HTTP handlers: thin transport mapping routes onto dispatched requests.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde_json::json;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::auth::JwtSecret;
use crate::dispatch::{requests, Dispatcher, Request};
use crate::error::AppResult;
use crate::hub::{CommentFanout, Hub};
use crate::middleware::AuthUser;
use crate::models::{ActivityDto, ActivityEnvelope, PhotoDto, ProfileDto, UserDto};
use crate::repositories::UserRepository;

/// Shared application state: the explicit context object built once at
/// startup and handed to every component that needs it.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub hub: Arc<Hub>,
    pub fanout: Arc<CommentFanout<Hub>>,
    pub users: Arc<dyn UserRepository>,
    pub jwt_secret: JwtSecret,
}

/// GET /api/activities
pub async fn list_activities(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Query(query): Query<requests::ListActivities>,
) -> AppResult<Json<ActivityEnvelope>> {
    let principal = user.map(|u| u.0);
    let reply = state
        .dispatcher
        .dispatch(
            principal.as_ref(),
            Request::ListActivities(query),
            &CancellationToken::new(),
        )
        .await?;
    Ok(Json(reply.into_activities()?))
}

/// GET /api/activities/:id
pub async fn get_activity(
    State(state): State<AppState>,
    user: Option<AuthUser>,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ActivityDto>> {
    let principal = user.map(|u| u.0);
    let reply = state
        .dispatcher
        .dispatch(
            principal.as_ref(),
            Request::ActivityDetails(requests::ActivityDetails { id }),
            &CancellationToken::new(),
        )
        .await?;
    Ok(Json(reply.into_activity()?))
}

/// POST /api/activities
pub async fn create_activity(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(body): Json<requests::CreateActivity>,
) -> AppResult<Json<ActivityDto>> {
    let reply = state
        .dispatcher
        .dispatch(
            Some(&principal),
            Request::CreateActivity(body),
            &CancellationToken::new(),
        )
        .await?;
    Ok(Json(reply.into_activity()?))
}

/// PUT /api/activities/:id
pub async fn edit_activity(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
    Json(mut body): Json<requests::EditActivity>,
) -> AppResult<Json<ActivityDto>> {
    body.id = id;
    let reply = state
        .dispatcher
        .dispatch(
            Some(&principal),
            Request::EditActivity(body),
            &CancellationToken::new(),
        )
        .await?;
    Ok(Json(reply.into_activity()?))
}

/// DELETE /api/activities/:id
pub async fn delete_activity(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<serde_json::Value>> {
    state
        .dispatcher
        .dispatch(
            Some(&principal),
            Request::DeleteActivity(requests::DeleteActivity { id }),
            &CancellationToken::new(),
        )
        .await?;
    Ok(Json(json!({ "ok": true })))
}

/// POST /api/activities/:id/attend
pub async fn attend(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ActivityDto>> {
    let reply = state
        .dispatcher
        .dispatch(
            Some(&principal),
            Request::Attend(requests::Attend { id }),
            &CancellationToken::new(),
        )
        .await?;
    Ok(Json(reply.into_activity()?))
}

/// DELETE /api/activities/:id/attend
pub async fn unattend(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<Uuid>,
) -> AppResult<Json<ActivityDto>> {
    let reply = state
        .dispatcher
        .dispatch(
            Some(&principal),
            Request::Unattend(requests::Unattend { id }),
            &CancellationToken::new(),
        )
        .await?;
    Ok(Json(reply.into_activity()?))
}

/// GET /api/user
pub async fn current_user(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
) -> AppResult<Json<UserDto>> {
    let reply = state
        .dispatcher
        .dispatch(
            Some(&principal),
            Request::CurrentUser,
            &CancellationToken::new(),
        )
        .await?;
    Ok(Json(reply.into_user()?))
}

/// GET /api/profiles/:username
pub async fn get_profile(
    State(state): State<AppState>,
    Path(username): Path<String>,
) -> AppResult<Json<ProfileDto>> {
    let reply = state
        .dispatcher
        .dispatch(
            None,
            Request::ProfileDetails(requests::ProfileDetails { username }),
            &CancellationToken::new(),
        )
        .await?;
    Ok(Json(reply.into_profile()?))
}

/// PUT /api/profiles
pub async fn edit_profile(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Json(body): Json<requests::EditProfile>,
) -> AppResult<Json<ProfileDto>> {
    let reply = state
        .dispatcher
        .dispatch(
            Some(&principal),
            Request::EditProfile(body),
            &CancellationToken::new(),
        )
        .await?;
    Ok(Json(reply.into_profile()?))
}

/// POST /api/photos - raw image bytes in the body.
pub async fn add_photo(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    body: Bytes,
) -> AppResult<Json<PhotoDto>> {
    let reply = state
        .dispatcher
        .dispatch(
            Some(&principal),
            Request::AddPhoto(requests::AddPhoto {
                data: body.to_vec(),
            }),
            &CancellationToken::new(),
        )
        .await?;
    Ok(Json(reply.into_photo()?))
}

/// POST /api/photos/:id/main
pub async fn set_main_photo(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    state
        .dispatcher
        .dispatch(
            Some(&principal),
            Request::SetMainPhoto(requests::SetMainPhoto { id }),
            &CancellationToken::new(),
        )
        .await?;
    Ok(Json(json!({ "ok": true })))
}

/// DELETE /api/photos/:id
pub async fn delete_photo(
    State(state): State<AppState>,
    AuthUser(principal): AuthUser,
    Path(id): Path<String>,
) -> AppResult<Json<serde_json::Value>> {
    state
        .dispatcher
        .dispatch(
            Some(&principal),
            Request::DeletePhoto(requests::DeletePhoto { id }),
            &CancellationToken::new(),
        )
        .await?;
    Ok(Json(json!({ "ok": true })))
}

/// GET /health - liveness probe.
pub async fn health() -> (StatusCode, Json<serde_json::Value>) {
    (
        StatusCode::OK,
        Json(json!({ "status": "ok", "service": "rally" })),
    )
}
