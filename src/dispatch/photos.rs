//! Photo handlers: upload through the gateway, set main, delete.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::{PhotoRecord, Principal};
use crate::repositories::{PhotoGateway, UserRepository};

use super::requests::{Reply, Request, RequestKind};
use super::{mismatch, require_principal, RequestHandler};

pub struct AddHandler {
    users: Arc<dyn UserRepository>,
    gateway: Arc<dyn PhotoGateway>,
}

impl AddHandler {
    pub fn new(users: Arc<dyn UserRepository>, gateway: Arc<dyn PhotoGateway>) -> Self {
        Self { users, gateway }
    }
}

#[async_trait]
impl RequestHandler for AddHandler {
    async fn handle(
        &self,
        principal: Option<&Principal>,
        request: Request,
        _cancel: &CancellationToken,
    ) -> AppResult<Reply> {
        let Request::AddPhoto(cmd) = request else {
            return Err(mismatch(RequestKind::AddPhoto));
        };
        let principal = require_principal(principal)?;

        let mut user = self
            .users
            .find_by_username(&principal.username)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {}", principal.username)))?;

        let stored = self.gateway.upload(cmd.data).await?;
        let photo = PhotoRecord {
            id: stored.id,
            url: stored.url,
            // The first photo becomes the profile image.
            is_main: user.photos.is_empty(),
        };
        let dto = photo.to_dto();
        user.photos.push(photo);
        self.users.update(user).await?;
        info!(user = %principal.username, photo = %dto.id, "photo added");
        Ok(Reply::Photo(dto))
    }
}

pub struct SetMainHandler {
    users: Arc<dyn UserRepository>,
}

impl SetMainHandler {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl RequestHandler for SetMainHandler {
    async fn handle(
        &self,
        principal: Option<&Principal>,
        request: Request,
        _cancel: &CancellationToken,
    ) -> AppResult<Reply> {
        let Request::SetMainPhoto(cmd) = request else {
            return Err(mismatch(RequestKind::SetMainPhoto));
        };
        let principal = require_principal(principal)?;

        let mut user = self
            .users
            .find_by_username(&principal.username)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {}", principal.username)))?;
        if !user.photos.iter().any(|p| p.id == cmd.id) {
            return Err(AppError::NotFound(format!("photo {}", cmd.id)));
        }
        for photo in &mut user.photos {
            photo.is_main = photo.id == cmd.id;
        }
        self.users.update(user).await?;
        Ok(Reply::Unit)
    }
}

pub struct DeleteHandler {
    users: Arc<dyn UserRepository>,
    gateway: Arc<dyn PhotoGateway>,
}

impl DeleteHandler {
    pub fn new(users: Arc<dyn UserRepository>, gateway: Arc<dyn PhotoGateway>) -> Self {
        Self { users, gateway }
    }
}

#[async_trait]
impl RequestHandler for DeleteHandler {
    async fn handle(
        &self,
        principal: Option<&Principal>,
        request: Request,
        _cancel: &CancellationToken,
    ) -> AppResult<Reply> {
        let Request::DeletePhoto(cmd) = request else {
            return Err(mismatch(RequestKind::DeletePhoto));
        };
        let principal = require_principal(principal)?;

        let mut user = self
            .users
            .find_by_username(&principal.username)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {}", principal.username)))?;
        let Some(pos) = user.photos.iter().position(|p| p.id == cmd.id) else {
            return Err(AppError::NotFound(format!("photo {}", cmd.id)));
        };
        if user.photos[pos].is_main {
            return Err(AppError::Conflict(
                "cannot delete the main photo".to_string(),
            ));
        }
        self.gateway.remove(&cmd.id).await?;
        user.photos.remove(pos);
        self.users.update(user).await?;
        Ok(Reply::Unit)
    }
}
