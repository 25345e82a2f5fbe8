//! Profile handlers: public details, self edit.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, AppResult};
use crate::models::Principal;
use crate::repositories::UserRepository;

use super::requests::{Reply, Request, RequestKind};
use super::{mismatch, require_principal, RequestHandler};

pub struct DetailsHandler {
    users: Arc<dyn UserRepository>,
}

impl DetailsHandler {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl RequestHandler for DetailsHandler {
    async fn handle(
        &self,
        _principal: Option<&Principal>,
        request: Request,
        _cancel: &CancellationToken,
    ) -> AppResult<Reply> {
        let Request::ProfileDetails(query) = request else {
            return Err(mismatch(RequestKind::ProfileDetails));
        };
        let user = self
            .users
            .find_by_username(&query.username)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("profile {}", query.username)))?;
        Ok(Reply::Profile(user.to_profile_dto()))
    }
}

pub struct EditHandler {
    users: Arc<dyn UserRepository>,
}

impl EditHandler {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl RequestHandler for EditHandler {
    async fn handle(
        &self,
        principal: Option<&Principal>,
        request: Request,
        _cancel: &CancellationToken,
    ) -> AppResult<Reply> {
        let Request::EditProfile(cmd) = request else {
            return Err(mismatch(RequestKind::EditProfile));
        };
        let principal = require_principal(principal)?;

        let mut user = self
            .users
            .find_by_username(&principal.username)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {}", principal.username)))?;
        user.display_name = cmd.display_name;
        user.bio = cmd.bio;
        let dto = user.to_profile_dto();
        self.users.update(user).await?;
        Ok(Reply::Profile(dto))
    }
}
