//! Current-user query.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::error::{AppError, AppResult};
use crate::models::Principal;
use crate::repositories::UserRepository;

use super::requests::{Reply, Request, RequestKind};
use super::{mismatch, require_principal, RequestHandler};

pub struct CurrentUserHandler {
    users: Arc<dyn UserRepository>,
}

impl CurrentUserHandler {
    pub fn new(users: Arc<dyn UserRepository>) -> Self {
        Self { users }
    }
}

#[async_trait]
impl RequestHandler for CurrentUserHandler {
    async fn handle(
        &self,
        principal: Option<&Principal>,
        request: Request,
        _cancel: &CancellationToken,
    ) -> AppResult<Reply> {
        if !matches!(request, Request::CurrentUser) {
            return Err(mismatch(RequestKind::CurrentUser));
        }
        let principal = require_principal(principal)?;
        let user = self
            .users
            .find_by_id(principal.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {}", principal.username)))?;
        Ok(Reply::User(user.to_user_dto()))
    }
}
