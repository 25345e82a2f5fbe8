//! Comment creation: the command behind the live feed.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{CommentRecord, Principal};
use crate::repositories::{ActivityRepository, UserRepository};

use super::requests::{Reply, Request, RequestKind};
use super::{mismatch, require_principal, RequestHandler};

pub struct CreateCommentHandler {
    activities: Arc<dyn ActivityRepository>,
    users: Arc<dyn UserRepository>,
}

impl CreateCommentHandler {
    pub fn new(activities: Arc<dyn ActivityRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { activities, users }
    }
}

#[async_trait]
impl RequestHandler for CreateCommentHandler {
    async fn handle(
        &self,
        principal: Option<&Principal>,
        request: Request,
        _cancel: &CancellationToken,
    ) -> AppResult<Reply> {
        let Request::CreateComment(cmd) = request else {
            return Err(mismatch(RequestKind::CreateComment));
        };
        let principal = require_principal(principal)?;

        let mut record = self
            .activities
            .find(cmd.activity_id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("activity {}", cmd.activity_id)))?;

        // Resolve author display data here so the returned DTO needs no
        // second read on the fanout path.
        let author = self
            .users
            .find_by_username(&principal.username)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("user {}", principal.username)))?;

        let comment = CommentRecord {
            id: Uuid::new_v4(),
            author: author.username.clone(),
            display_name: author.display_name.clone(),
            image: author.main_photo().map(|p| p.url.clone()),
            body: cmd.body,
            created_at: Utc::now(),
        };
        let dto = comment.to_dto();
        record.comments.push(comment);
        self.activities.update(record).await?;
        Ok(Reply::Comment(dto))
    }
}
