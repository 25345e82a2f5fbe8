//! Activity handlers: list, details, create, edit, delete, attendance.

use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::error::{AppError, AppResult};
use crate::models::{ActivityRecord, AttendeeRecord, Principal};
use crate::repositories::{ActivityFilter, ActivityRepository, UserRepository};

use super::requests::{Reply, Request, RequestKind};
use super::{mismatch, require_principal, RequestHandler};

/// Attendee entry for the given principal, with the image taken from the
/// user's main photo.
async fn attendee_for(
    users: &Arc<dyn UserRepository>,
    principal: &Principal,
    is_host: bool,
) -> AppResult<AttendeeRecord> {
    let image = users
        .find_by_username(&principal.username)
        .await?
        .and_then(|u| u.main_photo().map(|p| p.url.clone()));
    Ok(AttendeeRecord {
        username: principal.username.clone(),
        display_name: principal.display_name.clone(),
        image,
        is_host,
    })
}

pub struct ListHandler {
    activities: Arc<dyn ActivityRepository>,
}

impl ListHandler {
    pub fn new(activities: Arc<dyn ActivityRepository>) -> Self {
        Self { activities }
    }
}

#[async_trait]
impl RequestHandler for ListHandler {
    async fn handle(
        &self,
        principal: Option<&Principal>,
        request: Request,
        _cancel: &CancellationToken,
    ) -> AppResult<Reply> {
        let Request::ListActivities(query) = request else {
            return Err(mismatch(RequestKind::ListActivities));
        };
        let viewer = principal.map(|p| p.username.clone());
        let filter = ActivityFilter {
            offset: query.offset,
            limit: query.limit,
            is_going: query.is_going,
            is_host: query.is_host,
            start_date: query.start_date,
            viewer: viewer.clone(),
        };
        let (records, total) = self.activities.list(&filter).await?;
        Ok(Reply::Activities(crate::models::ActivityEnvelope {
            activities: records
                .iter()
                .map(|r| r.to_dto(viewer.as_deref()))
                .collect(),
            activity_count: total,
        }))
    }
}

pub struct DetailsHandler {
    activities: Arc<dyn ActivityRepository>,
}

impl DetailsHandler {
    pub fn new(activities: Arc<dyn ActivityRepository>) -> Self {
        Self { activities }
    }
}

#[async_trait]
impl RequestHandler for DetailsHandler {
    async fn handle(
        &self,
        principal: Option<&Principal>,
        request: Request,
        _cancel: &CancellationToken,
    ) -> AppResult<Reply> {
        let Request::ActivityDetails(query) = request else {
            return Err(mismatch(RequestKind::ActivityDetails));
        };
        let record = self
            .activities
            .find(query.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("activity {}", query.id)))?;
        Ok(Reply::Activity(
            record.to_dto(principal.map(|p| p.username.as_str())),
        ))
    }
}

pub struct CreateHandler {
    activities: Arc<dyn ActivityRepository>,
    users: Arc<dyn UserRepository>,
}

impl CreateHandler {
    pub fn new(activities: Arc<dyn ActivityRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { activities, users }
    }
}

#[async_trait]
impl RequestHandler for CreateHandler {
    async fn handle(
        &self,
        principal: Option<&Principal>,
        request: Request,
        _cancel: &CancellationToken,
    ) -> AppResult<Reply> {
        let Request::CreateActivity(cmd) = request else {
            return Err(mismatch(RequestKind::CreateActivity));
        };
        let principal = require_principal(principal)?;

        let host = attendee_for(&self.users, principal, true).await?;
        let record = ActivityRecord {
            id: cmd.id,
            title: cmd.title,
            description: cmd.description,
            category: cmd.category,
            date: cmd.date,
            city: cmd.city,
            venue: cmd.venue,
            attendees: vec![host],
            comments: vec![],
        };
        let dto = record.to_dto(Some(&principal.username));
        self.activities.insert(record).await?;
        info!(activity = %dto.id, host = %principal.username, "activity created");
        Ok(Reply::Activity(dto))
    }
}

pub struct EditHandler {
    activities: Arc<dyn ActivityRepository>,
}

impl EditHandler {
    pub fn new(activities: Arc<dyn ActivityRepository>) -> Self {
        Self { activities }
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
        let Request::EditActivity(cmd) = request else {
            return Err(mismatch(RequestKind::EditActivity));
        };
        let principal = require_principal(principal)?;

        let mut record = self
            .activities
            .find(cmd.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("activity {}", cmd.id)))?;
        record.title = cmd.title;
        record.description = cmd.description;
        record.category = cmd.category;
        record.date = cmd.date;
        record.city = cmd.city;
        record.venue = cmd.venue;
        let dto = record.to_dto(Some(&principal.username));
        self.activities.update(record).await?;
        Ok(Reply::Activity(dto))
    }
}

pub struct DeleteHandler {
    activities: Arc<dyn ActivityRepository>,
}

impl DeleteHandler {
    pub fn new(activities: Arc<dyn ActivityRepository>) -> Self {
        Self { activities }
    }
}

#[async_trait]
impl RequestHandler for DeleteHandler {
    async fn handle(
        &self,
        _principal: Option<&Principal>,
        request: Request,
        _cancel: &CancellationToken,
    ) -> AppResult<Reply> {
        let Request::DeleteActivity(cmd) = request else {
            return Err(mismatch(RequestKind::DeleteActivity));
        };
        if !self.activities.delete(cmd.id).await? {
            return Err(AppError::NotFound(format!("activity {}", cmd.id)));
        }
        info!(activity = %cmd.id, "activity deleted");
        Ok(Reply::Unit)
    }
}

pub struct AttendHandler {
    activities: Arc<dyn ActivityRepository>,
    users: Arc<dyn UserRepository>,
}

impl AttendHandler {
    pub fn new(activities: Arc<dyn ActivityRepository>, users: Arc<dyn UserRepository>) -> Self {
        Self { activities, users }
    }
}

#[async_trait]
impl RequestHandler for AttendHandler {
    async fn handle(
        &self,
        principal: Option<&Principal>,
        request: Request,
        _cancel: &CancellationToken,
    ) -> AppResult<Reply> {
        let Request::Attend(cmd) = request else {
            return Err(mismatch(RequestKind::Attend));
        };
        let principal = require_principal(principal)?;

        let mut record = self
            .activities
            .find(cmd.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("activity {}", cmd.id)))?;
        if record.is_attending(&principal.username) {
            return Err(AppError::Conflict("already attending".to_string()));
        }
        record
            .attendees
            .push(attendee_for(&self.users, principal, false).await?);
        let dto = record.to_dto(Some(&principal.username));
        self.activities.update(record).await?;
        Ok(Reply::Activity(dto))
    }
}

pub struct UnattendHandler {
    activities: Arc<dyn ActivityRepository>,
}

impl UnattendHandler {
    pub fn new(activities: Arc<dyn ActivityRepository>) -> Self {
        Self { activities }
    }
}

#[async_trait]
impl RequestHandler for UnattendHandler {
    async fn handle(
        &self,
        principal: Option<&Principal>,
        request: Request,
        _cancel: &CancellationToken,
    ) -> AppResult<Reply> {
        let Request::Unattend(cmd) = request else {
            return Err(mismatch(RequestKind::Unattend));
        };
        let principal = require_principal(principal)?;

        let mut record = self
            .activities
            .find(cmd.id)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("activity {}", cmd.id)))?;
        let Some(pos) = record
            .attendees
            .iter()
            .position(|a| a.username == principal.username)
        else {
            return Err(AppError::NotFound("attendance".to_string()));
        };
        if record.attendees[pos].is_host {
            return Err(AppError::Conflict(
                "the host cannot leave their own activity".to_string(),
            ));
        }
        record.attendees.remove(pos);
        let dto = record.to_dto(Some(&principal.username));
        self.activities.update(record).await?;
        Ok(Reply::Activity(dto))
    }
}
