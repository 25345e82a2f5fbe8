//! Typed requests and replies for the dispatcher.
//!
//! Every request is a Command (intends to mutate) or a Query (read-only),
//! carried as one variant of the [`Request`] tagged union. Routing happens
//! by [`RequestKind`], never by runtime type discovery.

use chrono::{DateTime, Utc};
use serde::Deserialize;
use uuid::Uuid;
use validator::{Validate, ValidationErrors};

use crate::error::{AppError, AppResult};
use crate::guard::Policy;
use crate::models::{ActivityDto, ActivityEnvelope, CommentDto, PhotoDto, ProfileDto, UserDto};

/// Tag identifying a request kind; registry key for handler lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RequestKind {
    ListActivities,
    ActivityDetails,
    CreateActivity,
    EditActivity,
    DeleteActivity,
    Attend,
    Unattend,
    CreateComment,
    CurrentUser,
    ProfileDetails,
    EditProfile,
    AddPhoto,
    SetMainPhoto,
    DeletePhoto,
}

impl RequestKind {
    pub fn is_command(&self) -> bool {
        !matches!(
            self,
            RequestKind::ListActivities
                | RequestKind::ActivityDetails
                | RequestKind::CurrentUser
                | RequestKind::ProfileDetails
        )
    }
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(rename_all = "camelCase", default)]
pub struct ListActivities {
    pub offset: Option<usize>,
    pub limit: Option<usize>,
    pub is_going: bool,
    pub is_host: bool,
    pub start_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ActivityDetails {
    pub id: Uuid,
}

/// The activity id is supplied by the client so a duplicate submission of
/// the same create lands as a conflict instead of a second activity.
#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateActivity {
    pub id: Uuid,
    #[validate(length(min = 1, max = 100, message = "title must be 1-100 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 2000, message = "description must be 1-2000 characters"))]
    pub description: String,
    #[validate(length(min = 1, max = 50, message = "category is required"))]
    pub category: String,
    pub date: DateTime<Utc>,
    #[validate(length(min = 1, max = 100, message = "city is required"))]
    pub city: String,
    #[validate(length(min = 1, max = 100, message = "venue is required"))]
    pub venue: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EditActivity {
    /// Filled from the route when the command arrives over HTTP.
    #[serde(default = "Uuid::nil")]
    pub id: Uuid,
    #[validate(length(min = 1, max = 100, message = "title must be 1-100 characters"))]
    pub title: String,
    #[validate(length(min = 1, max = 2000, message = "description must be 1-2000 characters"))]
    pub description: String,
    #[validate(length(min = 1, max = 50, message = "category is required"))]
    pub category: String,
    pub date: DateTime<Utc>,
    #[validate(length(min = 1, max = 100, message = "city is required"))]
    pub city: String,
    #[validate(length(min = 1, max = 100, message = "venue is required"))]
    pub venue: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeleteActivity {
    pub id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Attend {
    pub id: Uuid,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Unattend {
    pub id: Uuid,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct CreateComment {
    pub activity_id: Uuid,
    #[validate(length(min = 1, max = 500, message = "comment body must be 1-500 characters"))]
    pub body: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileDetails {
    pub username: String,
}

#[derive(Debug, Clone, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct EditProfile {
    #[validate(length(min = 1, max = 255, message = "display name is required"))]
    pub display_name: String,
    #[validate(length(max = 1000, message = "bio must be at most 1000 characters"))]
    pub bio: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct AddPhoto {
    #[validate(length(min = 1, message = "photo data is required"))]
    pub data: Vec<u8>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SetMainPhoto {
    pub id: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DeletePhoto {
    pub id: String,
}

/// A dispatchable request.
#[derive(Debug, Clone)]
pub enum Request {
    ListActivities(ListActivities),
    ActivityDetails(ActivityDetails),
    CreateActivity(CreateActivity),
    EditActivity(EditActivity),
    DeleteActivity(DeleteActivity),
    Attend(Attend),
    Unattend(Unattend),
    CreateComment(CreateComment),
    CurrentUser,
    ProfileDetails(ProfileDetails),
    EditProfile(EditProfile),
    AddPhoto(AddPhoto),
    SetMainPhoto(SetMainPhoto),
    DeletePhoto(DeletePhoto),
}

impl Request {
    pub fn kind(&self) -> RequestKind {
        match self {
            Request::ListActivities(_) => RequestKind::ListActivities,
            Request::ActivityDetails(_) => RequestKind::ActivityDetails,
            Request::CreateActivity(_) => RequestKind::CreateActivity,
            Request::EditActivity(_) => RequestKind::EditActivity,
            Request::DeleteActivity(_) => RequestKind::DeleteActivity,
            Request::Attend(_) => RequestKind::Attend,
            Request::Unattend(_) => RequestKind::Unattend,
            Request::CreateComment(_) => RequestKind::CreateComment,
            Request::CurrentUser => RequestKind::CurrentUser,
            Request::ProfileDetails(_) => RequestKind::ProfileDetails,
            Request::EditProfile(_) => RequestKind::EditProfile,
            Request::AddPhoto(_) => RequestKind::AddPhoto,
            Request::SetMainPhoto(_) => RequestKind::SetMainPhoto,
            Request::DeletePhoto(_) => RequestKind::DeletePhoto,
        }
    }

    /// Payload validation, stage one of dispatch.
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        match self {
            Request::CreateActivity(p) => p.validate(),
            Request::EditActivity(p) => p.validate(),
            Request::CreateComment(p) => p.validate(),
            Request::EditProfile(p) => p.validate(),
            Request::AddPhoto(p) => p.validate(),
            _ => Ok(()),
        }
    }

    /// Policy attached to this request kind, with the target resource.
    pub fn policy(&self) -> Option<(Policy, Uuid)> {
        match self {
            Request::EditActivity(p) => Some((Policy::IsHost, p.id)),
            Request::DeleteActivity(p) => Some((Policy::IsHost, p.id)),
            _ => None,
        }
    }
}

/// A handler's successful result.
#[derive(Debug, Clone)]
pub enum Reply {
    Activities(ActivityEnvelope),
    Activity(ActivityDto),
    Comment(CommentDto),
    Profile(ProfileDto),
    User(UserDto),
    Photo(PhotoDto),
    Unit,
}

fn unexpected(expected: &str, got: &Reply) -> AppError {
    AppError::Internal(anyhow::anyhow!(
        "expected {} reply, got {:?}",
        expected,
        std::mem::discriminant(got)
    ))
}

impl Reply {
    pub fn into_activities(self) -> AppResult<ActivityEnvelope> {
        match self {
            Reply::Activities(v) => Ok(v),
            other => Err(unexpected("activities", &other)),
        }
    }

    pub fn into_activity(self) -> AppResult<ActivityDto> {
        match self {
            Reply::Activity(v) => Ok(v),
            other => Err(unexpected("activity", &other)),
        }
    }

    pub fn into_comment(self) -> AppResult<CommentDto> {
        match self {
            Reply::Comment(v) => Ok(v),
            other => Err(unexpected("comment", &other)),
        }
    }

    pub fn into_profile(self) -> AppResult<ProfileDto> {
        match self {
            Reply::Profile(v) => Ok(v),
            other => Err(unexpected("profile", &other)),
        }
    }

    pub fn into_user(self) -> AppResult<UserDto> {
        match self {
            Reply::User(v) => Ok(v),
            other => Err(unexpected("user", &other)),
        }
    }

    pub fn into_photo(self) -> AppResult<PhotoDto> {
        match self {
            Reply::Photo(v) => Ok(v),
            other => Err(unexpected("photo", &other)),
        }
    }
}
