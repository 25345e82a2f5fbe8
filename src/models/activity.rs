//! Activity aggregate: attendees and comments are embedded so repository
//! reads return fully-populated records with no follow-up loading.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stored activity aggregate.
#[derive(Debug, Clone)]
pub struct ActivityRecord {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub date: DateTime<Utc>,
    pub city: String,
    pub venue: String,
    pub attendees: Vec<AttendeeRecord>,
    pub comments: Vec<CommentRecord>,
}

/// One attendance entry on an activity.
#[derive(Debug, Clone)]
pub struct AttendeeRecord {
    pub username: String,
    pub display_name: String,
    pub image: Option<String>,
    pub is_host: bool,
}

/// Stored comment. Author display data is resolved when the comment is
/// created, so mapping to a DTO needs no second user read.
#[derive(Debug, Clone)]
pub struct CommentRecord {
    pub id: Uuid,
    pub author: String,
    pub display_name: String,
    pub image: Option<String>,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

impl ActivityRecord {
    pub fn host(&self) -> Option<&AttendeeRecord> {
        self.attendees.iter().find(|a| a.is_host)
    }

    pub fn is_attending(&self, username: &str) -> bool {
        self.attendees.iter().any(|a| a.username == username)
    }

    /// Map to a DTO relative to the viewing principal: `is_host` and
    /// `is_going` are computed against the viewer's username.
    pub fn to_dto(&self, viewer: Option<&str>) -> ActivityDto {
        let is_host = viewer
            .map(|u| self.host().map(|h| h.username == u).unwrap_or(false))
            .unwrap_or(false);
        let is_going = viewer.map(|u| self.is_attending(u)).unwrap_or(false);
        ActivityDto {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            category: self.category.clone(),
            date: self.date,
            city: self.city.clone(),
            venue: self.venue.clone(),
            attendees: self.attendees.iter().map(AttendeeRecord::to_dto).collect(),
            comments: self.comments.iter().map(CommentRecord::to_dto).collect(),
            is_host,
            is_going,
        }
    }
}

impl AttendeeRecord {
    pub fn to_dto(&self) -> AttendeeDto {
        AttendeeDto {
            username: self.username.clone(),
            display_name: self.display_name.clone(),
            image: self.image.clone(),
            is_host: self.is_host,
        }
    }
}

impl CommentRecord {
    pub fn to_dto(&self) -> CommentDto {
        CommentDto {
            id: self.id,
            author: self.author.clone(),
            display_name: self.display_name.clone(),
            image: self.image.clone(),
            body: self.body.clone(),
            created_at: self.created_at,
        }
    }
}

/// Client-facing activity representation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ActivityDto {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub category: String,
    pub date: DateTime<Utc>,
    pub city: String,
    pub venue: String,
    pub attendees: Vec<AttendeeDto>,
    pub comments: Vec<CommentDto>,
    pub is_host: bool,
    pub is_going: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AttendeeDto {
    pub username: String,
    pub display_name: String,
    pub image: Option<String>,
    pub is_host: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CommentDto {
    pub id: Uuid,
    pub author: String,
    pub display_name: String,
    pub image: Option<String>,
    pub body: String,
    pub created_at: DateTime<Utc>,
}

/// Paged list result.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEnvelope {
    pub activities: Vec<ActivityDto>,
    pub activity_count: usize,
}
