//! Users, profiles, and the authenticated principal.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stored user aggregate.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
    pub email: String,
    pub password_hash: String,
    pub bio: Option<String>,
    pub photos: Vec<PhotoRecord>,
}

/// Stored photo reference; the blob itself lives behind the photo gateway.
#[derive(Debug, Clone)]
pub struct PhotoRecord {
    pub id: String,
    pub url: String,
    pub is_main: bool,
}

/// The authenticated caller. Identity only; what the caller may do is
/// decided by the authorization guard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub id: Uuid,
    pub username: String,
    pub display_name: String,
}

impl UserRecord {
    pub fn principal(&self) -> Principal {
        Principal {
            id: self.id,
            username: self.username.clone(),
            display_name: self.display_name.clone(),
        }
    }

    pub fn main_photo(&self) -> Option<&PhotoRecord> {
        self.photos.iter().find(|p| p.is_main)
    }

    pub fn to_user_dto(&self) -> UserDto {
        UserDto {
            username: self.username.clone(),
            display_name: self.display_name.clone(),
            image: self.main_photo().map(|p| p.url.clone()),
        }
    }

    pub fn to_profile_dto(&self) -> ProfileDto {
        ProfileDto {
            username: self.username.clone(),
            display_name: self.display_name.clone(),
            image: self.main_photo().map(|p| p.url.clone()),
            bio: self.bio.clone(),
            photos: self.photos.iter().map(PhotoRecord::to_dto).collect(),
        }
    }
}

impl PhotoRecord {
    pub fn to_dto(&self) -> PhotoDto {
        PhotoDto {
            id: self.id.clone(),
            url: self.url.clone(),
            is_main: self.is_main,
        }
    }
}

/// The signed-in user as returned from auth and the current-user query.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub username: String,
    pub display_name: String,
    pub image: Option<String>,
}

/// Public profile view.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ProfileDto {
    pub username: String,
    pub display_name: String,
    pub image: Option<String>,
    pub bio: Option<String>,
    pub photos: Vec<PhotoDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PhotoDto {
    pub id: String,
    pub url: String,
    pub is_main: bool,
}
