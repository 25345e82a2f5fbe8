//! Persistence collaborators: repository traits consumed by handlers and
//! the authorization guard, plus in-memory implementations.
//!
//! Reads return fully-populated aggregates; nothing is loaded lazily on
//! field access. Transactional guarantees belong to the implementation.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::AppResult;
use crate::models::{ActivityRecord, UserRecord};

pub mod memory;

pub use memory::{MemoryPhotoGateway, MemoryRepository};

/// Filters for the activity list query.
#[derive(Debug, Clone, Default)]
pub struct ActivityFilter {
    pub offset: Option<usize>,
    pub limit: Option<usize>,
    /// Only activities the viewer attends.
    pub is_going: bool,
    /// Only activities the viewer hosts.
    pub is_host: bool,
    pub start_date: Option<DateTime<Utc>>,
    pub viewer: Option<String>,
}

/// Queryable activity storage.
#[async_trait]
pub trait ActivityRepository: Send + Sync {
    async fn find(&self, id: Uuid) -> AppResult<Option<ActivityRecord>>;

    /// Host username for the activity. Read path used by the authorization
    /// guard; re-read on every check, never cached.
    async fn host_of(&self, id: Uuid) -> AppResult<Option<String>>;

    /// Matching activities ordered by date, paged per the filter, plus the
    /// unpaged match count.
    async fn list(&self, filter: &ActivityFilter) -> AppResult<(Vec<ActivityRecord>, usize)>;

    /// Insert a new activity. The id is client-supplied; reusing one is a
    /// conflict.
    async fn insert(&self, record: ActivityRecord) -> AppResult<()>;

    /// Replace the stored aggregate. Not-found if the id is unknown.
    async fn update(&self, record: ActivityRecord) -> AppResult<()>;

    /// Remove the activity; `false` if it was already gone.
    async fn delete(&self, id: Uuid) -> AppResult<bool>;
}

/// Queryable user storage.
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<UserRecord>>;
    async fn find_by_username(&self, username: &str) -> AppResult<Option<UserRecord>>;
    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserRecord>>;

    /// Insert a new user. Username and email must be unused.
    async fn create(&self, user: UserRecord) -> AppResult<()>;

    /// Replace the stored aggregate. Not-found if the id is unknown.
    async fn update(&self, user: UserRecord) -> AppResult<()>;
}

/// Result of storing a photo blob with the external provider.
#[derive(Debug, Clone)]
pub struct StoredPhoto {
    pub id: String,
    pub url: String,
}

/// External photo storage provider.
#[async_trait]
pub trait PhotoGateway: Send + Sync {
    async fn upload(&self, data: Vec<u8>) -> AppResult<StoredPhoto>;
    async fn remove(&self, id: &str) -> AppResult<()>;
}
