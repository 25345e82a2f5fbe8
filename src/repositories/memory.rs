//! In-memory repository and photo gateway, used by the demo binary and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::models::{ActivityRecord, UserRecord};

use super::{
    ActivityFilter, ActivityRepository, PhotoGateway, StoredPhoto, UserRepository,
};

/// Single-process storage for activities and users.
#[derive(Default)]
pub struct MemoryRepository {
    activities: RwLock<HashMap<Uuid, ActivityRecord>>,
    users: RwLock<HashMap<Uuid, UserRecord>>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ActivityRepository for MemoryRepository {
    async fn find(&self, id: Uuid) -> AppResult<Option<ActivityRecord>> {
        Ok(self.activities.read().await.get(&id).cloned())
    }

    async fn host_of(&self, id: Uuid) -> AppResult<Option<String>> {
        Ok(self
            .activities
            .read()
            .await
            .get(&id)
            .and_then(|a| a.host().map(|h| h.username.clone())))
    }

    async fn list(&self, filter: &ActivityFilter) -> AppResult<(Vec<ActivityRecord>, usize)> {
        let start = filter.start_date.unwrap_or_else(Utc::now);
        let viewer = filter.viewer.as_deref();

        let guard = self.activities.read().await;
        let mut matches: Vec<ActivityRecord> = guard
            .values()
            .filter(|a| a.date >= start)
            .filter(|a| match (filter.is_going, filter.is_host, viewer) {
                (true, false, Some(u)) => a.is_attending(u),
                (false, true, Some(u)) => a.host().map(|h| h.username == u).unwrap_or(false),
                _ => true,
            })
            .cloned()
            .collect();
        drop(guard);

        matches.sort_by_key(|a| a.date);
        let total = matches.len();
        let page = matches
            .into_iter()
            .skip(filter.offset.unwrap_or(0))
            .take(filter.limit.unwrap_or(3))
            .collect();
        Ok((page, total))
    }

    async fn insert(&self, record: ActivityRecord) -> AppResult<()> {
        let mut guard = self.activities.write().await;
        if guard.contains_key(&record.id) {
            return Err(AppError::Conflict(format!(
                "activity {} already exists",
                record.id
            )));
        }
        guard.insert(record.id, record);
        Ok(())
    }

    async fn update(&self, record: ActivityRecord) -> AppResult<()> {
        let mut guard = self.activities.write().await;
        if !guard.contains_key(&record.id) {
            return Err(AppError::NotFound(format!("activity {}", record.id)));
        }
        guard.insert(record.id, record);
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> AppResult<bool> {
        Ok(self.activities.write().await.remove(&id).is_some())
    }
}

#[async_trait]
impl UserRepository for MemoryRepository {
    async fn find_by_id(&self, id: Uuid) -> AppResult<Option<UserRecord>> {
        Ok(self.users.read().await.get(&id).cloned())
    }

    async fn find_by_username(&self, username: &str) -> AppResult<Option<UserRecord>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.username == username)
            .cloned())
    }

    async fn find_by_email(&self, email: &str) -> AppResult<Option<UserRecord>> {
        Ok(self
            .users
            .read()
            .await
            .values()
            .find(|u| u.email == email)
            .cloned())
    }

    async fn create(&self, user: UserRecord) -> AppResult<()> {
        let mut guard = self.users.write().await;
        if guard
            .values()
            .any(|u| u.username == user.username || u.email == user.email)
        {
            return Err(AppError::Conflict(
                "username or email already registered".to_string(),
            ));
        }
        guard.insert(user.id, user);
        Ok(())
    }

    async fn update(&self, user: UserRecord) -> AppResult<()> {
        let mut guard = self.users.write().await;
        if !guard.contains_key(&user.id) {
            return Err(AppError::NotFound(format!("user {}", user.username)));
        }
        guard.insert(user.id, user);
        Ok(())
    }
}

/// Photo gateway that keeps blobs in memory.
#[derive(Default)]
pub struct MemoryPhotoGateway {
    blobs: RwLock<HashMap<String, Vec<u8>>>,
}

impl MemoryPhotoGateway {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PhotoGateway for MemoryPhotoGateway {
    async fn upload(&self, data: Vec<u8>) -> AppResult<StoredPhoto> {
        let id = Uuid::new_v4().as_simple().to_string();
        let url = format!("memory://photos/{}", id);
        self.blobs.write().await.insert(id.clone(), data);
        Ok(StoredPhoto { id, url })
    }

    async fn remove(&self, id: &str) -> AppResult<()> {
        if self.blobs.write().await.remove(id).is_none() {
            return Err(AppError::NotFound(format!("photo {}", id)));
        }
        Ok(())
    }
}
