//! Typed accessors over the open-keyed store.
//!
//! The key set stays open and growable; each feature area gets a wrapper
//! that restores typed reads and writes at the call site.

use std::sync::Arc;

use serde_json::{json, Value};
use tracing::warn;
use uuid::Uuid;

use crate::models::{ActivityDto, CommentDto, UserDto};

use super::{Store, Subscription};

/// Well-known store keys. Callers may use others freely.
pub mod keys {
    pub const ACTIVITIES: &str = "activities";
    pub const ACTIVITY: &str = "activity";
    pub const USER: &str = "user";
    pub const LOADING: &str = "loading";
    pub const LOADER_CONTENT: &str = "loaderContent";
    pub const NOTICE: &str = "notice";
}

fn encode<T: serde::Serialize>(value: &T) -> Option<Value> {
    match serde_json::to_value(value) {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(error = %e, "dropping store write");
            None
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(value: Value) -> Option<T> {
    serde_json::from_value(value).ok()
}

/// Activity list and currently viewed activity.
#[derive(Clone)]
pub struct ActivitySlice {
    store: Arc<Store>,
}

impl ActivitySlice {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn activities(&self) -> Vec<ActivityDto> {
        self.store
            .get(keys::ACTIVITIES)
            .and_then(decode)
            .unwrap_or_default()
    }

    pub fn set_activities(&self, list: &[ActivityDto]) {
        if let Some(v) = encode(&list) {
            self.store.set(keys::ACTIVITIES, v);
        }
    }

    /// Replace the entry with the same id, or add it.
    pub fn upsert(&self, dto: &ActivityDto) {
        let mut list = self.activities();
        match list.iter_mut().find(|a| a.id == dto.id) {
            Some(slot) => *slot = dto.clone(),
            None => list.push(dto.clone()),
        }
        list.sort_by_key(|a| a.date);
        self.set_activities(&list);
        if self.current().map(|a| a.id) == Some(dto.id) {
            self.set_current(dto);
        }
    }

    pub fn remove(&self, id: Uuid) {
        let mut list = self.activities();
        list.retain(|a| a.id != id);
        self.set_activities(&list);
        if self.current().map(|a| a.id) == Some(id) {
            self.store.set(keys::ACTIVITY, Value::Null);
        }
    }

    pub fn current(&self) -> Option<ActivityDto> {
        self.store.get(keys::ACTIVITY).and_then(decode)
    }

    pub fn set_current(&self, dto: &ActivityDto) {
        if let Some(v) = encode(dto) {
            self.store.set(keys::ACTIVITY, v);
        }
    }

    /// Append a pushed comment to the currently viewed activity, if the
    /// push targets it.
    pub fn append_comment(&self, activity_id: Uuid, comment: &CommentDto) {
        let Some(mut current) = self.current() else {
            return;
        };
        if current.id != activity_id {
            return;
        }
        current.comments.push(comment.clone());
        self.set_current(&current);
    }

    pub fn select_list(&self) -> Subscription {
        self.store.select(keys::ACTIVITIES)
    }

    pub fn select_current(&self) -> Subscription {
        self.store.select(keys::ACTIVITY)
    }
}

/// Signed-in user.
#[derive(Clone)]
pub struct SessionSlice {
    store: Arc<Store>,
}

impl SessionSlice {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn user(&self) -> Option<UserDto> {
        self.store.get(keys::USER).and_then(decode)
    }

    pub fn set_user(&self, user: &UserDto) {
        if let Some(v) = encode(user) {
            self.store.set(keys::USER, v);
        }
    }

    pub fn clear_user(&self) {
        self.store.set(keys::USER, Value::Null);
    }

    pub fn select_user(&self) -> Subscription {
        self.store.select(keys::USER)
    }
}

/// Loading indicator state.
#[derive(Clone)]
pub struct UiSlice {
    store: Arc<Store>,
}

impl UiSlice {
    pub fn new(store: Arc<Store>) -> Self {
        Self { store }
    }

    pub fn start_loading(&self, content: &str) {
        self.store.set(keys::LOADER_CONTENT, json!(content));
        self.store.set(keys::LOADING, json!(true));
    }

    pub fn stop_loading(&self) {
        self.store.set(keys::LOADING, json!(false));
    }

    pub fn loading(&self) -> bool {
        self.store
            .get(keys::LOADING)
            .and_then(decode)
            .unwrap_or(false)
    }
}
