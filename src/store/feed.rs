//! Live-feed bridge: applies inbound hub events to the store.

use std::sync::Arc;

use tracing::debug;
use uuid::Uuid;

use crate::models::{CommentDto, WsEvent, EVENT_COMMENT_RECEIVED, EVENT_MEMBER_NOTICE};

use super::slices::{keys, ActivitySlice};
use super::Store;

/// Consumes events pushed by the hub and reconciles them into store state,
/// which in turn notifies UI subscribers.
#[derive(Clone)]
pub struct LiveFeed {
    store: Arc<Store>,
    activities: ActivitySlice,
}

impl LiveFeed {
    pub fn new(store: Arc<Store>) -> Self {
        let activities = ActivitySlice::new(store.clone());
        Self { store, activities }
    }

    pub fn apply(&self, event: &WsEvent) {
        match event.event.as_str() {
            EVENT_COMMENT_RECEIVED => {
                let Ok(activity_id) = Uuid::parse_str(&event.group) else {
                    debug!(group = %event.group, "ignoring comment for non-activity group");
                    return;
                };
                let Ok(comment) = serde_json::from_value::<CommentDto>(event.data.clone()) else {
                    debug!(group = %event.group, "ignoring malformed comment payload");
                    return;
                };
                self.activities.append_comment(activity_id, &comment);
            }
            EVENT_MEMBER_NOTICE => {
                self.store.set(keys::NOTICE, event.data.clone());
            }
            other => {
                debug!(event = %other, "ignoring unknown event");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    use crate::models::ActivityDto;

    fn activity(id: Uuid) -> ActivityDto {
        ActivityDto {
            id,
            title: "gig".into(),
            description: "d".into(),
            category: "music".into(),
            date: Utc::now(),
            city: "x".into(),
            venue: "y".into(),
            attendees: vec![],
            comments: vec![],
            is_host: false,
            is_going: true,
        }
    }

    #[test]
    fn comment_event_appends_to_current_activity() {
        let store = Arc::new(Store::new());
        let feed = LiveFeed::new(store.clone());
        let slice = ActivitySlice::new(store.clone());
        let id = Uuid::new_v4();
        slice.set_current(&activity(id));

        let comment = CommentDto {
            id: Uuid::new_v4(),
            author: "jane".into(),
            display_name: "Jane".into(),
            image: None,
            body: "count me in".into(),
            created_at: Utc::now(),
        };
        feed.apply(&WsEvent {
            event: EVENT_COMMENT_RECEIVED.into(),
            group: id.to_string(),
            data: serde_json::to_value(&comment).unwrap(),
        });

        let current = slice.current().unwrap();
        assert_eq!(current.comments.len(), 1);
        assert_eq!(current.comments[0].body, "count me in");
    }

    #[test]
    fn member_notice_lands_on_notice_key() {
        let store = Arc::new(Store::new());
        let feed = LiveFeed::new(store.clone());
        feed.apply(&WsEvent {
            event: EVENT_MEMBER_NOTICE.into(),
            group: Uuid::new_v4().to_string(),
            data: json!("Jane has joined the activity"),
        });
        assert_eq!(
            store.get(keys::NOTICE),
            Some(json!("Jane has joined the activity"))
        );
    }

    #[test]
    fn malformed_payload_is_ignored() {
        let store = Arc::new(Store::new());
        let feed = LiveFeed::new(store.clone());
        let slice = ActivitySlice::new(store.clone());
        let id = Uuid::new_v4();
        slice.set_current(&activity(id));

        feed.apply(&WsEvent {
            event: EVENT_COMMENT_RECEIVED.into(),
            group: id.to_string(),
            data: json!({"not": "a comment"}),
        });
        assert!(slice.current().unwrap().comments.is_empty());
    }
}
