//! Fanout: pushes committed mutation results into the hub.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::warn;
use uuid::Uuid;

use crate::models::{CommentDto, EVENT_COMMENT_RECEIVED};

/// Group-scoped push primitive. The hub implements this; tests substitute
/// a recorder.
#[async_trait]
pub trait Broadcaster: Send + Sync {
    async fn send(&self, group: &str, event: &str, data: serde_json::Value);
}

/// Bridges successful comment-creation commands into hub broadcasts.
///
/// Called only after the handler's persistence commit succeeded. A failure
/// here is logged and swallowed: it must never surface as a failure of the
/// already-succeeded command.
pub struct CommentFanout<B: Broadcaster + ?Sized> {
    hub: Arc<B>,
}

impl<B: Broadcaster + ?Sized> CommentFanout<B> {
    pub fn new(hub: Arc<B>) -> Self {
        Self { hub }
    }

    pub async fn comment_created(&self, activity_id: Uuid, comment: &CommentDto) {
        match serde_json::to_value(comment) {
            Ok(data) => {
                self.hub
                    .send(&activity_id.to_string(), EVENT_COMMENT_RECEIVED, data)
                    .await;
            }
            Err(e) => {
                warn!(activity = %activity_id, error = %e, "dropping comment broadcast");
            }
        }
    }
}
