//! Wire types for the real-time boundary.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event name for a pushed comment.
pub const EVENT_COMMENT_RECEIVED: &str = "CommentReceived";
/// Event name for join/leave notices.
pub const EVENT_MEMBER_NOTICE: &str = "MemberNotice";

/// Event sent over WebSocket to clients. Ephemeral, never persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WsEvent {
    pub event: String,
    pub group: String,
    pub data: serde_json::Value,
}

/// WebSocket client message: join / leave a group, or send a comment.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientMessage {
    Join { data: GroupPayload },
    Leave { data: GroupPayload },
    Comment { data: CommentPayload },
    Ping,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupPayload {
    pub activity_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentPayload {
    pub activity_id: Uuid,
    pub body: String,
}
