//! Real-time hub: connection registry, group membership, and at-most-once
//! broadcast to current group members.
//!
//! A connection moves `Connected -> {Joined(group)}* -> Disconnected` and
//! never returns. Delivery is fire-and-forget with no buffering: a member
//! that joins after a send never receives it.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use serde_json::json;
use tokio::sync::{mpsc, RwLock};
use tracing::debug;

use crate::error::{AppError, AppResult};
use crate::models::{Principal, WsEvent, EVENT_MEMBER_NOTICE};

pub mod fanout;

pub use fanout::{Broadcaster, CommentFanout};

pub type ConnectionId = String;
pub type EventSender = mpsc::UnboundedSender<WsEvent>;

struct ConnectionEntry {
    principal: Option<Principal>,
    sender: EventSender,
    groups: HashSet<String>,
}

#[derive(Default)]
struct HubState {
    connections: HashMap<ConnectionId, ConnectionEntry>,
    groups: HashMap<String, HashSet<ConnectionId>>,
}

/// Connection/group table behind a single lock. `send` snapshots the member
/// set under the lock and delivers outside it, so broadcasts never block
/// concurrent joins and leaves.
#[derive(Default)]
pub struct Hub {
    state: RwLock<HubState>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection with an empty membership set.
    pub async fn connect(
        &self,
        id: impl Into<ConnectionId>,
        principal: Option<Principal>,
        sender: EventSender,
    ) {
        let id = id.into();
        let mut state = self.state.write().await;
        state.connections.insert(
            id.clone(),
            ConnectionEntry {
                principal,
                sender,
                groups: HashSet::new(),
            },
        );
        debug!(connection = %id, "connected");
    }

    /// Add the connection to a group, then notify the group - including the
    /// newly joined member, so the joiner sees its own notice.
    pub async fn join(&self, id: &str, group: &str) -> AppResult<()> {
        let name = {
            let mut state = self.state.write().await;
            let entry = state
                .connections
                .get_mut(id)
                .ok_or_else(|| AppError::NotFound(format!("connection {}", id)))?;
            entry.groups.insert(group.to_string());
            let name = display_name(entry);
            state
                .groups
                .entry(group.to_string())
                .or_default()
                .insert(id.to_string());
            name
        };
        debug!(connection = %id, group = %group, "joined");
        self.send(
            group,
            EVENT_MEMBER_NOTICE,
            json!(format!("{} has joined the activity", name)),
        )
        .await;
        Ok(())
    }

    /// Remove the connection from a group and notify the remaining members.
    pub async fn leave(&self, id: &str, group: &str) -> AppResult<()> {
        let name = {
            let mut state = self.state.write().await;
            let entry = state
                .connections
                .get_mut(id)
                .ok_or_else(|| AppError::NotFound(format!("connection {}", id)))?;
            entry.groups.remove(group);
            let name = display_name(entry);
            remove_membership(&mut state, group, id);
            name
        };
        debug!(connection = %id, group = %group, "left");
        self.send(
            group,
            EVENT_MEMBER_NOTICE,
            json!(format!("{} has left the activity", name)),
        )
        .await;
        Ok(())
    }

    /// Drop the connection and every membership it held. Best-effort
    /// cleanup on transport close: no notices are sent.
    pub async fn disconnect(&self, id: &str) {
        let mut state = self.state.write().await;
        if let Some(entry) = state.connections.remove(id) {
            for group in entry.groups {
                remove_membership(&mut state, &group, id);
            }
            debug!(connection = %id, "disconnected");
        }
    }

    /// Broadcast to the current members of a group: snapshot the member
    /// senders under the lock, release it, then deliver fire-and-forget.
    /// Sending to an unknown or empty group is a no-op.
    pub async fn send(&self, group: &str, event: &str, data: serde_json::Value) {
        let targets: Vec<EventSender> = {
            let state = self.state.read().await;
            match state.groups.get(group) {
                Some(members) => members
                    .iter()
                    .filter_map(|id| state.connections.get(id))
                    .map(|entry| entry.sender.clone())
                    .collect(),
                None => return,
            }
        };

        let message = WsEvent {
            event: event.to_string(),
            group: group.to_string(),
            data,
        };
        let mut delivered = 0usize;
        for sender in &targets {
            // A closed receiver means the transport is tearing the
            // connection down; disconnect cleanup owns the registry.
            if sender.send(message.clone()).is_ok() {
                delivered += 1;
            }
        }
        debug!(group = %group, event = %event, delivered, "broadcast");
    }

    /// Current member count of a group.
    pub async fn group_size(&self, group: &str) -> usize {
        self.state
            .read()
            .await
            .groups
            .get(group)
            .map(HashSet::len)
            .unwrap_or(0)
    }

    /// Number of registered connections.
    pub async fn connection_count(&self) -> usize {
        self.state.read().await.connections.len()
    }
}

fn display_name(entry: &ConnectionEntry) -> String {
    entry
        .principal
        .as_ref()
        .map(|p| p.display_name.clone())
        .unwrap_or_else(|| "someone".to_string())
}

/// Drop the member from the group table, removing the group once empty.
fn remove_membership(state: &mut HubState, group: &str, id: &str) {
    if let Some(members) = state.groups.get_mut(group) {
        members.remove(id);
        if members.is_empty() {
            state.groups.remove(group);
        }
    }
}

#[async_trait]
impl Broadcaster for Hub {
    async fn send(&self, group: &str, event: &str, data: serde_json::Value) {
        Hub::send(self, group, event, data).await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use uuid::Uuid;

    fn principal(name: &str) -> Principal {
        Principal {
            id: Uuid::new_v4(),
            username: name.into(),
            display_name: name.into(),
        }
    }

    async fn connected(hub: &Hub, id: &str, name: &str) -> mpsc::UnboundedReceiver<WsEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        hub.connect(id, Some(principal(name)), tx).await;
        rx
    }

    fn drain(rx: &mut mpsc::UnboundedReceiver<WsEvent>) -> Vec<WsEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    #[tokio::test]
    async fn join_notice_reaches_group_including_joiner() {
        let hub = Hub::new();
        let mut rx1 = connected(&hub, "c1", "bob").await;
        let mut rx2 = connected(&hub, "c2", "jane").await;

        hub.join("c1", "act-1").await.unwrap();
        let events = drain(&mut rx1);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, EVENT_MEMBER_NOTICE);
        assert_eq!(events[0].data, json!("bob has joined the activity"));

        hub.join("c2", "act-1").await.unwrap();
        // Both members see jane's notice, jane included.
        assert_eq!(drain(&mut rx1).len(), 1);
        let events = drain(&mut rx2);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, json!("jane has joined the activity"));
    }

    #[tokio::test]
    async fn concurrent_joins_both_receive_subsequent_send() {
        let hub = Arc::new(Hub::new());
        let mut rx1 = connected(&hub, "c1", "bob").await;
        let mut rx2 = connected(&hub, "c2", "jane").await;

        let h1 = {
            let hub = hub.clone();
            tokio::spawn(async move { hub.join("c1", "act-1").await })
        };
        let h2 = {
            let hub = hub.clone();
            tokio::spawn(async move { hub.join("c2", "act-1").await })
        };
        h1.await.unwrap().unwrap();
        h2.await.unwrap().unwrap();
        assert_eq!(hub.group_size("act-1").await, 2);

        drain(&mut rx1);
        drain(&mut rx2);
        hub.send("act-1", "CommentReceived", json!({"body": "hi"})).await;
        assert_eq!(drain(&mut rx1).len(), 1);
        assert_eq!(drain(&mut rx2).len(), 1);
    }

    #[tokio::test]
    async fn groups_are_isolated() {
        let hub = Hub::new();
        let mut rx1 = connected(&hub, "c1", "bob").await;
        let mut rx2 = connected(&hub, "c2", "jane").await;
        hub.join("c1", "act-1").await.unwrap();
        hub.join("c2", "act-2").await.unwrap();
        drain(&mut rx1);
        drain(&mut rx2);

        hub.send("act-1", "CommentReceived", json!({"body": "m"})).await;
        let got = drain(&mut rx1);
        assert_eq!(got.len(), 1);
        assert_eq!(got[0].group, "act-1");
        assert!(drain(&mut rx2).is_empty());
    }

    #[tokio::test]
    async fn no_delivery_after_leave() {
        let hub = Hub::new();
        let mut rx1 = connected(&hub, "c1", "bob").await;
        let mut rx2 = connected(&hub, "c2", "jane").await;
        hub.join("c1", "act-1").await.unwrap();
        hub.join("c2", "act-1").await.unwrap();

        hub.leave("c1", "act-1").await.unwrap();
        drain(&mut rx1);
        drain(&mut rx2);

        hub.send("act-1", "CommentReceived", json!({})).await;
        assert!(drain(&mut rx1).is_empty());
        assert_eq!(drain(&mut rx2).len(), 1);
    }

    #[tokio::test]
    async fn leave_notifies_remaining_members() {
        let hub = Hub::new();
        let mut rx1 = connected(&hub, "c1", "bob").await;
        let mut rx2 = connected(&hub, "c2", "jane").await;
        hub.join("c1", "act-1").await.unwrap();
        hub.join("c2", "act-1").await.unwrap();
        drain(&mut rx1);
        drain(&mut rx2);

        hub.leave("c2", "act-1").await.unwrap();
        let events = drain(&mut rx1);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].data, json!("jane has left the activity"));
    }

    #[tokio::test]
    async fn disconnect_cleans_memberships_without_notices() {
        let hub = Hub::new();
        let mut rx1 = connected(&hub, "c1", "bob").await;
        let mut rx2 = connected(&hub, "c2", "jane").await;
        hub.join("c1", "act-1").await.unwrap();
        hub.join("c1", "act-2").await.unwrap();
        hub.join("c2", "act-1").await.unwrap();
        drain(&mut rx1);
        drain(&mut rx2);

        hub.disconnect("c1").await;
        // No departure notice on transport-level close.
        assert!(drain(&mut rx2).is_empty());
        assert_eq!(hub.group_size("act-1").await, 1);
        assert_eq!(hub.group_size("act-2").await, 0);
        assert_eq!(hub.connection_count().await, 1);

        hub.send("act-1", "CommentReceived", json!({})).await;
        assert!(drain(&mut rx1).is_empty());
        assert_eq!(drain(&mut rx2).len(), 1);
    }

    #[tokio::test]
    async fn send_to_empty_group_is_noop() {
        let hub = Hub::new();
        hub.send("nowhere", "CommentReceived", json!({})).await;
        assert_eq!(hub.group_size("nowhere").await, 0);
    }

    #[tokio::test]
    async fn join_unknown_connection_fails() {
        let hub = Hub::new();
        assert!(matches!(
            hub.join("ghost", "act-1").await,
            Err(AppError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn late_joiner_misses_earlier_send() {
        let hub = Hub::new();
        let mut rx1 = connected(&hub, "c1", "bob").await;
        hub.join("c1", "act-1").await.unwrap();
        drain(&mut rx1);

        hub.send("act-1", "CommentReceived", json!({"body": "early"})).await;

        let mut rx2 = connected(&hub, "c2", "jane").await;
        hub.join("c2", "act-1").await.unwrap();
        let events = drain(&mut rx2);
        // Only the join notice; the earlier broadcast is not replayed.
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event, EVENT_MEMBER_NOTICE);
    }
}
