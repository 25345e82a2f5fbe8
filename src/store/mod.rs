//! Keyed reactive state container for the client side.
//!
//! An open string-keyed map with change-driven subscriptions: a
//! subscription receives the current value immediately, then one update per
//! `set` whose value differs from the previous one. Delivery goes through a
//! per-subscriber queue drained on the subscriber's side, so a listener
//! that calls `set` on the key it observes cannot recurse into itself, and
//! a dead subscriber never blocks the rest.

use std::collections::HashMap;
use std::sync::Mutex;

use serde_json::Value;
use tokio::sync::mpsc;

pub mod feed;
pub mod slices;

pub use feed::LiveFeed;
pub use slices::{keys, ActivitySlice, SessionSlice, UiSlice};

#[derive(Default)]
struct StoreInner {
    state: HashMap<String, Value>,
    subscribers: HashMap<String, Vec<mpsc::UnboundedSender<Value>>>,
}

/// Single-owner keyed store. `set` is synchronous and has no suspension
/// points; cross-thread use funnels through the internal lock.
#[derive(Default)]
pub struct Store {
    inner: Mutex<StoreInner>,
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current value at `key`, if one was ever set.
    pub fn get(&self, key: &str) -> Option<Value> {
        let inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        inner.state.get(key).cloned()
    }

    /// Replace the value at `key` and notify that key's subscribers.
    ///
    /// Subscribers of other keys receive nothing, and an update equal to
    /// the previous value notifies nobody. There is no multi-key
    /// transaction; callers needing atomicity across fields combine them
    /// under one key.
    pub fn set(&self, key: &str, value: Value) {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let previous = inner.state.insert(key.to_string(), value.clone());
        if previous.as_ref() == Some(&value) {
            return;
        }
        if let Some(subs) = inner.subscribers.get_mut(key) {
            // A closed receiver is a gone subscriber; prune it and keep
            // delivering to the rest.
            subs.retain(|tx| tx.send(value.clone()).is_ok());
        }
    }

    /// Subscribe to `key`: the current value (JSON null when unset) arrives
    /// immediately, then every change until the subscription is dropped.
    pub fn select(&self, key: &str) -> Subscription {
        let mut inner = self.inner.lock().unwrap_or_else(|e| e.into_inner());
        let (tx, rx) = mpsc::unbounded_channel();
        let current = inner.state.get(key).cloned().unwrap_or(Value::Null);
        let _ = tx.send(current);
        inner
            .subscribers
            .entry(key.to_string())
            .or_default()
            .push(tx);
        Subscription { rx }
    }
}

/// A live view over one key's value sequence.
pub struct Subscription {
    rx: mpsc::UnboundedReceiver<Value>,
}

impl Subscription {
    /// Next value, waiting for one if necessary. `None` once the store is
    /// gone.
    pub async fn recv(&mut self) -> Option<Value> {
        self.rx.recv().await
    }

    /// Next value if one is already queued.
    pub fn try_recv(&mut self) -> Option<Value> {
        self.rx.try_recv().ok()
    }

    /// Drain queued values and return the most recent one.
    pub fn latest(&mut self) -> Option<Value> {
        let mut latest = None;
        while let Ok(value) = self.rx.try_recv() {
            latest = Some(value);
        }
        latest
    }
}
