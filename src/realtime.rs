//! In-process change notifications for habit and completion documents.
//!
//! The tracker publishes a [`ChangeEvent`] after every successful write.
//! Consumers subscribe to one collection and treat each event as a hint to
//! re-fetch their full snapshot; events carry no document bodies.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

/// Default number of buffered events per subscriber before it lags.
pub const DEFAULT_CAPACITY: usize = 256;

/// A document collection that emits change events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Collection {
    Habits,
    Completions,
}

/// What happened to a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeKind {
    Create,
    Update,
    Delete,
}

/// A single change notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeEvent {
    pub collection: Collection,

    pub kind: ChangeKind,

    /// Identifier of the affected document.
    pub document_id: String,

    /// Owner of the affected document.
    pub user_id: String,
}

/// Fan-out channel for change events.
#[derive(Clone)]
pub struct ChangeFeed {
    sender: broadcast::Sender<ChangeEvent>,
}

impl Default for ChangeFeed {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl ChangeFeed {
    /// Create a feed buffering up to `capacity` events per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    /// Deliver an event to every current subscriber.
    ///
    /// Events published while nobody is subscribed are dropped.
    pub fn publish(&self, event: ChangeEvent) {
        match self.sender.send(event) {
            Ok(receivers) => debug!(receivers, "Change event published"),
            Err(broadcast::error::SendError(event)) => debug!(
                collection = ?event.collection,
                kind = ?event.kind,
                "Change event dropped, no subscribers"
            ),
        }
    }

    /// Subscribe to changes in one collection.
    ///
    /// Only events published after this call are delivered.
    pub fn subscribe(&self, collection: Collection) -> Subscription {
        Subscription {
            collection,
            receiver: self.sender.subscribe(),
        }
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }
}

/// What a subscription yields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FeedMessage {
    Change(ChangeEvent),

    /// Events were missed; the consumer must resync from a full fetch.
    Lagged(u64),
}

/// A receiver scoped to one collection.
///
/// Dropping the subscription unsubscribes.
pub struct Subscription {
    collection: Collection,
    receiver: broadcast::Receiver<ChangeEvent>,
}

impl Subscription {
    pub fn collection(&self) -> Collection {
        self.collection
    }

    /// Wait for the next event in this subscription's collection.
    ///
    /// Returns `None` once every feed handle has been dropped.
    pub async fn recv(&mut self) -> Option<FeedMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(event) if event.collection == self.collection => {
                    return Some(FeedMessage::Change(event));
                }
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(missed)) => {
                    return Some(FeedMessage::Lagged(missed));
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}
