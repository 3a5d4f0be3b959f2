//! # Subscriptions
//!
//! The receiving side of a topic subscription.

use crate::messages::{Event, SubscriptionId};
use crate::session::Session;
use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::debug;

/// Errors from subscription operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SubscriptionError {
    /// The router dropped this subscription.
    #[error("Subscription closed")]
    Closed,
}

/// Router-side record of one subscriber.
#[derive(Clone)]
pub(crate) struct Subscriber {
    pub(crate) id: SubscriptionId,
    pub(crate) session: Session,
    pub(crate) sender: mpsc::Sender<Event>,
}

/// Subscriber table keyed by topic.
pub(crate) type SubscriberTable = Arc<DashMap<String, Vec<Subscriber>>>;

/// A subscription handle for receiving events.
///
/// When dropped, the subscription is removed from the router.
pub struct Subscription {
    id: SubscriptionId,
    topic: String,
    receiver: mpsc::Receiver<Event>,
    table: SubscriberTable,
}

impl Subscription {
    pub(crate) fn new(
        id: SubscriptionId,
        topic: String,
        receiver: mpsc::Receiver<Event>,
        table: SubscriberTable,
    ) -> Self {
        Self {
            id,
            topic,
            receiver,
            table,
        }
    }

    #[must_use]
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    #[must_use]
    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Receive the next delivered event.
    ///
    /// Returns `None` once the subscription has been removed from the router.
    pub async fn recv(&mut self) -> Option<Event> {
        self.receiver.recv().await
    }

    /// Try to receive the next event without waiting.
    ///
    /// - `Ok(Some(event))` - An event was waiting
    /// - `Ok(None)` - Nothing delivered yet
    /// - `Err(SubscriptionError::Closed)` - The subscription was removed
    pub fn try_recv(&mut self) -> Result<Option<Event>, SubscriptionError> {
        match self.receiver.try_recv() {
            Ok(event) => Ok(Some(event)),
            Err(mpsc::error::TryRecvError::Empty) => Ok(None),
            Err(mpsc::error::TryRecvError::Disconnected) => Err(SubscriptionError::Closed),
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        let Some(mut subscribers) = self.table.get_mut(&self.topic) else {
            debug!(topic = %self.topic, subscription = %self.id, "Subscription dropped");
            return;
        };
        subscribers.retain(|s| s.id != self.id);
        let empty = subscribers.is_empty();
        drop(subscribers);

        if empty {
            self.table.remove_if(&self.topic, |_, subs| subs.is_empty());
        }
        debug!(topic = %self.topic, subscription = %self.id, "Subscription dropped");
    }
}
