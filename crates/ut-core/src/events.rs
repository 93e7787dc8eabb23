//! User-state notifications and their subscribers.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::Serialize;

use crate::types::{TrackingId, UserState};

/// Category attached to every user-state notification.
pub const USER_STATE_CATEGORY: &str = "userState";

/// One published (id, state) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UserStateEntry {
    pub id: TrackingId,
    #[serde(rename = "userState")]
    pub user_state: UserState,
}

/// A change in the coordinator's published state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "eventType", rename_all = "camelCase")]
pub enum UserStateEvent {
    /// The primary user changed. Either side may be [`TrackingId::INVALID`].
    PrimaryUserChanged {
        #[serde(rename = "oldValue")]
        old_id: TrackingId,
        #[serde(rename = "newValue")]
        new_id: TrackingId,
    },
    /// The published (id, state) map changed. Entries are in ascending id order.
    UserStatesChanged {
        #[serde(rename = "userStates")]
        states: Vec<UserStateEntry>,
    },
}

impl UserStateEvent {
    /// Category tag shared by all variants.
    pub const fn category(&self) -> &'static str {
        USER_STATE_CATEGORY
    }

    /// Wraps the event with its category for serialization.
    pub const fn envelope(&self) -> EventEnvelope<'_> {
        EventEnvelope {
            category: USER_STATE_CATEGORY,
            event: self,
        }
    }
}

/// Serialized form of an event: `{"category": "userState", "eventType": ..., ...}`.
#[derive(Debug, Serialize)]
pub struct EventEnvelope<'a> {
    pub category: &'static str,
    #[serde(flatten)]
    pub event: &'a UserStateEvent,
}

/// Handle returned by [`EventChannel::subscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

type Handler = Arc<dyn Fn(&UserStateEvent) + Send + Sync>;

/// Synchronous fan-out of [`UserStateEvent`]s.
///
/// Handlers run on the publishing thread, in subscription order. The handler
/// list is snapshotted before delivery, so a handler may subscribe or
/// unsubscribe (itself included) without deadlocking; such changes take
/// effect from the next event.
#[derive(Default)]
pub struct EventChannel {
    handlers: RwLock<Vec<(SubscriptionId, Handler)>>,
    next_id: AtomicU64,
}

impl EventChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a handler for all future events.
    pub fn subscribe<F>(&self, handler: F) -> SubscriptionId
    where
        F: Fn(&UserStateEvent) + Send + Sync + 'static,
    {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.handlers.write().push((id, Arc::new(handler)));
        id
    }

    /// Removes a handler. Returns false if it was not registered.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut handlers = self.handlers.write();
        let before = handlers.len();
        handlers.retain(|(sid, _)| *sid != id);
        handlers.len() != before
    }

    pub fn subscriber_count(&self) -> usize {
        self.handlers.read().len()
    }

    /// Delivers `event` to every current subscriber.
    pub fn publish(&self, event: &UserStateEvent) {
        let handlers: Vec<Handler> = self
            .handlers
            .read()
            .iter()
            .map(|(_, handler)| Arc::clone(handler))
            .collect();

        tracing::trace!(
            category = event.category(),
            subscribers = handlers.len(),
            "delivering user state event"
        );
        for handler in handlers {
            handler(event);
        }
    }
}

impl std::fmt::Debug for EventChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventChannel")
            .field("subscribers", &self.subscriber_count())
            .finish_non_exhaustive()
    }
}
