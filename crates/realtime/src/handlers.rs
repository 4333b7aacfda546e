//! Handler registry
//!
//! Every mounted view registers a [`HandlerSet`] under its own consumer key.
//! Handler sets are not tied to a topic: they receive routed events for all
//! subscribed topics and filter on the topic argument themselves.
//!
//! # Example
//!
//! ```rust,no_run
//! use resolveit_realtime::{HandlerSet, RealtimeClient, RealtimeConfig};
//!
//! # async fn example() {
//! let client = RealtimeClient::new(RealtimeConfig::default());
//! let handlers = HandlerSet::new()
//!     .on_connect(|| println!("live updates on"))
//!     .on_status_update(|envelope, topic| {
//!         println!("{} changed: {}", topic, envelope.payload);
//!     });
//! client.add_handler("grievance-details", handlers).await;
//! # }
//! ```

use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;

use crate::events::Envelope;
use crate::topic::Topic;

/// Callback for connection lifecycle transitions
pub type LifecycleCallback = Arc<dyn Fn() + Send + Sync>;

/// Callback receiving an unwrapped item and its topic
pub type ItemCallback = Arc<dyn Fn(&Value, &Topic) + Send + Sync>;

/// Callback receiving a whole envelope and its topic
pub type EnvelopeCallback = Arc<dyn Fn(&Envelope, &Topic) + Send + Sync>;

/// Key under which a consumer registers its handlers
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConsumerKey(String);

impl ConsumerKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConsumerKey {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for ConsumerKey {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl fmt::Display for ConsumerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Named bundle of optional typed callbacks
///
/// A missing callback means the consumer is not interested in that event;
/// it is skipped silently.
#[derive(Clone, Default)]
pub struct HandlerSet {
    pub(crate) on_connect: Option<LifecycleCallback>,
    pub(crate) on_disconnect: Option<LifecycleCallback>,
    pub(crate) on_message: Option<EnvelopeCallback>,
    pub(crate) on_new_item: Option<ItemCallback>,
    pub(crate) on_status_update: Option<EnvelopeCallback>,
    pub(crate) on_typing_indicator: Option<EnvelopeCallback>,
}

impl fmt::Debug for HandlerSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("HandlerSet")
            .field("on_connect", &self.on_connect.is_some())
            .field("on_disconnect", &self.on_disconnect.is_some())
            .field("on_message", &self.on_message.is_some())
            .field("on_new_item", &self.on_new_item.is_some())
            .field("on_status_update", &self.on_status_update.is_some())
            .field("on_typing_indicator", &self.on_typing_indicator.is_some())
            .finish()
    }
}

impl HandlerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Called after every successful (re)connect
    pub fn on_connect(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_connect = Some(Arc::new(f));
        self
    }

    /// Called when the connection is torn down or lost
    pub fn on_disconnect(mut self, f: impl Fn() + Send + Sync + 'static) -> Self {
        self.on_disconnect = Some(Arc::new(f));
        self
    }

    /// Called for envelopes of any type other than the three typed ones
    pub fn on_message(mut self, f: impl Fn(&Envelope, &Topic) + Send + Sync + 'static) -> Self {
        self.on_message = Some(Arc::new(f));
        self
    }

    /// Called with the unwrapped item of a NEW_ITEM envelope
    pub fn on_new_item(mut self, f: impl Fn(&Value, &Topic) + Send + Sync + 'static) -> Self {
        self.on_new_item = Some(Arc::new(f));
        self
    }

    pub fn on_status_update(
        mut self,
        f: impl Fn(&Envelope, &Topic) + Send + Sync + 'static,
    ) -> Self {
        self.on_status_update = Some(Arc::new(f));
        self
    }

    pub fn on_typing_indicator(
        mut self,
        f: impl Fn(&Envelope, &Topic) + Send + Sync + 'static,
    ) -> Self {
        self.on_typing_indicator = Some(Arc::new(f));
        self
    }
}

/// Registered handler sets in registration order
pub type HandlerSnapshot = Vec<(ConsumerKey, HandlerSet)>;

/// Maps consumer keys to handler sets
///
/// Holds no topic state, so adding or removing handlers never touches subscriptions.
pub struct HandlerRegistry {
    /// Insertion-ordered; re-registering a key keeps its original position
    handlers: Arc<RwLock<Vec<(ConsumerKey, HandlerSet)>>>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self {
            handlers: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Register or replace the handler set for a consumer (last write wins)
    pub async fn add(&self, key: ConsumerKey, set: HandlerSet) {
        let mut handlers = self.handlers.write().await;
        if let Some(slot) = handlers.iter_mut().find(|(k, _)| *k == key) {
            slot.1 = set;
            tracing::debug!(consumer = %key, "Replaced message handler");
        } else {
            tracing::info!(
                consumer = %key,
                total_handlers = handlers.len() + 1,
                "Added message handler"
            );
            handlers.push((key, set));
        }
    }

    /// Remove a consumer's handler set; returns whether one was registered
    pub async fn remove(&self, key: &ConsumerKey) -> bool {
        let mut handlers = self.handlers.write().await;
        let before = handlers.len();
        handlers.retain(|(k, _)| k != key);
        let removed = handlers.len() < before;
        if removed {
            tracing::info!(consumer = %key, "Removed message handler");
        }
        removed
    }

    pub async fn keys(&self) -> Vec<ConsumerKey> {
        let handlers = self.handlers.read().await;
        handlers.iter().map(|(k, _)| k.clone()).collect()
    }

    pub async fn len(&self) -> usize {
        self.handlers.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.handlers.read().await.is_empty()
    }

    /// Copy of the current registrations for one dispatch
    ///
    /// Handlers added or removed while a frame is being dispatched only take
    /// effect from the next frame.
    pub async fn snapshot(&self) -> HandlerSnapshot {
        self.handlers.read().await.clone()
    }
}

impl Default for HandlerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Fire `on_connect` on every handler set that has one
pub(crate) fn notify_connect(handlers: &[(ConsumerKey, HandlerSet)]) {
    for (key, set) in handlers {
        if let Some(cb) = &set.on_connect {
            invoke_guarded(key.as_str(), "on_connect", || cb());
        }
    }
}

/// Fire `on_disconnect` on every handler set that has one
pub(crate) fn notify_disconnect(handlers: &[(ConsumerKey, HandlerSet)]) {
    for (key, set) in handlers {
        if let Some(cb) = &set.on_disconnect {
            invoke_guarded(key.as_str(), "on_disconnect", || cb());
        }
    }
}

/// Run a consumer callback, containing any panic to that consumer
pub(crate) fn invoke_guarded(consumer: &str, callback: &'static str, f: impl FnOnce()) {
    if catch_unwind(AssertUnwindSafe(f)).is_err() {
        tracing::error!(consumer = %consumer, callback, "Handler panicked; continuing dispatch");
    }
}
