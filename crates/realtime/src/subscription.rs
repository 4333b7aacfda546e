//! Subscription registry
//!
//! At most one live subscription exists per topic. The registry only tracks
//! bookkeeping; the client sends the matching SUBSCRIBE/UNSUBSCRIBE frames
//! while holding the write guard so replacement is atomic.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::{RwLock, RwLockWriteGuard};

use crate::error::RealtimeError;
use crate::events::Envelope;
use crate::handlers::invoke_guarded;
use crate::topic::{SubscriptionKey, Topic};

pub type PayloadCallback = Arc<dyn Fn(&Value) + Send + Sync>;
pub type StatusCallback = Arc<dyn Fn(&Envelope) + Send + Sync>;
pub type ErrorCallback = Arc<dyn Fn(&RealtimeError) + Send + Sync>;

/// Callbacks supplied by whoever created a subscription
#[derive(Clone, Default)]
pub struct SubscriptionCallbacks {
    pub(crate) on_message: Option<PayloadCallback>,
    pub(crate) on_status_update: Option<StatusCallback>,
    pub(crate) on_error: Option<ErrorCallback>,
}

impl fmt::Debug for SubscriptionCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriptionCallbacks")
            .field("on_message", &self.on_message.is_some())
            .field("on_status_update", &self.on_status_update.is_some())
            .field("on_error", &self.on_error.is_some())
            .finish()
    }
}

impl SubscriptionCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Receives the item of every NEW_ITEM envelope on the topic
    pub fn on_message(mut self, f: impl Fn(&Value) + Send + Sync + 'static) -> Self {
        self.on_message = Some(Arc::new(f));
        self
    }

    /// Receives every STATUS_UPDATE envelope on the topic
    pub fn on_status_update(mut self, f: impl Fn(&Envelope) + Send + Sync + 'static) -> Self {
        self.on_status_update = Some(Arc::new(f));
        self
    }

    /// Receives subscription failures and undecodable messages
    pub fn on_error(mut self, f: impl Fn(&RealtimeError) + Send + Sync + 'static) -> Self {
        self.on_error = Some(Arc::new(f));
        self
    }

    pub fn has_message_callback(&self) -> bool {
        self.on_message.is_some()
    }

    pub(crate) fn report_error(&self, topic: &Topic, err: &RealtimeError) {
        if let Some(cb) = &self.on_error {
            invoke_guarded(&topic.key(), "on_error", || cb(err));
        }
    }
}

/// A live binding between a topic and its callbacks
#[derive(Debug, Clone)]
pub struct Subscription {
    pub key: SubscriptionKey,
    pub topic: Topic,
    pub destination: String,
    pub(crate) callbacks: SubscriptionCallbacks,
}

impl Subscription {
    pub fn new(topic: Topic, destination: String, callbacks: SubscriptionCallbacks) -> Self {
        Self {
            key: topic.subscription_key(),
            topic,
            destination,
            callbacks,
        }
    }
}

/// Topic to subscription map
pub struct SubscriptionRegistry {
    subscriptions: Arc<RwLock<HashMap<Topic, Subscription>>>,
}

impl SubscriptionRegistry {
    pub fn new() -> Self {
        Self {
            subscriptions: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// Exclusive access for a multi-step change
    pub(crate) async fn write(&self) -> RwLockWriteGuard<'_, HashMap<Topic, Subscription>> {
        self.subscriptions.write().await
    }

    pub async fn contains(&self, topic: &Topic) -> bool {
        self.subscriptions.read().await.contains_key(topic)
    }

    /// Resolve the subscription a MESSAGE or receipt refers to
    pub async fn find_by_key(&self, key: &str) -> Option<Subscription> {
        let subscriptions = self.subscriptions.read().await;
        subscriptions
            .values()
            .find(|sub| sub.key.as_str() == key)
            .cloned()
    }

    pub async fn remove(&self, topic: &Topic) -> Option<Subscription> {
        self.subscriptions.write().await.remove(topic)
    }

    /// Remove every subscription, returning what was active
    pub async fn drain(&self) -> Vec<Subscription> {
        let mut subscriptions = self.subscriptions.write().await;
        subscriptions.drain().map(|(_, sub)| sub).collect()
    }

    /// Active topics in sorted order
    pub async fn topics(&self) -> Vec<Topic> {
        let subscriptions = self.subscriptions.read().await;
        let mut topics: Vec<Topic> = subscriptions.keys().cloned().collect();
        topics.sort();
        topics
    }

    pub async fn len(&self) -> usize {
        self.subscriptions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.subscriptions.read().await.is_empty()
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn subscription(id: &str) -> Subscription {
        let topic = Topic::grievance(id);
        let destination = topic.destination("/topic");
        Subscription::new(topic, destination, SubscriptionCallbacks::new())
    }

    #[tokio::test]
    async fn test_one_subscription_per_topic() {
        let registry = SubscriptionRegistry::new();
        {
            let mut subs = registry.write().await;
            let sub = subscription("g-1");
            subs.insert(sub.topic.clone(), sub);
            let again = subscription("g-1");
            assert!(subs.insert(again.topic.clone(), again).is_some());
        }
        assert_eq!(registry.len().await, 1);
        assert_eq!(registry.topics().await, vec![Topic::grievance("g-1")]);
    }

    #[tokio::test]
    async fn test_find_by_key() {
        let registry = SubscriptionRegistry::new();
        {
            let mut subs = registry.write().await;
            for id in ["g-1", "g-2"] {
                let sub = subscription(id);
                subs.insert(sub.topic.clone(), sub);
            }
        }

        let key = Topic::grievance("g-2").subscription_key();
        let found = registry.find_by_key(key.as_str()).await.unwrap();
        assert_eq!(found.topic, Topic::grievance("g-2"));
        assert_eq!(found.destination, "/topic/grievance/g-2");
        assert!(registry.find_by_key("sub-grievance-g-3").await.is_none());
    }

    #[tokio::test]
    async fn test_remove_and_drain() {
        let registry = SubscriptionRegistry::new();
        {
            let mut subs = registry.write().await;
            for id in ["g-1", "g-2", "g-3"] {
                let sub = subscription(id);
                subs.insert(sub.topic.clone(), sub);
            }
        }

        assert!(registry.remove(&Topic::grievance("g-1")).await.is_some());
        assert!(registry.remove(&Topic::grievance("g-1")).await.is_none());
        assert!(!registry.contains(&Topic::grievance("g-1")).await);

        assert_eq!(registry.drain().await.len(), 2);
        assert!(registry.is_empty().await);
    }

    #[test]
    fn test_report_error_reaches_callback() {
        let errors = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&errors);
        let callbacks = SubscriptionCallbacks::new().on_error(move |err| {
            assert!(matches!(err, RealtimeError::NotConnected));
            counter.fetch_add(1, Ordering::SeqCst);
        });

        callbacks.report_error(&Topic::grievance("g-1"), &RealtimeError::NotConnected);
        SubscriptionCallbacks::new()
            .report_error(&Topic::grievance("g-1"), &RealtimeError::NotConnected);

        assert_eq!(errors.load(Ordering::SeqCst), 1);
    }
}
