//! Message router
//!
//! Classifies each inbound envelope by its declared type and fans it out to
//! the subscription's own callbacks and to every registered handler set.
//! Dispatch is synchronous and runs on a snapshot of the handler registry.

use crate::error::RealtimeError;
use crate::events::{Envelope, EventKind};
use crate::handlers::{invoke_guarded, ConsumerKey, HandlerSet};
use crate::subscription::Subscription;

/// Delivery path chosen for an envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Route {
    NewItem,
    StatusUpdate,
    TypingIndicator,
    /// Generic `on_message` of every handler set
    Generic,
}

/// Pick the route for an envelope
///
/// A NEW_ITEM without an item has nothing to hand to item callbacks and is
/// routed as a generic message instead.
pub fn classify(envelope: &Envelope) -> Route {
    match envelope.kind {
        EventKind::NewItem if envelope.has_payload() => Route::NewItem,
        EventKind::StatusUpdate => Route::StatusUpdate,
        EventKind::TypingIndicator => Route::TypingIndicator,
        _ => Route::Generic,
    }
}

/// Parse a MESSAGE body and deliver it
///
/// An undecodable body goes to the subscription's `on_error` and reaches no
/// handler.
pub fn dispatch(
    subscription: &Subscription,
    handlers: &[(ConsumerKey, HandlerSet)],
    body: &str,
) -> Result<Route, RealtimeError> {
    let envelope = match Envelope::parse(body) {
        Ok(envelope) => envelope,
        Err(e) => {
            let err = RealtimeError::InvalidEnvelope(e);
            tracing::warn!(
                topic = %subscription.topic,
                error = %err,
                "Dropping undecodable message"
            );
            subscription.callbacks.report_error(&subscription.topic, &err);
            return Err(err);
        }
    };

    Ok(deliver(subscription, handlers, &envelope))
}

/// Deliver a decoded envelope; each callback runs at most once
pub fn deliver(
    subscription: &Subscription,
    handlers: &[(ConsumerKey, HandlerSet)],
    envelope: &Envelope,
) -> Route {
    let topic = &subscription.topic;
    let callbacks = &subscription.callbacks;
    let route = classify(envelope);

    tracing::debug!(topic = %topic, kind = %envelope.kind, ?route, "Routing message");

    match route {
        Route::NewItem => {
            if let Some(cb) = &callbacks.on_message {
                invoke_guarded(subscription.key.as_str(), "on_message", || cb(&envelope.payload));
            }
            for (key, set) in handlers {
                if let Some(cb) = &set.on_new_item {
                    invoke_guarded(key.as_str(), "on_new_item", || cb(&envelope.payload, topic));
                }
            }
        }
        Route::StatusUpdate => {
            if let Some(cb) = &callbacks.on_status_update {
                invoke_guarded(subscription.key.as_str(), "on_status_update", || cb(envelope));
            }
            for (key, set) in handlers {
                if let Some(cb) = &set.on_status_update {
                    invoke_guarded(key.as_str(), "on_status_update", || cb(envelope, topic));
                }
            }
        }
        Route::TypingIndicator => {
            for (key, set) in handlers {
                if let Some(cb) = &set.on_typing_indicator {
                    invoke_guarded(key.as_str(), "on_typing_indicator", || cb(envelope, topic));
                }
            }
        }
        Route::Generic => {
            for (key, set) in handlers {
                if let Some(cb) = &set.on_message {
                    invoke_guarded(key.as_str(), "on_message", || cb(envelope, topic));
                }
            }
        }
    }

    route
}
