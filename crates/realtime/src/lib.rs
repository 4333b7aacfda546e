//! ResolveIT real-time update client
//!
//! Keeps one STOMP-over-WebSocket connection to the grievance backend and
//! delivers remark, status and typing events to the dashboard views.
//!
//! - [`RealtimeClient`] manages the connection lifecycle and bounded reconnects
//! - subscriptions bind a [`Topic`] to per-topic [`SubscriptionCallbacks`]
//! - the [`router`] classifies each envelope and fans it out
//! - views register a [`HandlerSet`] under a consumer key and receive events
//!   for every subscribed topic

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod handlers;
pub mod reconnect;
pub mod router;
pub mod stomp;
pub mod subscription;
pub mod topic;
pub mod transport;

pub use client::{ConnectionState, RealtimeClient, RealtimeStats};
pub use config::{ConfigError, RealtimeConfig};
pub use error::{RealtimeError, RealtimeResult};
pub use events::{Envelope, EventKind, OutboundEvent};
pub use handlers::{ConsumerKey, HandlerSet};
pub use reconnect::{Backoff, ReconnectPolicy};
pub use router::Route;
pub use subscription::SubscriptionCallbacks;
pub use topic::{SubscriptionKey, Topic};
pub use transport::{Connector, FrameSink, TransportLink, WebSocketConnector};
