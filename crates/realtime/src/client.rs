//! Real-time client
//!
//! [`RealtimeClient`] owns the single broker connection and the two registries.
//! A spawned session task performs the STOMP handshake, reads inbound frames,
//! keeps heart-beats flowing and hands messages to the router. When the link
//! dies unexpectedly the session clears all subscriptions, notifies handlers
//! and schedules a bounded reconnect.
//!
//! Every connection attempt gets a generation number. `disconnect` bumps the
//! generation, so sessions and pending reconnects started before it become
//! inert even if they are still running.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU32, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use futures::FutureExt;
use serde_json::Value;
use tokio::sync::{mpsc, watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, timeout, Instant, MissedTickBehavior};

use resolveit_shared::{GrievanceStatus, TypingState};

use crate::config::RealtimeConfig;
use crate::error::{RealtimeError, RealtimeResult};
use crate::events::{now_rfc3339, OutboundEvent, StatusUpdatePayload};
use crate::handlers::{notify_connect, notify_disconnect, ConsumerKey, HandlerRegistry, HandlerSet};
use crate::router;
use crate::stomp::{self, parse_frames, Command, Frame, HeartBeat, HeartBeatPlan};
use crate::subscription::{Subscription, SubscriptionCallbacks, SubscriptionRegistry};
use crate::topic::{SubscriptionKey, Topic};
use crate::transport::{Connector, FrameSink, TransportLink, WebSocketConnector};

/// Period for heart-beat timers that negotiation disabled
const IDLE_TICK: Duration = Duration::from_secs(3600);

// =============================================================================
// Connection State
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
}

impl ConnectionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Statistics about the client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RealtimeStats {
    pub state: ConnectionState,
    /// Number of live topic subscriptions
    pub active_subscriptions: usize,
    /// Number of registered handler sets
    pub active_handlers: usize,
    /// Automatic reconnect attempts since the last successful connect
    pub reconnect_attempts: u32,
}

// =============================================================================
// Client
// =============================================================================

/// Parameters replayed by every automatic reconnect
#[derive(Clone, Default)]
struct ConnectParams {
    initial: Option<(Topic, SubscriptionCallbacks)>,
}

/// Handshake result handed to the read loop
struct Session {
    sink: Arc<dyn FrameSink>,
    inbound: mpsc::UnboundedReceiver<String>,
    plan: HeartBeatPlan,
}

struct Inner {
    config: RealtimeConfig,
    connector: Arc<dyn Connector>,
    state: watch::Sender<ConnectionState>,
    /// Outbound half of the live link; state transitions happen under this lock
    link: RwLock<Option<Arc<dyn FrameSink>>>,
    task: Mutex<Option<JoinHandle<()>>>,
    generation: AtomicU64,
    reconnect_attempts: AtomicU32,
    subscriptions: SubscriptionRegistry,
    handlers: HandlerRegistry,
}

/// Handle to the real-time connection; clones share one connection
#[derive(Clone)]
pub struct RealtimeClient {
    inner: Arc<Inner>,
}

impl fmt::Debug for RealtimeClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RealtimeClient")
            .field("url", &self.inner.config.url.as_str())
            .field("state", &self.state())
            .finish()
    }
}

impl RealtimeClient {
    /// Create a client that connects over WebSocket
    pub fn new(config: RealtimeConfig) -> Self {
        Self::with_connector(config, Arc::new(WebSocketConnector))
    }

    /// Create a client over an explicit transport
    pub fn with_connector(config: RealtimeConfig, connector: Arc<dyn Connector>) -> Self {
        Self {
            inner: Arc::new(Inner {
                config,
                connector,
                state: watch::channel(ConnectionState::Disconnected).0,
                link: RwLock::new(None),
                task: Mutex::new(None),
                generation: AtomicU64::new(0),
                reconnect_attempts: AtomicU32::new(0),
                subscriptions: SubscriptionRegistry::new(),
                handlers: HandlerRegistry::new(),
            }),
        }
    }

    pub fn config(&self) -> &RealtimeConfig {
        &self.inner.config
    }

    // -------------------------------------------------------------------------
    // Connection lifecycle
    // -------------------------------------------------------------------------

    /// Start connecting in the background
    ///
    /// A no-op while connected or connecting. Returns whether a new attempt
    /// was started; the outcome is reported through handler callbacks and
    /// [`state_changes`](Self::state_changes).
    pub async fn connect(&self) -> bool {
        self.begin_connect(ConnectParams::default(), None).await
    }

    /// Like [`connect`](Self::connect), and subscribe `topic` once connected
    ///
    /// The subscription is only created when `callbacks` has an `on_message`
    /// callback. It is re-created after every automatic reconnect.
    pub async fn connect_with(&self, topic: Topic, callbacks: SubscriptionCallbacks) -> bool {
        let params = ConnectParams {
            initial: Some((topic, callbacks)),
        };
        self.begin_connect(params, None).await
    }

    /// Tear down every subscription and close the connection
    ///
    /// Cancels any pending reconnect. Handler sets stay registered and get
    /// `on_connect` again after the next successful connect.
    pub async fn disconnect(&self) {
        let inner = &self.inner;
        let (previous, link) = {
            let mut link = inner.link.write().await;
            let mut previous = ConnectionState::Disconnected;
            inner.state.send_if_modified(|state| {
                inner.generation.fetch_add(1, Ordering::SeqCst);
                previous = *state;
                *state = ConnectionState::Disconnected;
                previous != ConnectionState::Disconnected
            });
            (previous, link.take())
        };

        if let Some(task) = inner.task.lock().await.take() {
            task.abort();
        }

        let subscriptions = inner.subscriptions.drain().await;
        if let Some(sink) = &link {
            for sub in &subscriptions {
                let _ = sink.send_text(Frame::unsubscribe(sub.key.as_str()).encode());
            }
            let _ = sink.send_text(Frame::disconnect().encode());
        }
        drop(link);
        inner.reconnect_attempts.store(0, Ordering::SeqCst);

        if previous == ConnectionState::Disconnected {
            tracing::debug!("Realtime client already disconnected");
            return;
        }

        tracing::info!(
            dropped_subscriptions = subscriptions.len(),
            "Realtime connection closed"
        );
        notify_disconnect(&inner.handlers.snapshot().await);
    }

    /// Alias of [`disconnect`](Self::disconnect)
    pub async fn shutdown(&self) {
        self.disconnect().await;
    }

    pub fn state(&self) -> ConnectionState {
        *self.inner.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// Receiver observing every state transition
    pub fn state_changes(&self) -> watch::Receiver<ConnectionState> {
        self.inner.state.subscribe()
    }

    /// Wait until the client reaches `target`; false on timeout
    pub async fn wait_for_state(&self, target: ConnectionState, within: Duration) -> bool {
        let mut changes = self.state_changes();
        let reached = matches!(
            timeout(within, changes.wait_for(|state| *state == target)).await,
            Ok(Ok(_))
        );
        reached
    }

    /// Automatic reconnect attempts since the last successful connect
    pub fn reconnect_attempts(&self) -> u32 {
        self.inner.reconnect_attempts.load(Ordering::SeqCst)
    }

    // -------------------------------------------------------------------------
    // Subscriptions
    // -------------------------------------------------------------------------

    /// Subscribe to a topic, replacing any existing subscription for it
    ///
    /// Fails without retrying when the topic has no id or the client is not
    /// connected; the error is also passed to `callbacks.on_error`.
    pub async fn subscribe(
        &self,
        topic: Topic,
        callbacks: SubscriptionCallbacks,
    ) -> RealtimeResult<SubscriptionKey> {
        if !topic.is_valid() {
            tracing::error!(topic = %topic, "Cannot subscribe: topic id is required");
            let err = RealtimeError::InvalidTopic;
            callbacks.report_error(&topic, &err);
            return Err(err);
        }

        let mut subscriptions = self.inner.subscriptions.write().await;
        let Some(sink) = self.connected_sink().await else {
            drop(subscriptions);
            tracing::error!(topic = %topic, "Cannot subscribe: not connected");
            let err = RealtimeError::NotConnected;
            callbacks.report_error(&topic, &err);
            return Err(err);
        };

        if let Some(previous) = subscriptions.remove(&topic) {
            tracing::info!(topic = %topic, "Already subscribed to topic, resubscribing");
            if let Err(e) = sink.send_text(Frame::unsubscribe(previous.key.as_str()).encode()) {
                tracing::warn!(topic = %topic, error = %e, "Failed to unsubscribe previous subscription");
            }
        }

        let destination = topic.destination(&self.inner.config.topic_prefix);
        let subscription = Subscription::new(topic.clone(), destination, callbacks);
        let frame = Frame::subscribe(subscription.key.as_str(), &subscription.destination);
        if let Err(err) = sink.send_text(frame.encode()) {
            drop(subscriptions);
            tracing::error!(topic = %topic, error = %err, "Failed to subscribe");
            subscription.callbacks.report_error(&topic, &err);
            return Err(err);
        }

        let key = subscription.key.clone();
        tracing::info!(
            topic = %topic,
            destination = %subscription.destination,
            total_subscriptions = subscriptions.len() + 1,
            "Subscribed to topic"
        );
        subscriptions.insert(topic, subscription);
        Ok(key)
    }

    /// Remove a topic's subscription; returns whether one existed
    pub async fn unsubscribe(&self, topic: &Topic) -> bool {
        let Some(subscription) = self.inner.subscriptions.remove(topic).await else {
            tracing::debug!(topic = %topic, "Not subscribed to topic");
            return false;
        };

        if let Some(sink) = self.inner.link.read().await.as_ref() {
            if let Err(e) = sink.send_text(Frame::unsubscribe(subscription.key.as_str()).encode()) {
                tracing::warn!(topic = %topic, error = %e, "Failed to send UNSUBSCRIBE");
            }
        }

        tracing::info!(topic = %topic, "Unsubscribed from topic");
        true
    }

    pub async fn is_subscribed(&self, topic: &Topic) -> bool {
        self.inner.subscriptions.contains(topic).await
    }

    pub async fn subscription_count(&self) -> usize {
        self.inner.subscriptions.len().await
    }

    pub async fn active_topics(&self) -> Vec<Topic> {
        self.inner.subscriptions.topics().await
    }

    // -------------------------------------------------------------------------
    // Handlers
    // -------------------------------------------------------------------------

    /// Register a consumer's handlers, replacing any previous set for the key
    pub async fn add_handler(&self, key: impl Into<ConsumerKey>, handlers: HandlerSet) {
        self.inner.handlers.add(key.into(), handlers).await;
    }

    pub async fn remove_handler(&self, key: impl Into<ConsumerKey>) -> bool {
        self.inner.handlers.remove(&key.into()).await
    }

    pub async fn active_handler_keys(&self) -> Vec<ConsumerKey> {
        self.inner.handlers.keys().await
    }

    // -------------------------------------------------------------------------
    // Publishing
    // -------------------------------------------------------------------------

    /// Tell other viewers of the topic whether `user_id` is typing
    pub async fn send_typing_indicator(&self, topic: &Topic, user_id: &str, is_typing: bool) -> bool {
        let event = OutboundEvent::TypingIndicator {
            topic_entity_id: topic.id().to_string(),
            user_id: user_id.to_string(),
            payload: TypingState {
                user_id: user_id.to_string(),
                is_typing,
            },
            timestamp: now_rfc3339(),
        };
        self.publish(topic, event).await
    }

    pub async fn send_new_item(&self, topic: &Topic, item: Value, user_id: &str) -> bool {
        let event = OutboundEvent::NewItem {
            topic_entity_id: topic.id().to_string(),
            user_id: user_id.to_string(),
            payload: item,
            timestamp: now_rfc3339(),
        };
        self.publish(topic, event).await
    }

    pub async fn send_status_update(
        &self,
        topic: &Topic,
        status: GrievanceStatus,
        note: Option<&str>,
        user_id: &str,
    ) -> bool {
        let event = OutboundEvent::StatusUpdate {
            topic_entity_id: topic.id().to_string(),
            user_id: user_id.to_string(),
            payload: StatusUpdatePayload {
                status: status.as_str().to_string(),
                note: note
                    .map(str::trim)
                    .filter(|n| !n.is_empty())
                    .map(str::to_string),
            },
            timestamp: now_rfc3339(),
        };
        self.publish(topic, event).await
    }

    async fn publish(&self, topic: &Topic, event: OutboundEvent) -> bool {
        let Some(sink) = self.connected_sink().await else {
            tracing::warn!(topic = %topic, kind = %event.kind(), "Cannot publish: not connected");
            return false;
        };
        if !topic.is_valid() {
            tracing::warn!(topic = %topic, kind = %event.kind(), "Cannot publish: topic id is required");
            return false;
        }

        let body = match serde_json::to_string(&event) {
            Ok(body) => body,
            Err(e) => {
                tracing::error!(topic = %topic, error = %e, "Failed to serialize event");
                return false;
            }
        };

        let destination = topic.app_destination(&self.inner.config.app_prefix, event.action());
        match sink.send_text(Frame::send_json(&destination, body).encode()) {
            Ok(()) => {
                tracing::debug!(topic = %topic, destination = %destination, kind = %event.kind(), "Published event");
                true
            }
            Err(e) => {
                tracing::warn!(topic = %topic, error = %e, "Failed to publish event");
                false
            }
        }
    }

    pub async fn stats(&self) -> RealtimeStats {
        RealtimeStats {
            state: self.state(),
            active_subscriptions: self.inner.subscriptions.len().await,
            active_handlers: self.inner.handlers.len().await,
            reconnect_attempts: self.reconnect_attempts(),
        }
    }

    // -------------------------------------------------------------------------
    // Session internals
    // -------------------------------------------------------------------------

    async fn connected_sink(&self) -> Option<Arc<dyn FrameSink>> {
        let link = self.inner.link.read().await;
        if self.state() != ConnectionState::Connected {
            return None;
        }
        link.as_ref().map(Arc::clone)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.inner.generation.load(Ordering::SeqCst) == generation
    }

    /// Move to `to` unless a newer generation took over; caller holds the link lock
    fn transition(&self, generation: u64, to: ConnectionState) -> bool {
        let inner = &self.inner;
        let mut applied = false;
        inner.state.send_if_modified(|state| {
            if inner.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            applied = true;
            let changed = *state != to;
            *state = to;
            changed
        });
        applied
    }

    /// Disconnected -> Connecting, then spawn a session
    ///
    /// `resume_from` is set for automatic reconnects and only proceeds if no
    /// disconnect or manual connect happened since that generation ended.
    async fn begin_connect(&self, params: ConnectParams, resume_from: Option<u64>) -> bool {
        let inner = &self.inner;
        let mut generation = 0;
        let started = inner.state.send_if_modified(|state| {
            let allowed = *state == ConnectionState::Disconnected
                && resume_from.map_or(true, |g| inner.generation.load(Ordering::SeqCst) == g);
            if allowed {
                generation = inner.generation.fetch_add(1, Ordering::SeqCst) + 1;
                *state = ConnectionState::Connecting;
            }
            allowed
        });

        if !started {
            match resume_from {
                None => tracing::debug!(state = %self.state(), "Connect ignored: already active"),
                Some(_) => tracing::debug!("Reconnect cancelled"),
            }
            return false;
        }

        if resume_from.is_none() {
            inner.reconnect_attempts.store(0, Ordering::SeqCst);
        }

        let handle = self.spawn_session(generation, params);
        *inner.task.lock().await = Some(handle);
        true
    }

    /// Run a session; a panic inside it still ends the session normally
    fn spawn_session(&self, generation: u64, params: ConnectParams) -> JoinHandle<()> {
        let client = self.clone();
        tokio::spawn(async move {
            let session = client.clone().run_session(generation, params.clone());
            if AssertUnwindSafe(session).catch_unwind().await.is_err() {
                tracing::error!(generation, "Realtime session task panicked");
                let was_connected = client.state() == ConnectionState::Connected;
                client
                    .handle_session_end(generation, params, RealtimeError::SessionPanicked, was_connected)
                    .await;
            }
        })
    }

    async fn run_session(self, generation: u64, params: ConnectParams) {
        let (reason, was_connected) = match self.establish(generation).await {
            Ok(Some(session)) => {
                self.on_established(generation, &params).await;
                (self.read_loop(generation, session).await, true)
            }
            Ok(None) => return,
            Err(err) => (err, false),
        };
        self.handle_session_end(generation, params, reason, was_connected)
            .await;
    }

    /// Open the transport and complete the STOMP handshake
    async fn establish(&self, generation: u64) -> RealtimeResult<Option<Session>> {
        let config = &self.inner.config;
        tracing::info!(url = %config.url, "Connecting to realtime endpoint");

        let TransportLink { sink, mut inbound } =
            timeout(config.connect_timeout, self.inner.connector.open(&config.url))
                .await
                .map_err(|_| RealtimeError::Timeout("transport open"))??;

        sink.send_text(Frame::connect(&config.stomp_host(), config.heart_beat).encode())?;
        let server_heart_beat = timeout(config.connect_timeout, await_connected(&mut inbound))
            .await
            .map_err(|_| RealtimeError::Timeout("CONNECTED frame"))??;
        let plan = HeartBeatPlan::negotiate(config.heart_beat, server_heart_beat);

        let mut link = self.inner.link.write().await;
        if !self.transition(generation, ConnectionState::Connected) {
            tracing::debug!("Connection superseded during handshake");
            return Ok(None);
        }
        *link = Some(Arc::clone(&sink));
        drop(link);

        self.inner.reconnect_attempts.store(0, Ordering::SeqCst);
        tracing::info!(
            url = %config.url,
            send_heartbeat_ms = plan.send_every.map(|d| d.as_millis() as u64),
            expect_heartbeat_ms = plan.expect_within.map(|d| d.as_millis() as u64),
            "Realtime connection established"
        );

        Ok(Some(Session {
            sink,
            inbound,
            plan,
        }))
    }

    /// Initial subscription and `on_connect`, skipped once the session is superseded
    async fn on_established(&self, generation: u64, params: &ConnectParams) {
        if !self.is_current(generation) {
            return;
        }
        if let Some((topic, callbacks)) = &params.initial {
            if callbacks.has_message_callback() {
                if let Err(e) = self.subscribe(topic.clone(), callbacks.clone()).await {
                    tracing::warn!(topic = %topic, error = %e, "Initial subscription failed");
                }
            }
        }

        let handlers = self.inner.handlers.snapshot().await;
        if !self.is_current(generation) {
            tracing::debug!("Connection superseded before on_connect");
            return;
        }
        notify_connect(&handlers);
    }

    /// Pump inbound frames and heart-beats until the link fails
    async fn read_loop(&self, generation: u64, session: Session) -> RealtimeError {
        let Session {
            sink,
            mut inbound,
            plan,
        } = session;

        let now = Instant::now();
        let send_period = plan.send_every.unwrap_or(IDLE_TICK);
        let mut send_ticker = interval_at(now + send_period, send_period);
        send_ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let check_period = plan.expect_within.map(|w| w / 2).unwrap_or(IDLE_TICK);
        let mut watchdog = interval_at(now + check_period, check_period);
        let mut last_inbound = now;

        loop {
            tokio::select! {
                message = inbound.recv() => {
                    let Some(text) = message else {
                        return RealtimeError::TransportClosed;
                    };
                    last_inbound = Instant::now();
                    self.handle_inbound(generation, &text).await;
                }
                _ = send_ticker.tick(), if plan.send_every.is_some() => {
                    if let Err(e) = sink.send_text("\n".to_string()) {
                        return e;
                    }
                }
                _ = watchdog.tick(), if plan.expect_within.is_some() => {
                    if let Some(window) = plan.expect_within {
                        if last_inbound.elapsed() > window {
                            return RealtimeError::HeartbeatTimeout(window.as_millis() as u64);
                        }
                    }
                }
            }
        }
    }

    async fn handle_inbound(&self, generation: u64, text: &str) {
        for frame in stomp::frames(text) {
            if !self.is_current(generation) {
                return;
            }
            let frame = match frame {
                Ok(frame) => frame,
                Err(e) => {
                    tracing::warn!(error = %e, "Dropping malformed STOMP frame");
                    continue;
                }
            };
            match frame.command {
                Command::Message => self.route_message(&frame).await,
                Command::Error => self.handle_broker_error(&frame).await,
                Command::Receipt => {
                    tracing::debug!(receipt = frame.get("receipt-id"), "Broker receipt");
                }
                other => tracing::debug!(command = %other, "Ignoring unexpected frame"),
            }
        }
    }

    async fn route_message(&self, frame: &Frame) {
        let Some(key) = frame.get("subscription") else {
            tracing::warn!(destination = frame.get("destination"), "MESSAGE without subscription header");
            return;
        };
        let Some(subscription) = self.inner.subscriptions.find_by_key(key).await else {
            tracing::debug!(subscription = key, "Dropping message for inactive subscription");
            return;
        };

        let handlers = self.inner.handlers.snapshot().await;
        if let Ok(route) = router::dispatch(&subscription, &handlers, &frame.body) {
            tracing::debug!(topic = %subscription.topic, ?route, handlers = handlers.len(), "Message dispatched");
        }
    }

    /// Broker ERROR frames are reported, never fatal to the connection
    async fn handle_broker_error(&self, frame: &Frame) {
        let message = frame.get("message").unwrap_or("unspecified broker error").to_string();
        tracing::error!(message = %message, body = %frame.body, "Broker sent ERROR frame");

        let Some(receipt) = frame.get("receipt-id") else {
            return;
        };
        if let Some(subscription) = self.inner.subscriptions.find_by_key(receipt).await {
            subscription
                .callbacks
                .report_error(&subscription.topic, &RealtimeError::Broker(message));
        }
    }

    async fn handle_session_end(
        &self,
        generation: u64,
        params: ConnectParams,
        reason: RealtimeError,
        was_connected: bool,
    ) {
        {
            let mut link = self.inner.link.write().await;
            if !self.transition(generation, ConnectionState::Disconnected) {
                tracing::debug!(error = %reason, "Superseded session ended");
                return;
            }
            link.take();
        }

        let dropped = self.inner.subscriptions.drain().await;
        if was_connected {
            tracing::warn!(
                error = %reason,
                dropped_subscriptions = dropped.len(),
                "Realtime connection lost"
            );
            notify_disconnect(&self.inner.handlers.snapshot().await);
        } else {
            tracing::warn!(error = %reason, "Realtime connection attempt failed");
        }

        self.schedule_reconnect(generation, params);
    }

    fn schedule_reconnect(&self, generation: u64, params: ConnectParams) {
        let policy = self.inner.config.reconnect;
        let attempt = self.reconnect_attempts() + 1;
        let Some(delay) = policy.delay_for(attempt) else {
            tracing::warn!(
                max_attempts = policy.max_attempts,
                "Reconnect attempts exhausted; call connect() to retry"
            );
            return;
        };

        self.inner.reconnect_attempts.store(attempt, Ordering::SeqCst);
        tracing::info!(
            attempt,
            max_attempts = policy.max_attempts,
            delay_ms = delay.as_millis() as u64,
            "Scheduling reconnect"
        );

        let client = self.clone();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            client.begin_connect(params, Some(generation)).await;
        });
    }
}

/// Read until CONNECTED; returns the broker's heart-beat offer
async fn await_connected(
    inbound: &mut mpsc::UnboundedReceiver<String>,
) -> RealtimeResult<HeartBeat> {
    while let Some(text) = inbound.recv().await {
        for frame in parse_frames(&text)? {
            match frame.command {
                Command::Connected => {
                    let heart_beat = frame
                        .get("heart-beat")
                        .and_then(|hb| hb.parse().ok())
                        .unwrap_or_default();
                    return Ok(heart_beat);
                }
                Command::Error => {
                    let message = frame.get("message").unwrap_or("connection rejected");
                    return Err(RealtimeError::Broker(message.to_string()));
                }
                other => tracing::debug!(command = %other, "Ignoring frame before CONNECTED"),
            }
        }
    }
    Err(RealtimeError::TransportClosed)
}
