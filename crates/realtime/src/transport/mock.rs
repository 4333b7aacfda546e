//! In-process STOMP broker for client tests
//!
//! Frames written to the sink are handled synchronously, so a test can assert
//! on broker state right after a client call returns.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use futures::future::BoxFuture;
use tokio::sync::mpsc;
use url::Url;

use super::{Connector, FrameSink, TransportLink};
use crate::error::{RealtimeError, RealtimeResult};
use crate::stomp::{is_heartbeat, parse_frames, Command, Frame};

#[derive(Clone)]
pub(crate) struct MockBroker {
    state: Arc<Mutex<BrokerState>>,
}

struct BrokerState {
    available: bool,
    reject_connect: bool,
    server_heart_beat: String,
    opens: usize,
    link_id: u64,
    inbound: Option<mpsc::UnboundedSender<String>>,
    received: Vec<Frame>,
    heartbeats: usize,
    panic_on_heartbeat: bool,
    /// destination -> subscription id
    subscriptions: HashMap<String, String>,
}

impl MockBroker {
    pub(crate) fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(BrokerState {
                available: true,
                reject_connect: false,
                server_heart_beat: "0,0".to_string(),
                opens: 0,
                link_id: 0,
                inbound: None,
                received: Vec::new(),
                heartbeats: 0,
                panic_on_heartbeat: false,
                subscriptions: HashMap::new(),
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, BrokerState> {
        match self.state.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// While unavailable every open attempt fails
    pub(crate) fn set_available(&self, available: bool) {
        self.lock().available = available;
    }

    /// Answer CONNECT with an ERROR frame
    pub(crate) fn set_reject_connect(&self, reject: bool) {
        self.lock().reject_connect = reject;
    }

    pub(crate) fn set_server_heart_beat(&self, heart_beat: &str) {
        self.lock().server_heart_beat = heart_beat.to_string();
    }

    /// Make the next heart-beat written by the client panic inside the sink
    pub(crate) fn panic_on_next_heartbeat(&self) {
        self.lock().panic_on_heartbeat = true;
    }

    pub(crate) fn open_count(&self) -> usize {
        self.lock().opens
    }

    pub(crate) fn heartbeat_count(&self) -> usize {
        self.lock().heartbeats
    }

    /// Frames of one command received so far, across all links
    pub(crate) fn received(&self, command: Command) -> Vec<Frame> {
        self.lock()
            .received
            .iter()
            .filter(|f| f.command == command)
            .cloned()
            .collect()
    }

    pub(crate) fn subscription_id(&self, destination: &str) -> Option<String> {
        self.lock().subscriptions.get(destination).cloned()
    }

    /// Deliver a MESSAGE to the subscriber of `destination`
    pub(crate) fn publish(&self, destination: &str, body: &str) -> bool {
        let state = self.lock();
        let (Some(id), Some(inbound)) = (state.subscriptions.get(destination), &state.inbound)
        else {
            return false;
        };
        let frame = Frame::new(Command::Message)
            .header("subscription", id.as_str())
            .header("destination", destination)
            .header("message-id", format!("m-{}", state.received.len()))
            .with_body(body);
        inbound.send(frame.encode()).is_ok()
    }

    /// Push arbitrary text to the live link
    pub(crate) fn send_raw(&self, text: &str) -> bool {
        match &self.lock().inbound {
            Some(inbound) => inbound.send(text.to_string()).is_ok(),
            None => false,
        }
    }

    /// Simulate the server going away
    pub(crate) fn drop_connection(&self) {
        let mut state = self.lock();
        state.inbound = None;
        state.subscriptions.clear();
    }
}

impl Connector for MockBroker {
    fn open(&self, _url: &Url) -> BoxFuture<'static, RealtimeResult<TransportLink>> {
        let broker = self.clone();
        Box::pin(async move {
            let mut state = broker.lock();
            state.opens += 1;
            if !state.available {
                return Err(RealtimeError::ConnectFailed(
                    "connection refused".to_string(),
                ));
            }

            let (in_tx, in_rx) = mpsc::unbounded_channel();
            state.link_id += 1;
            state.inbound = Some(in_tx);
            state.subscriptions.clear();
            let sink = MockSink {
                broker: broker.clone(),
                link_id: state.link_id,
            };
            drop(state);

            Ok(TransportLink {
                sink: Arc::new(sink),
                inbound: in_rx,
            })
        })
    }
}

struct MockSink {
    broker: MockBroker,
    link_id: u64,
}

impl FrameSink for MockSink {
    fn send_text(&self, text: String) -> RealtimeResult<()> {
        let mut state = self.broker.lock();
        if state.link_id != self.link_id || state.inbound.is_none() {
            return Err(RealtimeError::SendFailed("transport closed".to_string()));
        }

        if is_heartbeat(&text) {
            state.heartbeats += 1;
            if std::mem::take(&mut state.panic_on_heartbeat) {
                drop(state);
                panic!("sink failure while writing heart-beat");
            }
            return Ok(());
        }

        for frame in parse_frames(&text)? {
            match frame.command {
                Command::Connect => {
                    let reply = if state.reject_connect {
                        Frame::new(Command::Error)
                            .header("message", "Access denied")
                            .encode()
                    } else {
                        Frame::new(Command::Connected)
                            .header("version", "1.2")
                            .header("heart-beat", state.server_heart_beat.as_str())
                            .encode()
                    };
                    if let Some(inbound) = &state.inbound {
                        let _ = inbound.send(reply);
                    }
                }
                Command::Subscribe => {
                    if let (Some(id), Some(dest)) = (frame.get("id"), frame.get("destination")) {
                        state.subscriptions.insert(dest.to_string(), id.to_string());
                    }
                }
                Command::Unsubscribe => {
                    if let Some(id) = frame.get("id") {
                        state.subscriptions.retain(|_, sub| sub != id);
                    }
                }
                _ => {}
            }
            state.received.push(frame);
        }
        Ok(())
    }
}
