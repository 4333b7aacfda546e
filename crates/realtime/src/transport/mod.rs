//! Transport seam
//!
//! A [`Connector`] opens one text-message link to the broker. The client only
//! ever sees a [`TransportLink`]: a synchronous sink for outbound STOMP text
//! and a channel of inbound messages that ends when the link closes.

use std::sync::Arc;

use futures::future::BoxFuture;
use tokio::sync::mpsc;
use url::Url;

use crate::error::{RealtimeError, RealtimeResult};

mod websocket;

#[cfg(test)]
pub(crate) mod mock;

pub use websocket::WebSocketConnector;

/// Outbound half of a link
pub trait FrameSink: Send + Sync {
    /// Queue one text message; fails once the link is gone
    fn send_text(&self, text: String) -> RealtimeResult<()>;
}

impl FrameSink for mpsc::UnboundedSender<String> {
    fn send_text(&self, text: String) -> RealtimeResult<()> {
        self.send(text)
            .map_err(|_| RealtimeError::SendFailed("transport closed".to_string()))
    }
}

/// An open link to the broker
pub struct TransportLink {
    pub sink: Arc<dyn FrameSink>,
    /// Yields `None` once the remote side closes or the link fails
    pub inbound: mpsc::UnboundedReceiver<String>,
}

/// Opens transport links
pub trait Connector: Send + Sync + 'static {
    fn open(&self, url: &Url) -> BoxFuture<'static, RealtimeResult<TransportLink>>;
}
