//! WebSocket transport over tokio-tungstenite

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use super::{Connector, TransportLink};
use crate::error::{RealtimeError, RealtimeResult};

/// Opens plain `ws://` or TLS `wss://` links
///
/// Each link runs a writer pump and a reader pump. Dropping the sink closes
/// the socket; the inbound channel ends when the server closes or errors.
#[derive(Debug, Clone, Copy, Default)]
pub struct WebSocketConnector;

impl Connector for WebSocketConnector {
    fn open(&self, url: &Url) -> BoxFuture<'static, RealtimeResult<TransportLink>> {
        let url = url.to_string();
        Box::pin(async move {
            let (ws, _response) = connect_async(url.as_str())
                .await
                .map_err(|e| RealtimeError::ConnectFailed(e.to_string()))?;
            tracing::debug!(url = %url, "WebSocket opened");

            let (mut ws_tx, mut ws_rx) = ws.split();
            let (out_tx, mut out_rx) = mpsc::unbounded_channel::<String>();
            let (in_tx, in_rx) = mpsc::unbounded_channel::<String>();

            tokio::spawn(async move {
                while let Some(text) = out_rx.recv().await {
                    if let Err(e) = ws_tx.send(Message::Text(text.into())).await {
                        tracing::warn!(error = %e, "WebSocket write failed");
                        break;
                    }
                }
                let _ = ws_tx.close().await;
            });

            tokio::spawn(async move {
                while let Some(message) = ws_rx.next().await {
                    let text = match message {
                        Ok(Message::Text(text)) => text.as_str().to_owned(),
                        Ok(Message::Binary(data)) => match String::from_utf8(data.to_vec()) {
                            Ok(text) => text,
                            Err(_) => {
                                tracing::warn!(bytes = data.len(), "Dropping non-UTF-8 binary message");
                                continue;
                            }
                        },
                        Ok(Message::Close(frame)) => {
                            tracing::debug!(?frame, "WebSocket closed by server");
                            break;
                        }
                        // Ping/pong is answered by tungstenite itself
                        Ok(_) => continue,
                        Err(e) => {
                            tracing::warn!(error = %e, "WebSocket read failed");
                            break;
                        }
                    };
                    if in_tx.send(text).is_err() {
                        break;
                    }
                }
            });

            Ok(TransportLink {
                sink: Arc::new(out_tx),
                inbound: in_rx,
            })
        })
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_unreachable_endpoint_fails_to_open() {
        // Port 9 (discard) is not expected to speak WebSocket
        let url = Url::parse("ws://127.0.0.1:9/ws/websocket").unwrap();
        let result = WebSocketConnector.open(&url).await;
        assert!(matches!(result, Err(RealtimeError::ConnectFailed(_))));
    }
}
