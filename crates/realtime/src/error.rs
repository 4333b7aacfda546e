//! Real-time client error types

use crate::stomp::StompError;

/// Error type for real-time client operations
#[derive(Debug, thiserror::Error)]
pub enum RealtimeError {
    // Subscription errors
    #[error("Topic id is required")]
    InvalidTopic,
    #[error("Not connected to the realtime endpoint")]
    NotConnected,

    // Connection errors
    #[error("Failed to open transport: {0}")]
    ConnectFailed(String),
    #[error("Transport closed unexpectedly")]
    TransportClosed,
    #[error("No heart-beat from server within {0}ms")]
    HeartbeatTimeout(u64),
    #[error("Timed out waiting for {0}")]
    Timeout(&'static str),
    #[error("Session task panicked")]
    SessionPanicked,

    // Malformed frames
    #[error("Malformed frame: {0}")]
    MalformedFrame(#[from] StompError),
    #[error("Invalid envelope: {0}")]
    InvalidEnvelope(#[from] serde_json::Error),

    // Broker-side failures
    #[error("Broker error: {0}")]
    Broker(String),

    // Publish errors
    #[error("Failed to send frame: {0}")]
    SendFailed(String),
}

/// Result type for real-time client operations
pub type RealtimeResult<T> = Result<T, RealtimeError>;
