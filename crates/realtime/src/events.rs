//! Real-time event types and serialization
//!
//! Inbound [`Envelope`]s arrive as MESSAGE bodies on topic subscriptions;
//! [`OutboundEvent`]s are published to application destinations.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::format_description::well_known::{Iso8601, Rfc3339};
use time::{OffsetDateTime, PrimitiveDateTime};

use resolveit_shared::TypingState;

// =============================================================================
// Event Kinds
// =============================================================================

/// Declared type of an envelope
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum EventKind {
    NewItem,
    StatusUpdate,
    TypingIndicator,
    /// Any other type, kept verbatim
    Other(String),
}

impl EventKind {
    pub fn as_str(&self) -> &str {
        match self {
            Self::NewItem => "NEW_ITEM",
            Self::StatusUpdate => "STATUS_UPDATE",
            Self::TypingIndicator => "TYPING_INDICATOR",
            Self::Other(kind) => kind,
        }
    }
}

impl From<String> for EventKind {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            // The grievance backend still emits NEW_REMARK for posted remarks
            "NEW_ITEM" | "NEW_REMARK" => Self::NewItem,
            "STATUS_UPDATE" => Self::StatusUpdate,
            "TYPING_INDICATOR" => Self::TypingIndicator,
            _ => Self::Other(raw),
        }
    }
}

impl From<EventKind> for String {
    fn from(kind: EventKind) -> Self {
        match kind {
            EventKind::Other(raw) => raw,
            other => other.as_str().to_string(),
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Inbound Envelope
// =============================================================================

/// Typed unit delivered over a subscription
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "RawEnvelope", rename_all = "camelCase")]
pub struct Envelope {
    #[serde(rename = "type")]
    pub kind: EventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub topic_entity_id: Option<String>,
    pub payload: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    /// Remaining top-level fields (`sender`, `userId`, ...)
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Wire shape accepted from the broker, including the backend's legacy field names
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawEnvelope {
    #[serde(rename = "type")]
    kind: EventKind,
    #[serde(default)]
    topic_entity_id: Option<Value>,
    #[serde(default)]
    grievance_id: Option<Value>,
    #[serde(default)]
    payload: Option<Value>,
    #[serde(default)]
    remark: Option<Value>,
    #[serde(default)]
    additional_data: Option<Value>,
    #[serde(default)]
    timestamp: Option<Value>,
    #[serde(flatten)]
    extra: Map<String, Value>,
}

impl From<RawEnvelope> for Envelope {
    fn from(raw: RawEnvelope) -> Self {
        let topic_entity_id = raw
            .topic_entity_id
            .and_then(entity_id)
            .or_else(|| raw.grievance_id.and_then(entity_id));

        let payload = raw
            .payload
            .or(raw.remark)
            .or(raw.additional_data)
            .unwrap_or(Value::Null);

        let timestamp = raw.timestamp.and_then(|ts| match ts {
            Value::String(s) => Some(s),
            Value::Null => None,
            other => Some(other.to_string()),
        });

        Self {
            kind: raw.kind,
            topic_entity_id,
            payload,
            timestamp,
            extra: raw.extra,
        }
    }
}

fn entity_id(value: Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

impl Envelope {
    /// Parse a MESSAGE body
    pub fn parse(body: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(body)
    }

    pub fn new(kind: EventKind, payload: Value) -> Self {
        Self {
            kind,
            topic_entity_id: None,
            payload,
            timestamp: None,
            extra: Map::new(),
        }
    }

    /// True when the envelope carries an item (non-null payload)
    pub fn has_payload(&self) -> bool {
        !self.payload.is_null()
    }

    /// Decode the payload into a typed value
    pub fn decode_payload<T: serde::de::DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        T::deserialize(&self.payload)
    }

    /// Timestamp as UTC; offset-less ISO-8601 values are taken as UTC
    pub fn parsed_timestamp(&self) -> Option<OffsetDateTime> {
        let raw = self.timestamp.as_deref()?;
        OffsetDateTime::parse(raw, &Rfc3339)
            .ok()
            .or_else(|| {
                PrimitiveDateTime::parse(raw, &Iso8601::DEFAULT)
                    .ok()
                    .map(PrimitiveDateTime::assume_utc)
            })
    }

    /// Lookup of a top-level field outside the typed ones
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.extra.get(name)
    }
}

// =============================================================================
// Outbound Events
// =============================================================================

/// Envelopes published by this client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type")]
pub enum OutboundEvent {
    #[serde(rename = "TYPING_INDICATOR", rename_all = "camelCase")]
    TypingIndicator {
        topic_entity_id: String,
        user_id: String,
        payload: TypingState,
        timestamp: String,
    },

    #[serde(rename = "NEW_ITEM", rename_all = "camelCase")]
    NewItem {
        topic_entity_id: String,
        user_id: String,
        payload: Value,
        timestamp: String,
    },

    #[serde(rename = "STATUS_UPDATE", rename_all = "camelCase")]
    StatusUpdate {
        topic_entity_id: String,
        user_id: String,
        payload: StatusUpdatePayload,
        timestamp: String,
    },
}

/// Body of an outbound status change
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdatePayload {
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl OutboundEvent {
    /// Suffix appended to the topic's application destination
    pub fn action(&self) -> &'static str {
        match self {
            Self::TypingIndicator { .. } => "typing",
            Self::NewItem { .. } => "remark",
            Self::StatusUpdate { .. } => "status",
        }
    }

    pub fn kind(&self) -> EventKind {
        match self {
            Self::TypingIndicator { .. } => EventKind::TypingIndicator,
            Self::NewItem { .. } => EventKind::NewItem,
            Self::StatusUpdate { .. } => EventKind::StatusUpdate,
        }
    }
}

/// Current time formatted for the `timestamp` field
pub(crate) fn now_rfc3339() -> String {
    OffsetDateTime::now_utc()
        .format(&Rfc3339)
        .unwrap_or_else(|_| OffsetDateTime::now_utc().unix_timestamp().to_string())
}
