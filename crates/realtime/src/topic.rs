//! Topics and subscription keys
//!
//! A [`Topic`] names the event stream of one entity (`grievance/42`). It maps
//! to a broker destination for inbound events and to application
//! destinations for the publish operations.

use resolveit_shared::GrievanceId;

/// Entity kind used for grievance topics
pub const GRIEVANCE_KIND: &str = "grievance";

/// Logical event stream about one entity
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Topic {
    kind: String,
    id: String,
}

impl Topic {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }

    /// Topic carrying remarks, status changes and typing for one grievance
    pub fn grievance(id: impl Into<GrievanceId>) -> Self {
        Self::new(GRIEVANCE_KIND, id.into().0)
    }

    pub fn kind(&self) -> &str {
        &self.kind
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// A topic without an entity id cannot be subscribed or published to
    pub fn is_valid(&self) -> bool {
        !self.kind.trim().is_empty() && !self.id.trim().is_empty()
    }

    /// Opaque key identifying this stream, e.g. `grievance/42`
    pub fn key(&self) -> String {
        format!("{}/{}", self.kind, self.id)
    }

    /// Broker destination for inbound events, e.g. `/topic/grievance/42`
    pub fn destination(&self, topic_prefix: &str) -> String {
        format!("{}/{}/{}", topic_prefix.trim_end_matches('/'), self.kind, self.id)
    }

    /// Application destination for a publish action, e.g. `/app/grievance/42/typing`
    pub fn app_destination(&self, app_prefix: &str, action: &str) -> String {
        format!(
            "{}/{}/{}/{}",
            app_prefix.trim_end_matches('/'),
            self.kind,
            self.id,
            action
        )
    }

    /// `sub-{kind}-{id}` with `%` and `-` escaped inside each part, so no two
    /// topics share a key
    pub(crate) fn subscription_key(&self) -> SubscriptionKey {
        SubscriptionKey(format!(
            "sub-{}-{}",
            escape_key_part(&self.kind),
            escape_key_part(&self.id)
        ))
    }
}

fn escape_key_part(part: &str) -> String {
    let mut out = String::with_capacity(part.len());
    for c in part.chars() {
        match c {
            '%' => out.push_str("%25"),
            '-' => out.push_str("%2D"),
            other => out.push(other),
        }
    }
    out
}

impl std::fmt::Display for Topic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}", self.kind, self.id)
    }
}

impl From<GrievanceId> for Topic {
    fn from(id: GrievanceId) -> Self {
        Self::grievance(id)
    }
}

/// Handle returned by a successful subscribe
///
/// Derived from the topic, so re-subscribing the same topic yields the same key,
/// and distinct topics never share one. Doubles as the STOMP subscription id
/// and receipt.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubscriptionKey(String);

impl SubscriptionKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SubscriptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
