//! Common types used across ResolveIT

use serde::{Deserialize, Serialize};

use crate::error::ResolveError;

// =============================================================================
// ID Wrappers
// =============================================================================

/// Grievance ID wrapper
///
/// The backend uses numeric ids, but ids travel as opaque strings through
/// topics and destinations so the wrapper keeps the textual form.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GrievanceId(pub String);

impl GrievanceId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<u64> for GrievanceId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for GrievanceId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for GrievanceId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl std::fmt::Display for GrievanceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for GrievanceId {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(ResolveError::InvalidId(s.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }
}

// =============================================================================
// Enums
// =============================================================================

/// Lifecycle status of a grievance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrievanceStatus {
    Submitted,
    UnderReview,
    InProgress,
    Resolved,
    Rejected,
}

impl Default for GrievanceStatus {
    fn default() -> Self {
        Self::Submitted
    }
}

impl GrievanceStatus {
    /// Wire representation used by the backend
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::UnderReview => "under_review",
            Self::InProgress => "in_progress",
            Self::Resolved => "resolved",
            Self::Rejected => "rejected",
        }
    }

    /// Resolved and rejected grievances accept no further status changes
    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Resolved | Self::Rejected)
    }
}

impl std::fmt::Display for GrievanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GrievanceStatus {
    type Err = ResolveError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // The dashboard renders statuses as "IN_PROGRESS" or "in-progress" in places
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "submitted" => Ok(Self::Submitted),
            "under_review" => Ok(Self::UnderReview),
            "in_progress" => Ok(Self::InProgress),
            "resolved" => Ok(Self::Resolved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(ResolveError::InvalidStatus(s.to_string())),
        }
    }
}

// =============================================================================
// Real-time Payloads
// =============================================================================

/// A remark posted on a grievance (the item carried by NEW_ITEM events)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Remark {
    pub id: Option<u64>,
    pub message: String,
    #[serde(default)]
    pub user_name: Option<String>,
    #[serde(default)]
    pub user_type: Option<String>,
    #[serde(default)]
    pub is_internal: Option<bool>,
    #[serde(default)]
    pub created_at: Option<String>,
    #[serde(default)]
    pub formatted_time: Option<String>,
}

/// Details of a status transition (the payload of STATUS_UPDATE events)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusChange {
    #[serde(default)]
    pub old_status: Option<String>,
    pub new_status: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub updated_by: Option<String>,
    #[serde(default)]
    pub formatted_time: Option<String>,
}

impl StatusChange {
    /// Parsed new status, if the backend sent a known value
    pub fn status(&self) -> Option<GrievanceStatus> {
        self.new_status.parse().ok()
    }
}

/// Who is typing on a grievance
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TypingState {
    pub user_id: String,
    pub is_typing: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_grievance_status_default() {
        assert_eq!(GrievanceStatus::default(), GrievanceStatus::Submitted);
    }

    #[test]
    fn test_grievance_status_parse_variants() {
        assert_eq!(
            "in_progress".parse::<GrievanceStatus>().unwrap(),
            GrievanceStatus::InProgress
        );
        assert_eq!(
            "UNDER_REVIEW".parse::<GrievanceStatus>().unwrap(),
            GrievanceStatus::UnderReview
        );
        assert_eq!(
            "in-progress".parse::<GrievanceStatus>().unwrap(),
            GrievanceStatus::InProgress
        );
        assert_eq!(
            "closed".parse::<GrievanceStatus>(),
            Err(ResolveError::InvalidStatus("closed".to_string()))
        );
    }

    #[test]
    fn test_grievance_status_serialization() {
        let json = serde_json::to_string(&GrievanceStatus::UnderReview).unwrap();
        assert_eq!(json, r#""under_review""#);
        assert_eq!(GrievanceStatus::UnderReview.to_string(), "under_review");
    }

    #[test]
    fn test_grievance_status_closed() {
        assert!(GrievanceStatus::Resolved.is_closed());
        assert!(GrievanceStatus::Rejected.is_closed());
        assert!(!GrievanceStatus::InProgress.is_closed());
    }

    #[test]
    fn test_grievance_id_parse() {
        assert_eq!(" 42 ".parse::<GrievanceId>().unwrap(), GrievanceId::from(42));
        assert!("   ".parse::<GrievanceId>().is_err());
    }

    #[test]
    fn test_remark_deserialization() {
        let json = r#"{
            "id": 7,
            "message": "We are looking into it",
            "userName": "Jane Staff",
            "userType": "STAFF",
            "isInternal": false,
            "createdAt": "2024-03-01T10:15:30",
            "formattedTime": "Mar 01, 2024 10:15 AM"
        }"#;
        let remark: Remark = serde_json::from_str(json).unwrap();
        assert_eq!(remark.id, Some(7));
        assert_eq!(remark.user_name.as_deref(), Some("Jane Staff"));
        assert_eq!(remark.is_internal, Some(false));
    }

    #[test]
    fn test_status_change_status() {
        let json = r#"{"oldStatus":"submitted","newStatus":"in_progress","note":""}"#;
        let change: StatusChange = serde_json::from_str(json).unwrap();
        assert_eq!(change.status(), Some(GrievanceStatus::InProgress));
        assert_eq!(change.updated_by, None);
    }
}
