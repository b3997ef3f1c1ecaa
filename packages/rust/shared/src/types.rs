//! Core domain types for the Frontdesk escalation agent.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// RequestId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for help-request identifiers (time-sortable).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RequestId(pub Uuid);

impl RequestId {
    /// Generate a new time-sortable request identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RequestId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RequestId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// RequestStatus
// ---------------------------------------------------------------------------

/// Lifecycle state of a help request.
///
/// `Pending` is the only initial state. `Resolved` and `UnresolvedTimeout`
/// are both terminal; nothing transitions out of them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Resolved,
    UnresolvedTimeout,
}

impl RequestStatus {
    /// The stored string form of this status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Resolved => "resolved",
            Self::UnresolvedTimeout => "unresolved_timeout",
        }
    }

    /// Whether this status admits no further transitions.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unrecognized status string.
#[derive(Debug, thiserror::Error)]
#[error("unknown request status: {0}")]
pub struct UnknownStatus(pub String);

impl std::str::FromStr for RequestStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "resolved" => Ok(Self::Resolved),
            "unresolved_timeout" => Ok(Self::UnresolvedTimeout),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

// ---------------------------------------------------------------------------
// KnowledgeEntry
// ---------------------------------------------------------------------------

/// A curated question/answer pair used for automated lookup.
///
/// Entries are externally curated and read-only to the engine. Duplicate
/// queries are allowed; lookups resolve them first-match-wins in insertion
/// order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KnowledgeEntry {
    /// The customer question this entry answers, matched verbatim.
    pub query: String,
    /// The answer sent back to the customer.
    pub answer: String,
}

// ---------------------------------------------------------------------------
// HelpRequest
// ---------------------------------------------------------------------------

/// A tracked, supervisor-bound customer question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelpRequest {
    /// Unique identifier, assigned at creation.
    pub id: RequestId,
    /// Who asked.
    pub customer_id: String,
    /// The original unanswered question text.
    pub customer_query: String,
    /// Lifecycle state.
    pub status: RequestStatus,
    /// Assigned by the store at write time; immutable afterwards.
    pub created_at: DateTime<Utc>,
    /// Set together with `resolved_at` when a supervisor resolves the request.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supervisor_response: Option<String>,
    /// Set together with `supervisor_response` on resolution.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
    /// Whether the customer has been informed of the resolution.
    pub notified_customer: bool,
}

/// The caller-supplied fields of a new help request.
///
/// Everything else (id, status, `created_at`, the resolution fields) is
/// assigned by the store: status is forced to `Pending` and `created_at` is
/// set at write time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewHelpRequest {
    pub customer_id: String,
    pub customer_query: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn request_id_roundtrip() {
        let id = RequestId::new();
        let s = id.to_string();
        let parsed: RequestId = s.parse().expect("parse RequestId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn status_string_roundtrip() {
        for status in [
            RequestStatus::Pending,
            RequestStatus::Resolved,
            RequestStatus::UnresolvedTimeout,
        ] {
            let parsed: RequestStatus = status.as_str().parse().expect("parse status");
            assert_eq!(parsed, status);
        }
    }

    #[test]
    fn status_rejects_unknown_strings() {
        let err = "escalated".parse::<RequestStatus>().unwrap_err();
        assert!(err.to_string().contains("escalated"));
    }

    #[test]
    fn only_pending_is_non_terminal() {
        assert!(!RequestStatus::Pending.is_terminal());
        assert!(RequestStatus::Resolved.is_terminal());
        assert!(RequestStatus::UnresolvedTimeout.is_terminal());
    }

    #[test]
    fn help_request_serialization() {
        let request = HelpRequest {
            id: RequestId::new(),
            customer_id: "cust_123".into(),
            customer_query: "Do you deliver on Sundays?".into(),
            status: RequestStatus::Pending,
            created_at: Utc::now(),
            supervisor_response: None,
            resolved_at: None,
            notified_customer: false,
        };

        let json = serde_json::to_string(&request).expect("serialize");
        assert!(json.contains("\"pending\""));
        assert!(!json.contains("supervisor_response"));

        let parsed: HelpRequest = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.status, RequestStatus::Pending);
        assert_eq!(parsed.customer_query, "Do you deliver on Sundays?");
    }
}
