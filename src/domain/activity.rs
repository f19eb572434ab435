//! Immutable activity event records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::UserId;

/// Severity attached to an activity event.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Routine activity (the default when a submission omits it).
    #[default]
    Info,
    /// Something worth an admin's attention.
    Warning,
    /// Something requiring immediate admin attention.
    Critical,
}

impl Severity {
    /// Returns the wire-level string for this severity.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Info => "info",
            Self::Warning => "warning",
            Self::Critical => "critical",
        }
    }
}

impl std::str::FromStr for Severity {
    type Err = UnknownSeverity;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "info" => Ok(Self::Info),
            "warning" => Ok(Self::Warning),
            "critical" => Ok(Self::Critical),
            other => Err(UnknownSeverity(other.to_string())),
        }
    }
}

/// Error returned when parsing an unrecognized severity string.
#[derive(Debug, Clone, thiserror::Error)]
#[error("unknown severity: {0}")]
pub struct UnknownSeverity(pub String);

/// An activity event submitted by an authenticated client.
///
/// Created once by the relay with a server-side timestamp and never
/// mutated. Serializes to the `new-activity` wire payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActivityEvent {
    /// Identity that performed the action.
    #[serde(rename = "userId")]
    pub actor_id: UserId,
    /// Short verb phrase (e.g. `"completed-interview"`).
    pub action: String,
    /// Human-readable description.
    pub description: String,
    /// Categorization bucket (e.g. `"interview"`, `"profile"`).
    pub category: String,
    /// Severity level.
    pub severity: Severity,
    /// Optional free-form context.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    /// Server-side creation timestamp.
    pub timestamp: DateTime<Utc>,
}
