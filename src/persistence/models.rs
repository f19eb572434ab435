//! Database models for the activity event log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{ActivityEvent, UserId};

/// An activity event row from the `activity_events` table.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredActivity {
    /// Auto-increment row ID.
    pub id: i64,
    /// User that performed the action.
    pub user_id: Uuid,
    /// Short verb phrase.
    pub action: String,
    /// Human-readable description.
    pub description: String,
    /// Categorization bucket.
    pub category: String,
    /// Severity string as stored (`"info"`, `"warning"`, `"critical"`).
    pub severity: String,
    /// Optional JSONB context.
    pub metadata: Option<serde_json::Value>,
    /// Server-side creation timestamp.
    pub created_at: DateTime<Utc>,
}

impl StoredActivity {
    /// Converts the row into its wire-level event form.
    ///
    /// An unrecognized stored severity falls back to the default rather
    /// than failing the whole catch-up batch.
    #[must_use]
    pub fn into_event(self) -> ActivityEvent {
        ActivityEvent {
            actor_id: UserId::from(self.user_id),
            action: self.action,
            description: self.description,
            category: self.category,
            severity: self.severity.parse().unwrap_or_default(),
            metadata: self.metadata,
            timestamp: self.created_at,
        }
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::domain::Severity;

    #[test]
    fn unknown_severity_falls_back_to_default() {
        let row = StoredActivity {
            id: 1,
            user_id: Uuid::new_v4(),
            action: "completed-interview".to_string(),
            description: "Finished mock interview".to_string(),
            category: "interview".to_string(),
            severity: "catastrophic".to_string(),
            metadata: None,
            created_at: Utc::now(),
        };
        let event = row.into_event();
        assert_eq!(event.severity, Severity::Info);
    }
}
