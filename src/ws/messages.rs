//! Client-to-server wire messages.
//!
//! Every inbound frame is a JSON envelope `{"event": ..., "data": ...}`
//! with a kebab-case event name; `data` is omitted for parameterless
//! events. Server-to-client events live in [`crate::domain::event`].

use serde::Deserialize;

use crate::domain::{PresenceStatus, Severity};

/// Messages a client may send over the socket.
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
#[serde(rename_all_fields = "camelCase")]
pub enum ClientMessage {
    /// Present a session token for verification.
    Authenticate {
        /// Opaque credential issued by the platform at sign-in.
        token: String,
    },
    /// Request a dashboard summary snapshot.
    RequestDashboardData,
    /// Request an immediate system sample (admin role required).
    RequestSystemMetrics,
    /// Submit an activity event.
    LogActivity {
        /// Short verb phrase.
        action: String,
        /// Human-readable description.
        description: String,
        /// Categorization bucket.
        category: String,
        /// Severity, defaulting to `info` when omitted.
        #[serde(default)]
        severity: Option<Severity>,
        /// Optional free-form context.
        #[serde(default)]
        metadata: Option<serde_json::Value>,
    },
    /// Set the caller's presence status.
    UpdateStatus {
        /// Requested status (`online`, `away`, or `busy`).
        status: PresenceStatus,
    },
}

impl ClientMessage {
    /// Parses one inbound text frame.
    ///
    /// # Errors
    ///
    /// Returns the underlying serde error for malformed JSON, unknown
    /// event names, or payloads that do not match the event's shape.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn parses_authenticate() {
        let parsed = ClientMessage::parse(r#"{"event":"authenticate","data":{"token":"abc"}}"#);
        let Ok(ClientMessage::Authenticate { token }) = parsed else {
            panic!("expected authenticate");
        };
        assert_eq!(token, "abc");
    }

    #[test]
    fn parses_parameterless_request_without_data() {
        let parsed = ClientMessage::parse(r#"{"event":"request-dashboard-data"}"#);
        assert!(matches!(parsed, Ok(ClientMessage::RequestDashboardData)));

        let parsed = ClientMessage::parse(r#"{"event":"request-system-metrics"}"#);
        assert!(matches!(parsed, Ok(ClientMessage::RequestSystemMetrics)));
    }

    #[test]
    fn parses_log_activity_with_optional_fields_absent() {
        let parsed = ClientMessage::parse(
            r#"{"event":"log-activity","data":{"action":"a","description":"b","category":"c"}}"#,
        );
        let Ok(ClientMessage::LogActivity {
            severity, metadata, ..
        }) = parsed
        else {
            panic!("expected log-activity");
        };
        assert!(severity.is_none());
        assert!(metadata.is_none());
    }

    #[test]
    fn parses_update_status_values() {
        let parsed = ClientMessage::parse(r#"{"event":"update-status","data":{"status":"busy"}}"#);
        let Ok(ClientMessage::UpdateStatus { status }) = parsed else {
            panic!("expected update-status");
        };
        assert_eq!(status, PresenceStatus::Busy);
    }

    #[test]
    fn rejects_unknown_event_and_malformed_payload() {
        assert!(ClientMessage::parse(r#"{"event":"shutdown-server"}"#).is_err());
        assert!(ClientMessage::parse(r#"{"event":"authenticate","data":{}}"#).is_err());
        assert!(ClientMessage::parse("not json").is_err());
        assert!(
            ClientMessage::parse(
                r#"{"event":"log-activity","data":{"action":"a","description":"b","category":"c","severity":"fatal"}}"#
            )
            .is_err()
        );
    }
}
