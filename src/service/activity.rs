//! Activity event relay.
//!
//! Authenticated clients submit activity events (`log-activity`); the
//! relay validates, stamps a server-side timestamp, persists through
//! the [`ActivityStore`] collaborator, and fans the event out to the
//! admin room as `new-activity`. A rejected or unpersistable event is
//! answered on the submitting connection only — admin-room state never
//! sees a partial outcome.

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error};

use crate::collaborators::ActivityStore;
use crate::domain::{
    ActivityEvent, ConnectionGateway, ConnectionId, Room, ServerEvent, Severity, UserId,
};

/// A client-submitted activity payload, before validation.
#[derive(Debug, Clone)]
pub struct ActivitySubmission {
    /// Short verb phrase.
    pub action: String,
    /// Human-readable description.
    pub description: String,
    /// Categorization bucket.
    pub category: String,
    /// Severity, defaulting to `info` when omitted.
    pub severity: Option<Severity>,
    /// Optional free-form context.
    pub metadata: Option<serde_json::Value>,
}

/// Validates, persists, and fans out activity events.
pub struct ActivityRelay {
    gateway: Arc<ConnectionGateway>,
    store: Arc<dyn ActivityStore>,
}

impl std::fmt::Debug for ActivityRelay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActivityRelay").finish()
    }
}

impl ActivityRelay {
    /// Creates a relay over the given gateway and store.
    #[must_use]
    pub fn new(gateway: Arc<ConnectionGateway>, store: Arc<dyn ActivityStore>) -> Self {
        Self { gateway, store }
    }

    /// Handles one `log-activity` submission from `actor` on `conn`.
    ///
    /// Returns `true` when the event was persisted and broadcast.
    pub async fn submit(
        &self,
        conn: ConnectionId,
        actor: UserId,
        submission: ActivitySubmission,
    ) -> bool {
        let Some(event) = Self::validate(actor, submission) else {
            debug!(conn_id = %conn, "dropped malformed activity submission");
            self.answer_error(conn, "action, description, and category are required")
                .await;
            return false;
        };

        if let Err(e) = self.store.record(&event).await {
            error!(conn_id = %conn, error = %e, "failed to persist activity event");
            self.answer_error(conn, "activity could not be recorded")
                .await;
            return false;
        }

        let delivered = self
            .gateway
            .emit_to_room(&Room::admin(), &ServerEvent::NewActivity(event))
            .await;
        debug!(conn_id = %conn, delivered, "activity broadcast to admin room");
        true
    }

    fn validate(actor: UserId, submission: ActivitySubmission) -> Option<ActivityEvent> {
        let action = submission.action.trim();
        let description = submission.description.trim();
        let category = submission.category.trim();
        if action.is_empty() || description.is_empty() || category.is_empty() {
            return None;
        }
        Some(ActivityEvent {
            actor_id: actor,
            action: action.to_string(),
            description: description.to_string(),
            category: category.to_string(),
            severity: submission.severity.unwrap_or_default(),
            metadata: submission.metadata,
            timestamp: Utc::now(),
        })
    }

    async fn answer_error(&self, conn: ConnectionId, message: &str) {
        let event = ServerEvent::ActivityError {
            message: message.to_string(),
        };
        self.gateway.emit_to_connection(conn, &event).await;
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use async_trait::async_trait;
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::collaborators::memory::InMemoryActivityStore;
    use crate::domain::Role;
    use crate::error::GatewayError;

    struct FailingStore;

    #[async_trait]
    impl ActivityStore for FailingStore {
        async fn record(&self, _event: &ActivityEvent) -> Result<(), GatewayError> {
            Err(GatewayError::Persistence("down".to_string()))
        }

        async fn recorded_since(
            &self,
            _since: DateTime<Utc>,
        ) -> Result<Vec<ActivityEvent>, GatewayError> {
            Ok(Vec::new())
        }
    }

    fn submission() -> ActivitySubmission {
        ActivitySubmission {
            action: "completed-interview".to_string(),
            description: "Finished mock interview #12".to_string(),
            category: "interview".to_string(),
            severity: None,
            metadata: None,
        }
    }

    async fn admin_observer(
        gateway: &Arc<ConnectionGateway>,
    ) -> tokio::sync::mpsc::Receiver<ServerEvent> {
        let (conn, rx) = gateway.register().await;
        let _ = gateway.bind_identity(conn, UserId::new(), Role::Admin).await;
        rx
    }

    #[tokio::test]
    async fn valid_submission_is_stored_and_broadcast() {
        let gateway = Arc::new(ConnectionGateway::new(8));
        let store = Arc::new(InMemoryActivityStore::new());
        let relay = ActivityRelay::new(
            Arc::clone(&gateway),
            Arc::clone(&store) as Arc<dyn ActivityStore>,
        );
        let mut admin_rx = admin_observer(&gateway).await;
        let (conn, _rx) = gateway.register().await;
        let actor = UserId::new();

        assert!(relay.submit(conn, actor, submission()).await);

        assert_eq!(store.len().await, 1);
        let Ok(event) = admin_rx.try_recv() else {
            panic!("admin must receive the broadcast");
        };
        let ServerEvent::NewActivity(activity) = event else {
            panic!("expected new-activity");
        };
        assert_eq!(activity.actor_id, actor);
        assert_eq!(activity.severity, Severity::Info);
    }

    #[tokio::test]
    async fn missing_action_is_dropped_without_store_or_broadcast() {
        let gateway = Arc::new(ConnectionGateway::new(8));
        let store = Arc::new(InMemoryActivityStore::new());
        let relay = ActivityRelay::new(
            Arc::clone(&gateway),
            Arc::clone(&store) as Arc<dyn ActivityStore>,
        );
        let mut admin_rx = admin_observer(&gateway).await;
        let (conn, mut submitter_rx) = gateway.register().await;

        let mut bad = submission();
        bad.action = "   ".to_string();
        assert!(!relay.submit(conn, UserId::new(), bad).await);

        assert!(store.is_empty().await);
        assert!(admin_rx.try_recv().is_err(), "no admin broadcast");
        // Only the submitter hears about it.
        let Ok(event) = submitter_rx.try_recv() else {
            panic!("submitter must be answered");
        };
        assert_eq!(event.event_name(), "activity-error");
    }

    #[tokio::test]
    async fn persistence_failure_suppresses_broadcast() {
        let gateway = Arc::new(ConnectionGateway::new(8));
        let relay = ActivityRelay::new(Arc::clone(&gateway), Arc::new(FailingStore));
        let mut admin_rx = admin_observer(&gateway).await;
        let (conn, mut submitter_rx) = gateway.register().await;

        assert!(!relay.submit(conn, UserId::new(), submission()).await);

        assert!(admin_rx.try_recv().is_err(), "no admin broadcast");
        let Ok(event) = submitter_rx.try_recv() else {
            panic!("submitter must be answered");
        };
        assert_eq!(event.event_name(), "activity-error");
    }

    #[tokio::test]
    async fn submitted_event_is_queryable_exactly_once() {
        let gateway = Arc::new(ConnectionGateway::new(8));
        let store = Arc::new(InMemoryActivityStore::new());
        let relay = ActivityRelay::new(
            Arc::clone(&gateway),
            Arc::clone(&store) as Arc<dyn ActivityStore>,
        );
        let (conn, _rx) = gateway.register().await;
        let actor = UserId::new();

        let t0 = Utc::now() - chrono::Duration::seconds(1);
        assert!(relay.submit(conn, actor, submission()).await);

        let Ok(found) = store.recorded_since(t0).await else {
            panic!("query must succeed");
        };
        assert_eq!(found.len(), 1);
        let Some(event) = found.first() else {
            panic!("event must be present");
        };
        assert_eq!(event.actor_id, actor);
        assert!(event.timestamp >= t0, "server timestamp stamped at submit");
    }

    #[tokio::test]
    async fn explicit_severity_is_preserved() {
        let gateway = Arc::new(ConnectionGateway::new(8));
        let store = Arc::new(InMemoryActivityStore::new());
        let relay = ActivityRelay::new(Arc::clone(&gateway), store);
        let mut admin_rx = admin_observer(&gateway).await;
        let (conn, _rx) = gateway.register().await;

        let mut critical = submission();
        critical.severity = Some(Severity::Critical);
        assert!(relay.submit(conn, UserId::new(), critical).await);

        let Ok(ServerEvent::NewActivity(activity)) = admin_rx.try_recv() else {
            panic!("admin must receive the broadcast");
        };
        assert_eq!(activity.severity, Severity::Critical);
    }
}
