//! WebSocket connection lifecycle.
//!
//! Runs the read/write loop for one browser connection: registers it
//! with the gateway, enforces the authentication deadline, dispatches
//! inbound client messages, and forwards queued server events until
//! either side goes away.

use axum::extract::ws::{Message, WebSocket};
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};

use super::messages::ClientMessage;
use crate::app_state::AppState;
use crate::domain::{ConnectionId, ConnectionInfo, ServerEvent};
use crate::service::ActivitySubmission;

/// Runs the read/write loop for a single WebSocket connection.
///
/// - Forwards queued [`ServerEvent`]s from the gateway to the client.
/// - Reads client messages and dispatches them.
/// - Closes connections that have not authenticated within the deadline.
///
/// Every exit path funnels through the same cleanup: the connection is
/// unregistered, and if it carried the identity's last open connection
/// the identity flips to offline.
pub async fn run_connection(socket: WebSocket, state: AppState) {
    let (conn_id, mut outbound) = state.gateway.register().await;
    let (mut ws_tx, mut ws_rx) = socket.split();

    tracing::debug!(conn_id = %conn_id, "ws connection opened");

    let auth_deadline = tokio::time::sleep(state.auth_timeout);
    tokio::pin!(auth_deadline);
    let mut authenticated = false;

    loop {
        tokio::select! {
            // Queued event for this connection
            event = outbound.recv() => {
                let Some(event) = event else { break };
                let Ok(json) = serde_json::to_string(&event) else {
                    tracing::error!(
                        conn_id = %conn_id,
                        event = event.event_name(),
                        "failed to serialize server event"
                    );
                    continue;
                };
                if ws_tx.send(Message::text(json)).await.is_err() {
                    break;
                }
            }
            // Incoming frame from the client
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => {
                        dispatch(&text, conn_id, &state, &mut authenticated).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Err(e)) => {
                        tracing::debug!(conn_id = %conn_id, error = %e, "ws read failed");
                        break;
                    }
                    // Ping/pong is handled by axum; binary frames are ignored.
                    _ => {}
                }
            }
            // Anonymous connections get a bounded window to authenticate.
            () = &mut auth_deadline, if !authenticated => {
                tracing::debug!(conn_id = %conn_id, "closing connection that never authenticated");
                break;
            }
        }
    }

    if let Some(closed) = state.gateway.disconnect(conn_id).await
        && let Some(user) = closed.identity
    {
        state.presence.connection_closed(user).await;
    }
    tracing::debug!(conn_id = %conn_id, "ws connection closed");
}

/// Parses and dispatches one inbound text frame.
///
/// Malformed frames are logged and dropped without a wire response.
/// Messages that need a bound identity are dropped while the connection
/// is anonymous, and `request-system-metrics` is dropped for non-admins.
async fn dispatch(text: &str, conn_id: ConnectionId, state: &AppState, authenticated: &mut bool) {
    let message = match ClientMessage::parse(text) {
        Ok(message) => message,
        Err(e) => {
            tracing::debug!(conn_id = %conn_id, error = %e, "ignoring malformed client message");
            return;
        }
    };

    // Any inbound traffic from a bound identity refreshes its last-seen.
    let info = state.gateway.info(conn_id).await;
    if let Some(user) = info.as_ref().and_then(|i| i.identity) {
        state.presence.touch(user).await;
    }

    match message {
        ClientMessage::Authenticate { token } => {
            if state.auth.authenticate(conn_id, &token).await {
                *authenticated = true;
            }
        }
        ClientMessage::RequestDashboardData => {
            let Some(info) = info.filter(ConnectionInfo::is_authenticated) else {
                tracing::debug!(conn_id = %conn_id, "dropped dashboard request from anonymous connection");
                return;
            };
            let event = dashboard_snapshot(state, info.is_admin()).await;
            state.gateway.emit_to_connection(conn_id, &event).await;
        }
        ClientMessage::RequestSystemMetrics => {
            if !info.is_some_and(|i| i.is_admin()) {
                tracing::debug!(conn_id = %conn_id, "refused metrics request from non-admin connection");
                let event = ServerEvent::AuthenticationError {
                    message: "admin role required".to_string(),
                };
                state.gateway.emit_to_connection(conn_id, &event).await;
                return;
            }
            match state.metrics_source.sample().await {
                Ok(sample) => {
                    let event = ServerEvent::SystemMetricsUpdate(sample);
                    state.gateway.emit_to_connection(conn_id, &event).await;
                }
                Err(e) => {
                    tracing::error!(conn_id = %conn_id, error = %e, "on-demand metrics sample failed");
                }
            }
        }
        ClientMessage::LogActivity {
            action,
            description,
            category,
            severity,
            metadata,
        } => {
            let Some(actor) = info.and_then(|i| i.identity) else {
                tracing::debug!(conn_id = %conn_id, "dropped activity from anonymous connection");
                return;
            };
            let submission = ActivitySubmission {
                action,
                description,
                category,
                severity,
                metadata,
            };
            state.relay.submit(conn_id, actor, submission).await;
        }
        ClientMessage::UpdateStatus { status } => {
            let Some(user) = info.and_then(|i| i.identity) else {
                tracing::debug!(conn_id = %conn_id, "dropped status update from anonymous connection");
                return;
            };
            if let Err(e) = state.presence.set_status(user, status).await {
                tracing::debug!(conn_id = %conn_id, error = %e, "rejected status update");
            }
        }
    }
}

/// Builds the `dashboard-data-update` reply. Admin requesters also get
/// the per-user presence listing.
async fn dashboard_snapshot(state: &AppState, include_presence: bool) -> ServerEvent {
    let presence = if include_presence {
        Some(state.presence.snapshot().await)
    } else {
        None
    };
    ServerEvent::DashboardDataUpdate {
        timestamp: Utc::now(),
        online_users: state.presence.online_count().await,
        connections: state.gateway.connection_count().await,
        presence,
    }
}
