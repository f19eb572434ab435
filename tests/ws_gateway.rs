//! End-to-end tests against a live gateway instance.
//!
//! Each test spawns the real Axum server on an ephemeral port with the
//! in-memory collaborator set, drives it with a real WebSocket client,
//! and asserts on the wire-level envelopes dashboards would see.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use futures_util::{SinkExt, StreamExt};
use jsonwebtoken::{EncodingKey, Header};
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};
use uuid::Uuid;

use pulse_gateway::api;
use pulse_gateway::app_state::AppState;
use pulse_gateway::collaborators::jwt::{JwtSessionVerifier, SessionClaims};
use pulse_gateway::collaborators::memory::{
    InMemoryActivityStore, InMemoryMetricStore, InMemoryUserDirectory, StaticProbe,
};
use pulse_gateway::collaborators::sysinfo::SysinfoMetricsSource;
use pulse_gateway::collaborators::{
    ActivityStore, MetricsSource, ServiceProbe, SessionVerifier, UserDirectory,
};
use pulse_gateway::domain::{ConnectionGateway, Role};
use pulse_gateway::service::{
    ActivityRelay, AuthHandshake, Broadcaster, CollectorHandle, MetricsCollector, PresenceService,
};
use pulse_gateway::ws::handler::ws_handler;

const SECRET: &str = "e2e-shared-secret";

type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Spawns a full gateway on `127.0.0.1:0` and returns its address plus
/// the collector handle, which the caller must keep alive for the test.
///
/// The collector runs with long intervals so periodic traffic never
/// interferes with the frames under test.
async fn spawn_gateway(auth_timeout: Duration) -> anyhow::Result<(SocketAddr, CollectorHandle)> {
    let gateway = Arc::new(ConnectionGateway::new(32));
    let directory: Arc<dyn UserDirectory> = Arc::new(InMemoryUserDirectory::new());
    let activity_store: Arc<dyn ActivityStore> = Arc::new(InMemoryActivityStore::new());
    let probes: Vec<Arc<dyn ServiceProbe>> = vec![Arc::new(StaticProbe::new("gateway", true))];
    let metrics_source: Arc<dyn MetricsSource> = Arc::new(SysinfoMetricsSource::new(probes));

    let presence = Arc::new(PresenceService::new(
        Arc::clone(&gateway),
        Arc::clone(&directory),
    ));
    let verifier: Arc<dyn SessionVerifier> = Arc::new(JwtSessionVerifier::new(SECRET));
    let auth = Arc::new(AuthHandshake::new(
        Arc::clone(&gateway),
        verifier,
        Arc::clone(&presence),
    ));
    let relay = Arc::new(ActivityRelay::new(
        Arc::clone(&gateway),
        Arc::clone(&activity_store),
    ));
    let broadcaster = Broadcaster::new(Arc::clone(&gateway));

    let collector = Arc::new(MetricsCollector::new(
        Arc::clone(&gateway),
        Arc::clone(&metrics_source),
        Arc::new(InMemoryMetricStore::new()),
        activity_store,
        Arc::clone(&presence),
        Duration::from_secs(3600),
        Duration::from_secs(3600),
    ));
    let collector_handle = collector.start();

    let state = AppState {
        gateway,
        auth,
        presence,
        relay,
        broadcaster,
        metrics_source,
        auth_timeout,
    };

    let app = axum::Router::new()
        .merge(api::build_router())
        .route("/ws", axum::routing::get(ws_handler))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok((addr, collector_handle))
}

/// Signs a session token the way the platform's issuer does.
fn sign_token(user: Uuid, role: Role) -> anyhow::Result<String> {
    let now = Utc::now().timestamp();
    let claims = SessionClaims {
        sub: user,
        role,
        iat: now,
        exp: now + 3600,
    };
    Ok(jsonwebtoken::encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SECRET.as_bytes()),
    )?)
}

async fn connect(addr: SocketAddr) -> anyhow::Result<WsClient> {
    let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}/ws")).await?;
    Ok(ws)
}

async fn send_json(ws: &mut WsClient, value: &Value) -> anyhow::Result<()> {
    ws.send(Message::text(serde_json::to_string(value)?)).await?;
    Ok(())
}

/// Reads frames until one satisfies `pred`, skipping unrelated events.
async fn wait_for(
    ws: &mut WsClient,
    mut pred: impl FnMut(&Value) -> bool,
) -> anyhow::Result<Value> {
    for _ in 0..30 {
        let frame = timeout(Duration::from_secs(3), ws.next())
            .await
            .context("timed out waiting for a frame")?
            .context("socket closed while waiting")??;
        let Ok(text) = frame.into_text() else { continue };
        let Ok(value) = serde_json::from_str::<Value>(text.as_str()) else {
            continue;
        };
        if pred(&value) {
            return Ok(value);
        }
    }
    anyhow::bail!("expected event not observed within 30 frames")
}

fn event_name(value: &Value) -> Option<&str> {
    value.get("event").and_then(Value::as_str)
}

/// Sends `authenticate` and returns the ack or error envelope.
async fn authenticate(ws: &mut WsClient, token: &str) -> anyhow::Result<Value> {
    send_json(ws, &json!({"event": "authenticate", "data": {"token": token}})).await?;
    wait_for(ws, |v| {
        matches!(event_name(v), Some("authenticated" | "authentication-error"))
    })
    .await
}

#[tokio::test]
async fn authenticate_then_broadcast_activity() -> anyhow::Result<()> {
    let (addr, _collector) = spawn_gateway(Duration::from_secs(30)).await?;
    let admin_id = Uuid::new_v4();
    let user_id = Uuid::new_v4();

    let mut admin = connect(addr).await?;
    let ack = authenticate(&mut admin, &sign_token(admin_id, Role::Admin)?).await?;
    assert_eq!(event_name(&ack), Some("authenticated"));
    assert_eq!(
        ack.pointer("/data/success").and_then(Value::as_bool),
        Some(true)
    );
    assert_eq!(
        ack.pointer("/data/role").and_then(Value::as_str),
        Some("admin")
    );

    let mut user = connect(addr).await?;
    let ack = authenticate(&mut user, &sign_token(user_id, Role::User)?).await?;
    assert_eq!(event_name(&ack), Some("authenticated"));

    // The admin dashboard sees the user come online.
    let expected = user_id.to_string();
    wait_for(&mut admin, |v| {
        event_name(v) == Some("user-status-update")
            && v.pointer("/data/userId").and_then(Value::as_str) == Some(expected.as_str())
            && v.pointer("/data/status").and_then(Value::as_str) == Some("online")
    })
    .await?;

    send_json(
        &mut user,
        &json!({
            "event": "log-activity",
            "data": {
                "action": "session-started",
                "description": "Began a mock interview",
                "category": "practice"
            }
        }),
    )
    .await?;

    let activity = wait_for(&mut admin, |v| event_name(v) == Some("new-activity")).await?;
    assert_eq!(
        activity.pointer("/data/action").and_then(Value::as_str),
        Some("session-started")
    );
    assert_eq!(
        activity.pointer("/data/userId").and_then(Value::as_str),
        Some(expected.as_str())
    );
    assert_eq!(
        activity.pointer("/data/severity").and_then(Value::as_str),
        Some("info")
    );
    assert!(activity.pointer("/data/timestamp").is_some());
    Ok(())
}

#[tokio::test]
async fn rejected_token_allows_retry_on_same_connection() -> anyhow::Result<()> {
    let (addr, _collector) = spawn_gateway(Duration::from_secs(30)).await?;
    let mut ws = connect(addr).await?;

    let reply = authenticate(&mut ws, "not-a-token").await?;
    assert_eq!(event_name(&reply), Some("authentication-error"));
    assert!(
        reply
            .pointer("/data/message")
            .and_then(Value::as_str)
            .is_some()
    );

    // The connection survives the failure and a valid token still binds.
    let reply = authenticate(&mut ws, &sign_token(Uuid::new_v4(), Role::User)?).await?;
    assert_eq!(event_name(&reply), Some("authenticated"));
    Ok(())
}

#[tokio::test]
async fn status_change_reaches_admin_dashboard() -> anyhow::Result<()> {
    let (addr, _collector) = spawn_gateway(Duration::from_secs(30)).await?;
    let user_id = Uuid::new_v4();

    let mut admin = connect(addr).await?;
    authenticate(&mut admin, &sign_token(Uuid::new_v4(), Role::Admin)?).await?;
    let mut user = connect(addr).await?;
    authenticate(&mut user, &sign_token(user_id, Role::User)?).await?;

    send_json(
        &mut user,
        &json!({"event": "update-status", "data": {"status": "away"}}),
    )
    .await?;

    let expected = user_id.to_string();
    let update = wait_for(&mut admin, |v| {
        event_name(v) == Some("user-status-update")
            && v.pointer("/data/userId").and_then(Value::as_str) == Some(expected.as_str())
            && v.pointer("/data/status").and_then(Value::as_str) == Some("away")
    })
    .await?;
    assert!(update.pointer("/data/timestamp").is_some());
    Ok(())
}

#[tokio::test]
async fn disconnect_flips_user_offline_for_admins() -> anyhow::Result<()> {
    let (addr, _collector) = spawn_gateway(Duration::from_secs(30)).await?;
    let user_id = Uuid::new_v4();

    let mut admin = connect(addr).await?;
    authenticate(&mut admin, &sign_token(Uuid::new_v4(), Role::Admin)?).await?;
    let mut user = connect(addr).await?;
    authenticate(&mut user, &sign_token(user_id, Role::User)?).await?;

    user.close(None).await?;

    let expected = user_id.to_string();
    wait_for(&mut admin, |v| {
        event_name(v) == Some("user-status-update")
            && v.pointer("/data/userId").and_then(Value::as_str) == Some(expected.as_str())
            && v.pointer("/data/status").and_then(Value::as_str) == Some("offline")
    })
    .await?;
    Ok(())
}

#[tokio::test]
async fn health_and_stats_report_live_counts() -> anyhow::Result<()> {
    let (addr, _collector) = spawn_gateway(Duration::from_secs(30)).await?;

    let health: Value = reqwest::get(format!("http://{addr}/health"))
        .await?
        .json()
        .await?;
    assert_eq!(
        health.get("status").and_then(Value::as_str),
        Some("healthy")
    );

    let mut ws = connect(addr).await?;
    let ack = authenticate(&mut ws, &sign_token(Uuid::new_v4(), Role::User)?).await?;
    assert_eq!(event_name(&ack), Some("authenticated"));

    let stats: Value = reqwest::get(format!("http://{addr}/stats"))
        .await?
        .json()
        .await?;
    assert_eq!(stats.get("connections").and_then(Value::as_u64), Some(1));
    assert_eq!(stats.get("online_users").and_then(Value::as_u64), Some(1));
    assert_eq!(stats.get("admin_connections").and_then(Value::as_u64), Some(0));
    Ok(())
}

#[tokio::test]
async fn anonymous_connection_is_closed_after_deadline() -> anyhow::Result<()> {
    let (addr, _collector) = spawn_gateway(Duration::from_millis(200)).await?;
    let mut ws = connect(addr).await?;

    // No authenticate message: the server must end the session.
    let outcome = timeout(Duration::from_secs(5), async {
        loop {
            match ws.next().await {
                Some(Ok(Message::Close(_))) | None => break,
                Some(Err(_)) => break,
                Some(Ok(_)) => {}
            }
        }
    })
    .await;
    assert!(outcome.is_ok(), "server never closed the anonymous socket");
    Ok(())
}
