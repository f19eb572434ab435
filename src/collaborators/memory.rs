//! In-memory collaborator implementations.
//!
//! Used when the gateway runs without a database (`PERSISTENCE_ENABLED`
//! off) and throughout the test suite. Stores are bounded so a
//! long-running database-less deployment does not grow without limit.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use super::{ActivityStore, MetricStore, ServiceProbe, UserDirectory};
use crate::domain::{ActivityEvent, MetricSnapshot, UserId};
use crate::error::GatewayError;

/// Maximum history retained by the in-memory stores.
const RETAINED_ENTRIES: usize = 1_000;

/// Online flags held in process memory.
#[derive(Debug, Default)]
pub struct InMemoryUserDirectory {
    flags: RwLock<HashMap<UserId, (bool, DateTime<Utc>)>>,
}

impl InMemoryUserDirectory {
    /// Creates an empty directory.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserDirectory for InMemoryUserDirectory {
    async fn set_online_status(
        &self,
        user: UserId,
        online: bool,
        at: DateTime<Utc>,
    ) -> Result<(), GatewayError> {
        self.flags.write().await.insert(user, (online, at));
        Ok(())
    }

    async fn online_user_ids(&self) -> Result<Vec<UserId>, GatewayError> {
        let flags = self.flags.read().await;
        Ok(flags
            .iter()
            .filter(|(_, (online, _))| *online)
            .map(|(user, _)| *user)
            .collect())
    }

    async fn reset_online_flags(&self) -> Result<u64, GatewayError> {
        let mut flags = self.flags.write().await;
        let mut cleared = 0;
        for (online, _) in flags.values_mut() {
            if *online {
                *online = false;
                cleared += 1;
            }
        }
        Ok(cleared)
    }
}

/// Metric snapshots held in process memory, newest last.
#[derive(Debug, Default)]
pub struct InMemoryMetricStore {
    snapshots: RwLock<Vec<MetricSnapshot>>,
}

impl InMemoryMetricStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of the retained snapshots.
    pub async fn snapshots(&self) -> Vec<MetricSnapshot> {
        self.snapshots.read().await.clone()
    }
}

#[async_trait]
impl MetricStore for InMemoryMetricStore {
    async fn append(&self, snapshot: &MetricSnapshot) -> Result<(), GatewayError> {
        let mut snapshots = self.snapshots.write().await;
        snapshots.push(snapshot.clone());
        if snapshots.len() > RETAINED_ENTRIES {
            let excess = snapshots.len() - RETAINED_ENTRIES;
            snapshots.drain(..excess);
        }
        Ok(())
    }
}

/// Activity events held in process memory, oldest first.
#[derive(Debug, Default)]
pub struct InMemoryActivityStore {
    events: RwLock<Vec<ActivityEvent>>,
}

impl InMemoryActivityStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns how many events are retained.
    pub async fn len(&self) -> usize {
        self.events.read().await.len()
    }

    /// Returns `true` when no events are retained.
    pub async fn is_empty(&self) -> bool {
        self.events.read().await.is_empty()
    }
}

#[async_trait]
impl ActivityStore for InMemoryActivityStore {
    async fn record(&self, event: &ActivityEvent) -> Result<(), GatewayError> {
        let mut events = self.events.write().await;
        events.push(event.clone());
        if events.len() > RETAINED_ENTRIES {
            let excess = events.len() - RETAINED_ENTRIES;
            events.drain(..excess);
        }
        Ok(())
    }

    async fn recorded_since(
        &self,
        since: DateTime<Utc>,
    ) -> Result<Vec<ActivityEvent>, GatewayError> {
        let events = self.events.read().await;
        Ok(events
            .iter()
            .filter(|event| event.timestamp > since)
            .cloned()
            .collect())
    }
}

/// Probe with a fixed answer, for services whose liveness is implied by
/// the gateway process itself.
#[derive(Debug, Clone)]
pub struct StaticProbe {
    name: String,
    healthy: bool,
}

impl StaticProbe {
    /// Creates a probe that always reports `healthy`.
    #[must_use]
    pub fn new(name: impl Into<String>, healthy: bool) -> Self {
        Self {
            name: name.into(),
            healthy,
        }
    }
}

#[async_trait]
impl ServiceProbe for StaticProbe {
    fn name(&self) -> &str {
        &self.name
    }

    async fn probe(&self) -> bool {
        self.healthy
    }
}
