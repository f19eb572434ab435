//! Periodic metrics and activity catch-up tasks.
//!
//! [`MetricsCollector`] owns the two background timers of the gateway:
//!
//! 1. Metrics tick — samples the host through the [`MetricsSource`]
//!    collaborator, broadcasts a `system-metrics-update` to the
//!    system-monitoring room, then appends a snapshot to the metric
//!    store.
//! 2. Activity catch-up tick — queries activity events recorded since
//!    the previous tick boundary and broadcasts them as one
//!    `activity-updates` batch to the admin room. Also drains the
//!    presence retry queue.
//!
//! Both loops run a tick to completion before awaiting the next timer
//! fire, and missed fires are skipped, so a slow collaborator can delay
//! ticks but never stack them. Lifecycle is explicit: [`MetricsCollector::start`]
//! spawns the loops and returns a [`CollectorHandle`] whose `shutdown`
//! stops both and waits for them to finish.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

use crate::collaborators::{ActivityStore, MetricStore, MetricsSource};
use crate::domain::{ConnectionGateway, MetricSnapshot, Room, ServerEvent};
use crate::service::presence::PresenceService;

/// Owns the gateway's two periodic background tasks.
pub struct MetricsCollector {
    gateway: Arc<ConnectionGateway>,
    source: Arc<dyn MetricsSource>,
    metric_store: Arc<dyn MetricStore>,
    activity_store: Arc<dyn ActivityStore>,
    presence: Arc<PresenceService>,
    metrics_interval: Duration,
    catchup_interval: Duration,
}

impl std::fmt::Debug for MetricsCollector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MetricsCollector")
            .field("metrics_interval", &self.metrics_interval)
            .field("catchup_interval", &self.catchup_interval)
            .finish()
    }
}

/// Handle controlling the lifecycle of a started collector.
#[derive(Debug)]
pub struct CollectorHandle {
    shutdown: watch::Sender<bool>,
    metrics_task: JoinHandle<()>,
    catchup_task: JoinHandle<()>,
}

impl CollectorHandle {
    /// Signals both loops to stop and waits for them to finish.
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(true);
        let _ = self.metrics_task.await;
        let _ = self.catchup_task.await;
        info!("collector stopped");
    }
}

impl MetricsCollector {
    /// Creates a collector with the given collaborators and intervals.
    #[must_use]
    pub fn new(
        gateway: Arc<ConnectionGateway>,
        source: Arc<dyn MetricsSource>,
        metric_store: Arc<dyn MetricStore>,
        activity_store: Arc<dyn ActivityStore>,
        presence: Arc<PresenceService>,
        metrics_interval: Duration,
        catchup_interval: Duration,
    ) -> Self {
        Self {
            gateway,
            source,
            metric_store,
            activity_store,
            presence,
            metrics_interval,
            catchup_interval,
        }
    }

    /// Spawns the two periodic loops.
    #[must_use]
    pub fn start(self: Arc<Self>) -> CollectorHandle {
        let (tx, rx) = watch::channel(false);
        let metrics_task = tokio::spawn(Self::metrics_loop(Arc::clone(&self), rx.clone()));
        let catchup_task = tokio::spawn(Self::catchup_loop(self, rx));
        info!("collector started");
        CollectorHandle {
            shutdown: tx,
            metrics_task,
            catchup_task,
        }
    }

    async fn metrics_loop(this: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(this.metrics_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            tokio::select! {
                _ = ticker.tick() => this.run_metrics_tick().await,
                changed = shutdown.changed() => {
                    // A dropped sender counts as shutdown.
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        debug!("metrics loop exited");
    }

    async fn catchup_loop(this: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(this.catchup_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // Events recorded before the collector started are not caught up.
        let mut since = Utc::now();
        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    since = this.run_catchup_tick(since).await;
                    this.presence.flush_dirty().await;
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }
        debug!("catch-up loop exited");
    }

    /// Runs one metrics tick: sample, broadcast, persist.
    ///
    /// A sampling or persistence failure is logged and the tick ends;
    /// the next tick starts fresh.
    pub async fn run_metrics_tick(&self) {
        let sample = match self.source.sample().await {
            Ok(sample) => sample,
            Err(e) => {
                error!(error = %e, "system metrics sampling failed");
                return;
            }
        };

        let snapshot = MetricSnapshot::from_sample(sample.clone(), Utc::now());
        let delivered = self
            .gateway
            .emit_to_room(&Room::monitoring(), &ServerEvent::SystemMetricsUpdate(sample))
            .await;
        debug!(delivered, "system metrics broadcast");

        if let Err(e) = self.metric_store.append(&snapshot).await {
            error!(error = %e, "failed to persist metric snapshot");
        }
    }

    /// Runs one activity catch-up tick and returns the next boundary.
    ///
    /// The boundary advances to the newest timestamp in the delivered
    /// batch so no event is broadcast twice; when the batch is empty it
    /// advances to the query time. A store failure keeps the previous
    /// boundary, so the missed window is retried on the next tick.
    pub async fn run_catchup_tick(&self, since: DateTime<Utc>) -> DateTime<Utc> {
        let queried_at = Utc::now();
        let events = match self.activity_store.recorded_since(since).await {
            Ok(events) => events,
            Err(e) => {
                error!(error = %e, "activity catch-up query failed");
                return since;
            }
        };

        if events.is_empty() {
            return queried_at;
        }

        let next_boundary = events
            .iter()
            .map(|event| event.timestamp)
            .max()
            .unwrap_or(queried_at);
        let batch_size = events.len();
        let delivered = self
            .gateway
            .emit_to_room(&Room::admin(), &ServerEvent::ActivityUpdates(events))
            .await;
        debug!(batch_size, delivered, "activity catch-up broadcast");
        next_boundary
    }
}
