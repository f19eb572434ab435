//! Sampled system telemetry and snapshot records.
//!
//! A [`SystemSample`] is whatever the metrics source reports at one
//! instant; a [`MetricSnapshot`] is the immutable, timestamped record the
//! collector derives from it on each successful tick. Snapshots are
//! append-only — created once, never mutated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// CPU gauges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CpuGauge {
    /// Aggregate usage across all cores, percent.
    pub usage_percent: f32,
    /// 1/5/15-minute load averages (zeroed on platforms without them).
    pub load_average: [f64; 3],
    /// Logical core count.
    pub cores: usize,
}

/// Memory gauges. Totals come from the live sampler, never hardcoded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MemoryGauge {
    /// Total physical memory in MiB.
    pub total_mb: u64,
    /// Used memory in MiB.
    pub used_mb: u64,
    /// Used fraction as a percentage.
    pub percent_used: f32,
}

/// Root-filesystem storage gauges.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StorageGauge {
    /// Total capacity in GiB.
    pub total_gb: f64,
    /// Used capacity in GiB.
    pub used_gb: f64,
    /// Used fraction as a percentage.
    pub percent_used: f32,
}

/// Cumulative network interface counters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NetworkGauge {
    /// Bytes received across all interfaces since boot.
    pub received_bytes: u64,
    /// Bytes transmitted across all interfaces since boot.
    pub transmitted_bytes: u64,
}

/// Health of one named platform service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceHealth {
    /// Service name (e.g. `"database"`, `"ai-provider"`).
    pub name: String,
    /// Whether the service currently reports healthy.
    pub healthy: bool,
}

/// One instant of sampled system telemetry.
///
/// Serializes to the `system-metrics-update` wire payload:
/// `{cpu, memory, storage, network, services, uptime}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemSample {
    /// CPU gauges.
    pub cpu: CpuGauge,
    /// Memory gauges.
    pub memory: MemoryGauge,
    /// Storage gauges.
    pub storage: StorageGauge,
    /// Network counters.
    pub network: NetworkGauge,
    /// Per-service health flags.
    pub services: Vec<ServiceHealth>,
    /// System uptime in seconds.
    #[serde(rename = "uptime")]
    pub uptime_secs: u64,
}

/// Immutable, timestamped record of one collector tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricSnapshot {
    /// When the sample was taken (server clock).
    pub sampled_at: DateTime<Utc>,
    /// The gauges captured at that instant.
    #[serde(flatten)]
    pub sample: SystemSample,
}

impl MetricSnapshot {
    /// Derives a snapshot from a sample at the given instant.
    #[must_use]
    pub const fn from_sample(sample: SystemSample, sampled_at: DateTime<Utc>) -> Self {
        Self { sampled_at, sample }
    }
}
