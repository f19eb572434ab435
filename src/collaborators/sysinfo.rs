//! Host sampling backed by the `sysinfo` crate.

use std::sync::Arc;

use async_trait::async_trait;
use sysinfo::{Disks, Networks, System};
use tokio::sync::Mutex;

use super::{MetricsSource, ServiceProbe};
use crate::domain::SystemSample;
use crate::domain::metrics::{CpuGauge, MemoryGauge, NetworkGauge, ServiceHealth, StorageGauge};
use crate::error::GatewayError;

/// Samples CPU, memory, storage, and network from the local host.
///
/// Keeps one [`System`] alive between samples: CPU usage is computed
/// from the delta since the previous refresh, so with a persistent
/// handle each periodic sample reflects the full interval instead of
/// an instantaneous reading.
pub struct SysinfoMetricsSource {
    system: Mutex<System>,
    probes: Vec<Arc<dyn ServiceProbe>>,
}

impl std::fmt::Debug for SysinfoMetricsSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SysinfoMetricsSource")
            .field("probes", &self.probes.len())
            .finish()
    }
}

impl SysinfoMetricsSource {
    /// Creates a sampler that folds `probes` into each sample's
    /// service list.
    #[must_use]
    pub fn new(probes: Vec<Arc<dyn ServiceProbe>>) -> Self {
        let mut system = System::new_all();
        system.refresh_all();
        Self {
            system: Mutex::new(system),
            probes,
        }
    }

    fn cpu_gauge(system: &System) -> CpuGauge {
        let load = System::load_average();
        CpuGauge {
            usage_percent: system.global_cpu_info().cpu_usage(),
            load_average: [load.one, load.five, load.fifteen],
            cores: system.cpus().len(),
        }
    }

    fn memory_gauge(system: &System) -> MemoryGauge {
        let total = system.total_memory();
        let used = total.saturating_sub(system.available_memory());
        MemoryGauge {
            total_mb: total / (1024 * 1024),
            used_mb: used / (1024 * 1024),
            percent_used: percent(used as f64, total as f64),
        }
    }

    fn storage_gauge() -> StorageGauge {
        let disks = Disks::new_with_refreshed_list();
        let mut total_bytes: u64 = 0;
        let mut free_bytes: u64 = 0;
        for disk in disks.list() {
            total_bytes = total_bytes.saturating_add(disk.total_space());
            free_bytes = free_bytes.saturating_add(disk.available_space());
        }
        let used_bytes = total_bytes.saturating_sub(free_bytes);
        const GB: f64 = 1024.0 * 1024.0 * 1024.0;
        StorageGauge {
            total_gb: total_bytes as f64 / GB,
            used_gb: used_bytes as f64 / GB,
            percent_used: percent(used_bytes as f64, total_bytes as f64),
        }
    }

    fn network_gauge() -> NetworkGauge {
        let networks = Networks::new_with_refreshed_list();
        let mut received: u64 = 0;
        let mut transmitted: u64 = 0;
        for (_name, data) in &networks {
            received = received.saturating_add(data.total_received());
            transmitted = transmitted.saturating_add(data.total_transmitted());
        }
        NetworkGauge {
            received_bytes: received,
            transmitted_bytes: transmitted,
        }
    }
}

fn percent(used: f64, total: f64) -> f32 {
    if total > 0.0 {
        ((used / total) * 100.0) as f32
    } else {
        0.0
    }
}

#[async_trait]
impl MetricsSource for SysinfoMetricsSource {
    async fn sample(&self) -> Result<SystemSample, GatewayError> {
        let (cpu, memory) = {
            let mut system = self.system.lock().await;
            system.refresh_cpu_usage();
            system.refresh_memory();
            (Self::cpu_gauge(&system), Self::memory_gauge(&system))
        };

        let mut services = Vec::with_capacity(self.probes.len());
        for probe in &self.probes {
            services.push(ServiceHealth {
                name: probe.name().to_string(),
                healthy: probe.probe().await,
            });
        }

        Ok(SystemSample {
            cpu,
            memory,
            storage: Self::storage_gauge(),
            network: Self::network_gauge(),
            services,
            uptime_secs: System::uptime(),
        })
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;

    struct FixedProbe;

    #[async_trait]
    impl ServiceProbe for FixedProbe {
        fn name(&self) -> &str {
            "gateway"
        }

        async fn probe(&self) -> bool {
            true
        }
    }

    #[tokio::test]
    async fn sample_reflects_live_host() {
        let source = SysinfoMetricsSource::new(vec![Arc::new(FixedProbe)]);
        let sample = source.sample().await;
        let Ok(sample) = sample else {
            panic!("local sampling must succeed");
        };

        assert!(sample.cpu.cores > 0);
        assert!(sample.memory.total_mb > 0);
        assert!(sample.memory.used_mb <= sample.memory.total_mb);
        assert!((0.0..=100.0).contains(&sample.memory.percent_used));
        assert!((0.0..=100.0).contains(&sample.storage.percent_used));
        assert!(sample.uptime_secs > 0);
        assert_eq!(sample.services.len(), 1);
        assert!(sample.services.first().is_some_and(|s| s.healthy));
    }

    #[test]
    fn percent_handles_zero_total() {
        assert!((percent(10.0, 0.0) - 0.0).abs() < f32::EPSILON);
        assert!((percent(50.0, 200.0) - 25.0).abs() < f32::EPSILON);
    }
}
