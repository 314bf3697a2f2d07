//! Device registry
//!
//! Maps device identity to the last-known state reported over telemetry.
//! Presence is a read-time projection: a record only stores the moment it
//! was last seen, and `snapshot` derives online/offline from that age on
//! every call. Records are created on first report and kept until restart.

use std::net::IpAddr;
use std::time::Duration;

use dashmap::DashMap;

use fm_core::time::{clock_label, current_time_secs, elapsed_since};
use fm_core::DeviceId;
use fm_protocol::{
    DeviceHistory, DeviceStats, DeviceStatus, DeviceView, HistoryPoint, ProcessInfo,
    TelemetryReport,
};

use crate::history::HistoryBuffer;

/// Last-known state of one device, plus its history buffers.
#[derive(Debug)]
struct DeviceRecord {
    name: String,
    os: String,
    ip: Option<String>,
    last_seen: u64,
    stats: DeviceStats,
    processes: Vec<ProcessInfo>,
    hardware: serde_json::Value,
    cpu_history: HistoryBuffer,
    memory_history: HistoryBuffer,
    network_history: HistoryBuffer,
}

impl DeviceRecord {
    fn new(id: &DeviceId, history_capacity: usize) -> Self {
        Self {
            name: id.to_string(),
            os: "Unknown".to_string(),
            ip: None,
            last_seen: 0,
            stats: DeviceStats::default(),
            processes: Vec::new(),
            hardware: serde_json::Value::Object(Default::default()),
            cpu_history: HistoryBuffer::new(history_capacity),
            memory_history: HistoryBuffer::new(history_capacity),
            network_history: HistoryBuffer::new(history_capacity),
        }
    }

    fn to_view(&self, id: &DeviceId, offline_after: Duration) -> DeviceView {
        let status = if elapsed_since(self.last_seen) > offline_after {
            DeviceStatus::Offline
        } else {
            DeviceStatus::Online
        };

        DeviceView {
            id: id.to_string(),
            name: self.name.clone(),
            os: self.os.clone(),
            ip: self.ip.clone(),
            status,
            last_seen: self.last_seen,
            stats: self.stats.clone(),
            processes: self.processes.clone(),
            hardware: self.hardware.clone(),
            history: DeviceHistory {
                cpu: self.cpu_history.to_vec(),
                memory: self.memory_history.to_vec(),
                network: self.network_history.to_vec(),
            },
        }
    }
}

/// Registry of every device that has ever reported in.
pub struct DeviceRegistry {
    devices: DashMap<DeviceId, DeviceRecord>,
    offline_after: Duration,
    history_capacity: usize,
}

impl DeviceRegistry {
    /// Create an empty registry.
    pub fn new(offline_after: Duration, history_capacity: usize) -> Self {
        Self {
            devices: DashMap::new(),
            offline_after,
            history_capacity,
        }
    }

    /// Apply one telemetry report: upsert the record, refresh the heartbeat,
    /// and append one point per metric history labeled with the ingest time.
    ///
    /// Absent fields leave the previous value in place; absent stats append
    /// the metric defaults (0).
    pub fn ingest(&self, report: &TelemetryReport, source: Option<IpAddr>) {
        let id = DeviceId::new(report.id.clone());
        let now = current_time_secs();
        let label = clock_label(now);

        let mut record = self
            .devices
            .entry(id.clone())
            .or_insert_with(|| DeviceRecord::new(&id, self.history_capacity));

        record.last_seen = now;
        if let Some(name) = &report.name {
            record.name = name.clone();
        }
        if let Some(os) = &report.os {
            record.os = os.clone();
        }
        if let Some(stats) = &report.stats {
            record.stats = stats.clone();
        }
        if let Some(processes) = &report.processes {
            record.processes = processes.clone();
        }
        if let Some(hardware) = &report.hardware {
            record.hardware = hardware.clone();
        }
        if let Some(addr) = source {
            record.ip = Some(addr.to_string());
        }

        let stats = record.stats.clone();
        record
            .cpu_history
            .push(HistoryPoint::new(label.clone(), stats.cpu_usage as f64));
        record
            .memory_history
            .push(HistoryPoint::new(label.clone(), stats.memory_usage as f64));
        record
            .network_history
            .push(HistoryPoint::new(label, stats.network_in));
    }

    /// Snapshot every record as a projection with derived status.
    pub fn snapshot(&self) -> Vec<DeviceView> {
        self.devices
            .iter()
            .map(|entry| entry.value().to_view(entry.key(), self.offline_after))
            .collect()
    }

    /// Number of known devices.
    pub fn len(&self) -> usize {
        self.devices.len()
    }

    /// Check if empty.
    pub fn is_empty(&self) -> bool {
        self.devices.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(id: &str, cpu: f32) -> TelemetryReport {
        TelemetryReport {
            id: id.to_string(),
            stats: Some(DeviceStats {
                cpu_usage: cpu,
                ..Default::default()
            }),
            ..Default::default()
        }
    }

    fn registry() -> DeviceRegistry {
        DeviceRegistry::new(Duration::from_secs(15), 50)
    }

    #[test]
    fn test_first_report_creates_record() {
        let registry = registry();
        registry.ingest(&report("pi-01", 42.0), None);

        let views = registry.snapshot();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].id, "pi-01");
        assert_eq!(views[0].status, DeviceStatus::Online);
        assert_eq!(views[0].stats.cpu_usage, 42.0);
        assert_eq!(views[0].history.cpu.len(), 1);
    }

    #[test]
    fn test_latest_stats_win() {
        let registry = registry();
        registry.ingest(&report("pi-01", 10.0), None);
        registry.ingest(&report("pi-01", 90.0), None);

        let views = registry.snapshot();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].stats.cpu_usage, 90.0);
        assert_eq!(views[0].history.cpu.len(), 2);
    }

    #[test]
    fn test_absent_fields_keep_previous_values() {
        let registry = registry();
        registry.ingest(
            &TelemetryReport {
                id: "pi-01".to_string(),
                name: Some("kitchen-pi".to_string()),
                os: Some("Linux 6.8".to_string()),
                ..Default::default()
            },
            None,
        );
        registry.ingest(&report("pi-01", 5.0), None);

        let views = registry.snapshot();
        assert_eq!(views[0].name, "kitchen-pi");
        assert_eq!(views[0].os, "Linux 6.8");
    }

    #[test]
    fn test_history_capacity_enforced() {
        let registry = registry();
        for i in 0..51 {
            registry.ingest(&report("pi-01", i as f32), None);
        }

        let views = registry.snapshot();
        assert_eq!(views[0].history.cpu.len(), 50);
        // The first ingest (cpu 0) was evicted
        assert_eq!(views[0].history.cpu[0].value, 1.0);
    }

    #[test]
    fn test_status_ages_to_offline_and_flips_back() {
        let registry = DeviceRegistry::new(Duration::from_millis(0), 50);
        registry.ingest(&report("pi-01", 1.0), None);

        // Zero threshold: anything older than this instant reads offline
        std::thread::sleep(Duration::from_millis(1_100));
        assert_eq!(registry.snapshot()[0].status, DeviceStatus::Offline);

        registry.ingest(&report("pi-01", 2.0), None);
        assert_eq!(registry.snapshot()[0].status, DeviceStatus::Online);
    }

    #[test]
    fn test_stats_default_to_zero_without_report() {
        let registry = registry();
        registry.ingest(
            &TelemetryReport {
                id: "bare".to_string(),
                ..Default::default()
            },
            None,
        );

        let views = registry.snapshot();
        assert_eq!(views[0].stats.cpu_usage, 0.0);
        assert_eq!(views[0].history.cpu[0].value, 0.0);
    }
}
