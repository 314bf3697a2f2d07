//! Host metrics collection
//!
//! Samples the stats snapshot, process list, and hardware description that
//! make up a telemetry report. Used by the agent's poll loop and by the
//! coordinator's self-telemetry sampler.

use std::time::Instant;

use serde_json::json;
use sysinfo::{Components, Disks, Networks, ProcessesToUpdate, System};

use fm_protocol::{DeviceStats, ProcessInfo};

/// Sensor labels tried first when looking for a CPU temperature.
const CPU_SENSOR_HINTS: &[&str] = &["cpu", "coretemp", "k10temp", "tctl"];

/// Collects host metrics across successive samples.
///
/// Network rates are deltas between samples, so the first sample reports 0
/// and accuracy improves with a steady sampling interval.
pub struct MetricsCollector {
    sys: System,
    networks: Networks,
    disks: Disks,
    components: Components,
    last_net_sample: Instant,
}

impl MetricsCollector {
    /// Create a collector and take the initial baseline sample.
    pub fn new() -> Self {
        let mut sys = System::new();
        sys.refresh_cpu_usage();
        sys.refresh_memory();

        Self {
            sys,
            networks: Networks::new_with_refreshed_list(),
            disks: Disks::new_with_refreshed_list(),
            components: Components::new_with_refreshed_list(),
            last_net_sample: Instant::now(),
        }
    }

    /// Sample the current stats snapshot.
    pub fn sample_stats(&mut self) -> DeviceStats {
        self.sys.refresh_cpu_usage();
        self.sys.refresh_memory();
        self.disks.refresh();
        self.components.refresh();

        let total = self.sys.total_memory();
        let used = self.sys.used_memory();
        let memory_usage = if total > 0 {
            (used as f64 / total as f64 * 100.0) as f32
        } else {
            0.0
        };

        let (network_in, network_out) = self.sample_network_rates();
        let (disk_usage, _) = self.root_disk_usage();

        DeviceStats {
            cpu_usage: self.sys.global_cpu_usage(),
            memory_usage,
            memory_used: to_gb(used),
            memory_total: to_gb(total),
            temperature: self.cpu_temperature(),
            network_in,
            network_out,
            disk_usage,
        }
    }

    /// Sample the process list, heaviest CPU consumers first.
    pub fn sample_processes(&mut self, limit: usize) -> Vec<ProcessInfo> {
        self.sys.refresh_processes(ProcessesToUpdate::All, true);

        let mut processes: Vec<ProcessInfo> = self
            .sys
            .processes()
            .values()
            .map(|p| ProcessInfo {
                pid: p.pid().as_u32(),
                name: p.name().to_string_lossy().into_owned(),
                status: p.status().to_string().to_lowercase(),
                cpu: p.cpu_usage(),
                memory: round1(p.memory() as f64 / (1024.0 * 1024.0)),
                uptime: format_uptime(p.run_time()),
            })
            .collect();

        processes.sort_by(|a, b| b.cpu.partial_cmp(&a.cpu).unwrap_or(std::cmp::Ordering::Equal));
        processes.truncate(limit);
        processes
    }

    /// Describe the host hardware. Stable for the process lifetime, so
    /// callers collect it once and cache it.
    pub fn hardware_snapshot(&mut self) -> serde_json::Value {
        self.sys.refresh_cpu_usage();

        let cpu_model = self
            .sys
            .cpus()
            .first()
            .map(|c| c.brand().trim().to_string())
            .unwrap_or_else(|| "Unknown".to_string());

        let storage: Vec<serde_json::Value> = self
            .disks
            .list()
            .iter()
            .map(|d| {
                json!({
                    "name": d.name().to_string_lossy(),
                    "size": format!("{:.1} GB", to_gb(d.total_space())),
                    "type": d.file_system().to_string_lossy(),
                })
            })
            .collect();

        json!({
            "cpu": {
                "model": cpu_model,
                "cores": self.sys.physical_core_count().unwrap_or(0),
                "threads": self.sys.cpus().len(),
                "architecture": std::env::consts::ARCH,
            },
            "memory": {
                "total": format!("{:.1} GB", to_gb(self.sys.total_memory())),
            },
            "storage": storage,
        })
    }

    /// Network in/out rates in KB/s, averaged since the previous sample.
    fn sample_network_rates(&mut self) -> (f64, f64) {
        self.networks.refresh();

        let elapsed = self.last_net_sample.elapsed().as_secs_f64();
        self.last_net_sample = Instant::now();
        if elapsed <= 0.0 {
            return (0.0, 0.0);
        }

        let mut received = 0u64;
        let mut transmitted = 0u64;
        for (_, data) in &self.networks {
            received += data.received();
            transmitted += data.transmitted();
        }

        (
            round1(received as f64 / 1024.0 / elapsed),
            round1(transmitted as f64 / 1024.0 / elapsed),
        )
    }

    /// Usage percentage and total bytes of the root filesystem (largest
    /// disk when no "/" mount exists, e.g. on Windows).
    fn root_disk_usage(&self) -> (f32, u64) {
        let disk = self
            .disks
            .list()
            .iter()
            .find(|d| d.mount_point() == std::path::Path::new("/"))
            .or_else(|| self.disks.list().iter().max_by_key(|d| d.total_space()));

        match disk {
            Some(d) if d.total_space() > 0 => {
                let used = d.total_space() - d.available_space();
                (
                    (used as f64 / d.total_space() as f64 * 100.0) as f32,
                    d.total_space(),
                )
            }
            _ => (0.0, 0),
        }
    }

    /// Best-effort CPU temperature; 0 when no sensor matches.
    fn cpu_temperature(&self) -> f32 {
        let components = self.components.list();

        for hint in CPU_SENSOR_HINTS {
            if let Some(c) = components
                .iter()
                .find(|c| c.label().to_lowercase().contains(hint))
            {
                return c.temperature();
            }
        }

        components.first().map(|c| c.temperature()).unwrap_or(0.0)
    }
}

impl Default for MetricsCollector {
    fn default() -> Self {
        Self::new()
    }
}

/// Host name, when the platform exposes one.
pub fn host_name() -> Option<String> {
    System::host_name()
}

/// Describe the host operating system, e.g. "Linux 6.8.0".
pub fn os_description() -> String {
    format!(
        "{} {}",
        System::name().unwrap_or_else(|| std::env::consts::OS.to_string()),
        System::os_version().unwrap_or_default()
    )
    .trim_end()
    .to_string()
}

/// Format a process uptime the way the dashboard expects: "42s", "5m", "3h", "2d".
pub fn format_uptime(seconds: u64) -> String {
    match seconds {
        s if s < 60 => format!("{}s", s),
        s if s < 3_600 => format!("{}m", s / 60),
        s if s < 86_400 => format!("{}h", s / 3_600),
        s => format!("{}d", s / 86_400),
    }
}

fn to_gb(bytes: u64) -> f64 {
    round2(bytes as f64 / (1024.0 * 1024.0 * 1024.0))
}

fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
