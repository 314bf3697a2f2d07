//! Self-telemetry sampler
//!
//! The coordinator host shows up in its own fleet view: a background loop
//! samples local metrics and feeds them through the same registry ingest
//! path the agents use, under the reserved local identity. Commands queued
//! for that identity are drained here too, though power actions for the
//! coordinator's own host are only logged, never executed.

use tokio_util::sync::CancellationToken;

use fm_core::metrics::{host_name, os_description, MetricsCollector};
use fm_protocol::TelemetryReport;

use crate::state::CoordinatorState;

/// How many processes each self-telemetry report carries.
const PROCESS_LIMIT: usize = 10;

/// Run the sampling loop until cancelled.
pub async fn run(state: CoordinatorState, cancel: CancellationToken) {
    let identity = state.local_identity();
    let interval = state.config.self_telemetry_interval;

    // Metric sampling blocks on procfs reads, so every pass runs off the
    // runtime; the collector shuttles through the blocking task each tick
    let (mut collector, hardware) = match tokio::task::spawn_blocking(|| {
        let mut collector = MetricsCollector::new();
        let hardware = collector.hardware_snapshot();
        (collector, hardware)
    })
    .await
    {
        Ok(init) => init,
        Err(e) => {
            tracing::error!("Failed to start metrics collector: {}", e);
            return;
        }
    };
    let os = os_description();
    let hostname = host_name().unwrap_or_else(|| identity.to_string());

    tracing::info!(
        "Self-telemetry for {} every {:?}",
        identity,
        interval
    );

    loop {
        let (returned, stats, processes) = match tokio::task::spawn_blocking(move || {
            let stats = collector.sample_stats();
            let processes = collector.sample_processes(PROCESS_LIMIT);
            (collector, stats, processes)
        })
        .await
        {
            Ok(sampled) => sampled,
            Err(e) => {
                tracing::error!("Metric sampling failed: {}", e);
                return;
            }
        };
        collector = returned;

        let report = TelemetryReport {
            id: identity.to_string(),
            name: Some(hostname.clone()),
            os: Some(os.clone()),
            stats: Some(stats),
            processes: Some(processes),
            hardware: Some(hardware.clone()),
        };
        state.registry.ingest(&report, None);

        if let Some(command) = state.mailbox.drain(&identity) {
            tracing::warn!(
                "Ignoring {:?} queued for the coordinator's own host",
                command
            );
        }

        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = cancel.cancelled() => {
                tracing::debug!("Self-telemetry sampler stopped");
                return;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fm_core::config::CoordinatorConfig;
    use std::time::Duration;

    #[tokio::test]
    async fn test_sampler_populates_registry_and_stops() {
        let state = CoordinatorState::new(CoordinatorConfig {
            self_telemetry_interval: Duration::from_secs(60),
            ..Default::default()
        });
        let cancel = CancellationToken::new();

        let task = tokio::spawn(run(state.clone(), cancel.clone()));

        // One sample lands before the first sleep
        for _ in 0..100 {
            if !state.registry.is_empty() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        let views = state.registry.snapshot();
        assert_eq!(views.len(), 1);
        assert_eq!(views[0].id, "server");

        cancel.cancel();
        tokio::time::timeout(Duration::from_secs(1), task)
            .await
            .expect("sampler did not stop on cancel")
            .unwrap();
    }
}
