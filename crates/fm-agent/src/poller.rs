//! Telemetry poll loop
//!
//! Posts one report per tick and acts on whatever the coordinator sends
//! back. Network failures are logged at debug and retried by the next tick;
//! there is no backoff because the coordinator is expected to be on the
//! same network and the interval already bounds the request rate.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use fm_core::config::AgentConfig;
use fm_core::metrics::{os_description, MetricsCollector};
use fm_protocol::{CommandKind, PowerAction, TelemetryReport, TelemetryResponse};

use crate::power;

/// How many processes each report carries.
const PROCESS_LIMIT: usize = 10;

/// Run the telemetry loop until cancelled.
pub async fn run(config: Arc<AgentConfig>, client: reqwest::Client, cancel: CancellationToken) {
    let identity = config.device_id();
    let name = config.device_name();
    let url = config.endpoint("/api/telemetry");

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

    tracing::info!(
        "Reporting as {} to {} every {:?}",
        identity,
        url,
        config.poll_interval
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
            id: identity.clone(),
            name: Some(name.clone()),
            os: Some(os.clone()),
            stats: Some(stats),
            processes: Some(processes),
            hardware: Some(hardware.clone()),
        };

        match post_report(&client, &url, &report).await {
            Ok(response) => handle_response(response).await,
            Err(e) => tracing::debug!("Telemetry post failed, retrying next tick: {}", e),
        }

        tokio::select! {
            _ = tokio::time::sleep(config.poll_interval) => {}
            _ = cancel.cancelled() => {
                tracing::debug!("Telemetry loop stopped");
                return;
            }
        }
    }
}

async fn post_report(
    client: &reqwest::Client,
    url: &str,
    report: &TelemetryReport,
) -> anyhow::Result<TelemetryResponse> {
    let response = client
        .post(url)
        .json(report)
        .send()
        .await?
        .error_for_status()?
        .json::<TelemetryResponse>()
        .await?;
    Ok(response)
}

/// Act on the command piggybacked on a telemetry response, if any.
async fn handle_response(response: TelemetryResponse) {
    match response.command {
        Some(CommandKind::Reboot) => run_power(PowerAction::Reboot).await,
        Some(CommandKind::Shutdown) => run_power(PowerAction::Shutdown).await,
        Some(CommandKind::Update) => {
            // The update itself is the host's concern; the agent only
            // records that the trigger arrived and from where.
            tracing::info!(
                "Update requested from {}",
                response.repo_url.as_deref().unwrap_or("<unset>")
            );
        }
        None => {}
    }
}

async fn run_power(action: PowerAction) {
    if let Err(e) = power::execute(action).await {
        tracing::error!("Failed to execute {}: {:#}", action, e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_shape_for_wire() {
        let report = TelemetryReport {
            id: "pi-01".to_string(),
            name: Some("kitchen-pi".to_string()),
            os: Some("Linux 6.8".to_string()),
            stats: None,
            processes: None,
            hardware: None,
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["id"], "pi-01");
        // Absent sections are omitted entirely, not null
        assert!(json.get("stats").is_none());
    }

    #[tokio::test]
    async fn test_update_response_is_acknowledged_without_power_action() {
        // Must not attempt a reboot; completes immediately
        handle_response(TelemetryResponse {
            status: "ok".to_string(),
            command: Some(CommandKind::Update),
            repo_url: Some("https://example.com/repo".to_string()),
            token: None,
        })
        .await;
    }
}
