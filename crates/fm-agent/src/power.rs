//! Power command execution
//!
//! Reboot and shutdown go through the platform's own shutdown command so
//! init gets a clean transition. The agent process is expected to die as a
//! side effect; any error before that is reported to the caller.

use anyhow::{Context, Result};

use fm_protocol::PowerAction;

/// Execute a power action received from the coordinator.
pub async fn execute(action: PowerAction) -> Result<()> {
    let (program, args) = platform_command(action);
    tracing::warn!("Executing {} via {} {:?}", action, program, args);

    let status = tokio::process::Command::new(program)
        .args(args)
        .status()
        .await
        .with_context(|| format!("Failed to run {}", program))?;

    if !status.success() {
        anyhow::bail!("{} exited with {}", program, status);
    }
    Ok(())
}

#[cfg(unix)]
fn platform_command(action: PowerAction) -> (&'static str, &'static [&'static str]) {
    match action {
        PowerAction::Reboot => ("shutdown", &["-r", "now"]),
        PowerAction::Shutdown => ("shutdown", &["-h", "now"]),
    }
}

#[cfg(windows)]
fn platform_command(action: PowerAction) -> (&'static str, &'static [&'static str]) {
    match action {
        PowerAction::Reboot => ("shutdown", &["/r", "/t", "0"]),
        PowerAction::Shutdown => ("shutdown", &["/s", "/t", "0"]),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[cfg(unix)]
    #[test]
    fn test_platform_command_shapes() {
        let (program, args) = platform_command(PowerAction::Reboot);
        assert_eq!(program, "shutdown");
        assert_eq!(args, &["-r", "now"]);

        let (_, args) = platform_command(PowerAction::Shutdown);
        assert_eq!(args, &["-h", "now"]);
    }
}
