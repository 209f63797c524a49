//! `record` command implementation.

use std::time::Duration;

use anyhow::{Context, Result};
use link::{SimulatedConfig, SimulatedDevice};
use tracing::{info, warn};

use super::{load_session_config, revalidate};
use crate::cli::RecordArgs;
use crate::pipeline::{Pipeline, PipelineConfig};

/// Execute the `record` command
pub async fn run_record(args: &RecordArgs) -> Result<()> {
    let mut session = load_session_config(args.config.as_deref())?;

    if let Some(ref address) = args.address {
        info!(address = %address, "Overriding device address from CLI");
        session.link.address = address.clone();
    }
    if let Some(ref log_path) = args.log_path {
        info!(path = %log_path.display(), "Overriding log path from CLI");
        session.recording.log_path = log_path.clone();
    }
    revalidate(&session)?;

    if !(args.sim_rate_hz.is_finite() && args.sim_rate_hz > 0.0) {
        anyhow::bail!("--sim-rate-hz must be > 0, got {}", args.sim_rate_hz);
    }
    let duration = recording_duration(args.duration)?;

    // The radio stack is external; record against the simulated wearable
    let device = SimulatedDevice::new(
        &session.link,
        &session.decode,
        SimulatedConfig {
            rate_hz: args.sim_rate_hz,
            ..Default::default()
        },
    )
    .context("Failed to create simulated device")?;

    info!(
        address = %session.link.address,
        log = %session.recording.log_path.display(),
        rate_hz = args.sim_rate_hz,
        "Recording from simulated device"
    );

    let pipeline = Pipeline::new(PipelineConfig {
        session,
        duration,
        max_samples: (args.max_samples > 0).then_some(args.max_samples),
        reset_seq: args.reset_seq,
    });

    let stats = pipeline
        .run(device, shutdown_signal())
        .await
        .context("Recording failed")?;
    stats.print_summary();

    Ok(())
}

/// `--duration` in seconds; 0 means until shutdown
fn recording_duration(secs: f64) -> Result<Option<Duration>> {
    if secs == 0.0 {
        return Ok(None);
    }
    match Duration::try_from_secs_f64(secs) {
        Ok(duration) => Ok(Some(duration)),
        Err(e) => anyhow::bail!("--duration must be a finite value >= 0, got {secs}: {e}"),
    }
}

/// Resolves on Ctrl+C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    warn!("Received shutdown signal");
}
