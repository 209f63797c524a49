//! `trajectory` command implementation.

use anyhow::{Context, Result};
use tracing::{info, warn};

use analysis::{sort_by_time, write_trajectory_report, LogReader, TrajectoryEstimator};

use super::{load_session_config, resolve_log, revalidate};
use crate::cli::TrajectoryArgs;

/// Execute the `trajectory` command
pub fn run_trajectory(args: &TrajectoryArgs) -> Result<()> {
    let mut config = load_session_config(args.config.as_deref())?;
    if let Some(max_window_s) = args.max_window_s {
        config.trajectory.max_window_s = max_window_s;
    }
    revalidate(&config)?;

    let input = resolve_log(args.input.as_ref(), &config)?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| config.recording.trajectory_report_path());

    info!(input = %input.display(), "Estimating trajectory");

    let mut rows = LogReader::from_path(&input)
        .and_then(LogReader::accel_rows)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    sort_by_time(&mut rows);

    let report = TrajectoryEstimator::new(config.trajectory)?.estimate(&rows)?;
    let diagnostics = report.diagnostics;

    println!(
        "Estimated {} points over {:.2}s from {}",
        report.points.len(),
        diagnostics.window_s,
        input.display()
    );
    println!(
        "  bias removed: x={:.4}g z={:.4}g; velocity drift removed: x={:.4} z={:.4}",
        diagnostics.bias_x,
        diagnostics.bias_z,
        diagnostics.velocity_mean_x,
        diagnostics.velocity_mean_z
    );
    if report.exceeds_recommended_window {
        warn!(
            window_s = diagnostics.window_s,
            max_window_s = config.trajectory.max_window_s,
            "Log is longer than the recommended trajectory window"
        );
        println!(
            "Warning: {:.1}s exceeds the recommended {:.1}s window; the path is dominated by drift",
            diagnostics.window_s, config.trajectory.max_window_s
        );
    }

    write_trajectory_report(&output, &report.points)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Saved trajectory to: {}", output.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_run_trajectory_sorts_and_writes() {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("log.csv");
        let output = dir.path().join("out").join("trajectory.csv");

        // Out of order on purpose
        fs::write(
            &input,
            "t_s,seq,ax,ay,az,gx,gy,gz\n\
             0.2,2,-1,0,0,0,0,0\n\
             0.0,0,0,0,1,0,0,0\n\
             0.1,1,1,0,2,0,0,0\n\
             0.3,3,0,0,1,0,0,0\n",
        )
        .unwrap();

        let args = TrajectoryArgs {
            config: None,
            input: Some(input),
            output: Some(output.clone()),
            max_window_s: None,
        };
        run_trajectory(&args).unwrap();

        let report = fs::read_to_string(output).unwrap();
        let lines: Vec<_> = report.lines().collect();
        assert_eq!(lines[0], "t_s,position_x,position_z");
        assert_eq!(lines.len(), 5);
        assert!(lines[1].starts_with("0.000000,"));
        assert_eq!(lines[2], "0.100000,0.007500,0.007500");
    }
}
