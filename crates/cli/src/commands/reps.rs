//! `reps` command implementation.

use anyhow::{Context, Result};
use contracts::Rep;
use tracing::{info, warn};

use analysis::{write_rep_report, LogReader, RepSegmenter};

use super::{load_session_config, resolve_log, revalidate};
use crate::cli::RepsArgs;

/// Execute the `reps` command
pub fn run_reps(args: &RepsArgs) -> Result<()> {
    let mut config = load_session_config(args.config.as_deref())?;

    if let Some(start) = args.start_threshold {
        config.reps.start_threshold = start;
    }
    if let Some(stop) = args.stop_threshold {
        config.reps.stop_threshold = stop;
    }
    if let Some(min) = args.min_rep_duration {
        config.reps.min_rep_duration = min;
    }
    revalidate(&config)?;

    let input = resolve_log(args.input.as_ref(), &config)?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| config.recording.rep_report_path());

    info!(
        input = %input.display(),
        start_threshold = config.reps.start_threshold,
        stop_threshold = config.reps.stop_threshold,
        min_rep_duration = config.reps.min_rep_duration,
        "Segmenting reps"
    );

    let rows = LogReader::from_path(&input)
        .and_then(LogReader::gyro_rows)
        .with_context(|| format!("Failed to read {}", input.display()))?;
    let segmentation = RepSegmenter::new(config.reps)?
        .segment(&rows)
        .with_context(|| format!("Failed to segment {}", input.display()))?;

    println!(
        "Detected {} reps from {}",
        segmentation.reps.len(),
        input.display()
    );
    for rep in &segmentation.reps {
        println!("{}", rep_line(rep));
    }
    if let Some(start) = segmentation.unterminated_start {
        warn!(start, "Trailing rep never dropped below the stop threshold");
        println!("Note: a rep starting at {start:.3}s was still open at the end of the log and was not counted");
    }

    write_rep_report(&output, &segmentation.reps)
        .with_context(|| format!("Failed to write {}", output.display()))?;
    println!("Saved analysis to: {}", output.display());

    Ok(())
}

fn rep_line(rep: &Rep) -> String {
    format!(
        "Rep {}: start={:.3} end={:.3} dur={:.2}s",
        rep.index,
        rep.start_time,
        rep.end_time,
        rep.duration()
    )
}
