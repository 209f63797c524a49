//! Analysis report writers

use std::fs;
use std::io;
use std::path::Path;

use contracts::{Rep, TrajectoryPoint};
use tracing::info;

use crate::error::Result;

pub const REP_REPORT_HEADER: [&str; 4] = ["rep_number", "start_time", "end_time", "duration_sec"];
pub const TRAJECTORY_REPORT_HEADER: [&str; 3] = ["t_s", "position_x", "position_z"];

/// Write reps as `rep_number,start_time,end_time,duration_sec`
///
/// Fixed precision (6 decimals for times, 3 for the duration) keeps reruns
/// byte-identical.
pub fn write_rep_report(path: impl AsRef<Path>, reps: &[Rep]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_writer(create(path)?);
    write_reps(&mut writer, reps)?;
    writer.flush()?;
    info!(path = %path.display(), reps = reps.len(), "Rep report written");
    Ok(())
}

fn write_reps<W: io::Write>(writer: &mut csv::Writer<W>, reps: &[Rep]) -> Result<()> {
    writer.write_record(REP_REPORT_HEADER)?;
    for rep in reps {
        writer.write_record([
            rep.index.to_string(),
            format!("{:.6}", rep.start_time),
            format!("{:.6}", rep.end_time),
            format!("{:.3}", rep.duration()),
        ])?;
    }
    Ok(())
}

/// Write the estimated trace as `t_s,position_x,position_z`
pub fn write_trajectory_report(path: impl AsRef<Path>, points: &[TrajectoryPoint]) -> Result<()> {
    let path = path.as_ref();
    let mut writer = csv::Writer::from_writer(create(path)?);
    writer.write_record(TRAJECTORY_REPORT_HEADER)?;
    for point in points {
        writer.write_record([
            format!("{:.6}", point.time),
            format!("{:.6}", point.position_x),
            format!("{:.6}", point.position_z),
        ])?;
    }
    writer.flush()?;
    info!(path = %path.display(), points = points.len(), "Trajectory report written");
    Ok(())
}

fn create(path: &Path) -> Result<fs::File> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(fs::File::create(path)?)
}
