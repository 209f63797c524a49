//! Command implementations.

mod record;
mod reps;
mod trajectory;
mod validate;

pub use record::run_record;
pub use reps::run_reps;
pub use trajectory::run_trajectory;
pub use validate::run_validate;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use contracts::SessionConfig;
use tracing::info;

use crate::error::CliError;

/// Load the session configuration, or the defaults when no path is given
pub(crate) fn load_session_config(path: Option<&Path>) -> Result<SessionConfig> {
    let Some(path) = path else {
        info!("No configuration file given, using defaults");
        return Ok(SessionConfig::default());
    };

    if !path.exists() {
        return Err(CliError::config_not_found(path).into());
    }

    info!(config = %path.display(), "Loading configuration");
    config_loader::ConfigLoader::load_from_path(path)
        .with_context(|| format!("Failed to load config from {}", path.display()))
}

/// Re-run validation after command-line overrides were applied
pub(crate) fn revalidate(config: &SessionConfig) -> Result<()> {
    config_loader::ConfigLoader::validate(config).map_err(CliError::from)?;
    Ok(())
}

/// Input log for the analysis commands
pub(crate) fn resolve_log(input: Option<&PathBuf>, config: &SessionConfig) -> Result<PathBuf> {
    let path = input
        .cloned()
        .unwrap_or_else(|| config.recording.log_path.clone());
    if !path.exists() {
        return Err(CliError::log_not_found(&path).into());
    }
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_without_path() {
        let config = load_session_config(None).unwrap();
        assert_eq!(config.live.buffer_capacity, 300);
    }

    #[test]
    fn test_missing_config_file() {
        let err = load_session_config(Some(Path::new("/nonexistent/liftlog.toml"))).unwrap_err();
        assert!(err.to_string().contains("Configuration file not found"));
    }

    #[test]
    fn test_loads_file() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[reps]\nstart_threshold = 20.0").unwrap();

        let config = load_session_config(Some(file.path())).unwrap();
        assert_eq!(config.reps.start_threshold, 20.0);
    }

    #[test]
    fn test_revalidate_rejects_inverted_thresholds() {
        let mut config = SessionConfig::default();
        config.reps.stop_threshold = 30.0;
        let err = revalidate(&config).unwrap_err();
        assert!(err.to_string().contains("Invalid override"));
    }

    #[test]
    fn test_missing_log() {
        let config = SessionConfig::default();
        let missing = PathBuf::from("/nonexistent/log.csv");
        let err = resolve_log(Some(&missing), &config).unwrap_err();
        assert!(err.to_string().contains("Sample log not found"));
    }
}
