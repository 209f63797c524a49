//! `validate` command implementation.

use anyhow::{Context, Result};
use config_loader::ConfigLoader;
use contracts::{SessionConfig, SinkType};
use serde::Serialize;
use tracing::{info, warn};

use crate::cli::ValidateArgs;

/// Validation result for JSON output
#[derive(Serialize)]
struct ValidationResult {
    valid: bool,
    config_path: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    warnings: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    summary: Option<ConfigSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    effective_config: Option<serde_json::Value>,
    #[serde(skip)]
    effective_toml: Option<String>,
}

#[derive(Serialize)]
struct ConfigSummary {
    version: String,
    address: String,
    packet_len: usize,
    start_threshold: f64,
    stop_threshold: f64,
    min_rep_duration: f64,
    buffer_capacity: usize,
    log_path: String,
    sink_count: usize,
}

/// Execute the `validate` command
pub fn run_validate(args: &ValidateArgs) -> Result<()> {
    info!(config = %args.config.display(), "Validating configuration");

    let result = validate_config(args);

    if args.json {
        let json = serde_json::to_string_pretty(&result)
            .context("Failed to serialize validation result")?;
        println!("{json}");
    } else {
        print_validation_result(&result);
    }

    if result.valid {
        Ok(())
    } else {
        anyhow::bail!("Configuration validation failed")
    }
}

fn validate_config(args: &ValidateArgs) -> ValidationResult {
    let config_path = args.config.display().to_string();

    if !args.config.exists() {
        return ValidationResult {
            valid: false,
            config_path,
            error: Some(format!("File not found: {}", args.config.display())),
            warnings: None,
            summary: None,
            effective_config: None,
            effective_toml: None,
        };
    }

    match ConfigLoader::load_from_path(&args.config) {
        Ok(config) => {
            let warnings = collect_warnings(&config);
            let (effective_config, effective_toml) = if args.print_config {
                effective(&config, args.json)
            } else {
                (None, None)
            };
            ValidationResult {
                valid: true,
                config_path,
                error: None,
                warnings: (!warnings.is_empty()).then_some(warnings),
                summary: Some(ConfigSummary {
                    version: format!("{:?}", config.version),
                    address: config.link.address.clone(),
                    packet_len: config.decode.byte_len(),
                    start_threshold: config.reps.start_threshold,
                    stop_threshold: config.reps.stop_threshold,
                    min_rep_duration: config.reps.min_rep_duration,
                    buffer_capacity: config.live.buffer_capacity,
                    log_path: config.recording.log_path.display().to_string(),
                    sink_count: config.all_sinks().len(),
                }),
                effective_config,
                effective_toml,
            }
        }
        Err(e) => ValidationResult {
            valid: false,
            config_path,
            error: Some(e.to_string()),
            warnings: None,
            summary: None,
            effective_config: None,
            effective_toml: None,
        },
    }
}

/// Serialized effective config, as JSON for `--json` and TOML otherwise
fn effective(config: &SessionConfig, json: bool) -> (Option<serde_json::Value>, Option<String>) {
    let rendered = if json {
        ConfigLoader::to_json(config).and_then(|s| {
            serde_json::from_str(&s)
                .map_err(|e| contracts::ContractError::config_parse(e.to_string()))
        })
        .map(|value| (Some(value), None))
    } else {
        ConfigLoader::to_toml(config).map(|toml| (None, Some(toml)))
    };
    rendered.unwrap_or_else(|e| {
        warn!(error = %e, "Failed to serialize effective configuration");
        (None, None)
    })
}

/// Collect configuration warnings (non-fatal issues)
fn collect_warnings(config: &SessionConfig) -> Vec<String> {
    let mut warnings = Vec::new();

    let reps = &config.reps;
    if reps.start_threshold - reps.stop_threshold < 1.0 {
        warnings.push(format!(
            "Hysteresis gap of {:.2} deg/s is narrow; reps may chatter",
            reps.start_threshold - reps.stop_threshold
        ));
    }

    if config.trajectory.max_window_s > 60.0 {
        warnings.push(
            "trajectory.max_window_s above 60s; long traces are dominated by drift".to_string(),
        );
    }

    if config.live.channel_capacity < config.live.buffer_capacity {
        warnings.push(
            "live.channel_capacity is smaller than live.buffer_capacity; bursts may drop samples"
                .to_string(),
        );
    }

    for sink in &config.sinks {
        if sink.sink_type == SinkType::Csv
            && sink.params.get("path").map(String::as_str)
                == Some(config.recording.log_path.to_string_lossy().as_ref())
        {
            warnings.push(format!(
                "Sink '{}' writes to the durable log path and will clobber it",
                sink.name
            ));
        }
    }

    warnings
}

fn print_validation_result(result: &ValidationResult) {
    if result.valid {
        println!("✓ Configuration is valid: {}", result.config_path);

        if let Some(ref summary) = result.summary {
            println!("\n  Version: {}", summary.version);
            println!("  Device: {}", summary.address);
            println!("  Packet length: {} bytes", summary.packet_len);
            println!(
                "  Reps: start>{} stop<{} min={}s",
                summary.start_threshold, summary.stop_threshold, summary.min_rep_duration
            );
            println!("  Live buffer: {} samples", summary.buffer_capacity);
            println!("  Log: {}", summary.log_path);
            println!("  Sinks: {}", summary.sink_count);
        }

        if let Some(ref toml) = result.effective_toml {
            println!("\n  Effective configuration:\n");
            for line in toml.lines() {
                println!("    {line}");
            }
        }

        if let Some(ref warnings) = result.warnings {
            println!("\n⚠ Warnings:");
            for warning in warnings {
                println!("  - {warning}");
            }
        }
    } else {
        println!("✗ Configuration is invalid: {}", result.config_path);
        if let Some(ref error) = result.error {
            println!("\n  Error: {error}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::path::PathBuf;

    fn validate_str(content: &str) -> ValidationResult {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        validate_config(&ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
            print_config: false,
        })
    }

    #[test]
    fn test_valid_config_summary() {
        let result = validate_str("[reps]\nstart_threshold = 15.0\n");
        assert!(result.valid);
        let summary = result.summary.unwrap();
        assert_eq!(summary.packet_len, 14);
        assert_eq!(summary.sink_count, 1);
        assert!(result.warnings.is_none());
    }

    #[test]
    fn test_invalid_config() {
        let result = validate_str("[reps]\nstart_threshold = 5.0\nstop_threshold = 6.0\n");
        assert!(!result.valid);
        assert!(result.error.unwrap().contains("stop_threshold"));
    }

    #[test]
    fn test_narrow_gap_warns() {
        let result = validate_str("[reps]\nstart_threshold = 6.5\nstop_threshold = 6.0\n");
        assert!(result.valid);
        assert_eq!(result.warnings.map(|w| w.len()), Some(1));
    }

    #[test]
    fn test_missing_file() {
        let result = validate_config(&ValidateArgs {
            config: PathBuf::from("/nonexistent/liftlog.toml"),
            json: true,
            print_config: true,
        });
        assert!(!result.valid);
        assert!(result.effective_config.is_none());
    }

    #[test]
    fn test_effective_config_fills_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        file.write_all(b"[reps]\nstart_threshold = 15.0\n").unwrap();

        let toml_result = validate_config(&ValidateArgs {
            config: file.path().to_path_buf(),
            json: false,
            print_config: true,
        });
        let toml = toml_result.effective_toml.unwrap();
        let reparsed =
            ConfigLoader::load_from_str(&toml, config_loader::ConfigFormat::Toml).unwrap();
        assert_eq!(reparsed.reps.start_threshold, 15.0);
        assert_eq!(reparsed.reps.stop_threshold, 6.0);
        assert!(toml_result.effective_config.is_none());

        let json_result = validate_config(&ValidateArgs {
            config: file.path().to_path_buf(),
            json: true,
            print_config: true,
        });
        let value = json_result.effective_config.unwrap();
        assert_eq!(value["reps"]["start_threshold"], 15.0);
        assert_eq!(value["live"]["buffer_capacity"], 300);
    }
}
