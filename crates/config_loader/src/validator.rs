//! Configuration validation
//!
//! Rules:
//! - link address and characteristic UUIDs are non-empty
//! - connect timeout is finite and > 0
//! - decode layout describes every sample field exactly once
//! - rep thresholds are finite, >= 0, and stop < start
//! - min_rep_duration >= 0
//! - live buffer and channel capacities > 0
//! - sink names are non-empty and unique, and do not shadow the durable log

use std::collections::HashSet;

use contracts::{ContractError, DURABLE_LOG_SINK, SessionConfig, SinkType};

/// Validate a SessionConfig
///
/// Returns the first error encountered, or Ok(()).
pub fn validate(config: &SessionConfig) -> Result<(), ContractError> {
    validate_link(config)?;
    config.decode.validate()?;
    validate_reps(config)?;
    validate_trajectory(config)?;
    validate_live(config)?;
    validate_sinks(config)?;
    Ok(())
}

fn validate_link(config: &SessionConfig) -> Result<(), ContractError> {
    let link = &config.link;

    if link.address.trim().is_empty() {
        return Err(ContractError::config_validation(
            "link.address",
            "address must not be empty",
        ));
    }
    if link.notify_characteristic.is_empty() {
        return Err(ContractError::config_validation(
            "link.notify_characteristic",
            "characteristic UUID must not be empty",
        ));
    }
    if link.write_characteristic.is_empty() {
        return Err(ContractError::config_validation(
            "link.write_characteristic",
            "characteristic UUID must not be empty",
        ));
    }
    if !link.connect_timeout_s.is_finite() || link.connect_timeout_s <= 0.0 {
        return Err(ContractError::config_validation(
            "link.connect_timeout_s",
            format!("timeout must be > 0, got {}", link.connect_timeout_s),
        ));
    }
    Ok(())
}

fn validate_reps(config: &SessionConfig) -> Result<(), ContractError> {
    let reps = &config.reps;

    for (field, value) in [
        ("reps.start_threshold", reps.start_threshold),
        ("reps.stop_threshold", reps.stop_threshold),
        ("reps.min_rep_duration", reps.min_rep_duration),
    ] {
        if !value.is_finite() || value < 0.0 {
            return Err(ContractError::config_validation(
                field,
                format!("must be finite and >= 0, got {value}"),
            ));
        }
    }

    // Hysteresis requires a gap between the two thresholds
    if reps.stop_threshold >= reps.start_threshold {
        return Err(ContractError::config_validation(
            "reps.stop_threshold",
            format!(
                "stop_threshold ({}) must be < start_threshold ({})",
                reps.stop_threshold, reps.start_threshold
            ),
        ));
    }
    Ok(())
}

fn validate_trajectory(config: &SessionConfig) -> Result<(), ContractError> {
    let max = config.trajectory.max_window_s;
    if !max.is_finite() || max <= 0.0 {
        return Err(ContractError::config_validation(
            "trajectory.max_window_s",
            format!("must be > 0, got {max}"),
        ));
    }
    Ok(())
}

fn validate_live(config: &SessionConfig) -> Result<(), ContractError> {
    if config.live.buffer_capacity == 0 {
        return Err(ContractError::config_validation(
            "live.buffer_capacity",
            "buffer_capacity must be > 0",
        ));
    }
    if config.live.channel_capacity == 0 {
        return Err(ContractError::config_validation(
            "live.channel_capacity",
            "channel_capacity must be > 0",
        ));
    }
    Ok(())
}

fn validate_sinks(config: &SessionConfig) -> Result<(), ContractError> {
    let mut seen = HashSet::new();
    seen.insert(DURABLE_LOG_SINK);

    for (idx, sink) in config.sinks.iter().enumerate() {
        if sink.name.trim().is_empty() {
            return Err(ContractError::config_validation(
                format!("sinks[{idx}].name"),
                "sink name must not be empty",
            ));
        }
        if !seen.insert(sink.name.as_str()) {
            return Err(ContractError::config_validation(
                format!("sinks[name={}]", sink.name),
                "duplicate sink name",
            ));
        }
        if sink.queue_capacity == 0 {
            return Err(ContractError::config_validation(
                format!("sinks[{}].queue_capacity", sink.name),
                "queue_capacity must be > 0",
            ));
        }
        if sink.sink_type == SinkType::Csv && !sink.params.contains_key("path") {
            return Err(ContractError::config_validation(
                format!("sinks[{}].params.path", sink.name),
                "csv sink requires a 'path' param",
            ));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::SinkConfig;
    use std::collections::HashMap;

    fn sink(name: &str, sink_type: SinkType) -> SinkConfig {
        SinkConfig {
            name: name.to_string(),
            sink_type,
            queue_capacity: 16,
            params: HashMap::new(),
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate(&SessionConfig::default()).is_ok());
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let mut config = SessionConfig::default();
        config.reps.stop_threshold = config.reps.start_threshold;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("must be < start_threshold"));
    }

    #[test]
    fn test_negative_min_duration_rejected() {
        let mut config = SessionConfig::default();
        config.reps.min_rep_duration = -0.1;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_nan_threshold_rejected() {
        let mut config = SessionConfig::default();
        config.reps.start_threshold = f64::NAN;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("reps.start_threshold"));
    }

    #[test]
    fn test_zero_buffer_capacity_rejected() {
        let mut config = SessionConfig::default();
        config.live.buffer_capacity = 0;
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_zero_connect_timeout_rejected() {
        let mut config = SessionConfig::default();
        config.link.connect_timeout_s = 0.0;
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("link.connect_timeout_s"));
    }

    #[test]
    fn test_empty_characteristic_rejected() {
        let mut config = SessionConfig::default();
        config.link.write_characteristic = "  ".into();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_invalid_layout_rejected() {
        let mut config = SessionConfig::default();
        config.decode.fields.pop();
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_duplicate_sink_rejected() {
        let mut config = SessionConfig::default();
        config.sinks.push(sink("trace", SinkType::Log));
        config.sinks.push(sink("trace", SinkType::Log));
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("duplicate sink name"));
    }

    #[test]
    fn test_reserved_sink_name_rejected() {
        let mut config = SessionConfig::default();
        config.sinks.push(sink(DURABLE_LOG_SINK, SinkType::Log));
        assert!(validate(&config).is_err());
    }

    #[test]
    fn test_csv_sink_requires_path() {
        let mut config = SessionConfig::default();
        config.sinks.push(sink("mirror", SinkType::Csv));
        let err = validate(&config).unwrap_err();
        assert!(err.to_string().contains("params.path"));

        config.sinks[0]
            .params
            .insert("path".into(), "mirror.csv".into());
        assert!(validate(&config).is_ok());
    }
}
