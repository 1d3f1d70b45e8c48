/*!
 * Tests for application configuration
 */

use std::fs;
use anyhow::Result;
use subfit::app_config::{Config, ConstraintConfig, LogLevel};
use crate::common;

/// Test that a saved config loads back unchanged
#[test]
fn test_config_withFileRoundTrip_shouldLoadSameValues() -> Result<()> {
    let temp_dir = common::create_temp_dir()?;
    let path = temp_dir.path().join("conf.json");

    let mut config = Config::default();
    config.constraints.max_chars_per_line = 37;
    config.constraints.chaining = true;
    config.batch.concurrent_jobs = 2;
    config.log_level = LogLevel::Debug;
    fs::write(&path, serde_json::to_string_pretty(&config)?)?;

    let loaded: Config = serde_json::from_str(&fs::read_to_string(&path)?)?;

    assert_eq!(loaded, config);
    assert!(loaded.validate().is_ok());
    Ok(())
}

/// Test that a nested section with one field keeps the other defaults
#[test]
fn test_config_withPartialConstraints_shouldKeepOtherDefaults() -> Result<()> {
    let config: Config = serde_json::from_str(
        r#"{ "constraints": { "cps_hard_max": 17.0 }, "log_level": "warn" }"#,
    )?;

    assert_eq!(config.constraints.cps_hard_max, 17.0);
    assert_eq!(config.constraints.cps_target, 15.0);
    assert_eq!(config.constraints.min_gap_ms, 80);
    assert_eq!(config.offset.tolerance_ms, 500);
    assert_eq!(config.log_level, LogLevel::Warn);
    Ok(())
}

/// Test that every inconsistent threshold is rejected
#[test]
fn test_validate_withInconsistentValues_shouldFail() {
    let broken: Vec<Box<dyn Fn(&mut Config)>> = vec![
        Box::new(|c| c.constraints.max_chars_per_line = 0),
        Box::new(|c| c.constraints.cps_target = 25.0),
        Box::new(|c| c.constraints.cps_acceptable_excess = -1.0),
        Box::new(|c| c.constraints.min_duration_ms = 9000),
        Box::new(|c| c.constraints.max_passes = 0),
        Box::new(|c| c.constraints.fps = 0),
        Box::new(|c| c.offset.min_match_ratio = 1.5),
        Box::new(|c| c.batch.concurrent_jobs = 0),
    ];

    for (index, breaker) in broken.iter().enumerate() {
        let mut config = Config::default();
        breaker(&mut config);
        assert!(config.validate().is_err(), "case {} should be rejected", index);
    }
}

/// Test the reading time helper against the default thresholds
#[test]
fn test_duration_for_cps_withZeroInputs_shouldReturnZero() {
    assert_eq!(ConstraintConfig::duration_for_cps(0, 15.0), 0);
    assert_eq!(ConstraintConfig::duration_for_cps(30, 0.0), 0);
    assert_eq!(ConstraintConfig::duration_for_cps(30, 15.0), 2000);
    assert_eq!(ConstraintConfig::duration_for_cps(31, 15.0), 2067);
}
