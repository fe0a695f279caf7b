// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Configuration loader for [`GovernanceConfig`].
//!
//! Supports two load strategies:
//!
//! 1. **TOML file** — [`load_config_from_file`] reads and deserialises a TOML
//!    file into a [`GovernanceConfig`].
//! 2. **Environment variables** — [`load_config_from_env`] reads
//!    `GOVERNOR_`-prefixed environment variables over the struct's defaults.
//!
//! Both loaders validate the result via [`GovernanceConfig::validate`] before
//! returning it, so a caller never receives a config that violates a safety
//! band or the `suppression_threshold < trust_threshold` invariant. Both are
//! only available when the `config-loader` feature is active (which implies
//! `std`).
//!
//! # File format
//!
//! ```toml
//! trust_threshold         = 0.70
//! suppression_threshold   = 0.55
//! max_redemption_cycles   = 4
//! drift_delta             = 0.10
//! drift_window            = 10
//! reward_rate             = 0.02
//! penalty_rate            = 0.05
//! mutation_rate           = 0.02
//! mutation_window         = 10
//! mutation_window_min     = 5
//! target_success_rate     = 0.85
//! band_low                = 0.10
//! band_high               = 0.05
//! max_parallel_executions = 1
//! w_impact                = 0.4
//! w_urgency               = 0.4
//! w_risk                  = 0.2
//! ```
//!
//! Any field omitted from the file falls back to `GovernanceConfig::default()`.
//!
//! # Environment variables
//!
//! | Variable                             | Type    | Default |
//! |---------------------------------------|---------|---------|
//! | `GOVERNOR_TRUST_THRESHOLD`            | float   | 0.70    |
//! | `GOVERNOR_SUPPRESSION_THRESHOLD`      | float   | 0.55    |
//! | `GOVERNOR_MAX_REDEMPTION_CYCLES`      | integer | 4       |
//! | `GOVERNOR_DRIFT_DELTA`                | float   | 0.10    |
//! | `GOVERNOR_DRIFT_WINDOW`               | integer | 10      |
//! | `GOVERNOR_REWARD_RATE`                | float   | 0.02    |
//! | `GOVERNOR_PENALTY_RATE`               | float   | 0.05    |
//! | `GOVERNOR_MUTATION_RATE`              | float   | 0.02    |
//! | `GOVERNOR_MUTATION_WINDOW`            | integer | 10      |
//! | `GOVERNOR_MUTATION_WINDOW_MIN`        | integer | 5       |
//! | `GOVERNOR_TARGET_SUCCESS_RATE`        | float   | 0.85    |
//! | `GOVERNOR_BAND_LOW`                   | float   | 0.10    |
//! | `GOVERNOR_BAND_HIGH`                  | float   | 0.05    |
//! | `GOVERNOR_MAX_PARALLEL_EXECUTIONS`    | integer | 1       |
//! | `GOVERNOR_TASK_TIMEOUT_MS`            | integer | unset   |
//! | `GOVERNOR_W_IMPACT`                   | float   | 0.4     |
//! | `GOVERNOR_W_URGENCY`                  | float   | 0.4     |
//! | `GOVERNOR_W_RISK`                     | float   | 0.2     |

// Only compile this module when the "config-loader" feature is enabled.
// "config-loader" implies "std", so std facilities are always available here.
#![cfg(feature = "config-loader")]

use std::env;
use std::fs;

use crate::config::GovernanceConfig;
use crate::errors::ConfigError;

const ENV_PREFIX: &str = "GOVERNOR_";

/// Read and parse a TOML file into a [`GovernanceConfig`], then validate it.
pub fn load_config_from_file(path: &str) -> Result<GovernanceConfig, ConfigError> {
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::FileRead { path: path.into(), source })?;
    let config: GovernanceConfig = toml::from_str(&contents).map_err(|source| ConfigError::TomlParse { source })?;
    config.validate()?;
    Ok(config)
}

/// Build a [`GovernanceConfig`] from `GOVERNOR_`-prefixed environment
/// variables layered over [`GovernanceConfig::default`], then validate it.
pub fn load_config_from_env() -> Result<GovernanceConfig, ConfigError> {
    let mut config = GovernanceConfig::default();

    apply_f64_env(&mut config.trust_threshold, "TRUST_THRESHOLD")?;
    apply_f64_env(&mut config.suppression_threshold, "SUPPRESSION_THRESHOLD")?;
    apply_u32_env(&mut config.max_redemption_cycles, "MAX_REDEMPTION_CYCLES")?;
    apply_f64_env(&mut config.drift_delta, "DRIFT_DELTA")?;
    apply_usize_env(&mut config.drift_window, "DRIFT_WINDOW")?;
    apply_f64_env(&mut config.reward_rate, "REWARD_RATE")?;
    apply_f64_env(&mut config.penalty_rate, "PENALTY_RATE")?;
    apply_f64_env(&mut config.mutation_rate, "MUTATION_RATE")?;
    apply_usize_env(&mut config.mutation_window, "MUTATION_WINDOW")?;
    apply_usize_env(&mut config.mutation_window_min, "MUTATION_WINDOW_MIN")?;
    apply_f64_env(&mut config.target_success_rate, "TARGET_SUCCESS_RATE")?;
    apply_f64_env(&mut config.band_low, "BAND_LOW")?;
    apply_f64_env(&mut config.band_high, "BAND_HIGH")?;
    apply_usize_env(&mut config.max_parallel_executions, "MAX_PARALLEL_EXECUTIONS")?;
    apply_f64_env(&mut config.w_impact, "W_IMPACT")?;
    apply_f64_env(&mut config.w_urgency, "W_URGENCY")?;
    apply_f64_env(&mut config.w_risk, "W_RISK")?;

    if let Some(raw) = read_env("TASK_TIMEOUT_MS") {
        let parsed: u64 = raw.parse().map_err(|_| ConfigError::ParseField {
            field: "task_timeout_ms".into(),
            value: raw,
            reason: "must be a non-negative integer".into(),
        })?;
        config.task_timeout_ms = Some(parsed);
    }

    config.validate()?;
    Ok(config)
}

fn read_env(suffix: &str) -> Option<String> {
    env::var(alloc_format_env_key(suffix)).ok()
}

fn alloc_format_env_key(suffix: &str) -> String {
    let mut key = String::with_capacity(ENV_PREFIX.len() + suffix.len());
    key.push_str(ENV_PREFIX);
    key.push_str(suffix);
    key
}

fn apply_f64_env(field: &mut f64, suffix: &str) -> Result<(), ConfigError> {
    if let Some(raw) = read_env(suffix) {
        *field = raw.parse().map_err(|_| ConfigError::ParseField {
            field: suffix.to_ascii_lowercase(),
            value: raw,
            reason: "must be a floating-point number".into(),
        })?;
    }
    Ok(())
}

fn apply_u32_env(field: &mut u32, suffix: &str) -> Result<(), ConfigError> {
    if let Some(raw) = read_env(suffix) {
        *field = raw.parse().map_err(|_| ConfigError::ParseField {
            field: suffix.to_ascii_lowercase(),
            value: raw,
            reason: "must be a non-negative integer".into(),
        })?;
    }
    Ok(())
}

fn apply_usize_env(field: &mut usize, suffix: &str) -> Result<(), ConfigError> {
    if let Some(raw) = read_env(suffix) {
        *field = raw.parse().map_err(|_| ConfigError::ParseField {
            field: suffix.to_ascii_lowercase(),
            value: raw,
            reason: "must be a non-negative integer".into(),
        })?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-global; serialize the tests that
    // touch them so they don't race under the test harness's thread pool.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn defaults_apply_when_no_env_vars_are_set() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::remove_var("GOVERNOR_TRUST_THRESHOLD");
        let config = load_config_from_env().unwrap();
        assert_eq!(config.trust_threshold, GovernanceConfig::default().trust_threshold);
    }

    #[test]
    fn env_var_overrides_default() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("GOVERNOR_TRUST_THRESHOLD", "0.8");
        env::set_var("GOVERNOR_SUPPRESSION_THRESHOLD", "0.6");
        let config = load_config_from_env().unwrap();
        assert_eq!(config.trust_threshold, 0.8);
        env::remove_var("GOVERNOR_TRUST_THRESHOLD");
        env::remove_var("GOVERNOR_SUPPRESSION_THRESHOLD");
    }

    #[test]
    fn malformed_env_var_is_a_parse_field_error() {
        let _guard = ENV_LOCK.lock().unwrap();
        env::set_var("GOVERNOR_TRUST_THRESHOLD", "not-a-number");
        assert!(matches!(load_config_from_env(), Err(ConfigError::ParseField { .. })));
        env::remove_var("GOVERNOR_TRUST_THRESHOLD");
    }

    #[test]
    fn file_not_found_is_a_file_read_error() {
        assert!(matches!(
            load_config_from_file("/nonexistent/governor.toml"),
            Err(ConfigError::FileRead { .. })
        ));
    }
}
