// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Engine-level configuration.
//!
//! [`GovernanceConfig`] is the single entry point for tuning every threshold,
//! rate, and window the governance cycle engine uses. All fields have
//! defaults so `GovernanceConfig::default()` is always a starting point —
//! though not necessarily a *valid* one after manual overrides; call
//! [`GovernanceConfig::validate`] before constructing a loop.

use serde::{Deserialize, Serialize};

use crate::errors::ConfigError;

/// Top-level configuration for the Governance Loop and its sub-engines.
///
/// # Examples
///
/// ```rust
/// use governor_core::config::GovernanceConfig;
///
/// let config = GovernanceConfig {
///     max_parallel_executions: 4,
///     ..GovernanceConfig::default()
/// };
/// config.validate().unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GovernanceConfig {
    /// Minimum trust for an agent to be eligible for assignment.
    #[serde(default = "default_trust_threshold")]
    pub trust_threshold: f64,
    /// Below this trust, an `Active` agent transitions to `Suppressed`.
    #[serde(default = "default_suppression_threshold")]
    pub suppression_threshold: f64,
    /// Probation attempts allowed before an agent becomes `Excluded`.
    #[serde(default = "default_max_redemption_cycles")]
    pub max_redemption_cycles: u32,
    /// Rolling-mean gap across the drift window that triggers a `DriftEvent`.
    #[serde(default = "default_drift_delta")]
    pub drift_delta: f64,
    /// Number of trust samples per agent kept in the drift window.
    #[serde(default = "default_drift_window")]
    pub drift_window: usize,
    /// Asymmetric learning reward rate (η).
    #[serde(default = "default_reward_rate")]
    pub reward_rate: f64,
    /// Asymmetric learning penalty rate (γ).
    #[serde(default = "default_penalty_rate")]
    pub penalty_rate: f64,
    /// Threshold mutation step size (Δ).
    #[serde(default = "default_mutation_rate")]
    pub mutation_rate: f64,
    /// Number of recent cycles averaged by the Mutation Engine (M).
    #[serde(default = "default_mutation_window")]
    pub mutation_window: usize,
    /// Minimum populated window before mutation runs at all (M_min).
    #[serde(default = "default_mutation_window_min")]
    pub mutation_window_min: usize,
    /// Target success rate the Mutation Engine steers towards (s*).
    #[serde(default = "default_target_success_rate")]
    pub target_success_rate: f64,
    /// Lower hysteresis band around `target_success_rate`.
    #[serde(default = "default_band_low")]
    pub band_low: f64,
    /// Upper hysteresis band around `target_success_rate`.
    #[serde(default = "default_band_high")]
    pub band_high: f64,
    /// Maximum concurrent executor dispatches per cycle.
    #[serde(default = "default_max_parallel_executions")]
    pub max_parallel_executions: usize,
    /// Per-task executor timeout; `None` means unbounded. Enforced at the
    /// Executor Boundary: the sync engine reclassifies a call that overran
    /// this budget as a timeout failure once it returns (`execute_guarded`),
    /// while the async engine preempts the task outright via
    /// `tokio::time::timeout`.
    #[serde(default)]
    pub task_timeout_ms: Option<u64>,
    /// Prioritizer weight for `impact` (w_i).
    #[serde(default = "default_w_impact")]
    pub w_impact: f64,
    /// Prioritizer weight for `urgency` (w_u).
    #[serde(default = "default_w_urgency")]
    pub w_urgency: f64,
    /// Prioritizer weight for `risk` (w_r).
    #[serde(default = "default_w_risk")]
    pub w_risk: f64,
}

fn default_trust_threshold() -> f64 { 0.70 }
// See DESIGN.md: 0.55 preserves suppression_threshold < trust_threshold
// against a 0.70 trust_threshold, with headroom.
fn default_suppression_threshold() -> f64 { 0.55 }
fn default_max_redemption_cycles() -> u32 { 4 }
fn default_drift_delta() -> f64 { 0.10 }
fn default_drift_window() -> usize { 10 }
fn default_reward_rate() -> f64 { 0.02 }
fn default_penalty_rate() -> f64 { 0.05 }
fn default_mutation_rate() -> f64 { 0.02 }
fn default_mutation_window() -> usize { 10 }
fn default_mutation_window_min() -> usize { 5 }
fn default_target_success_rate() -> f64 { 0.85 }
fn default_band_low() -> f64 { 0.10 }
fn default_band_high() -> f64 { 0.05 }
fn default_max_parallel_executions() -> usize { 1 }
fn default_w_impact() -> f64 { 0.4 }
fn default_w_urgency() -> f64 { 0.4 }
fn default_w_risk() -> f64 { 0.2 }

impl Default for GovernanceConfig {
    fn default() -> Self {
        Self {
            trust_threshold: default_trust_threshold(),
            suppression_threshold: default_suppression_threshold(),
            max_redemption_cycles: default_max_redemption_cycles(),
            drift_delta: default_drift_delta(),
            drift_window: default_drift_window(),
            reward_rate: default_reward_rate(),
            penalty_rate: default_penalty_rate(),
            mutation_rate: default_mutation_rate(),
            mutation_window: default_mutation_window(),
            mutation_window_min: default_mutation_window_min(),
            target_success_rate: default_target_success_rate(),
            band_low: default_band_low(),
            band_high: default_band_high(),
            max_parallel_executions: default_max_parallel_executions(),
            task_timeout_ms: None,
            w_impact: default_w_impact(),
            w_urgency: default_w_urgency(),
            w_risk: default_w_risk(),
        }
    }
}

/// Safety bands enforced by [`GovernanceConfig::validate`] and by every
/// [`crate::mutation`] step.
pub const TRUST_THRESHOLD_BAND: (f64, f64) = (0.5, 0.9);
pub const SUPPRESSION_THRESHOLD_BAND: (f64, f64) = (0.4, 0.85);

impl GovernanceConfig {
    /// Validate safety bands and the suppression/trust ordering invariant.
    ///
    /// This is the fatal, do-not-start `ConfigError` case described in the
    /// error handling design: callers must run this before constructing a
    /// Governance Loop.
    ///
    /// # Examples
    ///
    /// ```rust
    /// use governor_core::config::GovernanceConfig;
    ///
    /// let mut config = GovernanceConfig::default();
    /// assert!(config.validate().is_ok());
    ///
    /// config.suppression_threshold = config.trust_threshold + 0.01;
    /// assert!(config.validate().is_err());
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_range("trust_threshold", self.trust_threshold, TRUST_THRESHOLD_BAND)?;
        check_range(
            "suppression_threshold",
            self.suppression_threshold,
            SUPPRESSION_THRESHOLD_BAND,
        )?;

        if !(self.suppression_threshold < self.trust_threshold) {
            return Err(ConfigError::ThresholdOrdering {
                trust_threshold: self.trust_threshold,
                suppression_threshold: self.suppression_threshold,
            });
        }

        if self.mutation_window_min > self.mutation_window {
            return Err(ConfigError::InvalidRange {
                field: "mutation_window_min".into(),
                value: alloc::format!("{}", self.mutation_window_min),
                reason: "must be <= mutation_window".into(),
            });
        }

        if self.drift_window < 2 {
            return Err(ConfigError::InvalidRange {
                field: "drift_window".into(),
                value: alloc::format!("{}", self.drift_window),
                reason: "must be >= 2 to split into before/after halves".into(),
            });
        }

        Ok(())
    }
}

fn check_range(field: &str, value: f64, band: (f64, f64)) -> Result<(), ConfigError> {
    if value < band.0 || value > band.1 {
        return Err(ConfigError::InvalidRange {
            field: field.into(),
            value: alloc::format!("{value}"),
            reason: alloc::format!("must be within [{}, {}]", band.0, band.1),
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(GovernanceConfig::default().validate().is_ok());
    }

    #[test]
    fn suppression_above_trust_is_rejected() {
        let mut config = GovernanceConfig::default();
        config.suppression_threshold = config.trust_threshold + 0.01;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ThresholdOrdering { .. })
        ));
    }

    #[test]
    fn out_of_band_trust_threshold_is_rejected() {
        let mut config = GovernanceConfig::default();
        config.trust_threshold = 0.95;
        assert!(matches!(config.validate(), Err(ConfigError::InvalidRange { .. })));
    }
}
