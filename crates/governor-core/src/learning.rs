// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Asymmetric trust update.
//!
//! Failures erode trust faster than successes build it. That asymmetry is
//! the whole point of this module — see `penalty_rate` vs. `reward_rate` in
//! [`crate::config::GovernanceConfig`].
//!
//! Success and failure move the score by different magnitudes and the
//! result is clamped to `[0, 1]`, matching the `η`/`γ` asymmetric update
//! rule used for swarm trust scores elsewhere in this space.

use alloc::vec::Vec;

use crate::config::GovernanceConfig;

/// Apply one outcome to a prior trust score.
///
/// `outcome = None` (the task was unassigned, or circuit-broken) leaves
/// trust untouched — only an actual execution outcome moves the score.
pub fn apply_outcome(trust: f64, outcome: Option<bool>, config: &GovernanceConfig) -> f64 {
    match outcome {
        Some(true) => (trust + config.reward_rate * (1.0 - trust)).clamp(0.0, 1.0),
        Some(false) => (trust - config.penalty_rate * trust).clamp(0.0, 1.0),
        None => trust,
    }
}

/// Fold a sequence of outcomes for the same agent, left to right, in the
/// order the tasks were prioritised. The final value is the one the cycle
/// writes back.
pub fn compose(trust: f64, outcomes: &[Option<bool>], config: &GovernanceConfig) -> f64 {
    outcomes.iter().fold(trust, |acc, outcome| apply_outcome(acc, *outcome, config))
}

/// Convenience for callers that have already grouped per-agent outcomes into
/// a `Vec` and want the composed trajectory rather than just the final
/// value (useful for populating a drift window in one pass).
pub fn trajectory(trust: f64, outcomes: &[Option<bool>], config: &GovernanceConfig) -> Vec<f64> {
    let mut values = Vec::with_capacity(outcomes.len());
    let mut current = trust;
    for outcome in outcomes {
        current = apply_outcome(current, *outcome, config);
        values.push(current);
    }
    values
}
