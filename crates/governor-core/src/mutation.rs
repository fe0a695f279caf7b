// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Mutation Engine — adaptive threshold tuning from windowed success rates.
//!
//! Thresholds are clamped to safety bands via the same typed
//! range-check-and-clamp style `config` uses for startup validation, applied
//! here at cycle-end instead.

use alloc::collections::VecDeque;

use crate::config::{GovernanceConfig, SUPPRESSION_THRESHOLD_BAND, TRUST_THRESHOLD_BAND};
use crate::types::{CycleId, Mutation, MutationDirection};

/// Safety band for `drift_delta`. Not named explicitly in the configuration
/// surface table; chosen so a mutation can never zero out drift sensitivity
/// or make it so loose a single bad cycle trips it. Recorded as an
/// engineering-judgment decision in `DESIGN.md`.
pub const DRIFT_DELTA_BAND: (f64, f64) = (0.02, 0.5);

/// Evaluate whether the windowed success rate warrants a threshold
/// adjustment, returning `None` when the window has not yet reached
/// `mutation_window_min` (no `Mutation` record is produced in that case —
/// the Mutation Engine simply has not collected enough history yet).
pub fn evaluate(
    window: &VecDeque<f64>,
    config: &GovernanceConfig,
    cycle_id: CycleId,
    timestamp_ms: u64,
) -> Option<Mutation> {
    if window.len() < config.mutation_window_min {
        return None;
    }

    let mean = window.iter().sum::<f64>() / window.len() as f64;
    let old_trust_threshold = config.trust_threshold;
    let old_suppression_threshold = config.suppression_threshold;
    let old_drift_delta = config.drift_delta;

    let direction = if mean < config.target_success_rate - config.band_low {
        MutationDirection::Tighten
    } else if mean > config.target_success_rate + config.band_high {
        MutationDirection::Loosen
    } else {
        MutationDirection::Hold
    };

    let (new_trust_threshold, new_suppression_threshold, new_drift_delta) = match direction {
        MutationDirection::Hold => (old_trust_threshold, old_suppression_threshold, old_drift_delta),
        MutationDirection::Tighten => step(
            old_trust_threshold,
            old_suppression_threshold,
            old_drift_delta,
            config.mutation_rate,
        ),
        MutationDirection::Loosen => step(
            old_trust_threshold,
            old_suppression_threshold,
            old_drift_delta,
            -config.mutation_rate,
        ),
    };

    Some(Mutation {
        cycle_id,
        old_trust_threshold,
        new_trust_threshold,
        old_suppression_threshold,
        new_suppression_threshold,
        old_drift_delta,
        new_drift_delta,
        observed_success_rate: mean,
        direction,
        timestamp_ms,
    })
}

/// Apply a signed step `delta` (positive = tighten, negative = loosen) to
/// both thresholds (suppression moves at half rate, drift_delta at quarter
/// rate), clamp each to its safety band, and — if clamping broke the
/// `suppression_threshold < trust_threshold` invariant — halve the step
/// repeatedly until the invariant holds or the step becomes negligible.
fn step(trust_threshold: f64, suppression_threshold: f64, drift_delta: f64, delta: f64) -> (f64, f64, f64) {
    let mut magnitude = delta;

    loop {
        let new_trust = (trust_threshold + magnitude).clamp(TRUST_THRESHOLD_BAND.0, TRUST_THRESHOLD_BAND.1);
        let new_suppression =
            (suppression_threshold + magnitude / 2.0).clamp(SUPPRESSION_THRESHOLD_BAND.0, SUPPRESSION_THRESHOLD_BAND.1);

        if new_suppression < new_trust || magnitude.abs() < 1e-6 {
            let new_drift_delta =
                (drift_delta + magnitude / 4.0).clamp(DRIFT_DELTA_BAND.0, DRIFT_DELTA_BAND.1);
            // Last-resort clamp: if halving the step still could not
            // preserve ordering (e.g. both bands are saturated against each
            // other), pin suppression just below trust rather than violate
            // the invariant.
            let new_suppression = if new_suppression >= new_trust {
                (new_trust - 1e-6).max(SUPPRESSION_THRESHOLD_BAND.0)
            } else {
                new_suppression
            };
            return (new_trust, new_suppression, new_drift_delta);
        }

        magnitude /= 2.0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    #[test]
    fn window_below_minimum_produces_no_mutation() {
        let window: VecDeque<f64> = vec![0.9].into();
        let config = GovernanceConfig::default();
        assert!(evaluate(&window, &config, 1, 0).is_none());
    }

    #[test]
    fn persistent_undershoot_tightens() {
        let window: VecDeque<f64> = vec![0.60; 5].into();
        let config = GovernanceConfig::default();
        let mutation = evaluate(&window, &config, 5, 0).expect("mutation expected");
        assert_eq!(mutation.direction, MutationDirection::Tighten);
        assert!((mutation.new_trust_threshold - (config.trust_threshold + config.mutation_rate)).abs() < 1e-9);
        assert!(mutation.new_trust_threshold <= TRUST_THRESHOLD_BAND.1);
    }

    #[test]
    fn persistent_overshoot_loosens() {
        let window: VecDeque<f64> = vec![0.99; 5].into();
        let config = GovernanceConfig::default();
        let mutation = evaluate(&window, &config, 5, 0).expect("mutation expected");
        assert_eq!(mutation.direction, MutationDirection::Loosen);
        assert!(mutation.new_trust_threshold < config.trust_threshold);
    }

    #[test]
    fn within_band_holds() {
        let window: VecDeque<f64> = vec![0.85; 5].into();
        let config = GovernanceConfig::default();
        let mutation = evaluate(&window, &config, 5, 0).expect("mutation expected");
        assert_eq!(mutation.direction, MutationDirection::Hold);
        assert_eq!(mutation.new_trust_threshold, mutation.old_trust_threshold);
    }

    #[test]
    fn ordering_invariant_survives_repeated_tightening() {
        let mut trust_threshold = GovernanceConfig::default().trust_threshold;
        let mut suppression_threshold = GovernanceConfig::default().suppression_threshold;
        let mut drift_delta = GovernanceConfig::default().drift_delta;
        for _ in 0..200 {
            let (t, s, d) = step(trust_threshold, suppression_threshold, drift_delta, 0.02);
            assert!(s < t);
            assert!((TRUST_THRESHOLD_BAND.0..=TRUST_THRESHOLD_BAND.1).contains(&t));
            assert!((SUPPRESSION_THRESHOLD_BAND.0..=SUPPRESSION_THRESHOLD_BAND.1).contains(&s));
            trust_threshold = t;
            suppression_threshold = s;
            drift_delta = d;
        }
    }
}
