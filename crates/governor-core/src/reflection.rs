// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Reflection Engine — a per-cycle self-report against four constraints.

use alloc::string::ToString;
use alloc::vec::Vec;

use crate::config::GovernanceConfig;
use crate::types::{CycleId, Reflection};

/// Inputs the Reflection Engine needs to score one cycle. None of these are
/// recomputed here — the Governance Loop hands over what it already knows.
pub struct ReflectionInputs {
    pub circuit_breaker_fired: bool,
    pub any_task_assigned: bool,
    pub success_rate: f64,
    pub any_agent_excluded_this_cycle: bool,
}

/// Score a cycle against the four governance constraints and record which
/// ones were violated.
pub fn reflect(cycle_id: CycleId, inputs: &ReflectionInputs, config: &GovernanceConfig, timestamp_ms: u64) -> Reflection {
    let mut constraint_score = 0u8;
    let mut notes = Vec::new();

    if !inputs.circuit_breaker_fired {
        constraint_score += 1;
    } else {
        notes.push("circuit breaker fired during this cycle".to_string());
    }

    if inputs.any_task_assigned {
        constraint_score += 1;
    } else {
        notes.push("no task was assigned to any agent".to_string());
    }

    if inputs.success_rate >= config.target_success_rate {
        constraint_score += 1;
    } else {
        notes.push(alloc::format!(
            "success rate {:.3} fell below target {:.3}",
            inputs.success_rate,
            config.target_success_rate
        ));
    }

    if !inputs.any_agent_excluded_this_cycle {
        constraint_score += 1;
    } else {
        notes.push("an agent crossed into excluded status this cycle".to_string());
    }

    Reflection { cycle_id, constraint_score, notes, timestamp_ms }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn perfect_cycle_scores_four() {
        let config = GovernanceConfig::default();
        let inputs = ReflectionInputs {
            circuit_breaker_fired: false,
            any_task_assigned: true,
            success_rate: 0.95,
            any_agent_excluded_this_cycle: false,
        };
        let reflection = reflect(1, &inputs, &config, 0);
        assert_eq!(reflection.constraint_score, 4);
        assert!(reflection.notes.is_empty());
    }

    #[test]
    fn circuit_breaker_cycle_loses_a_point_and_is_noted() {
        let config = GovernanceConfig::default();
        let inputs = ReflectionInputs {
            circuit_breaker_fired: true,
            any_task_assigned: false,
            success_rate: 0.0,
            any_agent_excluded_this_cycle: false,
        };
        let reflection = reflect(1, &inputs, &config, 0);
        assert_eq!(reflection.constraint_score, 1);
        assert_eq!(reflection.notes.len(), 3);
    }
}
