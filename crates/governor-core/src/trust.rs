// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Trust Engine — assignment, suppression, redemption, and drift detection.
//!
//! This is the one module that decides, per task, which agent (if any) gets
//! to run it, and the one that walks the suppression/redemption/exclusion
//! state machine at the end of every cycle. Both halves operate purely on
//! data handed to them — an [`crate::registry::AgentSnapshot`] for
//! assignment, a `&mut Agent` for transitions — so neither touches the
//! registry or the store directly.

use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::vec::Vec;
use hashbrown::HashSet;

use crate::config::GovernanceConfig;
use crate::registry::AgentSnapshot;
use crate::types::{Agent, AgentStatus, CycleId, Task};

// ---------------------------------------------------------------------------
// Assignment
// ---------------------------------------------------------------------------

/// One task's assignment outcome: either an agent to run it, or nothing
/// (recorded upstream as a per-task circuit breaker).
#[derive(Debug, Clone)]
pub struct Assignment {
    pub task_id: String,
    pub agent_id: Option<String>,
}

/// Select an agent for every task in `tasks`, in priority order.
///
/// `drift_flagged` holds agents that were preemptively down-weighted by the
/// previous cycle's drift detection: they are skipped unless they are the
/// *only* eligible agent for a given task.
///
/// # Examples
///
/// ```rust
/// use governor_core::config::GovernanceConfig;
/// use governor_core::registry::AgentRegistry;
/// use governor_core::trust::assign_all;
/// use governor_core::types::{Agent, Task};
/// use hashbrown::HashSet;
///
/// let registry = AgentRegistry::from_agents(alloc::vec![Agent::new("a1", HashSet::new(), 0.8)]);
/// let tasks = alloc::vec![Task {
///     task_id: "t1".into(), impact: 0.5, urgency: 0.5, risk: 0.0,
///     required_capability: None, metadata: alloc::vec::Vec::new(),
/// }];
/// let assignments = assign_all(&tasks, &registry.snapshot(), &GovernanceConfig::default(), &HashSet::new());
/// assert_eq!(assignments[0].agent_id.as_deref(), Some("a1"));
/// ```
pub fn assign_all(
    tasks: &[Task],
    snapshot: &AgentSnapshot,
    config: &GovernanceConfig,
    drift_flagged: &HashSet<String>,
) -> Vec<Assignment> {
    let mut probation_used_this_cycle: HashSet<String> = HashSet::new();
    let mut assignments = Vec::with_capacity(tasks.len());

    for task in tasks {
        let eligible: Vec<&Agent> = snapshot
            .agents()
            .filter(|agent| agent.status.is_assignable() && agent.satisfies(&task.required_capability))
            .collect();

        // Drift-flagged agents are skipped unless they are the sole eligible
        // candidate for this task.
        let effective: Vec<&Agent> = {
            let non_flagged: Vec<&Agent> =
                eligible.iter().copied().filter(|agent| !drift_flagged.contains(&agent.agent_id)).collect();
            if non_flagged.is_empty() {
                eligible.clone()
            } else {
                non_flagged
            }
        };

        let active_candidate = effective
            .iter()
            .copied()
            .filter(|agent| agent.status == AgentStatus::Active && agent.trust >= config.trust_threshold)
            .max_by(|a, b| {
                a.trust.total_cmp(&b.trust).then_with(|| b.agent_id.cmp(&a.agent_id))
            });

        let chosen = if let Some(agent) = active_candidate {
            Some(agent.agent_id.clone())
        } else {
            // No ACTIVE agent qualifies: fall back to a probation agent on
            // redemption trial. Probation is exempt from trust_threshold —
            // that is precisely what the trial is testing — but capped at
            // one assignment per agent per cycle.
            effective
                .iter()
                .copied()
                .filter(|agent| {
                    agent.status == AgentStatus::Probation
                        && !probation_used_this_cycle.contains(&agent.agent_id)
                })
                .max_by(|a, b| a.trust.total_cmp(&b.trust).then_with(|| b.agent_id.cmp(&a.agent_id)))
                .map(|agent| {
                    probation_used_this_cycle.insert(agent.agent_id.clone());
                    agent.agent_id.clone()
                })
        };

        assignments.push(Assignment { task_id: task.task_id.clone(), agent_id: chosen });
    }

    assignments
}

// ---------------------------------------------------------------------------
// Suppression / redemption state machine
// ---------------------------------------------------------------------------

/// The result of evaluating one agent's post-cycle status transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusTransition {
    pub old_status: AgentStatus,
    pub new_status: AgentStatus,
}

/// Evaluate (and apply in place) the suppression/redemption transition for
/// one agent, given its post-learning trust and — if it was on probation —
/// the outcome of its single redemption trial this cycle.
///
/// `probation_outcome` is `None` when the agent was not assigned a trial
/// this cycle (no matching task existed); in that case a `Probation` agent
/// simply remains `Probation` without consuming a redemption attempt.
///
/// `Excluded` is terminal: this function never transitions an agent out of
/// it.
pub fn transition(agent: &mut Agent, probation_outcome: Option<bool>, cycle_id: CycleId, config: &GovernanceConfig) -> Option<StatusTransition> {
    let old_status = agent.status;

    match old_status {
        AgentStatus::Active => {
            if agent.trust < config.suppression_threshold {
                agent.status = AgentStatus::Suppressed;
                agent.redemption_cycles_used = 0;
                agent.suppression_entered_at_cycle = Some(cycle_id);
            }
        }
        AgentStatus::Suppressed => {
            if agent.redemption_cycles_used < config.max_redemption_cycles {
                agent.status = AgentStatus::Probation;
            } else {
                agent.status = AgentStatus::Excluded;
            }
        }
        AgentStatus::Probation => match probation_outcome {
            Some(true) if agent.trust >= config.trust_threshold => {
                agent.status = AgentStatus::Active;
            }
            Some(_) => {
                agent.status = AgentStatus::Suppressed;
                agent.redemption_cycles_used += 1;
                agent.suppression_entered_at_cycle = Some(cycle_id);
            }
            None => {
                // No trial happened this cycle; hold position, no attempt
                // consumed.
            }
        },
        AgentStatus::Excluded => {}
    }

    if agent.status != old_status {
        Some(StatusTransition { old_status, new_status: agent.status })
    } else {
        None
    }
}

// ---------------------------------------------------------------------------
// Drift detection
// ---------------------------------------------------------------------------

/// Rolling window of an agent's trust trajectory, capped at `drift_window`
/// samples (oldest evicted first).
#[derive(Debug, Clone, Default)]
pub struct DriftWindow {
    samples: VecDeque<f64>,
}

/// Detected drift: the gap between the two halves of a fully-populated
/// window.
#[derive(Debug, Clone, Copy)]
pub struct DriftResult {
    pub delta: f64,
    pub window_mean_before: f64,
    pub window_mean_after: f64,
}

impl DriftWindow {
    pub fn push(&mut self, trust: f64, max_len: usize) {
        self.samples.push_back(trust);
        while self.samples.len() > max_len {
            self.samples.pop_front();
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Compare the mean of the most recent half of the window against the
    /// mean of the preceding half. Only fires once the window holds exactly
    /// `drift_window` samples (the default configuration's `W`).
    pub fn detect(&self, drift_window: usize, drift_delta: f64) -> Option<DriftResult> {
        if self.samples.len() < drift_window || drift_window < 2 {
            return None;
        }
        let half = drift_window / 2;
        let recent: Vec<f64> = self.samples.iter().rev().take(half).copied().collect();
        let preceding: Vec<f64> = self.samples.iter().rev().skip(half).take(half).copied().collect();
        if recent.len() < half || preceding.len() < half {
            return None;
        }

        let mean_before = preceding.iter().sum::<f64>() / preceding.len() as f64;
        let mean_after = recent.iter().sum::<f64>() / recent.len() as f64;
        let delta = mean_before - mean_after;

        if delta >= drift_delta {
            Some(DriftResult { delta, window_mean_before: mean_before, window_mean_after: mean_after })
        } else {
            None
        }
    }
}
