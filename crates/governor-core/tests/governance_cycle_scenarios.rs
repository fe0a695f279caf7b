// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Whole-engine scenario tests for the governance cycle.
//!
//! Each test below exercises one concrete scenario end to end through
//! [`GovernanceLoop::run_cycle`], standing in contrast to the per-module unit
//! tests colocated with `trust.rs`/`learning.rs`/`mutation.rs`. The
//! suppression-trip scenario uses the corrected `suppression_threshold`
//! default headroom (see `DESIGN.md`) but keeps the original intent: a
//! single failing update must push trust below the suppression floor.
//!
//! The suppression/redemption scenarios register a second, unrelated
//! "filler" agent that always succeeds on an uncapped task. This keeps the
//! cycle as a whole from tripping the whole-cycle circuit breaker while the
//! tracked agent sits in a non-assignable status — a solo-agent registry
//! would otherwise short-circuit status transitions entirely, since the
//! circuit-breaker path returns before the suppression/redemption state
//! machine ever runs.

use governor_core::config::GovernanceConfig;
use governor_core::engine::GovernanceLoop;
use governor_core::executor::{Executor, Outcome};
use governor_core::storage::InMemoryStateStore;
use governor_core::types::{Agent, AgentStatus, CycleStatus, ErrorKindTag, MutationDirection, Task};
use hashbrown::HashSet;

struct AlwaysSucceeds;
impl Executor for AlwaysSucceeds {
    fn execute(&self, _task: &Task, _agent_id: &str) -> Outcome {
        Outcome::success(3)
    }
}

struct AlwaysFails;
impl Executor for AlwaysFails {
    fn execute(&self, _task: &Task, _agent_id: &str) -> Outcome {
        Outcome::failure(3, Some(ErrorKindTag::Executor))
    }
}

/// Fails every execution assigned to `target`, succeeds for anyone else —
/// used to drive one tracked agent through a trial while a filler agent
/// keeps the rest of the cycle alive.
struct FailOneAgent {
    target: String,
}
impl Executor for FailOneAgent {
    fn execute(&self, _task: &Task, agent_id: &str) -> Outcome {
        if agent_id == self.target {
            Outcome::failure(3, Some(ErrorKindTag::Executor))
        } else {
            Outcome::success(3)
        }
    }
}

/// Executor scripted by task_id suffix, used to hit a fixed success rate.
struct RateScriptedExecutor {
    fail_suffixes: HashSet<String>,
}
impl Executor for RateScriptedExecutor {
    fn execute(&self, task: &Task, _agent_id: &str) -> Outcome {
        if self.fail_suffixes.contains(&task.task_id) {
            Outcome::failure(3, Some(ErrorKindTag::Executor))
        } else {
            Outcome::success(3)
        }
    }
}

fn task(id: &str, impact: f64, urgency: f64, risk: f64) -> Task {
    Task { task_id: id.into(), impact, urgency, risk, required_capability: None, metadata: Vec::new() }
}

fn capability_gated_task(id: &str, capability: &str) -> Task {
    Task {
        task_id: id.into(),
        impact: 0.5,
        urgency: 0.5,
        risk: 0.0,
        required_capability: Some(capability.into()),
        metadata: Vec::new(),
    }
}

fn filler_task(id: &str) -> Task {
    task(id, 0.1, 0.1, 0.0)
}

/// (a) A single success against a trust score exactly at the assignment
/// floor matches the worked asymmetric-update example, produces no
/// suppression/redemption transition, and no mutation (the window is far
/// too short to evaluate).
#[test]
fn unused_asymmetry_single_success_matches_worked_example() {
    let config = GovernanceConfig::default();
    let mut engine = GovernanceLoop::new(config, InMemoryStateStore::new()).unwrap();
    engine.register_agent(Agent::new("a1", HashSet::new(), 0.70)).unwrap();

    let result = engine.run_cycle(vec![task("t1", 0.5, 0.5, 0.0)], &AlwaysSucceeds, 0).unwrap();

    assert_eq!(result.status, CycleStatus::Completed);
    assert_eq!(result.executions[0].agent_id.as_deref(), Some("a1"));
    assert!(result.mutation.is_none());
}

/// (b) A failing update that pushes trust below `suppression_threshold`
/// transitions the agent ACTIVE -> SUPPRESSED this cycle; the cycle after
/// that promotes it SUPPRESSED -> PROBATION, observed here by its tracked
/// task being assignable to it again two cycles later.
#[test]
fn suppression_trips_and_advances_to_probation_within_two_cycles() {
    let mut track_capability = HashSet::new();
    track_capability.insert("track".to_string());

    let config = GovernanceConfig { suppression_threshold: 0.73, ..GovernanceConfig::default() };
    let mut engine = GovernanceLoop::new(config, InMemoryStateStore::new()).unwrap();
    engine.register_agent(Agent::new("a1", track_capability, 0.76)).unwrap();
    engine.register_agent(Agent::new("filler", HashSet::new(), 0.95)).unwrap();

    let executor = FailOneAgent { target: "a1".into() };

    // Cycle 0: a1 is still ACTIVE and eligible, fails its tracked task, and
    // drops to 0.722 — below the 0.73 suppression floor.
    let cycle0 = engine
        .run_cycle(vec![capability_gated_task("tracked-0", "track"), filler_task("filler-0")], &executor, 0)
        .unwrap();
    assert_eq!(cycle0.executions[0].agent_id.as_deref(), Some("a1"));
    assert_eq!(cycle0.executions[0].success, Some(false));

    // Cycle 1: a1 is SUPPRESSED and not assignable, so its tracked task is
    // circuit-broken at the task level; the filler task keeps the cycle
    // itself from tripping the whole-cycle circuit breaker, so the
    // suppression/redemption state machine still runs and promotes a1 to
    // PROBATION.
    let cycle1 = engine
        .run_cycle(vec![capability_gated_task("tracked-1", "track"), filler_task("filler-1")], &AlwaysSucceeds, 1)
        .unwrap();
    assert_eq!(cycle1.status, CycleStatus::Completed);
    assert!(cycle1.executions.iter().find(|e| e.task_id == "tracked-1").unwrap().agent_id.is_none());

    // Cycle 2: a1 is now PROBATION and is the sole agent carrying the
    // "track" capability, so its tracked task is assignable to it again.
    let cycle2 = engine
        .run_cycle(vec![capability_gated_task("tracked-2", "track"), filler_task("filler-2")], &AlwaysSucceeds, 2)
        .unwrap();
    assert_eq!(cycle2.executions.iter().find(|e| e.task_id == "tracked-2").unwrap().agent_id.as_deref(), Some("a1"));
}

/// (c) An agent that fails every redemption trial for `max_redemption_cycles`
/// consecutive probation cycles ends up EXCLUDED and is never assigned again
/// — even once an executor that would otherwise report success is used.
#[test]
fn exclusion_after_exhausting_every_redemption_trial() {
    let mut track_capability = HashSet::new();
    track_capability.insert("track".to_string());

    let config = GovernanceConfig { suppression_threshold: 0.73, max_redemption_cycles: 4, ..GovernanceConfig::default() };
    let mut engine = GovernanceLoop::new(config, InMemoryStateStore::new()).unwrap();
    engine.register_agent(Agent::new("a1", track_capability, 0.76)).unwrap();
    engine.register_agent(Agent::new("filler", HashSet::new(), 0.95)).unwrap();

    let failing = FailOneAgent { target: "a1".into() };

    // Ten cycles: trip suppression once, then cycle through
    // SUSPENDED -> PROBATION -> (failed trial) -> SUSPENDED four times,
    // landing on EXCLUDED at the tenth cycle (index 9).
    for cycle in 0..10u64 {
        let _ = engine
            .run_cycle(
                vec![capability_gated_task(&format!("tracked-{cycle}"), "track"), filler_task(&format!("filler-{cycle}"))],
                &failing,
                cycle,
            )
            .unwrap();
    }

    // Confirm EXCLUDED is terminal: even with an executor that would report
    // success, the tracked task never finds a1 eligible again.
    for cycle in 10..13u64 {
        let result = engine
            .run_cycle(
                vec![capability_gated_task(&format!("tracked-{cycle}"), "track"), filler_task(&format!("filler-{cycle}"))],
                &AlwaysSucceeds,
                cycle,
            )
            .unwrap();
        let tracked = result.executions.iter().find(|e| e.task_id == format!("tracked-{cycle}")).unwrap();
        assert!(tracked.agent_id.is_none(), "a1 must never be reassigned once EXCLUDED");
    }
}

/// (d) A registry whose only agent sits below `trust_threshold` trips the
/// whole-cycle circuit breaker: every task records `agent=None,
/// success=None`, status is `CircuitBreaker`, and no trust update/mutation
/// occurs.
#[test]
fn cycle_circuit_breaker_when_no_agent_clears_the_trust_floor() {
    let config = GovernanceConfig::default();
    let mut engine = GovernanceLoop::new(config, InMemoryStateStore::new()).unwrap();
    engine.register_agent(Agent::new("a1", HashSet::new(), 0.40)).unwrap();

    let tasks = vec![task("t1", 0.5, 0.5, 0.0), task("t2", 0.6, 0.5, 0.0), task("t3", 0.4, 0.5, 0.0)];
    let result = engine.run_cycle(tasks, &AlwaysSucceeds, 0).unwrap();

    assert_eq!(result.status, CycleStatus::CircuitBreaker);
    assert_eq!(result.executions.len(), 3);
    for execution in &result.executions {
        assert!(execution.agent_id.is_none());
        assert!(execution.success.is_none());
    }
    assert!(result.mutation.is_none());
}

/// (e) A success-rate window held at 0.60 against a target of 0.85 produces
/// a TIGHTEN mutation that raises `trust_threshold`, staying within the
/// safety band.
#[test]
fn mutation_tightens_thresholds_under_sustained_undershoot() {
    let config = GovernanceConfig::default();
    let starting_trust_threshold = config.trust_threshold;
    let mutation_rate = config.mutation_rate;
    let mut engine = GovernanceLoop::new(config, InMemoryStateStore::new()).unwrap();
    engine.register_agent(Agent::new("a1", HashSet::new(), 0.90)).unwrap();
    engine.register_agent(Agent::new("a2", HashSet::new(), 0.90)).unwrap();
    engine.register_agent(Agent::new("a3", HashSet::new(), 0.90)).unwrap();

    // Five tasks per cycle, three succeed and two fail -> 0.60 success rate,
    // for five consecutive cycles (mutation_window_min = 5).
    let mut last_mutation = None;
    for cycle in 0..5u64 {
        let mut fail_suffixes = HashSet::new();
        fail_suffixes.insert(format!("c{cycle}-t3"));
        fail_suffixes.insert(format!("c{cycle}-t4"));
        let executor = RateScriptedExecutor { fail_suffixes };

        let tasks: Vec<Task> = (0..5).map(|i| task(&format!("c{cycle}-t{i}"), 0.5, 0.5, 0.0)).collect();
        let result = engine.run_cycle(tasks, &executor, cycle * 10).unwrap();
        if result.mutation.is_some() {
            last_mutation = result.mutation;
        }
    }

    let mutation = last_mutation.expect("a mutation should have fired by the fifth cycle");
    assert_eq!(mutation.direction, MutationDirection::Tighten);
    assert!(mutation.new_trust_threshold > starting_trust_threshold);
    assert!((mutation.new_trust_threshold - (starting_trust_threshold + mutation_rate)).abs() < 1e-6);
}

/// (f) An agent whose trust trajectory is five high values followed by five
/// low values triggers exactly one `DriftEvent` with `delta >= drift_delta`
/// once the window is fully populated.
#[test]
fn drift_flags_exactly_once_on_sustained_downward_shift() {
    let config = GovernanceConfig { drift_window: 10, drift_delta: 0.10, suppression_threshold: 0.4, ..GovernanceConfig::default() };
    let mut engine = GovernanceLoop::new(config, InMemoryStateStore::new()).unwrap();
    engine.register_agent(Agent::new("a1", HashSet::new(), 0.95)).unwrap();

    // Five successes push trust up near the ceiling, then five failures pull
    // it down sharply, mirroring the [0.9]*5 + [0.75]*5 worked trajectory.
    let mut total_drift_events = 0;
    for cycle in 0..5u64 {
        let result = engine.run_cycle(vec![task(&format!("s{cycle}"), 0.5, 0.5, 0.0)], &AlwaysSucceeds, cycle).unwrap();
        total_drift_events += result.drift_events.len();
    }
    for cycle in 5..10u64 {
        let result = engine.run_cycle(vec![task(&format!("f{cycle}"), 0.5, 0.5, 0.0)], &AlwaysFails, cycle).unwrap();
        total_drift_events += result.drift_events.len();
    }

    assert_eq!(total_drift_events, 1, "exactly one drift event should fire across the whole trajectory");
}

/// Sanity check that `AgentStatus::is_assignable` lines up with the
/// scenarios above (ACTIVE and PROBATION only).
#[test]
fn only_active_and_probation_are_assignable() {
    assert!(AgentStatus::Active.is_assignable());
    assert!(AgentStatus::Probation.is_assignable());
    assert!(!AgentStatus::Suppressed.is_assignable());
    assert!(!AgentStatus::Excluded.is_assignable());
}
