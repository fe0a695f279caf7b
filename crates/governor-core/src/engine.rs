// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Governance Loop — the top-level composition of all nine components.
//!
//! [`GovernanceLoop`] owns the [`AgentRegistry`], the [`StateStore`], and the
//! [`EventBus`], and drives a single cycle end to end: prioritize, assign,
//! execute, learn, detect drift, transition status, mutate thresholds,
//! reflect, commit. Each cycle either commits in full or leaves the registry
//! and store exactly as they were before it started — the shadow-then-commit
//! discipline described per-module in `trust`/`learning`/`mutation` is
//! enforced here, at the one place that calls all of them in sequence.

use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::vec::Vec;
use hashbrown::{HashMap, HashSet};

use crate::config::GovernanceConfig;
use crate::errors::GovernanceError;
use crate::events::{CircuitScope, EventBus, GovernanceEvent};
use crate::executor::{Executor, Outcome};
use crate::learning;
use crate::mutation;
use crate::prioritizer;
use crate::reflection::{self, ReflectionInputs};
use crate::registry::AgentRegistry;
use crate::storage::{CycleCommit, StateStore};
use crate::trust::{self, DriftWindow};
use crate::types::{
    Agent, CycleId, CycleStatus, DriftEvent, ErrorKindTag, ExecutionResult, Mutation, Reflection, Task,
    TrustHistoryEntry,
};

/// Everything a caller needs to know about one completed (or circuit-broken)
/// cycle.
#[derive(Debug, Clone)]
pub struct CycleResult {
    pub cycle_id: CycleId,
    pub status: CycleStatus,
    pub executions: Vec<ExecutionResult>,
    pub drift_events: Vec<DriftEvent>,
    pub mutation: Option<Mutation>,
    pub reflection: Reflection,
}

/// Drives the governance cycle, generic over a [`StateStore`] backend and an
/// [`Executor`].
///
/// # Examples
///
/// ```rust
/// use governor_core::config::GovernanceConfig;
/// use governor_core::engine::GovernanceLoop;
/// use governor_core::executor::{Executor, Outcome};
/// use governor_core::storage::InMemoryStateStore;
/// use governor_core::types::{Agent, Task};
/// use hashbrown::HashSet;
///
/// struct AlwaysSucceeds;
/// impl Executor for AlwaysSucceeds {
///     fn execute(&self, _task: &Task, _agent_id: &str) -> Outcome {
///         Outcome::success(5)
///     }
/// }
///
/// let config = GovernanceConfig::default();
/// let mut engine = GovernanceLoop::new(config, InMemoryStateStore::new()).unwrap();
/// engine.register_agent(Agent::new("a1", HashSet::new(), 0.8)).unwrap();
///
/// let tasks = alloc::vec![Task {
///     task_id: "t1".into(), impact: 0.5, urgency: 0.5, risk: 0.0,
///     required_capability: None, metadata: alloc::vec::Vec::new(),
/// }];
/// let result = engine.run_cycle(tasks, &AlwaysSucceeds, 0).unwrap();
/// assert_eq!(result.executions[0].agent_id.as_deref(), Some("a1"));
/// ```
pub struct GovernanceLoop<S: StateStore> {
    config: GovernanceConfig,
    registry: AgentRegistry,
    store: S,
    events: EventBus,
    next_cycle_id: CycleId,
    drift_windows: HashMap<String, DriftWindow>,
    drift_flagged: HashSet<String>,
    success_window: VecDeque<f64>,
}

impl<S: StateStore> GovernanceLoop<S> {
    /// Construct a loop from a fresh config and store, rebuilding the
    /// in-memory registry from whatever the store already holds (empty for a
    /// brand-new store).
    pub fn new(config: GovernanceConfig, store: S) -> Result<Self, GovernanceError> {
        config.validate()?;
        let agents = store.load_agents();
        let next_cycle_id = store.last_cycle_id().map_or(1, |last| last + 1);
        Ok(Self {
            config,
            registry: AgentRegistry::from_agents(agents),
            store,
            events: EventBus::new(),
            next_cycle_id,
            drift_windows: HashMap::new(),
            drift_flagged: HashSet::new(),
            success_window: VecDeque::new(),
        })
    }

    /// Register a subscriber for every [`GovernanceEvent`] this loop emits.
    pub fn subscribe(&mut self, subscriber: alloc::sync::Arc<dyn crate::events::Subscriber>) {
        self.events.register(subscriber);
    }

    /// Register a brand-new agent, persisting it to the store before it
    /// becomes visible in the in-memory registry.
    pub fn register_agent(&mut self, agent: Agent) -> Result<(), GovernanceError> {
        self.store.upsert_agent(agent.clone(), false).map_err(|_| {
            GovernanceError::Storage("failed to persist newly registered agent".into())
        })?;
        let agent_id = agent.agent_id.clone();
        self.registry.register(agent);
        self.events.publish(&GovernanceEvent::AgentRegistered { agent_id });
        Ok(())
    }

    /// Run one full cycle over `tasks` using `executor` to carry out every
    /// assignment. `timestamp_ms` is supplied by the caller — the engine
    /// never reads the clock itself, keeping it deterministic and `no_std`-
    /// friendly.
    pub fn run_cycle<E: Executor>(
        &mut self,
        tasks: Vec<Task>,
        executor: &E,
        timestamp_ms: u64,
    ) -> Result<CycleResult, GovernanceError> {
        let cycle_id = self.next_cycle_id;
        #[cfg(feature = "std")]
        let _span = tracing::info_span!("governance_cycle", cycle_id).entered();

        // Step 1: prioritize.
        let ordered = prioritizer::prioritize(tasks, &self.config);

        // Step 2: snapshot the registry. Sub-engines never see anything but
        // this owned, immutable copy.
        let snapshot = self.registry.snapshot();

        // Step 3: assign. Agents flagged by the *previous* cycle's drift
        // detection are down-weighted here.
        let assignments = trust::assign_all(&ordered, &snapshot, &self.config, &self.drift_flagged);

        let any_assigned = assignments.iter().any(|a| a.agent_id.is_some());
        if !any_assigned {
            #[cfg(feature = "std")]
            tracing::warn!(cycle_id, "no task found an eligible agent; circuit breaker tripped");

            let mut pending_events =
                alloc::vec![GovernanceEvent::CircuitBreakerTripped { cycle_id, scope: CircuitScope::Cycle }];

            let executions: Vec<ExecutionResult> = ordered
                .iter()
                .map(|task| circuit_breaker_result(task, cycle_id, timestamp_ms))
                .collect();
            let reflection_inputs = ReflectionInputs {
                circuit_breaker_fired: true,
                any_task_assigned: false,
                success_rate: 0.0,
                any_agent_excluded_this_cycle: false,
            };
            let reflection = reflection::reflect(cycle_id, &reflection_inputs, &self.config, timestamp_ms);
            pending_events.push(GovernanceEvent::ReflectionRecorded {
                cycle_id,
                constraint_score: reflection.constraint_score,
            });

            self.store
                .record_cycle(CycleCommit {
                    cycle_id,
                    executions: executions.clone(),
                    trust_updates: Vec::new(),
                    agent_updates: Vec::new(),
                    drift_events: Vec::new(),
                    mutation: None,
                    reflection: reflection.clone(),
                })
                .map_err(|_| GovernanceError::Storage("failed to commit circuit-breaker cycle".into()))?;

            // Only now that the commit has succeeded do these events reflect
            // durable state — publish strictly after `record_cycle` returns Ok.
            for event in &pending_events {
                self.events.publish(event);
            }

            self.next_cycle_id += 1;
            return Ok(CycleResult {
                cycle_id,
                status: CycleStatus::CircuitBreaker,
                executions,
                drift_events: Vec::new(),
                mutation: None,
                reflection,
            });
        }

        let mut pending_events: Vec<GovernanceEvent> = Vec::new();

        for assignment in assignments.iter().filter(|a| a.agent_id.is_none()) {
            #[cfg(feature = "std")]
            tracing::debug!(cycle_id, task_id = %assignment.task_id, "no eligible agent for this task");
            pending_events.push(GovernanceEvent::CircuitBreakerTripped { cycle_id, scope: CircuitScope::Task });
        }

        // Step 4: execute every assigned task.
        let mut executions = Vec::with_capacity(ordered.len());
        let mut outcomes_by_agent: HashMap<String, Vec<Option<bool>>> = HashMap::new();

        for (task, assignment) in ordered.iter().zip(assignments.iter()) {
            let Some(ref agent_id) = assignment.agent_id else {
                executions.push(circuit_breaker_result(task, cycle_id, timestamp_ms));
                continue;
            };

            #[cfg(feature = "std")]
            let outcome: Outcome =
                crate::executor::execute_guarded(executor, task, agent_id, self.config.task_timeout_ms);
            #[cfg(not(feature = "std"))]
            let outcome: Outcome = executor.execute(task, agent_id);

            outcomes_by_agent.entry(agent_id.clone()).or_default().push(Some(outcome.success));

            executions.push(ExecutionResult {
                task_id: task.task_id.clone(),
                agent_id: Some(agent_id.clone()),
                cycle_id,
                success: Some(outcome.success),
                latency_ms: outcome.latency_ms,
                output_metadata: outcome.output,
                error_kind: outcome.error_kind,
                timestamp_ms,
            });
        }

        // Step 5: learning — fold every agent's outcome sequence this cycle,
        // in priority order, into its trust score.
        let mut trust_updates = Vec::new();
        let mut agent_updates: Vec<Agent> = Vec::new();
        let mut drift_events = Vec::new();
        let mut probation_outcomes: HashMap<String, bool> = HashMap::new();

        for (agent_id, outcomes) in &outcomes_by_agent {
            let Some(agent) = snapshot.get(agent_id) else { continue };
            let mut updated = agent.clone();
            let old_score = updated.trust;
            updated.trust = learning::compose(old_score, outcomes, &self.config);

            if let Some(last_outcome) = outcomes.last().copied().flatten() {
                probation_outcomes.insert(agent_id.clone(), last_outcome);
            }

            trust_updates.push(TrustHistoryEntry {
                agent_id: agent_id.clone(),
                cycle_id,
                old_score,
                new_score: updated.trust,
                outcome: outcomes.last().copied().flatten(),
                timestamp_ms,
            });
            pending_events.push(GovernanceEvent::TrustUpdated {
                agent_id: agent_id.clone(),
                old: old_score,
                new: updated.trust,
                outcome: outcomes.last().copied().flatten(),
            });

            // Step 6: drift detection on the freshly-updated trust value.
            let window = self.drift_windows.entry(agent_id.clone()).or_default();
            window.push(updated.trust, self.config.drift_window);
            match window.detect(self.config.drift_window, self.config.drift_delta) {
                Some(result) => {
                    self.drift_flagged.insert(agent_id.clone());
                    let event = DriftEvent {
                        agent_id: agent_id.clone(),
                        cycle_id,
                        delta: result.delta,
                        window_mean_before: result.window_mean_before,
                        window_mean_after: result.window_mean_after,
                    };
                    #[cfg(feature = "std")]
                    tracing::debug!(cycle_id, agent_id = %agent_id, delta = result.delta, "drift detected");
                    pending_events.push(GovernanceEvent::DriftDetected { agent_id: agent_id.clone(), delta: result.delta });
                    drift_events.push(event);
                }
                None => {
                    self.drift_flagged.remove(agent_id);
                }
            }

            agent_updates.push(updated);
        }

        // Step 7: suppression/redemption/exclusion transitions for every
        // registered agent, not only the ones executed this cycle.
        let mut any_excluded_this_cycle = false;
        let mut updates_by_id: HashMap<String, Agent> =
            agent_updates.into_iter().map(|a| (a.agent_id.clone(), a)).collect();

        for agent in snapshot.agents() {
            let mut current = updates_by_id.get(&agent.agent_id).cloned().unwrap_or_else(|| agent.clone());
            let probation_outcome = probation_outcomes.get(&agent.agent_id).copied();
            if let Some(transition_result) = trust::transition(&mut current, probation_outcome, cycle_id, &self.config) {
                #[cfg(feature = "std")]
                tracing::debug!(
                    cycle_id,
                    agent_id = %agent.agent_id,
                    old = ?transition_result.old_status,
                    new = ?transition_result.new_status,
                    "agent status transitioned"
                );
                if transition_result.new_status == crate::types::AgentStatus::Excluded {
                    any_excluded_this_cycle = true;
                }
                pending_events.push(GovernanceEvent::StatusChanged {
                    agent_id: agent.agent_id.clone(),
                    old: transition_result.old_status,
                    new: transition_result.new_status,
                    reason: alloc::format!("{:?} -> {:?}", transition_result.old_status, transition_result.new_status),
                });
                updates_by_id.insert(agent.agent_id.clone(), current);
            } else if !updates_by_id.contains_key(&agent.agent_id) {
                updates_by_id.insert(agent.agent_id.clone(), current);
            }
        }

        let agent_updates: Vec<Agent> = updates_by_id.into_values().collect();

        // Step 8: mutation — push this cycle's success rate into the window
        // before evaluating, so a mutation can fire on the cycle that just
        // filled the window.
        let executed_count = outcomes_by_agent.values().map(Vec::len).sum::<usize>();
        let success_count = outcomes_by_agent
            .values()
            .flatten()
            .filter(|o| **o == Some(true))
            .count();
        let success_rate = if executed_count == 0 { 0.0 } else { success_count as f64 / executed_count as f64 };
        self.success_window.push_back(success_rate);
        while self.success_window.len() > self.config.mutation_window {
            self.success_window.pop_front();
        }

        let mutation = mutation::evaluate(&self.success_window, &self.config, cycle_id, timestamp_ms);
        if let Some(ref m) = mutation {
            #[cfg(feature = "std")]
            tracing::info!(cycle_id, direction = ?m.direction, "threshold mutation applied");
            self.config.trust_threshold = m.new_trust_threshold;
            self.config.suppression_threshold = m.new_suppression_threshold;
            self.config.drift_delta = m.new_drift_delta;
            pending_events.push(GovernanceEvent::ThresholdMutated {
                old_trust_threshold: m.old_trust_threshold,
                new_trust_threshold: m.new_trust_threshold,
                direction: m.direction,
            });
        }

        // Step 9: reflection.
        let reflection_inputs = ReflectionInputs {
            circuit_breaker_fired: false,
            any_task_assigned: any_assigned,
            success_rate,
            any_agent_excluded_this_cycle: any_excluded_this_cycle,
        };
        let reflection = reflection::reflect(cycle_id, &reflection_inputs, &self.config, timestamp_ms);
        pending_events.push(GovernanceEvent::ReflectionRecorded { cycle_id, constraint_score: reflection.constraint_score });

        // Step 10: commit. Either this whole cycle becomes visible, or none
        // of it does — the registry is only updated after a successful
        // commit.
        self.store
            .record_cycle(CycleCommit {
                cycle_id,
                executions: executions.clone(),
                trust_updates,
                agent_updates: agent_updates.clone(),
                drift_events: drift_events.clone(),
                mutation: mutation.clone(),
                reflection: reflection.clone(),
            })
            .map_err(|_| {
                #[cfg(feature = "std")]
                tracing::error!(cycle_id, "failed to commit cycle");
                GovernanceError::Storage("failed to commit cycle".into())
            })?;

        self.registry.apply(agent_updates);
        self.next_cycle_id += 1;

        // The commit above succeeded, so every buffered event now describes
        // durable state — publish in the order it was recorded.
        for event in &pending_events {
            self.events.publish(event);
        }

        Ok(CycleResult { cycle_id, status: CycleStatus::Completed, executions, drift_events, mutation, reflection })
    }

    /// Read-only access to the current configuration, including any
    /// mutations applied by prior cycles.
    pub fn config(&self) -> &GovernanceConfig {
        &self.config
    }

    /// Number of agents currently registered.
    pub fn agent_count(&self) -> usize {
        self.registry.len()
    }

    /// An owned, point-in-time snapshot of every registered agent — the same
    /// view each cycle's sub-engines operate on.
    pub fn agents(&self) -> crate::registry::AgentSnapshot {
        self.registry.snapshot()
    }

    /// Read-only access to the underlying store, for callers that need to
    /// inspect persisted history directly.
    pub fn store(&self) -> &S {
        &self.store
    }
}

fn circuit_breaker_result(task: &Task, cycle_id: CycleId, timestamp_ms: u64) -> ExecutionResult {
    ExecutionResult {
        task_id: task.task_id.clone(),
        agent_id: None,
        cycle_id,
        success: None,
        latency_ms: 0,
        output_metadata: Vec::new(),
        error_kind: None,
        timestamp_ms,
    }
}
