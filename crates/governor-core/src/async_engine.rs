// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Async Governance Loop backed by Tokio.
//!
//! This module is only compiled when the `async` feature flag is enabled:
//!
//! ```toml
//! [dependencies]
//! governor-core = { version = "0.1", features = ["async"] }
//! ```
//!
//! # Design
//!
//! [`AsyncGovernanceLoop`] mirrors [`crate::engine::GovernanceLoop`] step for
//! step — prioritize, assign, execute, learn, detect drift, transition,
//! mutate, reflect, commit — but fans the execution step out across up to
//! `max_parallel_executions` concurrent Tokio tasks, bounded by a
//! [`tokio::sync::Semaphore`]. Every other step stays sequential: learning,
//! mutation, and the commit itself are not safe to parallelize (they fold
//! state), matching the concurrency model's "synchronous fan-in" rule.

#![cfg(feature = "async")]

use alloc::collections::VecDeque;
use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;
use hashbrown::{HashMap, HashSet};

use tokio::sync::Semaphore;
use tokio::task::{Id as TaskId, JoinSet};

use crate::config::GovernanceConfig;
use crate::engine::CycleResult;
use crate::errors::GovernanceError;
use crate::events::{CircuitScope, EventBus, GovernanceEvent};
use crate::executor::{AsyncExecutor, Outcome};
use crate::learning;
use crate::mutation;
use crate::prioritizer;
use crate::reflection::{self, ReflectionInputs};
use crate::registry::AgentRegistry;
use crate::storage::{CycleCommit, StateStore};
use crate::trust::{self, DriftWindow};
use crate::types::{
    Agent, CycleId, CycleStatus, DriftEvent, ErrorKindTag, ExecutionResult, Task, TrustHistoryEntry,
};

/// Async counterpart of [`crate::engine::GovernanceLoop`]. The executor is
/// held behind an `Arc` so bounded fan-out can move owned clones into
/// spawned Tokio tasks.
///
/// # Example
///
/// ```rust,no_run
/// # #[cfg(feature = "async")]
/// # {
/// use governor_core::async_engine::AsyncGovernanceLoop;
/// use governor_core::config::GovernanceConfig;
/// use governor_core::executor::{AsyncExecutor, Outcome};
/// use governor_core::storage::InMemoryStateStore;
/// use governor_core::types::{Agent, Task};
/// use hashbrown::HashSet;
///
/// struct AlwaysSucceeds;
/// impl AsyncExecutor for AlwaysSucceeds {
///     async fn execute(&self, _task: &Task, _agent_id: &str) -> Outcome {
///         Outcome::success(5)
///     }
/// }
///
/// #[tokio::main]
/// async fn main() {
///     let mut engine = AsyncGovernanceLoop::new(
///         GovernanceConfig::default(),
///         InMemoryStateStore::new(),
///         AlwaysSucceeds,
///     ).unwrap();
///     engine.register_agent(Agent::new("a1", HashSet::new(), 0.8)).unwrap();
///
///     let tasks = alloc::vec![Task {
///         task_id: "t1".into(), impact: 0.5, urgency: 0.5, risk: 0.0,
///         required_capability: None, metadata: alloc::vec::Vec::new(),
///     }];
///     let result = engine.run_cycle(tasks, 0).await.unwrap();
///     assert_eq!(result.executions[0].agent_id.as_deref(), Some("a1"));
/// }
/// # }
/// ```
pub struct AsyncGovernanceLoop<S: StateStore, E: AsyncExecutor + Send + Sync + 'static> {
    config: GovernanceConfig,
    registry: AgentRegistry,
    store: S,
    events: EventBus,
    executor: Arc<E>,
    next_cycle_id: CycleId,
    drift_windows: HashMap<String, DriftWindow>,
    drift_flagged: HashSet<String>,
    success_window: VecDeque<f64>,
}

impl<S: StateStore, E: AsyncExecutor + Send + Sync + 'static> AsyncGovernanceLoop<S, E> {
    pub fn new(config: GovernanceConfig, store: S, executor: E) -> Result<Self, GovernanceError> {
        config.validate()?;
        let agents = store.load_agents();
        let next_cycle_id = store.last_cycle_id().map_or(1, |last| last + 1);
        Ok(Self {
            config,
            registry: AgentRegistry::from_agents(agents),
            store,
            events: EventBus::new(),
            executor: Arc::new(executor),
            next_cycle_id,
            drift_windows: HashMap::new(),
            drift_flagged: HashSet::new(),
            success_window: VecDeque::new(),
        })
    }

    pub fn subscribe(&mut self, subscriber: Arc<dyn crate::events::Subscriber>) {
        self.events.register(subscriber);
    }

    pub fn register_agent(&mut self, agent: Agent) -> Result<(), GovernanceError> {
        self.store.upsert_agent(agent.clone(), false).map_err(|_| {
            GovernanceError::Storage("failed to persist newly registered agent".into())
        })?;
        let agent_id = agent.agent_id.clone();
        self.registry.register(agent);
        self.events.publish(&GovernanceEvent::AgentRegistered { agent_id });
        Ok(())
    }

    /// Run one cycle, fanning the execution step out across up to
    /// `config.max_parallel_executions` concurrent Tokio tasks.
    pub async fn run_cycle(&mut self, tasks: Vec<Task>, timestamp_ms: u64) -> Result<CycleResult, GovernanceError> {
        let cycle_id = self.next_cycle_id;

        let ordered = prioritizer::prioritize(tasks, &self.config);
        let snapshot = self.registry.snapshot();
        let assignments = trust::assign_all(&ordered, &snapshot, &self.config, &self.drift_flagged);

        let any_assigned = assignments.iter().any(|a| a.agent_id.is_some());
        if !any_assigned {
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
            let _ = assignment;
            pending_events.push(GovernanceEvent::CircuitBreakerTripped { cycle_id, scope: CircuitScope::Task });
        }

        // Bounded concurrent fan-out: one permit per in-flight execution. A
        // panicking or timed-out task becomes a failed `Outcome` for that
        // task alone — it never aborts the cycle for every other task.
        let semaphore = Arc::new(Semaphore::new(self.config.max_parallel_executions.max(1)));
        let mut join_set: JoinSet<(String, String, Outcome)> = JoinSet::new();
        let mut task_identity: HashMap<TaskId, (String, String)> = HashMap::new();
        let timeout_ms = self.config.task_timeout_ms;

        for (task, assignment) in ordered.iter().zip(assignments.iter()) {
            let Some(ref agent_id) = assignment.agent_id else { continue };
            let task = task.clone();
            let agent_id = agent_id.clone();
            let identity = (task.task_id.clone(), agent_id.clone());
            let executor = self.executor.clone();
            let permit = semaphore.clone().acquire_owned().await.expect("semaphore never closed");

            let abort_handle = join_set.spawn(async move {
                let start = std::time::Instant::now();
                let execution = executor.execute(&task, &agent_id);
                let outcome = match timeout_ms {
                    Some(ms) => match tokio::time::timeout(core::time::Duration::from_millis(ms), execution).await {
                        Ok(outcome) => outcome,
                        Err(_) => {
                            let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);
                            Outcome::failure(elapsed_ms, Some(ErrorKindTag::Timeout))
                        }
                    },
                    None => execution.await,
                };
                drop(permit);
                (task.task_id, agent_id, outcome)
            });
            task_identity.insert(abort_handle.id(), identity);
        }

        let mut outcome_by_task: HashMap<String, (String, Outcome)> = HashMap::new();
        while let Some(joined) = join_set.join_next_with_id().await {
            match joined {
                Ok((_id, (task_id, agent_id, outcome))) => {
                    outcome_by_task.insert(task_id, (agent_id, outcome));
                }
                Err(join_error) => {
                    let id = join_error.id();
                    if let Some((task_id, agent_id)) = task_identity.remove(&id) {
                        #[cfg(feature = "std")]
                        tracing::warn!(cycle_id, task_id = %task_id, "executor task panicked");
                        outcome_by_task.insert(task_id, (agent_id, Outcome::failure(0, Some(ErrorKindTag::Executor))));
                    }
                }
            }
        }

        let mut executions = Vec::with_capacity(ordered.len());
        let mut outcomes_by_agent: HashMap<String, Vec<Option<bool>>> = HashMap::new();

        for task in &ordered {
            match outcome_by_task.remove(&task.task_id) {
                Some((agent_id, outcome)) => {
                    outcomes_by_agent.entry(agent_id.clone()).or_default().push(Some(outcome.success));
                    executions.push(ExecutionResult {
                        task_id: task.task_id.clone(),
                        agent_id: Some(agent_id),
                        cycle_id,
                        success: Some(outcome.success),
                        latency_ms: outcome.latency_ms,
                        output_metadata: outcome.output,
                        error_kind: outcome.error_kind,
                        timestamp_ms,
                    });
                }
                None => executions.push(circuit_breaker_result(task, cycle_id, timestamp_ms)),
            }
        }

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

            let window = self.drift_windows.entry(agent_id.clone()).or_default();
            window.push(updated.trust, self.config.drift_window);
            match window.detect(self.config.drift_window, self.config.drift_delta) {
                Some(result) => {
                    self.drift_flagged.insert(agent_id.clone());
                    drift_events.push(DriftEvent {
                        agent_id: agent_id.clone(),
                        cycle_id,
                        delta: result.delta,
                        window_mean_before: result.window_mean_before,
                        window_mean_after: result.window_mean_after,
                    });
                    pending_events.push(GovernanceEvent::DriftDetected { agent_id: agent_id.clone(), delta: result.delta });
                }
                None => {
                    self.drift_flagged.remove(agent_id);
                }
            }

            agent_updates.push(updated);
        }

        let mut any_excluded_this_cycle = false;
        let mut updates_by_id: HashMap<String, Agent> =
            agent_updates.into_iter().map(|a| (a.agent_id.clone(), a)).collect();

        for agent in snapshot.agents() {
            let mut current = updates_by_id.get(&agent.agent_id).cloned().unwrap_or_else(|| agent.clone());
            let probation_outcome = probation_outcomes.get(&agent.agent_id).copied();
            if let Some(transition_result) = trust::transition(&mut current, probation_outcome, cycle_id, &self.config) {
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

        let executed_count = outcomes_by_agent.values().map(Vec::len).sum::<usize>();
        let success_count = outcomes_by_agent.values().flatten().filter(|o| **o == Some(true)).count();
        let success_rate = if executed_count == 0 { 0.0 } else { success_count as f64 / executed_count as f64 };
        self.success_window.push_back(success_rate);
        while self.success_window.len() > self.config.mutation_window {
            self.success_window.pop_front();
        }

        let mutation = mutation::evaluate(&self.success_window, &self.config, cycle_id, timestamp_ms);
        if let Some(ref m) = mutation {
            self.config.trust_threshold = m.new_trust_threshold;
            self.config.suppression_threshold = m.new_suppression_threshold;
            self.config.drift_delta = m.new_drift_delta;
            pending_events.push(GovernanceEvent::ThresholdMutated {
                old_trust_threshold: m.old_trust_threshold,
                new_trust_threshold: m.new_trust_threshold,
                direction: m.direction,
            });
        }

        let reflection_inputs = ReflectionInputs {
            circuit_breaker_fired: false,
            any_task_assigned: any_assigned,
            success_rate,
            any_agent_excluded_this_cycle: any_excluded_this_cycle,
        };
        let reflection = reflection::reflect(cycle_id, &reflection_inputs, &self.config, timestamp_ms);
        pending_events.push(GovernanceEvent::ReflectionRecorded { cycle_id, constraint_score: reflection.constraint_score });

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
            .map_err(|_| GovernanceError::Storage("failed to commit cycle".into()))?;

        self.registry.apply(agent_updates);
        self.next_cycle_id += 1;

        for event in &pending_events {
            self.events.publish(event);
        }

        Ok(CycleResult { cycle_id, status: CycleStatus::Completed, executions, drift_events, mutation, reflection })
    }

    pub fn config(&self) -> &GovernanceConfig {
        &self.config
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::InMemoryStateStore;
    use alloc::vec;
    use hashbrown::HashSet as HbHashSet;

    struct AlwaysSucceeds;
    impl AsyncExecutor for AlwaysSucceeds {
        fn execute(&self, _task: &Task, _agent_id: &str) -> impl core::future::Future<Output = Outcome> + Send {
            async { Outcome::success(5) }
        }
    }

    fn task(id: &str) -> Task {
        Task { task_id: id.into(), impact: 0.5, urgency: 0.5, risk: 0.0, required_capability: None, metadata: Vec::new() }
    }

    #[tokio::test]
    async fn concurrent_fan_out_respects_bounded_parallelism() {
        let config = GovernanceConfig { max_parallel_executions: 2, ..GovernanceConfig::default() };
        let mut engine = AsyncGovernanceLoop::new(config, InMemoryStateStore::new(), AlwaysSucceeds).unwrap();
        engine.register_agent(Agent::new("a1", HbHashSet::new(), 0.8)).unwrap();

        let tasks = vec![task("t1"), task("t2"), task("t3")];
        let result = engine.run_cycle(tasks, 0).await.unwrap();

        assert_eq!(result.status, CycleStatus::Completed);
        assert_eq!(result.executions.len(), 3);
        assert!(result.executions.iter().all(|e| e.success == Some(true)));
    }

    struct PanicsOnOddTasks;
    impl AsyncExecutor for PanicsOnOddTasks {
        fn execute(&self, task: &Task, _agent_id: &str) -> impl core::future::Future<Output = Outcome> + Send {
            let should_panic = task.task_id.ends_with('1') || task.task_id.ends_with('3');
            async move {
                if should_panic {
                    panic!("executor exploded on {should_panic}");
                }
                Outcome::success(5)
            }
        }
    }

    #[tokio::test]
    async fn one_panicking_task_does_not_abort_the_cycle() {
        let config = GovernanceConfig { max_parallel_executions: 2, ..GovernanceConfig::default() };
        let mut engine = AsyncGovernanceLoop::new(config, InMemoryStateStore::new(), PanicsOnOddTasks).unwrap();
        engine.register_agent(Agent::new("a1", HbHashSet::new(), 0.8)).unwrap();

        let tasks = vec![task("t1"), task("t2"), task("t3")];
        let result = engine.run_cycle(tasks, 0).await.unwrap();

        assert_eq!(result.status, CycleStatus::Completed);
        assert_eq!(result.executions.len(), 3);
        let by_id: HashMap<String, Option<bool>> =
            result.executions.iter().map(|e| (e.task_id.clone(), e.success)).collect();
        assert_eq!(by_id.get("t1"), Some(&Some(false)));
        assert_eq!(by_id.get("t2"), Some(&Some(true)));
        assert_eq!(by_id.get("t3"), Some(&Some(false)));
    }

    struct Sleeps(u64);
    impl AsyncExecutor for Sleeps {
        fn execute(&self, _task: &Task, _agent_id: &str) -> impl core::future::Future<Output = Outcome> + Send {
            let millis = self.0;
            async move {
                tokio::time::sleep(core::time::Duration::from_millis(millis)).await;
                Outcome::success(millis)
            }
        }
    }

    #[tokio::test]
    async fn slow_task_is_preempted_at_the_configured_timeout() {
        let config = GovernanceConfig { task_timeout_ms: Some(5), ..GovernanceConfig::default() };
        let mut engine = AsyncGovernanceLoop::new(config, InMemoryStateStore::new(), Sleeps(200)).unwrap();
        engine.register_agent(Agent::new("a1", HbHashSet::new(), 0.8)).unwrap();

        let result = engine.run_cycle(vec![task("t1")], 0).await.unwrap();

        assert_eq!(result.executions[0].success, Some(false));
        assert!(matches!(result.executions[0].error_kind, Some(ErrorKindTag::Timeout)));
    }

    struct AlwaysFailsCommit;
    impl StateStore for AlwaysFailsCommit {
        fn upsert_agent(&mut self, _agent: Agent, _overwrite: bool) -> Result<(), GovernanceError> {
            Ok(())
        }
        fn load_agents(&self) -> Vec<Agent> {
            Vec::new()
        }
        fn last_cycle_id(&self) -> Option<CycleId> {
            None
        }
        fn record_cycle(&mut self, _commit: CycleCommit) -> Result<(), GovernanceError> {
            Err(GovernanceError::Storage("boom".into()))
        }
        fn stats(&self, _window: Option<usize>) -> crate::types::Stats {
            crate::types::Stats::default()
        }
        fn history(
            &self,
            _entity: crate::types::HistoryEntity,
            _filter: &crate::types::HistoryFilter,
        ) -> Vec<crate::storage::HistoryRecord> {
            Vec::new()
        }
    }

    struct EventCounter(core::sync::atomic::AtomicUsize);
    impl crate::events::Subscriber for EventCounter {
        fn on_event(&self, _event: &GovernanceEvent) {
            self.0.fetch_add(1, core::sync::atomic::Ordering::SeqCst);
        }
    }

    #[tokio::test]
    async fn no_events_publish_when_commit_fails() {
        let config = GovernanceConfig::default();
        let mut engine = AsyncGovernanceLoop::new(config, AlwaysFailsCommit, AlwaysSucceeds).unwrap();
        engine.register_agent(Agent::new("a1", HbHashSet::new(), 0.8)).unwrap();

        let counter = Arc::new(EventCounter(core::sync::atomic::AtomicUsize::new(0)));
        engine.subscribe(counter.clone());

        let result = engine.run_cycle(vec![task("t1")], 0).await;
        assert!(result.is_err());
        assert_eq!(counter.0.load(core::sync::atomic::Ordering::SeqCst), 0);
    }
}
