// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! State Store — the durable, transactional home for every entity the
//! governance cycle produces.
//!
//! [`StateStore`] is the single interface between the Governance Loop and
//! whatever persists its state — narrow, `Send + Sync`, implementation
//! agnostic. This crate ships [`InMemoryStateStore`] for development and
//! testing; the durable file-backed implementation lives in the sibling
//! `governor-store` crate so this core crate stays `no_std`.

use alloc::vec::Vec;
use hashbrown::HashMap;

use crate::errors::GovernanceError;
use crate::types::{
    Agent, CycleId, DriftEvent, ExecutionResult, HistoryEntity, HistoryFilter, Mutation, Reflection, Stats,
    TrustHistoryEntry,
};

/// One record from an append-only history table, typed by which
/// [`HistoryEntity`] it came from.
#[derive(Debug, Clone)]
pub enum HistoryRecord {
    Trust(TrustHistoryEntry),
    Execution(ExecutionResult),
    Drift(DriftEvent),
    Mutation(Mutation),
    Reflection(Reflection),
}

/// Everything produced by one cycle, handed to [`StateStore::record_cycle`]
/// as a single atomic unit. Either the whole of this is visible afterward,
/// or none of it is.
#[derive(Debug, Clone)]
pub struct CycleCommit {
    pub cycle_id: CycleId,
    pub executions: Vec<ExecutionResult>,
    pub trust_updates: Vec<TrustHistoryEntry>,
    /// Full post-cycle agent records for every agent whose trust or status
    /// changed this cycle.
    pub agent_updates: Vec<Agent>,
    pub drift_events: Vec<DriftEvent>,
    pub mutation: Option<Mutation>,
    pub reflection: Reflection,
}

/// Pluggable persistence interface for the governance engine.
///
/// Implementations MUST be `Send + Sync` so a store can be shared across
/// threads when wrapped in `Arc<Mutex<...>>` (see `async_engine`).
pub trait StateStore: Send + Sync {
    /// Idempotent registration: preserves the agent's existing trust and
    /// status unless `overwrite` is set, in which case the incoming agent's
    /// fields replace the stored ones entirely.
    fn upsert_agent(&mut self, agent: Agent, overwrite: bool) -> Result<(), GovernanceError>;

    /// Snapshot of every registered agent. Ordering is unspecified.
    fn load_agents(&self) -> Vec<Agent>;

    /// The highest `cycle_id` this store has ever committed, or `None` if no
    /// cycle has ever been recorded.
    fn last_cycle_id(&self) -> Option<CycleId>;

    /// Atomically persist everything one cycle produced. Either the whole
    /// commit becomes visible or none of it does; a failure here must leave
    /// the store exactly as it was before the call.
    fn record_cycle(&mut self, commit: CycleCommit) -> Result<(), GovernanceError>;

    /// Aggregate counts over the most recent `window` cycles, or all time
    /// when `window` is `None`.
    fn stats(&self, window: Option<usize>) -> Stats;

    /// Ordered, filtered, paginated reads of one append-only history table.
    fn history(&self, entity: HistoryEntity, filter: &HistoryFilter) -> Vec<HistoryRecord>;
}

// ---------------------------------------------------------------------------
// InMemoryStateStore
// ---------------------------------------------------------------------------

/// A volatile, heap-allocated [`StateStore`] suitable for tests and
/// short-lived processes. All data is lost when dropped.
#[derive(Debug, Default)]
pub struct InMemoryStateStore {
    agents: HashMap<alloc::string::String, Agent>,
    trust_history: Vec<TrustHistoryEntry>,
    executions: Vec<ExecutionResult>,
    drift_events: Vec<DriftEvent>,
    mutations: Vec<Mutation>,
    reflections: Vec<Reflection>,
    last_cycle_id: Option<CycleId>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn cycles_in_window(&self, window: Option<usize>) -> Option<hashbrown::HashSet<CycleId>> {
        let window = window?;
        let mut cycle_ids: Vec<CycleId> = self.executions.iter().map(|e| e.cycle_id).collect();
        cycle_ids.sort_unstable();
        cycle_ids.dedup();
        let start = cycle_ids.len().saturating_sub(window);
        Some(cycle_ids[start..].iter().copied().collect())
    }
}

impl StateStore for InMemoryStateStore {
    fn upsert_agent(&mut self, agent: Agent, overwrite: bool) -> Result<(), GovernanceError> {
        match self.agents.get_mut(&agent.agent_id) {
            Some(existing) => {
                existing.capabilities = agent.capabilities;
                if overwrite {
                    existing.trust = agent.trust;
                    existing.status = agent.status;
                    existing.redemption_cycles_used = agent.redemption_cycles_used;
                    existing.suppression_entered_at_cycle = agent.suppression_entered_at_cycle;
                }
            }
            None => {
                self.agents.insert(agent.agent_id.clone(), agent);
            }
        }
        Ok(())
    }

    fn load_agents(&self) -> Vec<Agent> {
        self.agents.values().cloned().collect()
    }

    fn last_cycle_id(&self) -> Option<CycleId> {
        self.last_cycle_id
    }

    fn record_cycle(&mut self, commit: CycleCommit) -> Result<(), GovernanceError> {
        for agent in &commit.agent_updates {
            self.agents.insert(agent.agent_id.clone(), agent.clone());
        }
        self.trust_history.extend(commit.trust_updates);
        self.executions.extend(commit.executions);
        self.drift_events.extend(commit.drift_events);
        if let Some(mutation) = commit.mutation {
            self.mutations.push(mutation);
        }
        self.reflections.push(commit.reflection);
        self.last_cycle_id = Some(self.last_cycle_id.map_or(commit.cycle_id, |prev| prev.max(commit.cycle_id)));
        Ok(())
    }

    fn stats(&self, window: Option<usize>) -> Stats {
        let cycles = self.cycles_in_window(window);
        let in_window = |cycle_id: CycleId| cycles.as_ref().map_or(true, |set| set.contains(&cycle_id));

        let mut stats = Stats::default();
        for execution in self.executions.iter().filter(|e| in_window(e.cycle_id)) {
            match execution.success {
                Some(true) => {
                    stats.executions += 1;
                    stats.successes += 1;
                }
                Some(false) => {
                    stats.executions += 1;
                    stats.failures += 1;
                }
                None => {}
            }
        }

        let mut trust_sum = 0.0;
        let mut active = 0u64;
        let mut suppressed = 0u64;
        for agent in self.agents.values() {
            trust_sum += agent.trust;
            match agent.status {
                crate::types::AgentStatus::Active => active += 1,
                crate::types::AgentStatus::Suppressed => suppressed += 1,
                _ => {}
            }
        }
        stats.active_agents = active;
        stats.suppressed_agents = suppressed;
        stats.average_trust = if self.agents.is_empty() { 0.0 } else { trust_sum / self.agents.len() as f64 };

        stats
    }

    fn history(&self, entity: HistoryEntity, filter: &HistoryFilter) -> Vec<HistoryRecord> {
        fn passes(agent_id: Option<&str>, cycle_id: CycleId, timestamp_filter: &HistoryFilter) -> bool {
            if let Some(ref wanted) = timestamp_filter.agent_id {
                if agent_id != Some(wanted.as_str()) {
                    return false;
                }
            }
            if let Some(since) = timestamp_filter.since_cycle {
                if cycle_id < since {
                    return false;
                }
            }
            if let Some(until) = timestamp_filter.until_cycle {
                if cycle_id > until {
                    return false;
                }
            }
            true
        }

        let limit = filter.limit.unwrap_or(usize::MAX);

        match entity {
            HistoryEntity::TrustHistory => self
                .trust_history
                .iter()
                .filter(|e| passes(Some(&e.agent_id), e.cycle_id, filter))
                .take(limit)
                .cloned()
                .map(HistoryRecord::Trust)
                .collect(),
            HistoryEntity::Executions => self
                .executions
                .iter()
                .filter(|e| passes(e.agent_id.as_deref(), e.cycle_id, filter))
                .take(limit)
                .cloned()
                .map(HistoryRecord::Execution)
                .collect(),
            HistoryEntity::DriftEvents => self
                .drift_events
                .iter()
                .filter(|e| passes(Some(&e.agent_id), e.cycle_id, filter))
                .take(limit)
                .cloned()
                .map(HistoryRecord::Drift)
                .collect(),
            HistoryEntity::Mutations => self
                .mutations
                .iter()
                .filter(|e| passes(None, e.cycle_id, filter))
                .take(limit)
                .cloned()
                .map(HistoryRecord::Mutation)
                .collect(),
            HistoryEntity::Reflections => self
                .reflections
                .iter()
                .filter(|e| passes(None, e.cycle_id, filter))
                .take(limit)
                .cloned()
                .map(HistoryRecord::Reflection)
                .collect(),
        }
    }
}
