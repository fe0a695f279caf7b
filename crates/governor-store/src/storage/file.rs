// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! File-based JSON state store backend.
//!
//! [`FileStateStore`] persists all governance state to a single JSON file on
//! disk. Every commit flushes the file atomically (write-rename) so a crash
//! mid-write never corrupts existing data.
//!
//! ## Layout
//!
//! The JSON file has the shape:
//!
//! ```json
//! {
//!   "agents":        { "<agent_id>": Agent, ... },
//!   "trust_history": [ TrustHistoryEntry, ... ],
//!   "executions":    [ ExecutionResult, ... ],
//!   "drift_events":  [ DriftEvent, ... ],
//!   "mutations":     [ Mutation, ... ],
//!   "reflections":   [ Reflection, ... ],
//!   "last_cycle_id": CycleId | null
//! }
//! ```
//!
//! ## Caveats
//!
//! * [`FileStateStore`] holds the full in-memory state and flushes on every
//!   commit. It is not intended for high-frequency write workloads.
//! * Concurrent access from multiple processes is not supported. Use a
//!   proper database-backed `StateStore` implementation for multi-process
//!   deployments.

use std::collections::HashMap as StdHashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use governor_core::errors::GovernanceError;
use governor_core::storage::{CycleCommit, HistoryRecord, StateStore};
use governor_core::types::{
    Agent, AgentStatus, CycleId, DriftEvent, ExecutionResult, HistoryEntity, HistoryFilter, Mutation, Reflection,
    Stats, TrustHistoryEntry,
};
use serde::{Deserialize, Serialize};

/// Snapshot of all governance state, serialised to / deserialised from disk.
#[derive(Debug, Default, Serialize, Deserialize)]
struct StateSnapshot {
    agents: StdHashMap<String, Agent>,
    trust_history: Vec<TrustHistoryEntry>,
    executions: Vec<ExecutionResult>,
    drift_events: Vec<DriftEvent>,
    mutations: Vec<Mutation>,
    reflections: Vec<Reflection>,
    last_cycle_id: Option<CycleId>,
}

/// A file-backed [`StateStore`] implementation that persists state as JSON.
///
/// # Examples
///
/// ```rust,no_run
/// use governor_store::storage::file::FileStateStore;
/// use governor_core::storage::StateStore;
/// use governor_core::types::Agent;
/// use hashbrown::HashSet;
///
/// let mut store = FileStateStore::open("/tmp/governor-state.json")
///     .expect("could not open state file");
/// store.upsert_agent(Agent::new("a1", HashSet::new(), 0.8), false).unwrap();
/// ```
pub struct FileStateStore {
    path: PathBuf,
    data: StateSnapshot,
}

impl FileStateStore {
    /// Open an existing JSON state file, or create a new empty one if the
    /// path does not exist.
    ///
    /// # Errors
    ///
    /// Returns an [`io::Error`] if the file exists but cannot be read or if
    /// the JSON is malformed.
    pub fn open<P: AsRef<Path>>(path: P) -> io::Result<Self> {
        let path = path.as_ref().to_path_buf();
        let data = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            serde_json::from_str(&raw)
                .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, format!("governor state JSON parse error: {error}")))?
        } else {
            StateSnapshot::default()
        };

        Ok(Self { path, data })
    }

    /// Flush the current in-memory state to disk using an atomic
    /// write-rename.
    ///
    /// The file is written to `<path>.tmp` first, then renamed over the
    /// target, so a crash during the write never leaves a partial file.
    pub fn flush(&self) -> io::Result<()> {
        let json = serde_json::to_string_pretty(&self.data)
            .map_err(|error| io::Error::new(io::ErrorKind::InvalidData, format!("governor state serialisation error: {error}")))?;

        let tmp_path = self.path.with_extension("tmp");
        fs::write(&tmp_path, json)?;
        fs::rename(&tmp_path, &self.path)?;
        Ok(())
    }

    fn flush_or_fault(&self) -> Result<(), GovernanceError> {
        self.flush().map_err(|source| GovernanceError::Storage(format!("failed to flush state file: {source}")))
    }
}

impl StateStore for FileStateStore {
    fn upsert_agent(&mut self, agent: Agent, overwrite: bool) -> Result<(), GovernanceError> {
        match self.data.agents.get_mut(&agent.agent_id) {
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
                self.data.agents.insert(agent.agent_id.clone(), agent);
            }
        }
        self.flush_or_fault()
    }

    fn load_agents(&self) -> Vec<Agent> {
        self.data.agents.values().cloned().collect()
    }

    fn last_cycle_id(&self) -> Option<CycleId> {
        self.data.last_cycle_id
    }

    fn record_cycle(&mut self, commit: CycleCommit) -> Result<(), GovernanceError> {
        let previous = StateSnapshot {
            agents: self.data.agents.clone(),
            trust_history: self.data.trust_history.clone(),
            executions: self.data.executions.clone(),
            drift_events: self.data.drift_events.clone(),
            mutations: self.data.mutations.clone(),
            reflections: self.data.reflections.clone(),
            last_cycle_id: self.data.last_cycle_id,
        };

        for agent in &commit.agent_updates {
            self.data.agents.insert(agent.agent_id.clone(), agent.clone());
        }
        self.data.trust_history.extend(commit.trust_updates);
        self.data.executions.extend(commit.executions);
        self.data.drift_events.extend(commit.drift_events);
        if let Some(mutation) = commit.mutation {
            self.data.mutations.push(mutation);
        }
        self.data.reflections.push(commit.reflection);
        self.data.last_cycle_id = Some(self.data.last_cycle_id.map_or(commit.cycle_id, |prev| prev.max(commit.cycle_id)));

        // Atomicity: if the flush fails, roll the in-memory state back to
        // exactly what it was before this commit so a retried cycle never
        // sees a partially-applied update.
        if let Err(err) = self.flush_or_fault() {
            self.data = previous;
            return Err(err);
        }
        Ok(())
    }

    fn stats(&self, window: Option<usize>) -> Stats {
        let cycles = window.map(|w| {
            let mut ids: Vec<CycleId> = self.data.executions.iter().map(|e| e.cycle_id).collect();
            ids.sort_unstable();
            ids.dedup();
            let start = ids.len().saturating_sub(w);
            ids[start..].iter().copied().collect::<std::collections::HashSet<_>>()
        });
        let in_window = |cycle_id: CycleId| cycles.as_ref().map_or(true, |set| set.contains(&cycle_id));

        let mut stats = Stats::default();
        for execution in self.data.executions.iter().filter(|e| in_window(e.cycle_id)) {
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
        for agent in self.data.agents.values() {
            trust_sum += agent.trust;
            match agent.status {
                AgentStatus::Active => active += 1,
                AgentStatus::Suppressed => suppressed += 1,
                _ => {}
            }
        }
        stats.active_agents = active;
        stats.suppressed_agents = suppressed;
        stats.average_trust = if self.data.agents.is_empty() { 0.0 } else { trust_sum / self.data.agents.len() as f64 };

        stats
    }

    fn history(&self, entity: HistoryEntity, filter: &HistoryFilter) -> Vec<HistoryRecord> {
        fn passes(agent_id: Option<&str>, cycle_id: CycleId, filter: &HistoryFilter) -> bool {
            if let Some(ref wanted) = filter.agent_id {
                if agent_id != Some(wanted.as_str()) {
                    return false;
                }
            }
            if let Some(since) = filter.since_cycle {
                if cycle_id < since {
                    return false;
                }
            }
            if let Some(until) = filter.until_cycle {
                if cycle_id > until {
                    return false;
                }
            }
            true
        }

        let limit = filter.limit.unwrap_or(usize::MAX);

        match entity {
            HistoryEntity::TrustHistory => self
                .data
                .trust_history
                .iter()
                .filter(|e| passes(Some(&e.agent_id), e.cycle_id, filter))
                .take(limit)
                .cloned()
                .map(HistoryRecord::Trust)
                .collect(),
            HistoryEntity::Executions => self
                .data
                .executions
                .iter()
                .filter(|e| passes(e.agent_id.as_deref(), e.cycle_id, filter))
                .take(limit)
                .cloned()
                .map(HistoryRecord::Execution)
                .collect(),
            HistoryEntity::DriftEvents => self
                .data
                .drift_events
                .iter()
                .filter(|e| passes(Some(&e.agent_id), e.cycle_id, filter))
                .take(limit)
                .cloned()
                .map(HistoryRecord::Drift)
                .collect(),
            HistoryEntity::Mutations => self
                .data
                .mutations
                .iter()
                .filter(|e| passes(None, e.cycle_id, filter))
                .take(limit)
                .cloned()
                .map(HistoryRecord::Mutation)
                .collect(),
            HistoryEntity::Reflections => self
                .data
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
