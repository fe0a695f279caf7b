// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! In-memory agent registry — the hot-path mirror of the State Store.
//!
//! [`AgentRegistry`] is never the source of truth: on startup it is rebuilt
//! from [`crate::storage::StateStore::load_agents`], and on every successful
//! cycle commit it is updated with exactly the same deltas that were just
//! persisted. No sub-engine is ever handed a mutable reference to it —
//! [`AgentRegistry::snapshot`] returns an owned, immutable copy that a cycle
//! can freely read without racing a concurrent mutation.

use alloc::string::String;
use alloc::vec::Vec;
use hashbrown::HashMap;

use crate::types::Agent;

/// An owned, point-in-time copy of the registry, handed to a single cycle.
///
/// Because this is an owned clone rather than a borrow, nothing else can
/// observe a partially-applied update while a cycle is still reading from
/// its snapshot — the shadow-then-commit discipline in the Governance Loop
/// relies on this.
#[derive(Debug, Clone, Default)]
pub struct AgentSnapshot {
    agents: HashMap<String, Agent>,
}

impl AgentSnapshot {
    pub fn agents(&self) -> impl Iterator<Item = &Agent> {
        self.agents.values()
    }

    pub fn get(&self, agent_id: &str) -> Option<&Agent> {
        self.agents.get(agent_id)
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

/// The fast, in-memory view of every registered agent fed to each cycle.
pub struct AgentRegistry {
    agents: HashMap<String, Agent>,
}

impl AgentRegistry {
    /// Build a registry from the store's full agent snapshot. Called once at
    /// startup (or whenever a fresh [`crate::engine::GovernanceLoop`] is
    /// constructed).
    pub fn from_agents(agents: Vec<Agent>) -> Self {
        let mut map = HashMap::with_capacity(agents.len());
        for agent in agents {
            map.insert(agent.agent_id.clone(), agent);
        }
        Self { agents: map }
    }

    /// Install a brand-new agent in memory. The caller is responsible for
    /// having already persisted it via `StateStore::upsert_agent`.
    pub fn register(&mut self, agent: Agent) {
        self.agents.insert(agent.agent_id.clone(), agent);
    }

    /// Take an immutable, owned copy of the current registry state. This is
    /// the only input a cycle's sub-engines ever see.
    pub fn snapshot(&self) -> AgentSnapshot {
        AgentSnapshot { agents: self.agents.clone() }
    }

    /// Apply a batch of updated agent records. Must only be called after the
    /// corresponding cycle has been durably committed to the store.
    pub fn apply(&mut self, updates: Vec<Agent>) {
        for agent in updates {
            self.agents.insert(agent.agent_id.clone(), agent);
        }
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AgentStatus;
    use hashbrown::HashSet;

    fn agent(id: &str, trust: f64) -> Agent {
        Agent::new(id, HashSet::new(), trust)
    }

    #[test]
    fn snapshot_is_independent_of_later_mutation() {
        let mut registry = AgentRegistry::from_agents(alloc::vec![agent("a1", 0.7)]);
        let snapshot = registry.snapshot();

        let mut updated = agent("a1", 0.9);
        updated.status = AgentStatus::Suppressed;
        registry.apply(alloc::vec![updated]);

        assert_eq!(snapshot.get("a1").unwrap().trust, 0.7);
        assert_eq!(registry.snapshot().get("a1").unwrap().trust, 0.9);
    }

    #[test]
    fn apply_inserts_unknown_agents() {
        let mut registry = AgentRegistry::from_agents(Vec::new());
        registry.apply(alloc::vec![agent("new", 0.5)]);
        assert_eq!(registry.len(), 1);
    }
}
