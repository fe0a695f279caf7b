// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Minimal end-to-end walkthrough of the governance cycle engine.
//!
//! Registers a small agent pool, submits a batch of tasks across several
//! cycles, and prints what the Governance Loop decided at each step:
//! assignment, trust movement, suppression, and — once enough cycles have
//! run — an adaptive threshold mutation.
//!
//! Run with:
//!
//! ```text
//! cargo run --example basic
//! ```
//!
//! (This file is kept under `demos/` rather than wired into a Cargo target —
//! copy it into a package's `examples/` directory to run it directly.)

use governor_core::config::GovernanceConfig;
use governor_core::engine::GovernanceLoop;
use governor_core::executor::{Executor, Outcome};
use governor_core::storage::InMemoryStateStore;
use governor_core::types::{Agent, Task};
use hashbrown::HashSet;

/// An executor whose success rate is fixed per agent, for a reproducible
/// demo run without any real task backend.
struct ScriptedExecutor {
    reliable_agents: HashSet<String>,
}

impl Executor for ScriptedExecutor {
    fn execute(&self, _task: &Task, agent_id: &str) -> Outcome {
        if self.reliable_agents.contains(agent_id) {
            Outcome::success(12)
        } else {
            Outcome::failure(12, Some(governor_core::types::ErrorKindTag::Executor))
        }
    }
}

fn tasks_for_cycle(cycle: u64) -> Vec<Task> {
    (0..3)
        .map(|i| Task {
            task_id: format!("cycle{cycle}-task{i}"),
            impact: 0.5 + 0.1 * i as f64,
            urgency: 0.4,
            risk: 0.1,
            required_capability: None,
            metadata: Vec::new(),
        })
        .collect()
}

fn main() {
    let config = GovernanceConfig::default();
    let mut engine = GovernanceLoop::new(config, InMemoryStateStore::new()).expect("valid config");

    engine.register_agent(Agent::new("reliable-1", HashSet::new(), 0.80)).unwrap();
    engine.register_agent(Agent::new("flaky-1", HashSet::new(), 0.72)).unwrap();

    let mut reliable_agents = HashSet::new();
    reliable_agents.insert("reliable-1".to_string());
    let executor = ScriptedExecutor { reliable_agents };

    for cycle in 0..12u64 {
        let tasks = tasks_for_cycle(cycle);
        let result = engine.run_cycle(tasks, &executor, cycle * 1_000).expect("cycle commits");

        println!(
            "cycle {}: status={:?} executions={} drift_events={} mutation={:?}",
            result.cycle_id,
            result.status,
            result.executions.len(),
            result.drift_events.len(),
            result.mutation.as_ref().map(|m| m.direction),
        );
    }

    println!(
        "final thresholds: trust={:.3} suppression={:.3}",
        engine.config().trust_threshold,
        engine.config().suppression_threshold
    );
}
