// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! # governor-core
//!
//! Trust-weighted pre-execution governance for a pool of autonomous agents.
//!
//! Given a batch of tasks and a registry of agents, the [`engine::GovernanceLoop`]
//! decides which agent (if any) executes each task, learns from the outcome,
//! adapts its own thresholds over time, and detects agents whose trust is
//! drifting downward before they fail outright.
//!
//! This crate is `no_std`-compatible (requires `alloc`). Enable the `std`
//! feature (on by default) for `tracing`-based logging and `std::error::Error`
//! impls; enable `async` for [`async_engine::AsyncGovernanceLoop`]; enable
//! `config-loader` for TOML/env-var configuration loading.
//!
//! ## Architecture
//!
//! ```text
//! GovernanceLoop<S: StateStore>
//!   ├── AgentRegistry           — in-memory mirror of the store, snapshot-only reads
//!   ├── prioritizer::prioritize — deterministic task ordering
//!   ├── trust::assign_all       — trust-weighted, capability-filtered assignment
//!   ├── Executor / AsyncExecutor — the caller-supplied execution boundary
//!   ├── learning::compose       — asymmetric trust update
//!   ├── trust::DriftWindow      — rolling half-window mean-shift detection
//!   ├── trust::transition       — suppression / redemption / exclusion state machine
//!   ├── mutation::evaluate      — adaptive threshold tuning
//!   ├── reflection::reflect     — per-cycle constraint self-assessment
//!   └── StateStore::record_cycle — single atomic commit per cycle
//! ```
//!
//! ## Quick Start
//!
//! ```rust
//! use governor_core::config::GovernanceConfig;
//! use governor_core::engine::GovernanceLoop;
//! use governor_core::executor::{Executor, Outcome};
//! use governor_core::storage::InMemoryStateStore;
//! use governor_core::types::{Agent, Task};
//! use hashbrown::HashSet;
//!
//! struct Always(bool);
//! impl Executor for Always {
//!     fn execute(&self, _task: &Task, _agent_id: &str) -> Outcome {
//!         if self.0 { Outcome::success(10) } else { Outcome::failure(10, None) }
//!     }
//! }
//!
//! let mut engine = GovernanceLoop::new(GovernanceConfig::default(), InMemoryStateStore::new()).unwrap();
//! engine.register_agent(Agent::new("agent-001", HashSet::new(), 0.8)).unwrap();
//!
//! let tasks = alloc::vec![Task {
//!     task_id: "task-1".into(), impact: 0.9, urgency: 0.6, risk: 0.1,
//!     required_capability: None, metadata: alloc::vec::Vec::new(),
//! }];
//! let result = engine.run_cycle(tasks, &Always(true), 0).unwrap();
//! assert!(result.executions[0].success.unwrap());
//! ```

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;

pub mod config;
pub mod engine;
pub mod errors;
pub mod events;
pub mod executor;
pub mod learning;
pub mod mutation;
pub mod prioritizer;
pub mod reflection;
pub mod registry;
pub mod storage;
pub mod trust;
pub mod types;

// Async engine — only compiled when the "async" feature is enabled.
// Requires the "std" feature (Tokio cannot run in no_std environments).
#[cfg(feature = "async")]
pub mod async_engine;

// Config loader — TOML file and environment variable loading.
// Only compiled when the "config-loader" feature is enabled.
#[cfg(feature = "config-loader")]
pub mod config_loader;

// Re-export the most commonly used items at the crate root so consumers can
// write `use governor_core::GovernanceLoop;` instead of the fully qualified
// path.
pub use config::GovernanceConfig;
pub use engine::{CycleResult, GovernanceLoop};
pub use errors::{ConfigError, GovernanceError};
pub use events::{CircuitScope, EventBus, GovernanceEvent, Subscriber};
pub use executor::{Executor, Outcome};
pub use storage::{InMemoryStateStore, StateStore};
pub use types::{Agent, AgentStatus, CycleId, CycleStatus, Task};

// Re-export the async engine at the crate root for ergonomic imports.
#[cfg(feature = "async")]
pub use async_engine::AsyncGovernanceLoop;
#[cfg(feature = "async")]
pub use executor::AsyncExecutor;

// Re-export config loader functions at the crate root.
#[cfg(feature = "config-loader")]
pub use config_loader::{load_config_from_env, load_config_from_file};
