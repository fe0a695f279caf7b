// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Shared data types for the governance cycle engine.
//!
//! All types implement [`Clone`], [`Debug`], [`serde::Serialize`], and
//! [`serde::Deserialize`] so they can be serialised to JSON and stored
//! without additional conversion steps.

use alloc::string::String;
use alloc::vec::Vec;
use hashbrown::HashSet;
use serde::{Deserialize, Serialize};

/// Identifier for one invocation of the Governance Loop.
pub type CycleId = u64;

// ---------------------------------------------------------------------------
// Task
// ---------------------------------------------------------------------------

/// A unit of work submitted to one cycle of the Governance Loop.
///
/// Tasks are ephemeral: they exist only for the duration of the cycle that
/// processes them. Only their derived [`ExecutionResult`] persists.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    /// Stable identifier, unique within the batch.
    pub task_id: String,
    /// Estimated business impact, `[0, 1]`.
    pub impact: f64,
    /// Time sensitivity, `[0, 1]`.
    pub urgency: f64,
    /// Estimated downside if executed poorly, `[0, 1]`.
    pub risk: f64,
    /// Opaque capability tag the assigned agent must carry, if any.
    pub required_capability: Option<String>,
    /// Opaque payload interpreted only by the executor.
    #[serde(default)]
    pub metadata: Vec<(String, String)>,
}

impl Task {
    /// Deterministic prioritisation score: `w_i*impact + w_u*urgency + w_r*risk`.
    pub fn score(&self, w_impact: f64, w_urgency: f64, w_risk: f64) -> f64 {
        w_impact * self.impact + w_urgency * self.urgency + w_risk * self.risk
    }
}

// ---------------------------------------------------------------------------
// Agent
// ---------------------------------------------------------------------------

/// Lifecycle status of a registered agent.
///
/// `Excluded` is terminal: no subsequent cycle may transition an agent out
/// of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AgentStatus {
    /// Eligible for assignment under the normal threshold rule.
    Active,
    /// Suppressed, currently serving a single-cycle redemption trial.
    Probation,
    /// Ineligible for assignment; awaiting promotion to `Probation`.
    Suppressed,
    /// Permanently ineligible for assignment.
    Excluded,
}

impl AgentStatus {
    /// `true` for the two statuses the Trust Engine may select from.
    pub fn is_assignable(self) -> bool {
        matches!(self, AgentStatus::Active | AgentStatus::Probation)
    }
}

/// A registered agent and its current governance state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    /// Stable identifier, unique across the registry.
    pub agent_id: String,
    /// Unordered set of opaque capability tags.
    pub capabilities: HashSet<String>,
    /// Current lifecycle status.
    pub status: AgentStatus,
    /// Current trust score, `[0, 1]`.
    pub trust: f64,
    /// Number of probation trials consumed since the most recent suppression.
    pub redemption_cycles_used: u32,
    /// Cycle at which the agent most recently entered `Suppressed`.
    pub suppression_entered_at_cycle: Option<CycleId>,
}

impl Agent {
    /// Register a brand-new agent in the `Active` status.
    pub fn new(agent_id: impl Into<String>, capabilities: HashSet<String>, initial_trust: f64) -> Self {
        Self {
            agent_id: agent_id.into(),
            capabilities,
            status: AgentStatus::Active,
            trust: initial_trust.clamp(0.0, 1.0),
            redemption_cycles_used: 0,
            suppression_entered_at_cycle: None,
        }
    }

    /// Whether this agent carries `capability`, or `capability` is `None`
    /// (meaning the task does not restrict by capability).
    pub fn satisfies(&self, capability: &Option<String>) -> bool {
        match capability {
            Some(required) => self.capabilities.contains(required),
            None => true,
        }
    }
}

// ---------------------------------------------------------------------------
// Trust records
// ---------------------------------------------------------------------------

/// The registry/store's canonical (agent_id, score) pair.
///
/// Invariant: the registry's score for an agent always equals the store's
/// latest score for that agent after a committed cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustScoreRecord {
    pub agent_id: String,
    pub score: f64,
    pub updated_at_cycle: CycleId,
}

/// One append-only entry in an agent's trust trajectory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrustHistoryEntry {
    pub agent_id: String,
    pub cycle_id: CycleId,
    pub old_score: f64,
    pub new_score: f64,
    pub outcome: Option<bool>,
    pub timestamp_ms: u64,
}

/// Per-agent suppression/redemption bookkeeping.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SuppressionState {
    pub agent_id: String,
    pub status: AgentStatus,
    pub cycle_entered: Option<CycleId>,
    pub redemption_attempts: u32,
    pub last_probation_outcome: Option<bool>,
}

// ---------------------------------------------------------------------------
// Execution / drift / mutation / reflection
// ---------------------------------------------------------------------------

/// The recorded outcome of one (task, agent) assignment, or of a task that
/// received no assignment (`agent_id = None`, `success = None`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub task_id: String,
    pub agent_id: Option<String>,
    pub cycle_id: CycleId,
    pub success: Option<bool>,
    pub latency_ms: u64,
    pub output_metadata: Vec<(String, String)>,
    pub error_kind: Option<ErrorKindTag>,
    pub timestamp_ms: u64,
}

/// Lightweight, serialisable tag mirroring [`crate::errors::GovernanceError`]
/// variants that can originate from an executor call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKindTag {
    Executor,
    Timeout,
}

/// Emitted when an agent's rolling trust mean drops by at least `drift_delta`
/// between the two halves of the drift window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriftEvent {
    pub agent_id: String,
    pub cycle_id: CycleId,
    pub delta: f64,
    pub window_mean_before: f64,
    pub window_mean_after: f64,
}

/// Direction a [`Mutation`] moved the governance thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MutationDirection {
    Tighten,
    Loosen,
    Hold,
}

/// An adaptive adjustment of the trust/suppression/drift thresholds.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Mutation {
    pub cycle_id: CycleId,
    pub old_trust_threshold: f64,
    pub new_trust_threshold: f64,
    pub old_suppression_threshold: f64,
    pub new_suppression_threshold: f64,
    pub old_drift_delta: f64,
    pub new_drift_delta: f64,
    pub observed_success_rate: f64,
    pub direction: MutationDirection,
    pub timestamp_ms: u64,
}

/// A cycle's self-assessment against the four governance constraints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Reflection {
    pub cycle_id: CycleId,
    pub constraint_score: u8,
    pub notes: Vec<String>,
    pub timestamp_ms: u64,
}

/// Overall status of a completed (or short-circuited) cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CycleStatus {
    /// The cycle ran to completion; learning and mutation applied.
    Completed,
    /// Every task in the cycle found no eligible agent; no learning, no
    /// mutation, no status transitions. The only whole-cycle no-op case.
    CircuitBreaker,
}

/// Aggregate statistics returned by `StateStore::stats`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Stats {
    pub executions: u64,
    pub successes: u64,
    pub failures: u64,
    pub active_agents: u64,
    pub suppressed_agents: u64,
    pub average_trust: f64,
}

/// Which append-only table a [`HistoryFilter`] reads from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HistoryEntity {
    TrustHistory,
    Executions,
    DriftEvents,
    Mutations,
    Reflections,
}

/// Filter + pagination for [`crate::storage::StateStore::history`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryFilter {
    pub agent_id: Option<String>,
    pub since_cycle: Option<CycleId>,
    pub until_cycle: Option<CycleId>,
    pub limit: Option<usize>,
}
