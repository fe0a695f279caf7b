// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Deterministic task prioritisation.
//!
//! The Prioritizer has one job: turn an unordered task batch into a single
//! total order that every process and every restart agrees on. It holds no
//! state and makes no decisions about agents.

use alloc::vec::Vec;

use crate::config::GovernanceConfig;
use crate::types::Task;

/// Sort `tasks` by descending weighted score, ties broken by ascending
/// `task_id`.
///
/// # Examples
///
/// ```rust
/// use governor_core::config::GovernanceConfig;
/// use governor_core::prioritizer::prioritize;
/// use governor_core::types::Task;
///
/// let tasks = alloc::vec![
///     Task { task_id: "b".into(), impact: 0.2, urgency: 0.2, risk: 0.0, required_capability: None, metadata: alloc::vec::Vec::new() },
///     Task { task_id: "a".into(), impact: 0.9, urgency: 0.9, risk: 0.0, required_capability: None, metadata: alloc::vec::Vec::new() },
/// ];
/// let ordered = prioritize(tasks, &GovernanceConfig::default());
/// assert_eq!(ordered[0].task_id, "a");
/// ```
pub fn prioritize(mut tasks: Vec<Task>, config: &GovernanceConfig) -> Vec<Task> {
    tasks.sort_by(|a, b| {
        let score_a = a.score(config.w_impact, config.w_urgency, config.w_risk);
        let score_b = b.score(config.w_impact, config.w_urgency, config.w_risk);
        score_b.total_cmp(&score_a).then_with(|| a.task_id.cmp(&b.task_id))
    });
    tasks
}
