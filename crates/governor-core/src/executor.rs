// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Executor Boundary — the abstract contract for actually running a task.
//!
//! The core never runs a task itself; everything past "this agent is
//! assigned to this task" is delegated through [`Executor`] (or
//! [`AsyncExecutor`], behind the `async` feature) — a narrow trait the engine
//! is generic over, never a trait object, so monomorphisation keeps dispatch
//! static.

use alloc::vec::Vec;

use crate::types::{ErrorKindTag, Task};

/// The result of one (task, agent) execution attempt.
#[derive(Debug, Clone)]
pub struct Outcome {
    pub success: bool,
    pub latency_ms: u64,
    pub output: Vec<(alloc::string::String, alloc::string::String)>,
    pub error_kind: Option<ErrorKindTag>,
}

impl Outcome {
    pub fn success(latency_ms: u64) -> Self {
        Self { success: true, latency_ms, output: Vec::new(), error_kind: None }
    }

    pub fn failure(latency_ms: u64, error_kind: Option<ErrorKindTag>) -> Self {
        Self { success: false, latency_ms, output: Vec::new(), error_kind }
    }
}

/// Synchronous executor contract. Implementations must be
/// side-effect-idempotent with respect to retries at the governance layer —
/// the core never retries a task within a cycle.
pub trait Executor {
    /// Run `task` on `agent_id` and report what happened. Implementations
    /// should prefer reporting ordinary execution failures as
    /// `Outcome { success: false, .. }`, but the engine does not trust that
    /// convention: a panic unwinding out of `execute` is caught at the
    /// Executor Boundary (see [`execute_guarded`]) and folded into an
    /// `Outcome` carrying `ErrorKindTag::Executor`, the same as any other
    /// per-task fault, rather than aborting the cycle.
    fn execute(&self, task: &Task, agent_id: &str) -> Outcome;
}

/// Run `executor.execute(task, agent_id)` behind the Executor Boundary's
/// panic and timeout guards.
///
/// A panic unwinding out of `execute` is caught and reported as
/// `Outcome::failure(_, Some(ErrorKindTag::Executor))` instead of
/// propagating — one misbehaving executor must not abort the cycle for
/// every other task. If `timeout_ms` is `Some` and the call's wall-clock
/// elapsed time exceeds it, the outcome is reclassified as a timeout
/// failure with `ErrorKindTag::Timeout` regardless of what the executor
/// itself reported.
///
/// This is detection, not preemption: a synchronous `execute` that never
/// returns still blocks the caller. Callers needing a task to actually be
/// cancelled at the deadline should run under the `async` feature's
/// [`crate::async_engine::AsyncGovernanceLoop`], which wraps each dispatch in
/// `tokio::time::timeout` and can abort the future at the boundary.
#[cfg(feature = "std")]
pub fn execute_guarded<E: Executor>(
    executor: &E,
    task: &Task,
    agent_id: &str,
    timeout_ms: Option<u64>,
) -> Outcome {
    let start = std::time::Instant::now();
    let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
        executor.execute(task, agent_id)
    }));
    let elapsed_ms = u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX);

    let mut outcome = match result {
        Ok(outcome) => outcome,
        Err(_) => Outcome::failure(elapsed_ms, Some(ErrorKindTag::Executor)),
    };

    if let Some(timeout_ms) = timeout_ms {
        if elapsed_ms > timeout_ms {
            outcome = Outcome::failure(elapsed_ms, Some(ErrorKindTag::Timeout));
        }
    }

    outcome
}

/// Async executor contract, enabled by the `async` feature. The Governance
/// Loop is generic over this trait (never a `dyn` object), so it dispatches
/// through concrete async methods rather than a boxed trait.
#[cfg(feature = "async")]
pub trait AsyncExecutor: Send + Sync {
    /// Run `task` on `agent_id` and report what happened.
    fn execute(&self, task: &Task, agent_id: &str) -> impl core::future::Future<Output = Outcome> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct AlwaysSucceeds;
    impl Executor for AlwaysSucceeds {
        fn execute(&self, _task: &Task, _agent_id: &str) -> Outcome {
            Outcome::success(5)
        }
    }

    #[test]
    fn executor_trait_is_object_usable_in_generic_context() {
        let executor = AlwaysSucceeds;
        let task = Task {
            task_id: "t".into(),
            impact: 0.0,
            urgency: 0.0,
            risk: 0.0,
            required_capability: None,
            metadata: Vec::new(),
        };
        let outcome = executor.execute(&task, "agent");
        assert!(outcome.success);
    }

    fn sample_task() -> Task {
        Task {
            task_id: "t".into(),
            impact: 0.0,
            urgency: 0.0,
            risk: 0.0,
            required_capability: None,
            metadata: Vec::new(),
        }
    }

    #[cfg(feature = "std")]
    struct AlwaysPanics;
    #[cfg(feature = "std")]
    impl Executor for AlwaysPanics {
        fn execute(&self, _task: &Task, _agent_id: &str) -> Outcome {
            panic!("executor exploded")
        }
    }

    #[cfg(feature = "std")]
    struct Sleeps(u64);
    #[cfg(feature = "std")]
    impl Executor for Sleeps {
        fn execute(&self, _task: &Task, _agent_id: &str) -> Outcome {
            std::thread::sleep(std::time::Duration::from_millis(self.0));
            Outcome::success(self.0)
        }
    }

    #[cfg(feature = "std")]
    #[test]
    fn guarded_panic_becomes_executor_failure() {
        let task = sample_task();
        let outcome = execute_guarded(&AlwaysPanics, &task, "agent", None);
        assert!(!outcome.success);
        assert!(matches!(outcome.error_kind, Some(ErrorKindTag::Executor)));
    }

    #[cfg(feature = "std")]
    #[test]
    fn guarded_reclassifies_slow_call_as_timeout() {
        let task = sample_task();
        let outcome = execute_guarded(&Sleeps(30), &task, "agent", Some(5));
        assert!(!outcome.success);
        assert!(matches!(outcome.error_kind, Some(ErrorKindTag::Timeout)));
    }

    #[cfg(feature = "std")]
    #[test]
    fn guarded_success_within_timeout_is_untouched() {
        let task = sample_task();
        let outcome = execute_guarded(&AlwaysSucceeds, &task, "agent", Some(1_000));
        assert!(outcome.success);
        assert!(outcome.error_kind.is_none());
    }
}
