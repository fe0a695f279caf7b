// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 MuVeraAI Corporation

//! Event Boundary — typed, best-effort notifications published after a
//! successful cycle commit.
//!
//! A single handler trait with default no-op methods, shared via `Arc<dyn _>`
//! and fanned out to every subscriber, so observability stays a typed
//! boundary rather than ambient print/log side effects scattered through the
//! cycle steps.

use alloc::string::String;
use alloc::sync::Arc;
use alloc::vec::Vec;

use crate::types::{AgentStatus, CycleId, MutationDirection};

/// Which scope a circuit breaker tripped at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitScope {
    /// A single task found no eligible agent; the cycle continues.
    Task,
    /// Every task in the cycle found no eligible agent; the cycle is a
    /// no-op.
    Cycle,
}

/// Everything the core can tell an outside observer about a committed
/// cycle. Emitted strictly after `StateStore::record_cycle` succeeds —
/// subscriber delivery never affects committed state.
#[derive(Debug, Clone)]
pub enum GovernanceEvent {
    AgentRegistered { agent_id: String },
    TrustUpdated { agent_id: String, old: f64, new: f64, outcome: Option<bool> },
    StatusChanged { agent_id: String, old: AgentStatus, new: AgentStatus, reason: String },
    DriftDetected { agent_id: String, delta: f64 },
    ThresholdMutated { old_trust_threshold: f64, new_trust_threshold: f64, direction: MutationDirection },
    ReflectionRecorded { cycle_id: CycleId, constraint_score: u8 },
    CircuitBreakerTripped { cycle_id: CycleId, scope: CircuitScope },
}

/// Receives published [`GovernanceEvent`]s. All methods default to a no-op
/// so a subscriber only implements what it cares about.
pub trait Subscriber: Send + Sync {
    fn on_event(&self, event: &GovernanceEvent) {
        let _ = event;
    }
}

/// Fan-out dispatcher. Subscriber failures (including panics unwound by the
/// caller's own panic handling) never roll back committed state — delivery
/// is strictly best-effort.
#[derive(Default)]
pub struct EventBus {
    subscribers: Vec<Arc<dyn Subscriber>>,
}

impl EventBus {
    pub fn new() -> Self {
        Self { subscribers: Vec::new() }
    }

    pub fn register(&mut self, subscriber: Arc<dyn Subscriber>) {
        self.subscribers.push(subscriber);
    }

    pub fn publish(&self, event: &GovernanceEvent) {
        for subscriber in &self.subscribers {
            subscriber.on_event(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::sync::atomic::{AtomicUsize, Ordering};

    struct Counter(AtomicUsize);
    impl Subscriber for Counter {
        fn on_event(&self, _event: &GovernanceEvent) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn publish_reaches_every_registered_subscriber() {
        let mut bus = EventBus::new();
        let counter = Arc::new(Counter(AtomicUsize::new(0)));
        bus.register(counter.clone());
        bus.register(counter.clone());

        bus.publish(&GovernanceEvent::ReflectionRecorded { cycle_id: 1, constraint_score: 4 });

        assert_eq!(counter.0.load(Ordering::SeqCst), 2);
    }
}
