//! Events emitted by the governor after each committed state change.

use crate::status::ProposalStatus;
use agora_types::Principal;

/// Governor-level events that observers can subscribe to via the [`EventBus`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GovernorEvent {
    ProposalCreated {
        id: u64,
        proposer: Principal,
    },
    VoteCast {
        id: u64,
        voter: Principal,
        voting_power: u128,
    },
    ProposalCancelled {
        id: u64,
        by: Principal,
    },
    /// An approved proposal entered its timelock.
    ProposalQueued {
        id: u64,
    },
    ProposalExecuted {
        id: u64,
        params_updated: bool,
    },
    /// The outbound call failed; the proposal stays queued.
    ExecutionFailed {
        id: u64,
        reason: String,
    },
    CheckpointsRefreshed {
        principal: Principal,
    },
    /// Persisting a change failed; it will be retried on the next write.
    PersistFailed {
        reason: String,
    },
}

impl GovernorEvent {
    /// The proposal the event concerns, if any.
    pub fn proposal_id(&self) -> Option<u64> {
        match self {
            Self::ProposalCreated { id, .. }
            | Self::VoteCast { id, .. }
            | Self::ProposalCancelled { id, .. }
            | Self::ProposalQueued { id }
            | Self::ProposalExecuted { id, .. }
            | Self::ExecutionFailed { id, .. } => Some(*id),
            Self::CheckpointsRefreshed { .. } | Self::PersistFailed { .. } => None,
        }
    }
}

/// Event for a successful `execute`, depending on whether it queued or ran.
pub fn execute_event(id: u64, status: &ProposalStatus, params_updated: bool) -> GovernorEvent {
    match status {
        ProposalStatus::Executed => GovernorEvent::ProposalExecuted { id, params_updated },
        _ => GovernorEvent::ProposalQueued { id },
    }
}

type Listener = Box<dyn Fn(&GovernorEvent) + Send + Sync>;

/// Synchronous fan-out event bus.
///
/// Listeners run inline on the emitting task, after the governor has released
/// its state lock; keep handlers fast.
pub struct EventBus {
    listeners: Vec<Listener>,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            listeners: Vec::new(),
        }
    }

    pub fn subscribe(&mut self, listener: Listener) {
        self.listeners.push(listener);
    }

    pub fn emit(&self, event: &GovernorEvent) {
        for listener in &self.listeners {
            listener(event);
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{
        atomic::{AtomicUsize, Ordering},
        Arc,
    };

    #[test]
    fn emit_calls_all_listeners() {
        let counter = Arc::new(AtomicUsize::new(0));
        let mut bus = EventBus::new();

        let c1 = Arc::clone(&counter);
        bus.subscribe(Box::new(move |_| {
            c1.fetch_add(1, Ordering::SeqCst);
        }));
        let c2 = Arc::clone(&counter);
        bus.subscribe(Box::new(move |_| {
            c2.fetch_add(10, Ordering::SeqCst);
        }));

        bus.emit(&GovernorEvent::ProposalQueued { id: 1 });
        assert_eq!(counter.load(Ordering::SeqCst), 11);
    }

    #[test]
    fn emit_with_no_listeners_is_noop() {
        let bus = EventBus::new();
        bus.emit(&GovernorEvent::PersistFailed {
            reason: "disk full".into(),
        });
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn listener_sees_variant() {
        let votes = Arc::new(AtomicUsize::new(0));
        let mut bus = EventBus::new();
        let v = Arc::clone(&votes);
        bus.subscribe(Box::new(move |event| {
            if let GovernorEvent::VoteCast { voting_power, .. } = event {
                v.fetch_add(*voting_power as usize, Ordering::SeqCst);
            }
        }));

        bus.emit(&GovernorEvent::VoteCast {
            id: 0,
            voter: Principal::new([1; 32]),
            voting_power: 7,
        });
        bus.emit(&GovernorEvent::ProposalQueued { id: 0 });
        assert_eq!(votes.load(Ordering::SeqCst), 7);
    }

    #[test]
    fn execute_event_depends_on_status() {
        assert_eq!(
            execute_event(3, &ProposalStatus::Executed, true),
            GovernorEvent::ProposalExecuted {
                id: 3,
                params_updated: true
            }
        );
        assert_eq!(
            execute_event(
                3,
                &ProposalStatus::Queued {
                    executable_at: agora_types::Timestamp::from_nanos(9)
                },
                false
            ),
            GovernorEvent::ProposalQueued { id: 3 }
        );
        assert_eq!(GovernorEvent::ProposalQueued { id: 3 }.proposal_id(), Some(3));
    }
}
