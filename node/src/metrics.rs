//! Prometheus metrics for the Agora node.
//!
//! [`GovernorMetrics`] owns a dedicated [`Registry`] that the RPC `/metrics`
//! endpoint encodes into the Prometheus text exposition format. Counters are
//! driven by [`GovernorEvent`]s, so they only move for committed changes.

use agora_governance::{EventBus, GovernorEvent};
use prometheus::{
    register_int_counter_with_registry, register_int_gauge_with_registry, IntCounter, IntGauge,
    Opts, Registry,
};
use std::sync::Arc;

/// Central collection of all governor-level Prometheus metrics.
pub struct GovernorMetrics {
    /// The Prometheus registry that owns every metric below.
    pub registry: Registry,

    // ── Counters ────────────────────────────────────────────────────────
    pub proposals_created: IntCounter,
    pub votes_cast: IntCounter,
    pub proposals_cancelled: IntCounter,
    /// Approved proposals that entered their timelock.
    pub proposals_queued: IntCounter,
    pub executions_succeeded: IntCounter,
    /// Outbound calls that failed; the proposal stayed queued.
    pub dispatch_failures: IntCounter,
    /// Executions that changed the system parameters.
    pub params_updates: IntCounter,
    pub persist_failures: IntCounter,

    // ── Gauges ──────────────────────────────────────────────────────────
    /// Number of proposals ever created.
    pub proposal_count: IntGauge,
}

impl GovernorMetrics {
    /// Create a fresh set of metrics, all registered under a new
    /// [`Registry`].
    pub fn new() -> Self {
        let registry = Registry::new();

        let counter = |name: &str, help: &str| {
            register_int_counter_with_registry!(Opts::new(name, help), registry)
                .expect("metric names are unique within the registry")
        };

        let proposals_created = counter(
            "agora_proposals_created_total",
            "Total proposals created",
        );
        let votes_cast = counter("agora_votes_cast_total", "Total votes cast");
        let proposals_cancelled = counter(
            "agora_proposals_cancelled_total",
            "Total proposals cancelled by proposer or guardian",
        );
        let proposals_queued = counter(
            "agora_proposals_queued_total",
            "Total approved proposals placed under timelock",
        );
        let executions_succeeded = counter(
            "agora_executions_succeeded_total",
            "Total proposals executed",
        );
        let dispatch_failures = counter(
            "agora_dispatch_failures_total",
            "Total failed proposal calls",
        );
        let params_updates = counter(
            "agora_params_updates_total",
            "Total system parameter updates applied by proposals",
        );
        let persist_failures = counter(
            "agora_persist_failures_total",
            "Total failed writes to the store",
        );

        let proposal_count = register_int_gauge_with_registry!(
            Opts::new("agora_proposal_count", "Current number of proposals"),
            registry
        )
        .expect("failed to register proposal_count gauge");

        Self {
            registry,
            proposals_created,
            votes_cast,
            proposals_cancelled,
            proposals_queued,
            executions_succeeded,
            dispatch_failures,
            params_updates,
            persist_failures,
            proposal_count,
        }
    }

    pub fn observe(&self, event: &GovernorEvent) {
        match event {
            GovernorEvent::ProposalCreated { .. } => {
                self.proposals_created.inc();
                self.proposal_count.inc();
            }
            GovernorEvent::VoteCast { .. } => self.votes_cast.inc(),
            GovernorEvent::ProposalCancelled { .. } => self.proposals_cancelled.inc(),
            GovernorEvent::ProposalQueued { .. } => self.proposals_queued.inc(),
            GovernorEvent::ProposalExecuted { params_updated, .. } => {
                self.executions_succeeded.inc();
                if *params_updated {
                    self.params_updates.inc();
                }
            }
            GovernorEvent::ExecutionFailed { .. } => self.dispatch_failures.inc(),
            GovernorEvent::PersistFailed { .. } => self.persist_failures.inc(),
            GovernorEvent::CheckpointsRefreshed { .. } => {}
        }
    }

    /// Route every event on `bus` into these metrics.
    pub fn subscribe(self: &Arc<Self>, bus: &mut EventBus) {
        let metrics = Arc::clone(self);
        bus.subscribe(Box::new(move |event| metrics.observe(event)));
    }
}

impl Default for GovernorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_types::Principal;

    #[test]
    fn events_drive_counters() {
        let metrics = Arc::new(GovernorMetrics::new());
        let mut bus = EventBus::new();
        metrics.subscribe(&mut bus);

        bus.emit(&GovernorEvent::ProposalCreated {
            id: 0,
            proposer: Principal::new([1; 32]),
        });
        bus.emit(&GovernorEvent::VoteCast {
            id: 0,
            voter: Principal::new([1; 32]),
            voting_power: 10,
        });
        bus.emit(&GovernorEvent::ProposalQueued { id: 0 });
        bus.emit(&GovernorEvent::ExecutionFailed {
            id: 0,
            reason: "down".into(),
        });
        bus.emit(&GovernorEvent::ProposalExecuted {
            id: 0,
            params_updated: true,
        });

        assert_eq!(metrics.proposals_created.get(), 1);
        assert_eq!(metrics.proposal_count.get(), 1);
        assert_eq!(metrics.votes_cast.get(), 1);
        assert_eq!(metrics.proposals_queued.get(), 1);
        assert_eq!(metrics.dispatch_failures.get(), 1);
        assert_eq!(metrics.executions_succeeded.get(), 1);
        assert_eq!(metrics.params_updates.get(), 1);
    }

    #[test]
    fn registry_gathers_all_families() {
        let metrics = GovernorMetrics::new();
        assert_eq!(metrics.registry.gather().len(), 9);
    }
}
