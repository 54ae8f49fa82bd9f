//! Proposal engine: the lifecycle state machine and its access rules.
//!
//! The engine is synchronous and deterministic. Callers supply `now` and any
//! ledger observations; the engine never reads a clock or the ledger itself.
//! The async [`crate::Governor`] wraps it with those collaborators.

use crate::checkpoint::{CheckpointStore, Subject};
use crate::dispatch::Effect;
use crate::error::{DispatchError, GovernanceError};
use crate::proposal::{Proposal, ProposalContent, ProposalPayload, ProposalView, Vote, VoteBook, VoteOption};
use crate::registry::{ParamsRegistry, VersionedParams};
use crate::status::{derive_status, ProposalStatus};
use agora_types::{Principal, SystemParams, SystemParamsUpdate, Timestamp};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::ops::Bound;
use tracing::{debug, info, warn};

/// Ledger values read at the start of a call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Observation {
    /// Caller's current balance.
    pub balance: u128,
    pub total_supply: u128,
}

/// Records touched since the last [`GovernanceEngine::take_changes`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ChangeSet {
    pub proposals: BTreeSet<u64>,
    pub subjects: BTreeSet<Subject>,
    pub params: bool,
    pub next_proposal_id: bool,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty() && self.subjects.is_empty() && !self.params && !self.next_proposal_id
    }

    pub fn merge(&mut self, other: ChangeSet) {
        self.proposals.extend(other.proposals);
        self.subjects.extend(other.subjects);
        self.params |= other.params;
        self.next_proposal_id |= other.next_proposal_id;
    }
}

/// What `execute` should do next.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ExecuteStep {
    /// The proposal was approved and has just been queued. No call is made.
    Queued(ProposalView),
    /// The timelock has passed; perform this call, then report back through
    /// [`GovernanceEngine::finish_execute`].
    Dispatch {
        proposal_id: u64,
        payload: ProposalPayload,
    },
}

pub struct GovernanceEngine {
    proposals: BTreeMap<u64, Proposal>,
    checkpoints: CheckpointStore,
    registry: ParamsRegistry,
    next_id: u64,
    /// Proposals whose outbound call is running.
    in_flight: HashSet<u64>,
    changes: ChangeSet,
}

impl GovernanceEngine {
    pub fn new(params: SystemParams) -> Self {
        Self {
            proposals: BTreeMap::new(),
            checkpoints: CheckpointStore::new(),
            registry: ParamsRegistry::new(params),
            next_id: 0,
            in_flight: HashSet::new(),
            changes: ChangeSet::default(),
        }
    }

    /// Rebuild from persisted records. The id counter is never allowed to fall
    /// behind an existing proposal.
    pub fn from_parts(
        proposals: Vec<Proposal>,
        checkpoints: CheckpointStore,
        registry: ParamsRegistry,
        next_id: u64,
    ) -> Self {
        let proposals: BTreeMap<u64, Proposal> = proposals.into_iter().map(|p| (p.id, p)).collect();
        let floor = proposals.keys().next_back().map_or(0, |id| id + 1);
        Self {
            proposals,
            checkpoints,
            registry,
            next_id: next_id.max(floor),
            in_flight: HashSet::new(),
            changes: ChangeSet::default(),
        }
    }

    // ── Mutations ────────────────────────────────────────────────────────

    /// Create a proposal on behalf of `caller`.
    pub fn propose(
        &mut self,
        caller: Principal,
        content: ProposalContent,
        payload: ProposalPayload,
        now: Timestamp,
        observed: Observation,
    ) -> Result<ProposalView, GovernanceError> {
        if caller.is_anonymous() {
            return Err(GovernanceError::AnonymousProposer);
        }
        let params = self.registry.params();
        if observed.balance < params.proposal_threshold {
            return Err(GovernanceError::BelowProposalThreshold { principal: caller });
        }
        let quorum_threshold = params.quorum_threshold;

        self.observe(caller, now, observed)?;

        let id = self.next_id;
        self.next_id += 1;
        let proposal = Proposal {
            id,
            proposer: caller,
            content,
            payload,
            created_at: now,
            quorum_threshold,
            votes: VoteBook::new(),
            timelocked_at: None,
            executed_at: None,
            cancelled_at: None,
        };
        self.proposals.insert(id, proposal);
        self.changes.proposals.insert(id);
        self.changes.next_proposal_id = true;

        info!(proposal_id = id, proposer = %caller, "proposal created");
        self.view(id, now)
    }

    /// Record `caller`'s vote. Power is the caller's checkpointed balance at
    /// the proposal's voting start, not the balance observed now.
    pub fn cast_vote(
        &mut self,
        caller: Principal,
        id: u64,
        option: VoteOption,
        now: Timestamp,
        observed: Observation,
    ) -> Result<ProposalView, GovernanceError> {
        self.check_vote(caller, id, now)?;
        let params = self.registry.params();
        let proposal = self
            .proposals
            .get(&id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;

        let voting_start = proposal.voting_start(params);
        // An observation taken exactly at voting start is that instant's value.
        let voting_power = if now == voting_start {
            observed.balance
        } else {
            self.checkpoints.past_votes(&caller, voting_start)
        };
        if voting_power == 0 {
            return Err(GovernanceError::NoVotingPower { principal: caller });
        }

        self.observe(caller, now, observed)?;

        if let Some(proposal) = self.proposals.get_mut(&id) {
            proposal.votes.insert(Vote {
                voter: caller,
                option,
                voting_power,
            });
        }
        self.changes.proposals.insert(id);

        info!(proposal_id = id, voter = %caller, ?option, %voting_power, "vote cast");
        self.view(id, now)
    }

    /// Checks a vote must pass before the voter's balance is worth reading:
    /// a known caller, an existing open proposal, no earlier vote.
    pub fn check_vote(&self, caller: Principal, id: u64, now: Timestamp) -> Result<(), GovernanceError> {
        if caller.is_anonymous() {
            return Err(GovernanceError::AnonymousVoter);
        }
        let proposal = self
            .proposals
            .get(&id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;
        if derive_status(proposal, now, self.registry.params()) != ProposalStatus::Open {
            return Err(GovernanceError::NotOpenForVoting);
        }
        if proposal.votes.has_voted(&caller) {
            return Err(GovernanceError::AlreadyVoted { principal: caller });
        }
        Ok(())
    }

    /// Cancel an open or queued proposal. Only its proposer or the guardian may.
    pub fn cancel(
        &mut self,
        caller: Principal,
        id: u64,
        now: Timestamp,
    ) -> Result<ProposalView, GovernanceError> {
        let params = self.registry.params();
        let proposal = self
            .proposals
            .get(&id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;
        if !derive_status(proposal, now, params).is_cancellable() {
            return Err(GovernanceError::NotCancellable);
        }
        if caller != proposal.proposer && !params.is_guardian(&caller) {
            return Err(GovernanceError::NotProposerOrGuardian {
                proposer: proposal.proposer,
            });
        }
        if self.in_flight.contains(&id) {
            return Err(GovernanceError::ExecutionInProgress);
        }

        if let Some(proposal) = self.proposals.get_mut(&id) {
            proposal.cancelled_at = Some(now);
        }
        self.changes.proposals.insert(id);

        info!(proposal_id = id, by = %caller, "proposal cancelled");
        self.view(id, now)
    }

    /// First half of `execute`: queue an approved proposal, or claim a due one
    /// for dispatch. A claimed proposal must be released with
    /// [`Self::finish_execute`].
    pub fn begin_execute(&mut self, id: u64, now: Timestamp) -> Result<ExecuteStep, GovernanceError> {
        let params = self.registry.params();
        let proposal = self
            .proposals
            .get(&id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;
        if self.in_flight.contains(&id) {
            return Err(GovernanceError::ExecutionInProgress);
        }

        match derive_status(proposal, now, params) {
            ProposalStatus::Approved => {
                if let Some(proposal) = self.proposals.get_mut(&id) {
                    proposal.timelocked_at = Some(now);
                }
                self.changes.proposals.insert(id);
                info!(proposal_id = id, "proposal queued");
                Ok(ExecuteStep::Queued(self.view(id, now)?))
            }
            ProposalStatus::Queued { executable_at } if now < executable_at => {
                Err(GovernanceError::TimelockNotPassed { executable_at })
            }
            ProposalStatus::Queued { .. } => {
                let payload = proposal.payload.clone();
                self.in_flight.insert(id);
                debug!(proposal_id = id, "execution claimed");
                Ok(ExecuteStep::Dispatch {
                    proposal_id: id,
                    payload,
                })
            }
            ProposalStatus::Pending | ProposalStatus::Open => Err(GovernanceError::NotApproved),
            ProposalStatus::Rejected { .. } => Err(GovernanceError::ProposalRejected),
            ProposalStatus::Executed => Err(GovernanceError::AlreadyExecuted),
        }
    }

    /// Second half of `execute`: commit a successful dispatch, or release the
    /// claim and leave the proposal queued for retry.
    pub fn finish_execute(
        &mut self,
        id: u64,
        now: Timestamp,
        outcome: Result<Effect, DispatchError>,
    ) -> Result<ProposalView, GovernanceError> {
        self.in_flight.remove(&id);
        if !self.proposals.contains_key(&id) {
            return Err(GovernanceError::ProposalNotFound(id));
        }

        let effect = match outcome {
            Ok(effect) => effect,
            Err(e) => {
                warn!(proposal_id = id, error = %e, "execution failed, proposal stays queued");
                return Err(e.into());
            }
        };

        if let Effect::ParamsUpdate { update, grant } = effect {
            self.registry.apply(&update, grant);
            self.changes.params = true;
        }
        if let Some(proposal) = self.proposals.get_mut(&id) {
            proposal.executed_at = Some(now);
        }
        self.changes.proposals.insert(id);

        info!(proposal_id = id, "proposal executed");
        self.view(id, now)
    }

    /// Drop the execution claim on `id` without touching the proposal, for
    /// a dispatch that ended without reporting an outcome.
    pub fn release_claim(&mut self, id: u64) -> bool {
        let released = self.in_flight.remove(&id);
        if released {
            warn!(proposal_id = id, "execution claim released, proposal stays queued");
        }
        released
    }

    /// Record the current balance of `principal` and the total supply.
    pub fn refresh(
        &mut self,
        principal: Principal,
        now: Timestamp,
        observed: Observation,
    ) -> Result<(), GovernanceError> {
        self.observe(principal, now, observed)?;
        debug!(%principal, "checkpoints refreshed");
        Ok(())
    }

    /// External entry point for parameter updates. Always refused: the only
    /// write path is an executed self-targeted proposal.
    pub fn update_system_params_direct(
        &self,
        _update: &SystemParamsUpdate,
    ) -> Result<(), GovernanceError> {
        Err(GovernanceError::DirectParamsUpdate)
    }

    // ── Queries ──────────────────────────────────────────────────────────

    pub fn get_proposal(&self, id: u64, now: Timestamp) -> Result<ProposalView, GovernanceError> {
        self.view(id, now)
    }

    /// Up to `limit` proposals with id greater than `after`, ascending.
    pub fn get_proposals(&self, after: Option<u64>, limit: usize, now: Timestamp) -> Vec<ProposalView> {
        let lower = after.map_or(Bound::Unbounded, Bound::Excluded);
        let params = self.registry.params();
        self.proposals
            .range((lower, Bound::Unbounded))
            .take(limit)
            .map(|(_, p)| ProposalView::new(p, derive_status(p, now, params)))
            .collect()
    }

    /// Queued proposals whose timelock has passed and that are not running.
    pub fn due_for_execution(&self, now: Timestamp) -> Vec<u64> {
        let params = self.registry.params();
        self.proposals
            .values()
            .filter(|p| !self.in_flight.contains(&p.id))
            .filter(|p| {
                matches!(
                    derive_status(p, now, params),
                    ProposalStatus::Queued { executable_at } if now >= executable_at
                )
            })
            .map(|p| p.id)
            .collect()
    }

    pub fn past_votes(&self, principal: &Principal, timepoint: Timestamp) -> u128 {
        self.checkpoints.past_votes(principal, timepoint)
    }

    pub fn past_total_supply(&self, timepoint: Timestamp) -> u128 {
        self.checkpoints.past_total_supply(timepoint)
    }

    pub fn params(&self) -> &SystemParams {
        self.registry.params()
    }

    pub fn versioned_params(&self) -> &VersionedParams {
        self.registry.versioned()
    }

    pub fn proposal(&self, id: u64) -> Option<&Proposal> {
        self.proposals.get(&id)
    }

    pub fn proposal_count(&self) -> usize {
        self.proposals.len()
    }

    pub fn next_proposal_id(&self) -> u64 {
        self.next_id
    }

    pub fn checkpoints(&self) -> &CheckpointStore {
        &self.checkpoints
    }

    pub fn is_in_flight(&self, id: u64) -> bool {
        self.in_flight.contains(&id)
    }

    // ── Change tracking ──────────────────────────────────────────────────

    /// Drain the set of records touched since the previous call.
    pub fn take_changes(&mut self) -> ChangeSet {
        std::mem::take(&mut self.changes)
    }

    /// Put back changes that could not be persisted, so the next flush
    /// retries them.
    pub fn restore_changes(&mut self, changes: ChangeSet) {
        self.changes.merge(changes);
    }

    // ── Internals ────────────────────────────────────────────────────────

    fn observe(
        &mut self,
        principal: Principal,
        now: Timestamp,
        observed: Observation,
    ) -> Result<(), GovernanceError> {
        let balance = Subject::Balance(principal);
        self.checkpoints.record_all(
            now,
            &[
                (balance, observed.balance),
                (Subject::TotalSupply, observed.total_supply),
            ],
        )?;
        self.changes.subjects.insert(balance);
        self.changes.subjects.insert(Subject::TotalSupply);
        Ok(())
    }

    fn view(&self, id: u64, now: Timestamp) -> Result<ProposalView, GovernanceError> {
        let proposal = self
            .proposals
            .get(&id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;
        Ok(ProposalView::new(
            proposal,
            derive_status(proposal, now, self.registry.params()),
        ))
    }
}

impl Default for GovernanceEngine {
    fn default() -> Self {
        Self::new(SystemParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::{encode_params_update, ExecutionGrant};
    use crate::status::RejectionReason;

    const DELAY: u64 = 10;
    const PERIOD: u64 = 20;
    const TIMELOCK: u64 = 5;

    fn params() -> SystemParams {
        SystemParams {
            voting_delay_ns: DELAY,
            voting_period_ns: PERIOD,
            timelock_delay_ns: TIMELOCK,
            proposal_threshold: 1,
            quorum_threshold: 1,
            guardian: Some(guardian()),
            metadata: None,
        }
    }

    fn alice() -> Principal {
        Principal::new([1; 32])
    }

    fn bob() -> Principal {
        Principal::new([2; 32])
    }

    fn guardian() -> Principal {
        Principal::new([9; 32])
    }

    fn at(n: u64) -> Timestamp {
        Timestamp::from_nanos(n)
    }

    fn obs(balance: u128) -> Observation {
        Observation {
            balance,
            total_supply: 100_000_000,
        }
    }

    fn content() -> ProposalContent {
        ProposalContent {
            title: "Say hello".into(),
            description: Some("calls greet on the test service".into()),
        }
    }

    fn payload() -> ProposalPayload {
        ProposalPayload {
            target: Principal::new([7; 32]),
            method: "greet".into(),
            args: vec![],
        }
    }

    /// Alice proposes at t=0 holding the whole supply.
    fn engine_with_proposal() -> GovernanceEngine {
        let mut engine = GovernanceEngine::new(params());
        engine
            .propose(alice(), content(), payload(), at(0), obs(100_000_000))
            .unwrap();
        engine
    }

    fn approved_engine() -> GovernanceEngine {
        let mut engine = engine_with_proposal();
        engine
            .cast_vote(alice(), 0, VoteOption::For, at(DELAY), obs(100_000_000))
            .unwrap();
        engine
    }

    fn ok_effect() -> Result<Effect, DispatchError> {
        Ok(Effect::External { reply: vec![] })
    }

    #[test]
    fn propose_assigns_sequential_ids_and_snapshots_quorum() {
        let mut engine = engine_with_proposal();
        let second = engine
            .propose(alice(), content(), payload(), at(1), obs(100_000_000))
            .unwrap();
        assert_eq!(second.id, 1);
        assert_eq!(second.status, ProposalStatus::Pending);
        assert_eq!(second.quorum_threshold, 1);
        assert_eq!(engine.next_proposal_id(), 2);
    }

    #[test]
    fn anonymous_cannot_propose() {
        let mut engine = GovernanceEngine::new(params());
        let err = engine
            .propose(Principal::ANONYMOUS, content(), payload(), at(0), obs(10))
            .unwrap_err();
        assert!(matches!(err, GovernanceError::AnonymousProposer));
        assert_eq!(engine.proposal_count(), 0);
    }

    #[test]
    fn proposer_below_threshold_is_rejected_without_side_effects() {
        let mut engine = GovernanceEngine::new(params());
        let err = engine
            .propose(bob(), content(), payload(), at(0), obs(0))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("Voting power of principal \"{}\" is below proposal threshold.", bob())
        );
        assert!(engine.checkpoints().history(&Subject::Balance(bob())).is_none());
        assert!(engine.take_changes().is_empty());
    }

    #[test]
    fn propose_records_proposer_and_supply_checkpoints() {
        let engine = engine_with_proposal();
        assert_eq!(engine.past_votes(&alice(), at(0)), 100_000_000);
        assert_eq!(engine.past_total_supply(at(0)), 100_000_000);
    }

    #[test]
    fn vote_before_open_is_rejected() {
        let mut engine = engine_with_proposal();
        let err = engine
            .cast_vote(alice(), 0, VoteOption::For, at(DELAY - 1), obs(1))
            .unwrap_err();
        assert!(matches!(err, GovernanceError::NotOpenForVoting));
    }

    #[test]
    fn voter_without_power_is_rejected() {
        let mut engine = engine_with_proposal();
        let err = engine
            .cast_vote(bob(), 0, VoteOption::For, at(DELAY + 1), obs(0))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("Principal \"{}\" doesn't have any voting power.", bob())
        );
    }

    #[test]
    fn vote_power_is_fixed_at_voting_start() {
        let mut engine = engine_with_proposal();
        // Bob acquires tokens after voting opened: no power on this proposal.
        let err = engine
            .cast_vote(bob(), 0, VoteOption::For, at(DELAY + 2), obs(5_000))
            .unwrap_err();
        assert!(matches!(err, GovernanceError::NoVotingPower { .. }));

        // Alice's balance dropped since, but her power is still the snapshot.
        let view = engine
            .cast_vote(alice(), 0, VoteOption::For, at(DELAY + 3), obs(1))
            .unwrap();
        assert_eq!(view.votes[0].voting_power, 100_000_000);
        assert_eq!(view.for_votes, 100_000_000);
    }

    #[test]
    fn vote_exactly_at_voting_start_uses_observed_balance() {
        let mut engine = engine_with_proposal();
        let view = engine
            .cast_vote(bob(), 0, VoteOption::Against, at(DELAY), obs(42))
            .unwrap();
        assert_eq!(view.against_votes, 42);
    }

    #[test]
    fn refresh_before_voting_start_grants_power() {
        let mut engine = engine_with_proposal();
        engine.refresh(bob(), at(3), obs(700)).unwrap();
        let view = engine
            .cast_vote(bob(), 0, VoteOption::Against, at(DELAY + 1), obs(0))
            .unwrap();
        assert_eq!(view.against_votes, 700);
    }

    #[test]
    fn second_vote_is_rejected() {
        let mut engine = approved_engine();
        let err = engine
            .cast_vote(alice(), 0, VoteOption::Against, at(DELAY + 1), obs(1))
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            format!("Principal \"{}\" already voted.", alice())
        );
        assert_eq!(engine.proposal(0).unwrap().votes.len(), 1);
    }

    #[test]
    fn vote_checks_run_without_an_observation() {
        let engine = approved_engine();
        assert!(matches!(
            engine.check_vote(bob(), 9, at(DELAY + 1)),
            Err(GovernanceError::ProposalNotFound(9))
        ));
        assert!(matches!(
            engine.check_vote(bob(), 0, at(DELAY + PERIOD)),
            Err(GovernanceError::NotOpenForVoting)
        ));
        assert!(matches!(
            engine.check_vote(alice(), 0, at(DELAY + 1)),
            Err(GovernanceError::AlreadyVoted { .. })
        ));
        assert!(engine.check_vote(bob(), 0, at(DELAY + 1)).is_ok());
    }

    #[test]
    fn released_claim_allows_another_attempt() {
        let mut engine = approved_engine();
        let end = DELAY + PERIOD;
        engine.begin_execute(0, at(end)).unwrap();
        engine.begin_execute(0, at(end + TIMELOCK)).unwrap();
        assert!(engine.is_in_flight(0));

        assert!(engine.release_claim(0));
        assert!(!engine.release_claim(0));
        assert!(matches!(
            engine.get_proposal(0, at(end + TIMELOCK)).unwrap().status,
            ProposalStatus::Queued { .. }
        ));
        assert!(matches!(
            engine.begin_execute(0, at(end + TIMELOCK)).unwrap(),
            ExecuteStep::Dispatch { .. }
        ));
    }

    #[test]
    fn unknown_proposal_is_not_found() {
        let mut engine = GovernanceEngine::new(params());
        let err = engine.begin_execute(3, at(0)).unwrap_err();
        assert_eq!(err.to_string(), "Proposal with ID \"3\" doesn't exist.");
    }

    #[test]
    fn execute_queues_then_waits_for_timelock_then_dispatches() {
        let mut engine = approved_engine();
        let end = DELAY + PERIOD;

        let step = engine.begin_execute(0, at(end)).unwrap();
        let ExecuteStep::Queued(view) = step else {
            panic!("approved proposal must be queued first");
        };
        assert_eq!(
            view.status,
            ProposalStatus::Queued {
                executable_at: at(end + TIMELOCK)
            }
        );

        let err = engine.begin_execute(0, at(end + 1)).unwrap_err();
        assert_eq!(err.to_string(), "Proposal hasn't surpassed time lock.");

        let step = engine.begin_execute(0, at(end + TIMELOCK)).unwrap();
        assert!(matches!(step, ExecuteStep::Dispatch { proposal_id: 0, .. }));
        let view = engine.finish_execute(0, at(end + TIMELOCK), ok_effect()).unwrap();
        assert_eq!(view.status, ProposalStatus::Executed);
        assert_eq!(view.executed_at, Some(at(end + TIMELOCK)));

        let err = engine.begin_execute(0, at(end + 100)).unwrap_err();
        assert_eq!(err.to_string(), "Proposal has been already executed.");
    }

    #[test]
    fn failed_dispatch_leaves_proposal_queued() {
        let mut engine = approved_engine();
        let end = DELAY + PERIOD;
        engine.begin_execute(0, at(end)).unwrap();
        engine.begin_execute(0, at(end + TIMELOCK)).unwrap();
        let err = engine
            .finish_execute(
                0,
                at(end + TIMELOCK),
                Err(DispatchError::Unreachable("connection refused".into())),
            )
            .unwrap_err();
        assert!(matches!(err, GovernanceError::Dispatch(_)));
        assert!(!engine.is_in_flight(0));
        assert!(matches!(
            engine.get_proposal(0, at(end + TIMELOCK)).unwrap().status,
            ProposalStatus::Queued { .. }
        ));
        // Retry is allowed.
        assert!(matches!(
            engine.begin_execute(0, at(end + TIMELOCK + 1)).unwrap(),
            ExecuteStep::Dispatch { .. }
        ));
    }

    #[test]
    fn in_flight_proposal_cannot_be_claimed_or_cancelled_twice() {
        let mut engine = approved_engine();
        let end = DELAY + PERIOD;
        engine.begin_execute(0, at(end)).unwrap();
        engine.begin_execute(0, at(end + TIMELOCK)).unwrap();
        assert!(matches!(
            engine.begin_execute(0, at(end + TIMELOCK)).unwrap_err(),
            GovernanceError::ExecutionInProgress
        ));
        assert!(matches!(
            engine.cancel(alice(), 0, at(end + TIMELOCK)).unwrap_err(),
            GovernanceError::ExecutionInProgress
        ));
        assert!(engine.due_for_execution(at(end + TIMELOCK)).is_empty());
    }

    #[test]
    fn execute_status_errors() {
        let mut engine = engine_with_proposal();
        assert!(matches!(
            engine.begin_execute(0, at(1)).unwrap_err(),
            GovernanceError::NotApproved
        ));
        assert!(matches!(
            engine.begin_execute(0, at(DELAY)).unwrap_err(),
            GovernanceError::NotApproved
        ));
        // Nobody voted: quorum not met.
        assert!(matches!(
            engine.begin_execute(0, at(DELAY + PERIOD)).unwrap_err(),
            GovernanceError::ProposalRejected
        ));
    }

    #[test]
    fn only_proposer_or_guardian_can_cancel() {
        let mut engine = engine_with_proposal();
        let err = engine.cancel(bob(), 0, at(DELAY)).unwrap_err();
        assert_eq!(
            err.to_string(),
            format!(
                "Only the guardian or principal \"{}\" can cancel the proposal.",
                alice()
            )
        );
        let view = engine.cancel(alice(), 0, at(DELAY + 1)).unwrap();
        assert_eq!(
            view.status,
            ProposalStatus::Rejected {
                reason: RejectionReason::Cancelled
            }
        );
    }

    #[test]
    fn guardian_can_cancel_queued_proposal() {
        let mut engine = approved_engine();
        let end = DELAY + PERIOD;
        engine.begin_execute(0, at(end)).unwrap();
        let view = engine.cancel(guardian(), 0, at(end + 1)).unwrap();
        assert_eq!(view.cancelled_at, Some(at(end + 1)));
        assert!(engine.due_for_execution(at(end + TIMELOCK)).is_empty());
    }

    #[test]
    fn cancel_on_pending_or_terminal_is_rejected() {
        let mut engine = engine_with_proposal();
        assert!(matches!(
            engine.cancel(alice(), 0, at(1)).unwrap_err(),
            GovernanceError::NotCancellable
        ));
        engine.cancel(alice(), 0, at(DELAY)).unwrap();
        let before = engine.proposal(0).unwrap().clone();
        assert!(matches!(
            engine.cancel(alice(), 0, at(DELAY + 1)).unwrap_err(),
            GovernanceError::NotCancellable
        ));
        assert_eq!(engine.proposal(0).unwrap(), &before);
    }

    #[test]
    fn direct_params_update_is_always_refused() {
        let engine = GovernanceEngine::new(params());
        let err = engine
            .update_system_params_direct(&SystemParamsUpdate::default())
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "This function is only callable via proposal execution."
        );
    }

    #[test]
    fn executed_params_update_goes_through_registry() {
        let mut engine = approved_engine();
        let end = DELAY + PERIOD;
        engine.begin_execute(0, at(end)).unwrap();
        engine.begin_execute(0, at(end + TIMELOCK)).unwrap();
        let update = SystemParamsUpdate {
            quorum_threshold: Some(50),
            ..Default::default()
        };
        assert!(!encode_params_update(&update).unwrap().is_empty());
        engine
            .finish_execute(
                0,
                at(end + TIMELOCK),
                Ok(Effect::ParamsUpdate {
                    update,
                    grant: ExecutionGrant::for_proposal(0),
                }),
            )
            .unwrap();
        assert_eq!(engine.params().quorum_threshold, 50);
        assert_eq!(engine.versioned_params().version, 1);
        assert!(engine.take_changes().params);
    }

    #[test]
    fn paging_walks_ids_in_order() {
        let mut engine = GovernanceEngine::new(params());
        for t in 0..5 {
            engine
                .propose(alice(), content(), payload(), at(t), obs(10))
                .unwrap();
        }
        let first: Vec<_> = engine.get_proposals(None, 2, at(5)).iter().map(|p| p.id).collect();
        assert_eq!(first, vec![0, 1]);
        let next: Vec<_> = engine.get_proposals(Some(1), 10, at(5)).iter().map(|p| p.id).collect();
        assert_eq!(next, vec![2, 3, 4]);
        assert!(engine.get_proposals(Some(4), 10, at(5)).is_empty());
    }

    #[test]
    fn change_tracking_covers_touched_records() {
        let mut engine = engine_with_proposal();
        let changes = engine.take_changes();
        assert!(changes.proposals.contains(&0));
        assert!(changes.next_proposal_id);
        assert!(changes.subjects.contains(&Subject::Balance(alice())));
        assert!(changes.subjects.contains(&Subject::TotalSupply));
        assert!(engine.take_changes().is_empty());

        engine.restore_changes(changes.clone());
        assert_eq!(engine.take_changes(), changes);
    }

    #[test]
    fn restored_engine_continues_id_sequence() {
        let engine = engine_with_proposal();
        let proposals = vec![engine.proposal(0).unwrap().clone()];
        let restored = GovernanceEngine::from_parts(
            proposals,
            engine.checkpoints().clone(),
            ParamsRegistry::new(params()),
            0,
        );
        assert_eq!(restored.next_proposal_id(), 1);
        assert_eq!(restored.past_votes(&alice(), at(0)), 100_000_000);
    }
}
