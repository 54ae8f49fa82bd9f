//! The governor service: the engine plus its collaborators.
//!
//! Ledger reads happen before the state write lock is taken, so queries are
//! never held up by a ledger round-trip. The clock is read only once the
//! write lock is held: calls are applied one at a time in lock order and
//! every checkpoint is recorded at a time no earlier than the previous one.
//! The outbound call of `execute` also runs outside the lock.

use crate::clock::Clock;
use crate::dispatch::{Effect, ExecutionDispatcher};
use crate::engine::{ExecuteStep, GovernanceEngine, Observation};
use crate::error::GovernanceError;
use crate::event::{execute_event, EventBus, GovernorEvent};
use crate::ledger::TokenLedger;
use crate::persist;
use crate::proposal::{ProposalContent, ProposalPayload, ProposalView, VoteOption};
use crate::registry::VersionedParams;
use agora_store::GovernanceStore;
use agora_types::{Principal, SystemParams, SystemParamsUpdate, Timestamp};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

/// Page size of `get_proposals` when the caller gives none.
pub const DEFAULT_PAGE_SIZE: usize = 100;

/// Largest page `get_proposals` will return.
pub const MAX_PAGE_SIZE: usize = 1000;

pub type SharedStore = Arc<dyn GovernanceStore + Send + Sync>;

/// State shared with execution tasks.
struct Shared {
    engine: RwLock<GovernanceEngine>,
    store: Option<SharedStore>,
    events: EventBus,
}

impl Shared {
    /// Write back everything the engine changed since the last flush.
    ///
    /// On failure the changes are kept so the next flush retries them.
    fn flush(&self, engine: &mut GovernanceEngine) -> Result<(), GovernanceError> {
        let Some(store) = &self.store else {
            engine.take_changes();
            return Ok(());
        };
        let changes = engine.take_changes();
        if changes.is_empty() {
            return Ok(());
        }
        let result = persist::build_batch(engine, &changes)
            .and_then(|batch| store.commit(batch).map_err(GovernanceError::from));
        if let Err(e) = result {
            error!(error = %e, "failed to persist governance state");
            engine.restore_changes(changes);
            self.events.emit(&GovernorEvent::PersistFailed {
                reason: e.to_string(),
            });
            return Err(e);
        }
        Ok(())
    }
}

/// Builder-style assembly of a [`Governor`].
pub struct GovernorBuilder {
    engine: GovernanceEngine,
    ledger: Arc<dyn TokenLedger>,
    dispatcher: ExecutionDispatcher,
    clock: Arc<dyn Clock>,
    store: Option<SharedStore>,
    events: EventBus,
}

impl GovernorBuilder {
    pub fn store(mut self, store: SharedStore) -> Self {
        self.store = Some(store);
        self
    }

    pub fn events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn build(self) -> Governor {
        Governor {
            shared: Arc::new(Shared {
                engine: RwLock::new(self.engine),
                store: self.store,
                events: self.events,
            }),
            ledger: self.ledger,
            dispatcher: self.dispatcher,
            clock: self.clock,
        }
    }
}

pub struct Governor {
    shared: Arc<Shared>,
    ledger: Arc<dyn TokenLedger>,
    dispatcher: ExecutionDispatcher,
    clock: Arc<dyn Clock>,
}

impl Governor {
    pub fn builder(
        engine: GovernanceEngine,
        ledger: Arc<dyn TokenLedger>,
        dispatcher: ExecutionDispatcher,
        clock: Arc<dyn Clock>,
    ) -> GovernorBuilder {
        GovernorBuilder {
            engine,
            ledger,
            dispatcher,
            clock,
            store: None,
            events: EventBus::new(),
        }
    }

    /// Load state from `store` and keep writing back to it.
    pub fn restore(
        store: SharedStore,
        initial_params: SystemParams,
        ledger: Arc<dyn TokenLedger>,
        dispatcher: ExecutionDispatcher,
        clock: Arc<dyn Clock>,
        events: EventBus,
    ) -> Result<Self, GovernanceError> {
        let engine = persist::load_engine(store.as_ref(), initial_params)?;
        Ok(Self::builder(engine, ledger, dispatcher, clock)
            .store(store)
            .events(events)
            .build())
    }

    pub fn governor_id(&self) -> &Principal {
        self.dispatcher.governor_id()
    }

    // ── Mutations ────────────────────────────────────────────────────────

    pub async fn propose(
        &self,
        caller: Principal,
        content: ProposalContent,
        payload: ProposalPayload,
    ) -> Result<ProposalView, GovernanceError> {
        if caller.is_anonymous() {
            return Err(GovernanceError::AnonymousProposer);
        }
        let observed = self.observe(&caller).await?;
        let mut engine = self.shared.engine.write().await;
        let now = self.clock.now();
        let view = engine.propose(caller, content, payload, now, observed)?;
        self.shared.flush(&mut engine)?;
        drop(engine);

        self.shared.events.emit(&GovernorEvent::ProposalCreated {
            id: view.id,
            proposer: caller,
        });
        Ok(view)
    }

    pub async fn cast_vote(
        &self,
        caller: Principal,
        id: u64,
        option: VoteOption,
    ) -> Result<ProposalView, GovernanceError> {
        {
            let engine = self.shared.engine.read().await;
            engine.check_vote(caller, id, self.clock.now())?;
        }
        let observed = self.observe(&caller).await?;
        // Checked again under the write lock: another call may have landed
        // while the ledger was being read.
        let mut engine = self.shared.engine.write().await;
        let now = self.clock.now();
        let view = engine.cast_vote(caller, id, option, now, observed)?;
        self.shared.flush(&mut engine)?;
        drop(engine);

        let voting_power = view
            .votes
            .iter()
            .find(|v| v.voter == caller)
            .map_or(0, |v| v.voting_power);
        self.shared.events.emit(&GovernorEvent::VoteCast {
            id,
            voter: caller,
            voting_power,
        });
        Ok(view)
    }

    pub async fn cancel(&self, caller: Principal, id: u64) -> Result<ProposalView, GovernanceError> {
        let mut engine = self.shared.engine.write().await;
        let now = self.clock.now();
        let view = engine.cancel(caller, id, now)?;
        self.shared.flush(&mut engine)?;
        drop(engine);

        self.shared
            .events
            .emit(&GovernorEvent::ProposalCancelled { id, by: caller });
        Ok(view)
    }

    /// Queue an approved proposal, or run a queued one whose timelock passed.
    ///
    /// The outbound call runs on its own task, so dropping this future cannot
    /// leave the proposal claimed.
    pub async fn execute(&self, id: u64) -> Result<ProposalView, GovernanceError> {
        let (now, step) = {
            let mut engine = self.shared.engine.write().await;
            let now = self.clock.now();
            let step = engine.begin_execute(id, now)?;
            if matches!(step, ExecuteStep::Queued(_)) {
                self.shared.flush(&mut engine)?;
            }
            (now, step)
        };

        let (proposal_id, payload) = match step {
            ExecuteStep::Queued(view) => {
                self.shared
                    .events
                    .emit(&execute_event(id, &view.status, false));
                return Ok(view);
            }
            ExecuteStep::Dispatch {
                proposal_id,
                payload,
            } => (proposal_id, payload),
        };

        let shared = Arc::clone(&self.shared);
        let dispatcher = self.dispatcher.clone();
        let task = tokio::spawn(async move {
            let outcome = dispatcher.dispatch(proposal_id, &payload).await;
            let params_updated = matches!(outcome, Ok(Effect::ParamsUpdate { .. }));
            let failure = outcome.as_ref().err().map(ToString::to_string);

            let mut engine = shared.engine.write().await;
            let result = engine.finish_execute(proposal_id, now, outcome);
            if result.is_ok() {
                shared.flush(&mut engine)?;
            }
            drop(engine);

            match &result {
                Ok(view) => shared
                    .events
                    .emit(&execute_event(proposal_id, &view.status, params_updated)),
                Err(_) => {
                    if let Some(reason) = failure {
                        shared.events.emit(&GovernorEvent::ExecutionFailed {
                            id: proposal_id,
                            reason,
                        });
                    }
                }
            }
            result
        });

        match task.await {
            Ok(result) => result,
            Err(e) => {
                error!(proposal_id, error = %e, "execution task failed");
                self.shared.engine.write().await.release_claim(proposal_id);
                self.shared.events.emit(&GovernorEvent::ExecutionFailed {
                    id: proposal_id,
                    reason: e.to_string(),
                });
                Err(GovernanceError::TaskFailed(e.to_string()))
            }
        }
    }

    /// Execute every queued proposal whose timelock has passed.
    ///
    /// Each one goes through [`Self::execute`]; failures leave it queued for
    /// the next sweep.
    pub async fn execute_due(&self) -> Vec<(u64, Result<ProposalView, GovernanceError>)> {
        let due = {
            let engine = self.shared.engine.read().await;
            engine.due_for_execution(self.clock.now())
        };
        if !due.is_empty() {
            debug!(count = due.len(), "executing due proposals");
        }

        let mut results = Vec::with_capacity(due.len());
        for id in due {
            let result = self.execute(id).await;
            match &result {
                Ok(_) => info!(proposal_id = id, "auto-executed proposal"),
                Err(e) => warn!(proposal_id = id, error = %e, "auto-execution failed"),
            }
            results.push((id, result));
        }
        results
    }

    /// Record the current balance of `principal` and the total supply.
    pub async fn refresh_checkpoints(&self, principal: Principal) -> Result<(), GovernanceError> {
        let observed = self.observe(&principal).await?;
        let mut engine = self.shared.engine.write().await;
        let now = self.clock.now();
        engine.refresh(principal, now, observed)?;
        self.shared.flush(&mut engine)?;
        drop(engine);

        self.shared
            .events
            .emit(&GovernorEvent::CheckpointsRefreshed { principal });
        Ok(())
    }

    /// External parameter update. Always refused.
    pub async fn update_system_params(
        &self,
        caller: Principal,
        update: &SystemParamsUpdate,
    ) -> Result<(), GovernanceError> {
        let engine = self.shared.engine.read().await;
        let result = engine.update_system_params_direct(update);
        if let Err(e) = &result {
            warn!(%caller, error = %e, "rejected direct parameter update");
        }
        result
    }

    // ── Queries ──────────────────────────────────────────────────────────

    pub async fn get_proposal(&self, id: u64) -> Result<ProposalView, GovernanceError> {
        let engine = self.shared.engine.read().await;
        engine.get_proposal(id, self.clock.now())
    }

    /// Proposals after `cursor` in id order, `count` clamped to
    /// 1..=[`MAX_PAGE_SIZE`].
    pub async fn get_proposals(&self, cursor: Option<u64>, count: Option<usize>) -> Vec<ProposalView> {
        let limit = count.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
        let engine = self.shared.engine.read().await;
        engine.get_proposals(cursor, limit, self.clock.now())
    }

    pub async fn get_system_params(&self) -> VersionedParams {
        self.shared.engine.read().await.versioned_params().clone()
    }

    pub async fn get_past_votes(&self, principal: &Principal, timepoint: Timestamp) -> u128 {
        self.shared.engine.read().await.past_votes(principal, timepoint)
    }

    pub async fn get_past_total_supply(&self, timepoint: Timestamp) -> u128 {
        self.shared.engine.read().await.past_total_supply(timepoint)
    }

    pub async fn proposal_count(&self) -> usize {
        self.shared.engine.read().await.proposal_count()
    }

    /// Current time as seen by this governor.
    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }

    async fn observe(&self, principal: &Principal) -> Result<Observation, GovernanceError> {
        let (balance, total_supply) = tokio::try_join!(
            self.ledger.balance_of(principal),
            self.ledger.total_supply()
        )?;
        Ok(Observation {
            balance,
            total_supply,
        })
    }
}
