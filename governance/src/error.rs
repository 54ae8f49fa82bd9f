use agora_types::{Principal, Timestamp};
use thiserror::Error;

use crate::checkpoint::Subject;

/// Coarse classification of a [`GovernanceError`], used by service
/// boundaries to pick a response code.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Authorization,
    NotFound,
    State,
    Dispatch,
    Unavailable,
    Internal,
}

#[derive(Debug, Error)]
pub enum GovernanceError {
    // ── Authorization ────────────────────────────────────────────────────
    #[error("Anonymous principals are not allowed to propose.")]
    AnonymousProposer,

    #[error("Anonymous principals are not allowed to vote.")]
    AnonymousVoter,

    #[error("Voting power of principal \"{principal}\" is below proposal threshold.")]
    BelowProposalThreshold { principal: Principal },

    #[error("Principal \"{principal}\" doesn't have any voting power.")]
    NoVotingPower { principal: Principal },

    #[error("Only the guardian or principal \"{proposer}\" can cancel the proposal.")]
    NotProposerOrGuardian { proposer: Principal },

    #[error("This function is only callable via proposal execution.")]
    DirectParamsUpdate,

    // ── Not found ────────────────────────────────────────────────────────
    #[error("Proposal with ID \"{0}\" doesn't exist.")]
    ProposalNotFound(u64),

    // ── State ────────────────────────────────────────────────────────────
    #[error("Proposal is not open for voting.")]
    NotOpenForVoting,

    #[error("Principal \"{principal}\" already voted.")]
    AlreadyVoted { principal: Principal },

    #[error("Only open or time-locked proposals can be cancelled.")]
    NotCancellable,

    #[error("Proposal has not been approved.")]
    NotApproved,

    #[error("Proposal has been rejected.")]
    ProposalRejected,

    #[error("Proposal hasn't surpassed time lock.")]
    TimelockNotPassed { executable_at: Timestamp },

    #[error("Proposal has been already executed.")]
    AlreadyExecuted,

    #[error("Proposal execution is already in progress.")]
    ExecutionInProgress,

    // ── Dispatch ─────────────────────────────────────────────────────────
    #[error("execution failed: {0}")]
    Dispatch(#[from] DispatchError),

    // ── Collaborators & internals ────────────────────────────────────────
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    #[error("checkpoint error: {0}")]
    Checkpoint(#[from] CheckpointError),

    #[error("store error: {0}")]
    Store(#[from] agora_store::StoreError),

    #[error("codec error: {0}")]
    Codec(String),

    #[error("execution task failed: {0}")]
    TaskFailed(String),
}

impl GovernanceError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::AnonymousProposer
            | Self::AnonymousVoter
            | Self::BelowProposalThreshold { .. }
            | Self::NoVotingPower { .. }
            | Self::NotProposerOrGuardian { .. }
            | Self::DirectParamsUpdate => ErrorKind::Authorization,
            Self::ProposalNotFound(_) => ErrorKind::NotFound,
            Self::NotOpenForVoting
            | Self::AlreadyVoted { .. }
            | Self::NotCancellable
            | Self::NotApproved
            | Self::ProposalRejected
            | Self::TimelockNotPassed { .. }
            | Self::AlreadyExecuted
            | Self::ExecutionInProgress => ErrorKind::State,
            Self::Dispatch(_) => ErrorKind::Dispatch,
            Self::Ledger(_) => ErrorKind::Unavailable,
            Self::Checkpoint(_) | Self::Store(_) | Self::Codec(_) | Self::TaskFailed(_) => {
                ErrorKind::Internal
            }
        }
    }
}

/// Failure of the single outbound call made when executing a proposal.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("no route to target service {0}")]
    UnknownTarget(Principal),

    #[error("target service {target} rejected {method}: {reason}")]
    Rejected {
        target: Principal,
        method: String,
        reason: String,
    },

    #[error("target service unreachable: {0}")]
    Unreachable(String),

    #[error("call timed out after {0}s")]
    Timeout(u64),

    #[error("governor has no method {0}")]
    UnsupportedMethod(String),

    #[error("method name {0:?} is not a single path segment")]
    InvalidMethod(String),

    #[error("invalid call arguments: {0}")]
    InvalidArguments(String),
}

/// Failure reading balances from the token ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger unavailable: {0}")]
    Unavailable(String),

    #[error("unexpected ledger response: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Error)]
pub enum CheckpointError {
    #[error("checkpoint for {subject} at {attempted} precedes last recorded {last}")]
    NonMonotonic {
        subject: Subject,
        last: Timestamp,
        attempted: Timestamp,
    },

    #[error("invalid subject key: {0}")]
    InvalidSubjectKey(String),
}
