//! Proposal status, derived from stored facts and the current time.
//!
//! Nothing advances a proposal in the background. Every read and write
//! recomputes the status from `created_at`, the vote tally, the
//! timelock/execution/cancellation markers, and `now`.

use crate::proposal::Proposal;
use agora_types::{SystemParams, Timestamp};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    QuorumNotMet,
    RejectedByMajority,
    Cancelled,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ProposalStatus {
    /// Created; voting has not opened yet.
    Pending,
    /// Inside the voting window.
    Open,
    /// Window closed with quorum and a strict `for` majority; not yet queued.
    Approved,
    Rejected { reason: RejectionReason },
    /// Timelock running (or elapsed, awaiting execution).
    Queued { executable_at: Timestamp },
    Executed,
}

impl ProposalStatus {
    /// Whether no further transition is possible.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Rejected { .. } | Self::Executed)
    }

    pub fn is_cancellable(&self) -> bool {
        matches!(self, Self::Open | Self::Queued { .. })
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Open => f.write_str("open"),
            Self::Approved => f.write_str("approved"),
            Self::Rejected { reason } => match reason {
                RejectionReason::QuorumNotMet => f.write_str("rejected (quorum not met)"),
                RejectionReason::RejectedByMajority => f.write_str("rejected (majority)"),
                RejectionReason::Cancelled => f.write_str("rejected (cancelled)"),
            },
            Self::Queued { executable_at } => write!(f, "queued until {executable_at}"),
            Self::Executed => f.write_str("executed"),
        }
    }
}

/// Status of `proposal` at `now` under `params`.
///
/// Precedence: executed, cancelled, queued, then the time-based phases, and
/// finally the tally once the window has closed.
pub fn derive_status(proposal: &Proposal, now: Timestamp, params: &SystemParams) -> ProposalStatus {
    if proposal.executed_at.is_some() {
        return ProposalStatus::Executed;
    }
    if proposal.cancelled_at.is_some() {
        return ProposalStatus::Rejected {
            reason: RejectionReason::Cancelled,
        };
    }
    if let Some(executable_at) = proposal.executable_at(params) {
        return ProposalStatus::Queued { executable_at };
    }
    if now < proposal.voting_start(params) {
        return ProposalStatus::Pending;
    }
    if now < proposal.voting_end(params) {
        return ProposalStatus::Open;
    }

    let tally = proposal.votes.tally();
    if tally.total() < proposal.quorum_threshold {
        ProposalStatus::Rejected {
            reason: RejectionReason::QuorumNotMet,
        }
    } else if tally.for_votes <= tally.against_votes {
        ProposalStatus::Rejected {
            reason: RejectionReason::RejectedByMajority,
        }
    } else {
        ProposalStatus::Approved
    }
}
