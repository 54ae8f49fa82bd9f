//! Governance system parameters.
//!
//! Every field is governable: the only way to change them is a proposal whose
//! payload targets the governor's own parameter registry.

use crate::principal::Principal;
use crate::time::NANOS_PER_SEC;
use serde::{Deserialize, Serialize};

/// Human-facing description of the governor instance.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernorMetadata {
    pub name: String,
    pub description: String,
}

/// All parameters consulted by the proposal engine.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemParams {
    // ── Timing (nanoseconds) ─────────────────────────────────────────────
    /// Delay between proposal creation and the opening of the voting window.
    pub voting_delay_ns: u64,

    /// Length of the voting window.
    pub voting_period_ns: u64,

    /// Delay between queueing an approved proposal and permitted execution.
    pub timelock_delay_ns: u64,

    // ── Thresholds ───────────────────────────────────────────────────────
    /// Minimum voting power needed to create a proposal.
    pub proposal_threshold: u128,

    /// Minimum total votes cast (for + against) to avoid automatic rejection.
    /// Snapshotted into each proposal at creation.
    pub quorum_threshold: u128,

    // ── Roles & metadata ─────────────────────────────────────────────────
    /// Principal allowed to cancel any open or queued proposal.
    #[serde(default)]
    pub guardian: Option<Principal>,

    #[serde(default)]
    pub metadata: Option<GovernorMetadata>,
}

impl SystemParams {
    /// Return a copy with every field present in `update` replaced.
    pub fn merged(&self, update: &SystemParamsUpdate) -> Self {
        Self {
            voting_delay_ns: update.voting_delay_ns.unwrap_or(self.voting_delay_ns),
            voting_period_ns: update.voting_period_ns.unwrap_or(self.voting_period_ns),
            timelock_delay_ns: update.timelock_delay_ns.unwrap_or(self.timelock_delay_ns),
            proposal_threshold: update.proposal_threshold.unwrap_or(self.proposal_threshold),
            quorum_threshold: update.quorum_threshold.unwrap_or(self.quorum_threshold),
            guardian: update.guardian.or(self.guardian),
            metadata: update.metadata.clone().or_else(|| self.metadata.clone()),
        }
    }

    /// Whether `principal` is the configured guardian.
    pub fn is_guardian(&self, principal: &Principal) -> bool {
        self.guardian.as_ref() == Some(principal)
    }
}

/// Development defaults: 15 s delay, 30 s window, 15 s timelock, thresholds of 1.
impl Default for SystemParams {
    fn default() -> Self {
        Self {
            voting_delay_ns: 15 * NANOS_PER_SEC,
            voting_period_ns: 30 * NANOS_PER_SEC,
            timelock_delay_ns: 15 * NANOS_PER_SEC,
            proposal_threshold: 1,
            quorum_threshold: 1,
            guardian: None,
            metadata: None,
        }
    }
}

/// A partial parameter update. Omitted fields keep their previous value.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemParamsUpdate {
    #[serde(default)]
    pub voting_delay_ns: Option<u64>,
    #[serde(default)]
    pub voting_period_ns: Option<u64>,
    #[serde(default)]
    pub timelock_delay_ns: Option<u64>,
    #[serde(default)]
    pub proposal_threshold: Option<u128>,
    #[serde(default)]
    pub quorum_threshold: Option<u128>,
    #[serde(default)]
    pub guardian: Option<Principal>,
    #[serde(default)]
    pub metadata: Option<GovernorMetadata>,
}

impl SystemParamsUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}
