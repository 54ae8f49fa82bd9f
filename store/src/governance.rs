//! Governance storage trait.
//!
//! Layout: proposals keyed by their monotonic id, one checkpoint sequence per
//! subject key, a single parameters record, and the next proposal id.

use crate::StoreError;

/// Every record touched by one governor call, written atomically.
#[derive(Clone, Debug, Default)]
pub struct GovernanceBatch {
    /// `(proposal id, encoded proposal)`.
    pub proposals: Vec<(u64, Vec<u8>)>,
    /// `(encoded subject key, encoded checkpoint sequence)`.
    pub checkpoints: Vec<(Vec<u8>, Vec<u8>)>,
    /// Encoded parameter registry, when it changed.
    pub params: Option<Vec<u8>>,
    /// New value of the id counter, when a proposal was created.
    pub next_proposal_id: Option<u64>,
}

impl GovernanceBatch {
    pub fn is_empty(&self) -> bool {
        self.proposals.is_empty()
            && self.checkpoints.is_empty()
            && self.params.is_none()
            && self.next_proposal_id.is_none()
    }
}

/// Trait for storing governor state (proposals, checkpoints, parameters).
pub trait GovernanceStore {
    /// Apply a batch. Either every record in it is written or none is.
    fn commit(&self, batch: GovernanceBatch) -> Result<(), StoreError>;

    /// Get a proposal by id.
    fn get_proposal(&self, id: u64) -> Result<Vec<u8>, StoreError>;

    /// All proposals in ascending id order.
    fn iter_proposals(&self) -> Result<Vec<(u64, Vec<u8>)>, StoreError>;

    /// All checkpoint sequences, keyed by encoded subject.
    fn iter_checkpoints(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError>;

    /// The parameter registry, if one was ever written.
    fn get_params(&self) -> Result<Option<Vec<u8>>, StoreError>;

    /// The id the next proposal will receive (0 for a fresh store).
    fn next_proposal_id(&self) -> Result<u64, StoreError>;
}
