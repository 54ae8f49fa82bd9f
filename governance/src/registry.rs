//! System parameter registry.
//!
//! Holds the single versioned `SystemParams` record. Reads are free; the only
//! write path is [`ParamsRegistry::apply`], which demands an
//! [`ExecutionGrant`] that can only be minted while dispatching an executed
//! proposal.

use crate::dispatch::ExecutionGrant;
use agora_types::{SystemParams, SystemParamsUpdate};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Current parameters plus a counter bumped on every successful update.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionedParams {
    pub version: u64,
    pub params: SystemParams,
}

#[derive(Clone, Debug)]
pub struct ParamsRegistry {
    current: VersionedParams,
}

impl ParamsRegistry {
    pub fn new(params: SystemParams) -> Self {
        Self {
            current: VersionedParams { version: 0, params },
        }
    }

    pub fn from_versioned(current: VersionedParams) -> Self {
        Self { current }
    }

    pub fn params(&self) -> &SystemParams {
        &self.current.params
    }

    pub fn version(&self) -> u64 {
        self.current.version
    }

    pub fn versioned(&self) -> &VersionedParams {
        &self.current
    }

    /// Merge `update` into the current parameters.
    ///
    /// The grant is consumed: one executed proposal authorizes exactly one write.
    pub fn apply(&mut self, update: &SystemParamsUpdate, grant: ExecutionGrant) -> u64 {
        self.current.params = self.current.params.merged(update);
        self.current.version += 1;
        info!(
            proposal_id = grant.proposal_id(),
            version = self.current.version,
            "system parameters updated"
        );
        self.current.version
    }
}

impl Default for ParamsRegistry {
    fn default() -> Self {
        Self::new(SystemParams::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn apply_merges_and_bumps_version() {
        let mut registry = ParamsRegistry::default();
        let update = SystemParamsUpdate {
            quorum_threshold: Some(42),
            ..Default::default()
        };
        let version = registry.apply(&update, ExecutionGrant::for_proposal(7));
        assert_eq!(version, 1);
        assert_eq!(registry.params().quorum_threshold, 42);
        assert_eq!(
            registry.params().voting_delay_ns,
            SystemParams::default().voting_delay_ns
        );
    }

    #[test]
    fn empty_update_still_counts_as_a_write() {
        let mut registry = ParamsRegistry::default();
        registry.apply(&SystemParamsUpdate::default(), ExecutionGrant::for_proposal(0));
        assert_eq!(registry.version(), 1);
        assert_eq!(registry.params(), &SystemParams::default());
    }
}
