//! Encoding of engine state for a [`GovernanceStore`].
//!
//! Records are bincode-encoded. Only records named in a [`ChangeSet`] are
//! written, so each call persists what it touched and nothing else.

use crate::checkpoint::{Checkpoint, CheckpointStore, History, Subject};
use crate::engine::{ChangeSet, GovernanceEngine};
use crate::error::GovernanceError;
use crate::proposal::Proposal;
use crate::registry::{ParamsRegistry, VersionedParams};
use agora_store::{GovernanceBatch, GovernanceStore};
use agora_types::SystemParams;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::info;

fn encode<T: Serialize>(value: &T) -> Result<Vec<u8>, GovernanceError> {
    bincode::serialize(value).map_err(|e| GovernanceError::Codec(e.to_string()))
}

fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, GovernanceError> {
    bincode::deserialize(bytes).map_err(|e| GovernanceError::Codec(e.to_string()))
}

/// Collect the current value of every record in `changes`.
pub fn build_batch(
    engine: &GovernanceEngine,
    changes: &ChangeSet,
) -> Result<GovernanceBatch, GovernanceError> {
    let mut batch = GovernanceBatch::default();

    for &id in &changes.proposals {
        let proposal = engine
            .proposal(id)
            .ok_or(GovernanceError::ProposalNotFound(id))?;
        batch.proposals.push((id, encode(proposal)?));
    }

    for subject in &changes.subjects {
        if let Some(history) = engine.checkpoints().history(subject) {
            batch.checkpoints.push((subject.to_key(), encode(history)?));
        }
    }

    if changes.params {
        batch.params = Some(encode(engine.versioned_params())?);
    }
    if changes.next_proposal_id {
        batch.next_proposal_id = Some(engine.next_proposal_id());
    }

    Ok(batch)
}

/// Rebuild an engine from `store`. A store that never saw a parameter write
/// starts from `initial_params`.
pub fn load_engine(
    store: &dyn GovernanceStore,
    initial_params: SystemParams,
) -> Result<GovernanceEngine, GovernanceError> {
    let proposals = store
        .iter_proposals()?
        .into_iter()
        .map(|(_, bytes)| decode::<Proposal>(&bytes))
        .collect::<Result<Vec<_>, _>>()?;

    let mut checkpoints = CheckpointStore::new();
    for (key, bytes) in store.iter_checkpoints()? {
        let subject = Subject::from_key(&key)?;
        let entries: Vec<Checkpoint> = decode(&bytes)?;
        checkpoints.insert_history(subject, History::from_checkpoints(subject, entries)?);
    }

    let registry = match store.get_params()? {
        Some(bytes) => ParamsRegistry::from_versioned(decode::<VersionedParams>(&bytes)?),
        None => ParamsRegistry::new(initial_params),
    };

    let next_id = store.next_proposal_id()?;
    let engine = GovernanceEngine::from_parts(proposals, checkpoints, registry, next_id);
    info!(
        proposals = engine.proposal_count(),
        subjects = engine.checkpoints().subject_count(),
        params_version = engine.versioned_params().version,
        "governance state loaded"
    );
    Ok(engine)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::Observation;
    use crate::proposal::{ProposalContent, ProposalPayload};
    use agora_types::{Principal, Timestamp};

    fn engine_with_one_proposal() -> GovernanceEngine {
        let mut engine = GovernanceEngine::default();
        engine
            .propose(
                Principal::new([1; 32]),
                ProposalContent {
                    title: "t".into(),
                    description: None,
                },
                ProposalPayload {
                    target: Principal::new([2; 32]),
                    method: "m".into(),
                    args: vec![1, 2, 3],
                },
                Timestamp::from_nanos(5),
                Observation {
                    balance: 10,
                    total_supply: 10,
                },
            )
            .unwrap();
        engine
    }

    #[test]
    fn batch_holds_exactly_the_touched_records() {
        let mut engine = engine_with_one_proposal();
        let changes = engine.take_changes();
        let batch = build_batch(&engine, &changes).unwrap();

        assert_eq!(batch.proposals.len(), 1);
        assert_eq!(batch.checkpoints.len(), 2);
        assert_eq!(batch.next_proposal_id, Some(1));
        assert!(batch.params.is_none());

        let decoded: Proposal = decode(&batch.proposals[0].1).unwrap();
        assert_eq!(&decoded, engine.proposal(0).unwrap());
    }

    #[test]
    fn empty_changes_give_empty_batch() {
        let engine = engine_with_one_proposal();
        let batch = build_batch(&engine, &ChangeSet::default()).unwrap();
        assert!(batch.is_empty());
    }

    #[test]
    fn corrupt_record_is_a_codec_error() {
        let err = decode::<Proposal>(&[0xff]).unwrap_err();
        assert!(matches!(err, GovernanceError::Codec(_)));
    }
}
