//! LMDB implementation of GovernanceStore.
//!
//! Proposals are keyed by big-endian id so iteration is in id order. The
//! id counter lives in the meta database next to the schema version.

use std::sync::Arc;

use heed::types::Bytes;
use heed::{Database, Env};

use agora_store::governance::{GovernanceBatch, GovernanceStore};
use agora_store::meta::NEXT_PROPOSAL_ID_KEY;
use agora_store::StoreError;

use crate::LmdbError;

const PARAMS_KEY: &[u8] = b"current";

pub struct LmdbGovernanceStore {
    pub(crate) env: Arc<Env>,
    pub(crate) proposals_db: Database<Bytes, Bytes>,
    pub(crate) checkpoints_db: Database<Bytes, Bytes>,
    pub(crate) params_db: Database<Bytes, Bytes>,
    pub(crate) meta_db: Database<Bytes, Bytes>,
}

fn decode_id(key: &[u8]) -> Result<u64, LmdbError> {
    let arr: [u8; 8] = key
        .try_into()
        .map_err(|_| LmdbError::Serialization("invalid proposal key length".into()))?;
    Ok(u64::from_be_bytes(arr))
}

impl GovernanceStore for LmdbGovernanceStore {
    fn commit(&self, batch: GovernanceBatch) -> Result<(), StoreError> {
        let mut wtxn = self.env.write_txn().map_err(LmdbError::from)?;
        for (id, bytes) in &batch.proposals {
            self.proposals_db
                .put(&mut wtxn, &id.to_be_bytes(), bytes)
                .map_err(LmdbError::from)?;
        }
        for (key, bytes) in &batch.checkpoints {
            self.checkpoints_db
                .put(&mut wtxn, key, bytes)
                .map_err(LmdbError::from)?;
        }
        if let Some(params) = &batch.params {
            self.params_db
                .put(&mut wtxn, PARAMS_KEY, params)
                .map_err(LmdbError::from)?;
        }
        if let Some(next) = batch.next_proposal_id {
            self.meta_db
                .put(&mut wtxn, NEXT_PROPOSAL_ID_KEY.as_bytes(), &next.to_le_bytes())
                .map_err(LmdbError::from)?;
        }
        wtxn.commit().map_err(LmdbError::from)?;
        Ok(())
    }

    fn get_proposal(&self, id: u64) -> Result<Vec<u8>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .proposals_db
            .get(&rtxn, &id.to_be_bytes())
            .map_err(LmdbError::from)?
            .ok_or_else(|| LmdbError::NotFound(format!("proposal {id}")))?;
        Ok(val.to_vec())
    }

    fn iter_proposals(&self) -> Result<Vec<(u64, Vec<u8>)>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut proposals = Vec::new();
        let iter = self.proposals_db.iter(&rtxn).map_err(LmdbError::from)?;
        for result in iter {
            let (key, val) = result.map_err(LmdbError::from)?;
            proposals.push((decode_id(key)?, val.to_vec()));
        }
        Ok(proposals)
    }

    fn iter_checkpoints(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let mut sequences = Vec::new();
        let iter = self.checkpoints_db.iter(&rtxn).map_err(LmdbError::from)?;
        for result in iter {
            let (key, val) = result.map_err(LmdbError::from)?;
            sequences.push((key.to_vec(), val.to_vec()));
        }
        Ok(sequences)
    }

    fn get_params(&self) -> Result<Option<Vec<u8>>, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .params_db
            .get(&rtxn, PARAMS_KEY)
            .map_err(LmdbError::from)?;
        Ok(val.map(<[u8]>::to_vec))
    }

    fn next_proposal_id(&self) -> Result<u64, StoreError> {
        let rtxn = self.env.read_txn().map_err(LmdbError::from)?;
        let val = self
            .meta_db
            .get(&rtxn, NEXT_PROPOSAL_ID_KEY.as_bytes())
            .map_err(LmdbError::from)?;
        match val {
            None => Ok(0),
            Some(bytes) => {
                let arr: [u8; 8] = bytes.try_into().map_err(|_| {
                    StoreError::Corruption("next_proposal_id has unexpected byte length".into())
                })?;
                Ok(u64::from_le_bytes(arr))
            }
        }
    }
}
