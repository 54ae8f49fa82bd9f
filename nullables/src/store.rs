//! Nullable store: thread-safe in-memory storage for testing.

use agora_store::governance::{GovernanceBatch, GovernanceStore};
use agora_store::meta::MetaStore;
use agora_store::StoreError;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

#[derive(Debug, Default)]
struct Tables {
    proposals: BTreeMap<u64, Vec<u8>>,
    checkpoints: BTreeMap<Vec<u8>, Vec<u8>>,
    params: Option<Vec<u8>>,
    next_proposal_id: u64,
}

/// An in-memory governance + meta store for testing.
/// Thread-safe for use with tokio's multi-threaded runtime.
#[derive(Debug, Default)]
pub struct NullGovernanceStore {
    tables: Mutex<Tables>,
    meta: Mutex<HashMap<String, Vec<u8>>>,
    fail_commits: AtomicBool,
    commits: AtomicUsize,
}

impl NullGovernanceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent commit fail until cleared.
    pub fn set_fail_commits(&self, fail: bool) {
        self.fail_commits.store(fail, Ordering::SeqCst);
    }

    /// Number of successful commits so far.
    pub fn commit_count(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn proposal_count(&self) -> usize {
        self.tables.lock().unwrap().proposals.len()
    }
}

impl GovernanceStore for NullGovernanceStore {
    fn commit(&self, batch: GovernanceBatch) -> Result<(), StoreError> {
        if self.fail_commits.load(Ordering::SeqCst) {
            return Err(StoreError::Backend("null store commit disabled".into()));
        }
        let mut tables = self.tables.lock().unwrap();
        tables.proposals.extend(batch.proposals);
        tables.checkpoints.extend(batch.checkpoints);
        if let Some(params) = batch.params {
            tables.params = Some(params);
        }
        if let Some(next) = batch.next_proposal_id {
            tables.next_proposal_id = next;
        }
        self.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn get_proposal(&self, id: u64) -> Result<Vec<u8>, StoreError> {
        self.tables
            .lock()
            .unwrap()
            .proposals
            .get(&id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("proposal {id}")))
    }

    fn iter_proposals(&self) -> Result<Vec<(u64, Vec<u8>)>, StoreError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .proposals
            .iter()
            .map(|(id, bytes)| (*id, bytes.clone()))
            .collect())
    }

    fn iter_checkpoints(&self) -> Result<Vec<(Vec<u8>, Vec<u8>)>, StoreError> {
        Ok(self
            .tables
            .lock()
            .unwrap()
            .checkpoints
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }

    fn get_params(&self) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.tables.lock().unwrap().params.clone())
    }

    fn next_proposal_id(&self) -> Result<u64, StoreError> {
        Ok(self.tables.lock().unwrap().next_proposal_id)
    }
}

impl MetaStore for NullGovernanceStore {
    fn put_meta(&self, key: &str, value: &[u8]) -> Result<(), StoreError> {
        self.meta
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn get_meta(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.meta.lock().unwrap().get(key).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn commit_applies_whole_batch() {
        let store = NullGovernanceStore::new();
        store
            .commit(GovernanceBatch {
                proposals: vec![(0, vec![1]), (1, vec![2])],
                checkpoints: vec![(vec![0], vec![3])],
                params: Some(vec![4]),
                next_proposal_id: Some(2),
            })
            .unwrap();
        assert_eq!(store.get_proposal(1).unwrap(), vec![2]);
        assert_eq!(store.iter_checkpoints().unwrap().len(), 1);
        assert_eq!(store.get_params().unwrap(), Some(vec![4]));
        assert_eq!(store.next_proposal_id().unwrap(), 2);
        assert!(matches!(store.get_proposal(9), Err(StoreError::NotFound(_))));
    }

    #[test]
    fn failing_commit_writes_nothing() {
        let store = NullGovernanceStore::new();
        store.set_fail_commits(true);
        let batch = GovernanceBatch {
            proposals: vec![(0, vec![1])],
            ..Default::default()
        };
        assert!(store.commit(batch).is_err());
        assert_eq!(store.proposal_count(), 0);
        assert_eq!(store.commit_count(), 0);
    }

    #[test]
    fn schema_version_defaults_to_zero() {
        let store = NullGovernanceStore::new();
        assert_eq!(store.get_schema_version().unwrap(), 0);
        store.set_schema_version(3).unwrap();
        assert_eq!(store.get_schema_version().unwrap(), 3);
    }
}
