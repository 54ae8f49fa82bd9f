//! Checkpointed history of observed balances and total supply.
//!
//! The store is a passive cache of what the governor has seen: it is fed
//! only when a call observes a subject's current value (proposal creation,
//! vote casting, explicit refresh) and never polls the ledger itself.
//! Lookups for an instant that was never observed return the most recent
//! earlier observation, so the engine must only ask for instants that sit on
//! a proposal's own observation boundary.

use crate::error::CheckpointError;
use agora_types::{Principal, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// What a checkpoint sequence tracks.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Subject {
    /// Global token supply.
    TotalSupply,
    /// Balance (voting power) of one principal.
    Balance(Principal),
}

impl Subject {
    const TOTAL_SUPPLY_TAG: u8 = 0x00;
    const BALANCE_TAG: u8 = 0x01;

    /// Storage key: a one-byte tag, followed by the principal for balances.
    pub fn to_key(&self) -> Vec<u8> {
        match self {
            Self::TotalSupply => vec![Self::TOTAL_SUPPLY_TAG],
            Self::Balance(p) => {
                let mut key = Vec::with_capacity(1 + Principal::LEN);
                key.push(Self::BALANCE_TAG);
                key.extend_from_slice(p.as_bytes());
                key
            }
        }
    }

    pub fn from_key(key: &[u8]) -> Result<Self, CheckpointError> {
        match key.split_first() {
            Some((&Self::TOTAL_SUPPLY_TAG, [])) => Ok(Self::TotalSupply),
            Some((&Self::BALANCE_TAG, rest)) => Principal::from_slice(rest)
                .map(Self::Balance)
                .map_err(|e| CheckpointError::InvalidSubjectKey(e.to_string())),
            _ => Err(CheckpointError::InvalidSubjectKey(hex::encode(key))),
        }
    }
}

impl fmt::Display for Subject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TotalSupply => f.write_str("total supply"),
            Self::Balance(p) => write!(f, "balance of {p}"),
        }
    }
}

/// A single observation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Checkpoint {
    pub timestamp: Timestamp,
    pub value: u128,
}

/// Observations of one subject, strictly increasing by timestamp.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct History(Vec<Checkpoint>);

impl History {
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Rebuild from decoded checkpoints, rejecting out-of-order sequences.
    pub fn from_checkpoints(
        subject: Subject,
        checkpoints: Vec<Checkpoint>,
    ) -> Result<Self, CheckpointError> {
        for pair in checkpoints.windows(2) {
            if pair[1].timestamp <= pair[0].timestamp {
                return Err(CheckpointError::NonMonotonic {
                    subject,
                    last: pair[0].timestamp,
                    attempted: pair[1].timestamp,
                });
            }
        }
        Ok(Self(checkpoints))
    }

    /// Whether an observation at `timestamp` would keep the sequence ordered.
    pub fn accepts(&self, timestamp: Timestamp) -> bool {
        self.latest().map_or(true, |last| timestamp >= last.timestamp)
    }

    /// Append an observation. Re-observing the latest instant replaces its value.
    pub fn record(
        &mut self,
        subject: Subject,
        timestamp: Timestamp,
        value: u128,
    ) -> Result<(), CheckpointError> {
        match self.0.last_mut() {
            Some(last) if last.timestamp == timestamp => {
                last.value = value;
                Ok(())
            }
            Some(last) if last.timestamp > timestamp => Err(CheckpointError::NonMonotonic {
                subject,
                last: last.timestamp,
                attempted: timestamp,
            }),
            _ => {
                self.0.push(Checkpoint { timestamp, value });
                Ok(())
            }
        }
    }

    /// Value of the latest checkpoint at or before `timestamp`; 0 if none.
    pub fn value_at(&self, timestamp: Timestamp) -> u128 {
        let idx = self.0.partition_point(|c| c.timestamp <= timestamp);
        match idx {
            0 => 0,
            i => self.0[i - 1].value,
        }
    }

    pub fn latest(&self) -> Option<&Checkpoint> {
        self.0.last()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Checkpoint> {
        self.0.iter()
    }
}

/// Per-subject histories, answering "value of S as of T".
#[derive(Clone, Debug, Default)]
pub struct CheckpointStore {
    histories: BTreeMap<Subject, History>,
}

impl CheckpointStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one observation for `subject`.
    pub fn record(
        &mut self,
        subject: Subject,
        timestamp: Timestamp,
        value: u128,
    ) -> Result<(), CheckpointError> {
        self.histories
            .entry(subject)
            .or_default()
            .record(subject, timestamp, value)
    }

    /// Record several observations taken at the same instant.
    ///
    /// All subjects are checked before any is written, so a rejected batch
    /// leaves the store untouched.
    pub fn record_all(
        &mut self,
        timestamp: Timestamp,
        observations: &[(Subject, u128)],
    ) -> Result<(), CheckpointError> {
        for (subject, _) in observations {
            if let Some(history) = self.histories.get(subject) {
                if !history.accepts(timestamp) {
                    return Err(CheckpointError::NonMonotonic {
                        subject: *subject,
                        last: history.latest().map(|c| c.timestamp).unwrap_or_default(),
                        attempted: timestamp,
                    });
                }
            }
        }
        for (subject, value) in observations {
            self.record(*subject, timestamp, *value)?;
        }
        Ok(())
    }

    /// Value of `subject` as of `timestamp`. O(log n) in the subject's history.
    pub fn value_at(&self, subject: &Subject, timestamp: Timestamp) -> u128 {
        self.histories
            .get(subject)
            .map_or(0, |history| history.value_at(timestamp))
    }

    /// Voting power of `principal` as of `timestamp`.
    pub fn past_votes(&self, principal: &Principal, timestamp: Timestamp) -> u128 {
        self.value_at(&Subject::Balance(*principal), timestamp)
    }

    pub fn past_total_supply(&self, timestamp: Timestamp) -> u128 {
        self.value_at(&Subject::TotalSupply, timestamp)
    }

    pub fn history(&self, subject: &Subject) -> Option<&History> {
        self.histories.get(subject)
    }

    /// Replace a subject's history wholesale (used when restoring from disk).
    pub fn insert_history(&mut self, subject: Subject, history: History) {
        self.histories.insert(subject, history);
    }

    pub fn subjects(&self) -> impl Iterator<Item = &Subject> {
        self.histories.keys()
    }

    pub fn subject_count(&self) -> usize {
        self.histories.len()
    }
}
