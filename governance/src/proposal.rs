//! Proposals, payloads and votes.

use crate::status::ProposalStatus;
use agora_types::{Principal, SystemParams, Timestamp};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Human-readable description of a proposal.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalContent {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// The single outbound call a proposal performs when executed.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalPayload {
    /// Service the call is addressed to.
    pub target: Principal,
    pub method: String,
    /// Opaque argument blob; hex in JSON, raw bytes in binary encodings.
    #[serde(with = "opaque_bytes")]
    pub args: Vec<u8>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VoteOption {
    For,
    Against,
}

/// A recorded vote. Immutable once cast.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub voter: Principal,
    pub option: VoteOption,
    pub voting_power: u128,
}

/// Sum of voting power per option.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tally {
    pub for_votes: u128,
    pub against_votes: u128,
}

impl Tally {
    pub fn total(&self) -> u128 {
        self.for_votes.saturating_add(self.against_votes)
    }
}

/// Votes in casting order, indexed by voter.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<Vote>", into = "Vec<Vote>")]
pub struct VoteBook {
    votes: Vec<Vote>,
    by_voter: HashMap<Principal, usize>,
}

impl VoteBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn has_voted(&self, voter: &Principal) -> bool {
        self.by_voter.contains_key(voter)
    }

    pub fn get(&self, voter: &Principal) -> Option<&Vote> {
        self.by_voter.get(voter).map(|&i| &self.votes[i])
    }

    /// Append a vote. Returns `false` (and records nothing) if the voter
    /// already has one.
    pub fn insert(&mut self, vote: Vote) -> bool {
        if self.by_voter.contains_key(&vote.voter) {
            return false;
        }
        self.by_voter.insert(vote.voter, self.votes.len());
        self.votes.push(vote);
        true
    }

    pub fn tally(&self) -> Tally {
        self.votes.iter().fold(Tally::default(), |mut tally, vote| {
            match vote.option {
                VoteOption::For => tally.for_votes = tally.for_votes.saturating_add(vote.voting_power),
                VoteOption::Against => {
                    tally.against_votes = tally.against_votes.saturating_add(vote.voting_power)
                }
            }
            tally
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = &Vote> {
        self.votes.iter()
    }

    pub fn len(&self) -> usize {
        self.votes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.votes.is_empty()
    }
}

impl From<Vec<Vote>> for VoteBook {
    fn from(votes: Vec<Vote>) -> Self {
        let mut book = Self::new();
        for vote in votes {
            // First vote per voter wins, as it did when first recorded.
            book.insert(vote);
        }
        book
    }
}

impl From<VoteBook> for Vec<Vote> {
    fn from(book: VoteBook) -> Self {
        book.votes
    }
}

/// A proposal as stored. Status is not a field: see [`crate::derive_status`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: u64,
    pub proposer: Principal,
    pub content: ProposalContent,
    pub payload: ProposalPayload,
    pub created_at: Timestamp,
    /// Quorum captured from the parameters at creation.
    pub quorum_threshold: u128,
    pub votes: VoteBook,
    pub timelocked_at: Option<Timestamp>,
    pub executed_at: Option<Timestamp>,
    pub cancelled_at: Option<Timestamp>,
}

impl Proposal {
    /// Instant at which voting opens, and at which voting power is measured.
    pub fn voting_start(&self, params: &SystemParams) -> Timestamp {
        self.created_at.saturating_add(params.voting_delay_ns)
    }

    /// First instant after the voting window.
    pub fn voting_end(&self, params: &SystemParams) -> Timestamp {
        self.voting_start(params)
            .saturating_add(params.voting_period_ns)
    }

    /// When a queued proposal may be executed; `None` unless queued.
    pub fn executable_at(&self, params: &SystemParams) -> Option<Timestamp> {
        self.timelocked_at
            .map(|t| t.saturating_add(params.timelock_delay_ns))
    }
}

/// A proposal together with its status at the instant it was read.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalView {
    pub id: u64,
    pub proposer: Principal,
    pub content: ProposalContent,
    pub payload: ProposalPayload,
    pub status: ProposalStatus,
    pub created_at: Timestamp,
    pub quorum_threshold: u128,
    pub for_votes: u128,
    pub against_votes: u128,
    pub votes: Vec<Vote>,
    pub timelocked_at: Option<Timestamp>,
    pub executed_at: Option<Timestamp>,
    pub cancelled_at: Option<Timestamp>,
}

impl ProposalView {
    pub fn new(proposal: &Proposal, status: ProposalStatus) -> Self {
        let tally = proposal.votes.tally();
        Self {
            id: proposal.id,
            proposer: proposal.proposer,
            content: proposal.content.clone(),
            payload: proposal.payload.clone(),
            status,
            created_at: proposal.created_at,
            quorum_threshold: proposal.quorum_threshold,
            for_votes: tally.for_votes,
            against_votes: tally.against_votes,
            votes: proposal.votes.iter().cloned().collect(),
            timelocked_at: proposal.timelocked_at,
            executed_at: proposal.executed_at,
            cancelled_at: proposal.cancelled_at,
        }
    }
}

mod opaque_bytes {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        if serializer.is_human_readable() {
            serializer.serialize_str(&hex::encode(bytes))
        } else {
            serializer.serialize_bytes(bytes)
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        if deserializer.is_human_readable() {
            let text = String::deserialize(deserializer)?;
            hex::decode(text.trim_start_matches("0x")).map_err(D::Error::custom)
        } else {
            <Vec<u8>>::deserialize(deserializer)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn voter(n: u8) -> Principal {
        Principal::new([n; 32])
    }

    fn vote(n: u8, option: VoteOption, voting_power: u128) -> Vote {
        Vote {
            voter: voter(n),
            option,
            voting_power,
        }
    }

    #[test]
    fn vote_book_rejects_second_vote() {
        let mut book = VoteBook::new();
        assert!(book.insert(vote(1, VoteOption::For, 10)));
        assert!(!book.insert(vote(1, VoteOption::Against, 99)));
        assert_eq!(book.len(), 1);
        assert_eq!(book.get(&voter(1)).unwrap().option, VoteOption::For);
    }

    #[test]
    fn tally_sums_power_per_option() {
        let mut book = VoteBook::new();
        book.insert(vote(1, VoteOption::For, 10));
        book.insert(vote(2, VoteOption::Against, 4));
        book.insert(vote(3, VoteOption::For, 5));
        let tally = book.tally();
        assert_eq!(tally.for_votes, 15);
        assert_eq!(tally.against_votes, 4);
        assert_eq!(tally.total(), 19);
    }

    #[test]
    fn vote_book_keeps_casting_order_through_bincode() {
        let mut book = VoteBook::new();
        book.insert(vote(3, VoteOption::For, 1));
        book.insert(vote(1, VoteOption::Against, 2));
        let bytes = bincode::serialize(&book).unwrap();
        let decoded: VoteBook = bincode::deserialize(&bytes).unwrap();
        let voters: Vec<_> = decoded.iter().map(|v| v.voter).collect();
        assert_eq!(voters, vec![voter(3), voter(1)]);
        assert!(decoded.has_voted(&voter(1)));
    }

    #[test]
    fn payload_args_are_hex_in_json() {
        let payload = ProposalPayload {
            target: voter(7),
            method: "greet".into(),
            args: vec![0xde, 0xad],
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert_eq!(json["args"], "dead");
        let back: ProposalPayload = serde_json::from_value(json).unwrap();
        assert_eq!(back, payload);
    }

    #[test]
    fn timing_helpers_follow_params() {
        let params = SystemParams {
            voting_delay_ns: 10,
            voting_period_ns: 20,
            timelock_delay_ns: 5,
            ..Default::default()
        };
        let mut proposal = Proposal {
            id: 0,
            proposer: voter(1),
            content: ProposalContent {
                title: "t".into(),
                description: None,
            },
            payload: ProposalPayload {
                target: voter(2),
                method: "m".into(),
                args: vec![],
            },
            created_at: Timestamp::from_nanos(100),
            quorum_threshold: 1,
            votes: VoteBook::new(),
            timelocked_at: None,
            executed_at: None,
            cancelled_at: None,
        };
        assert_eq!(proposal.voting_start(&params), Timestamp::from_nanos(110));
        assert_eq!(proposal.voting_end(&params), Timestamp::from_nanos(130));
        assert_eq!(proposal.executable_at(&params), None);
        proposal.timelocked_at = Some(Timestamp::from_nanos(140));
        assert_eq!(proposal.executable_at(&params), Some(Timestamp::from_nanos(145)));
    }
}
