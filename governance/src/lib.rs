//! Token-weighted governance for the Agora governor.
//!
//! Principals holding a fungible balance propose actions and vote with power
//! equal to their balance at a fixed historical instant. Approved proposals
//! pass through a timelock before their single outbound call is executed.
//!
//! Components, leaves first:
//! - [`CheckpointStore`]: per-subject history of observed balances and supply.
//! - [`ParamsRegistry`]: the versioned system parameters, writable only with
//!   an [`ExecutionGrant`].
//! - [`GovernanceEngine`]: the proposal state machine.
//! - [`ExecutionDispatcher`]: performs the call a proposal carries.
//!
//! [`Governor`] ties these to a ledger, a clock, and an optional store.

pub mod checkpoint;
pub mod clock;
pub mod dispatch;
pub mod engine;
pub mod error;
pub mod event;
pub mod governor;
pub mod ledger;
pub mod persist;
pub mod proposal;
pub mod registry;
pub mod status;

pub use checkpoint::{Checkpoint, CheckpointStore, History, Subject};
pub use clock::{Clock, SystemClock};
pub use dispatch::{
    decode_params_update, encode_params_update, Dispatcher, Effect, ExecutionDispatcher,
    ExecutionGrant, Route, UPDATE_SYSTEM_PARAMS_METHOD,
};
pub use engine::{ChangeSet, ExecuteStep, GovernanceEngine, Observation};
pub use error::{CheckpointError, DispatchError, ErrorKind, GovernanceError, LedgerError};
pub use event::{EventBus, GovernorEvent};
pub use governor::{Governor, GovernorBuilder, SharedStore, DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
pub use ledger::TokenLedger;
pub use proposal::{
    Proposal, ProposalContent, ProposalPayload, ProposalView, Tally, Vote, VoteBook, VoteOption,
};
pub use registry::{ParamsRegistry, VersionedParams};
pub use status::{derive_status, ProposalStatus, RejectionReason};
