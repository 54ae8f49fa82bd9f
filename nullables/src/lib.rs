//! Nullable infrastructure for deterministic testing.
//!
//! Inspired by the "A-frame architecture" pattern from RsNano.
//! Every external dependency of the governor (clock, token ledger, outbound
//! dispatch, storage) sits behind a trait. This crate provides test-friendly
//! implementations that:
//! - Return deterministic values
//! - Can be controlled programmatically
//! - Never touch the filesystem or network
//!
//! Usage: swap real implementations for nullables in tests.

pub mod clock;
pub mod dispatcher;
pub mod ledger;
pub mod store;

pub use clock::NullClock;
pub use dispatcher::{DispatchedCall, NullDispatcher};
pub use ledger::NullLedger;
pub use store::NullGovernanceStore;
