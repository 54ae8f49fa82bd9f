//! Abstract storage traits for the Agora governor.
//!
//! Every storage backend (LMDB, in-memory for testing) implements these
//! traits. Records cross this boundary as opaque bytes; the governance crate
//! owns their encoding.

pub mod error;
pub mod governance;
pub mod meta;

pub use error::StoreError;
pub use governance::{GovernanceBatch, GovernanceStore};
pub use meta::MetaStore;
