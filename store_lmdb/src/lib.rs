//! LMDB storage backend for the Agora governor.
//!
//! Implements the storage traits from `agora-store` using the `heed` LMDB bindings.
//! Each logical table maps to one LMDB database within a single environment.

pub mod environment;
pub mod error;
pub mod governance;
pub mod integrity;
pub mod meta;
pub mod migration;

pub use environment::LmdbEnvironment;
pub use error::LmdbError;
pub use governance::LmdbGovernanceStore;
pub use integrity::{check_data_dir, check_integrity, IntegrityReport};
pub use meta::LmdbMetaStore;
pub use migration::{Migrator, CURRENT_SCHEMA_VERSION};
