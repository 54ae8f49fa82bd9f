//! Fundamental types for the Agora governor.
//!
//! This crate defines the core types shared across every other crate in the workspace:
//! principals, nanosecond timestamps, and the governance system parameters.

pub mod error;
pub mod params;
pub mod principal;
pub mod time;

pub use error::AgoraError;
pub use params::{GovernorMetadata, SystemParams, SystemParamsUpdate};
pub use principal::Principal;
pub use time::Timestamp;
