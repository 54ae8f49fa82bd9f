//! HTTP/JSON server for the Agora governor.
//!
//! Provides endpoints for:
//! - Proposal creation, listing and lookup
//! - Voting, cancellation and execution
//! - System parameters (read; writes are always refused)
//! - Historical voting power and total supply
//! - Checkpoint refresh
//! - Health and Prometheus metrics

pub mod error;
pub mod handlers;
pub mod pagination;
pub mod server;

pub use error::RpcError;
pub use server::{RpcServer, RpcState, CALLER_HEADER};
