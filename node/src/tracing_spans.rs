//! Pre-built [`tracing::Span`] constructors for the node's outbound work.
//!
//! Consistent span names and fields make ledger reads, proposal calls and
//! sweep runs easy to filter and correlate.

use agora_types::Principal;
use tracing::{info_span, Span};

/// Span covering one request to the token ledger.
pub fn ledger_request_span(operation: &str) -> Span {
    info_span!("ledger_request", op = %operation)
}

/// Span covering the outbound call of a proposal.
pub fn dispatch_span(target: &Principal, method: &str) -> Span {
    info_span!("dispatch", target = %target, method = %method)
}

/// Span covering one run of the execution sweep.
pub fn sweep_span(run: u64) -> Span {
    info_span!("execute_sweep", run = run)
}
