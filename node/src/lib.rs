//! Agora governor node.
//!
//! The node wires the governance engine to its environment:
//! - Opens (and checks) the LMDB store and restores governor state from it
//! - Reads balances from the token ledger over HTTP
//! - Performs proposal calls against configured target services over HTTP
//! - Serves the RPC surface and Prometheus metrics
//! - Periodically executes queued proposals whose timelock has passed

pub mod config;
pub mod error;
pub mod http_dispatcher;
pub mod http_ledger;
pub mod logging;
pub mod metrics;
pub mod node;
pub mod shutdown;
pub mod tracing_spans;

pub use config::{GenesisParams, NodeConfig, ServiceEndpoint};
pub use error::NodeError;
pub use http_dispatcher::HttpDispatcher;
pub use http_ledger::HttpLedger;
pub use logging::{init_logging, LogFormat};
pub use metrics::GovernorMetrics;
pub use node::AgoraNode;
pub use shutdown::ShutdownController;
