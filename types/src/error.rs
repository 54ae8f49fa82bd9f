//! Top-level error type shared across crates.

use thiserror::Error;

/// Common error type for values parsed or validated outside a specific engine.
#[derive(Debug, Error)]
pub enum AgoraError {
    #[error("invalid principal: {0}")]
    InvalidPrincipal(String),
}
