//! RPC error types and their HTTP mapping.

use agora_governance::{ErrorKind, GovernanceError};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RpcError {
    #[error(transparent)]
    Governance(#[from] GovernanceError),

    #[error("invalid request: {0}")]
    InvalidRequest(String),

    #[error("metrics are disabled")]
    MetricsDisabled,

    #[error("server error: {0}")]
    Server(String),
}

impl RpcError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::Governance(e) => match e.kind() {
                ErrorKind::Authorization => StatusCode::FORBIDDEN,
                ErrorKind::NotFound => StatusCode::NOT_FOUND,
                ErrorKind::State => StatusCode::CONFLICT,
                ErrorKind::Dispatch => StatusCode::BAD_GATEWAY,
                ErrorKind::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
                ErrorKind::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::InvalidRequest(_) => StatusCode::BAD_REQUEST,
            Self::MetricsDisabled => StatusCode::NOT_FOUND,
            Self::Server(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RpcError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(%status, error = %self, "request failed");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agora_governance::DispatchError;
    use agora_types::Principal;

    #[test]
    fn governance_errors_map_by_kind() {
        let cases = [
            (GovernanceError::AnonymousProposer, StatusCode::FORBIDDEN),
            (GovernanceError::ProposalNotFound(1), StatusCode::NOT_FOUND),
            (
                GovernanceError::AlreadyVoted {
                    principal: Principal::new([1; 32]),
                },
                StatusCode::CONFLICT,
            ),
            (
                GovernanceError::Dispatch(DispatchError::Timeout(5)),
                StatusCode::BAD_GATEWAY,
            ),
        ];
        for (err, status) in cases {
            assert_eq!(RpcError::from(err).status(), status);
        }
    }

    #[test]
    fn governance_message_is_passed_through() {
        let err = RpcError::from(GovernanceError::DirectParamsUpdate);
        assert_eq!(
            err.to_string(),
            "This function is only callable via proposal execution."
        );
    }
}
