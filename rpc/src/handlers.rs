//! RPC request handlers.

use crate::error::RpcError;
use crate::pagination::{next_cursor, PaginationParams};
use crate::server::{RpcState, CALLER_HEADER};
use agora_governance::{ProposalContent, ProposalPayload, ProposalView, VersionedParams, VoteOption};
use agora_types::{Principal, SystemParamsUpdate, Timestamp};
use axum::extract::{Path, Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::IntoResponse;
use axum::Json;
use prometheus::{Encoder, TextEncoder};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

type Shared = State<Arc<RpcState>>;

/// The calling principal. A missing header is the anonymous caller.
pub fn caller(headers: &HeaderMap) -> Result<Principal, RpcError> {
    let Some(value) = headers.get(CALLER_HEADER) else {
        return Ok(Principal::ANONYMOUS);
    };
    let text = value
        .to_str()
        .map_err(|_| RpcError::InvalidRequest(format!("{CALLER_HEADER} is not valid text")))?;
    text.parse()
        .map_err(|e| RpcError::InvalidRequest(format!("{CALLER_HEADER}: {e}")))
}

// ── Proposals ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CreateProposalRequest {
    pub content: ProposalContent,
    pub payload: ProposalPayload,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProposalListResponse {
    pub proposals: Vec<ProposalView>,
    /// Cursor for the next page; absent on the last page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cursor: Option<u64>,
}

pub async fn create_proposal(
    State(state): Shared,
    headers: HeaderMap,
    Json(req): Json<CreateProposalRequest>,
) -> Result<impl IntoResponse, RpcError> {
    let caller = caller(&headers)?;
    debug!(%caller, target = %req.payload.target, method = %req.payload.method, "propose");
    let view = state
        .governor
        .propose(caller, req.content, req.payload)
        .await?;
    Ok((StatusCode::CREATED, Json(view)))
}

pub async fn list_proposals(
    State(state): Shared,
    Query(page): Query<PaginationParams>,
) -> Json<ProposalListResponse> {
    let count = page.effective_count();
    let proposals = state
        .governor
        .get_proposals(page.cursor, Some(count as usize))
        .await;
    let cursor = next_cursor(proposals.last().map(|p| p.id), proposals.len(), count);
    Json(ProposalListResponse {
        proposals,
        cursor,
    })
}

pub async fn get_proposal(
    State(state): Shared,
    Path(id): Path<u64>,
) -> Result<Json<ProposalView>, RpcError> {
    Ok(Json(state.governor.get_proposal(id).await?))
}

// ── Voting & lifecycle ───────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct CastVoteRequest {
    pub option: VoteOption,
}

pub async fn cast_vote(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<u64>,
    Json(req): Json<CastVoteRequest>,
) -> Result<Json<ProposalView>, RpcError> {
    let caller = caller(&headers)?;
    debug!(%caller, proposal_id = id, option = ?req.option, "vote");
    Ok(Json(state.governor.cast_vote(caller, id, req.option).await?))
}

pub async fn cancel_proposal(
    State(state): Shared,
    headers: HeaderMap,
    Path(id): Path<u64>,
) -> Result<Json<ProposalView>, RpcError> {
    let caller = caller(&headers)?;
    debug!(%caller, proposal_id = id, "cancel");
    Ok(Json(state.governor.cancel(caller, id).await?))
}

pub async fn execute_proposal(
    State(state): Shared,
    Path(id): Path<u64>,
) -> Result<Json<ProposalView>, RpcError> {
    debug!(proposal_id = id, "execute");
    Ok(Json(state.governor.execute(id).await?))
}

// ── Parameters ───────────────────────────────────────────────────────────

pub async fn get_params(State(state): Shared) -> Json<VersionedParams> {
    Json(state.governor.get_system_params().await)
}

pub async fn update_params(
    State(state): Shared,
    headers: HeaderMap,
    Json(update): Json<SystemParamsUpdate>,
) -> Result<StatusCode, RpcError> {
    let caller = caller(&headers)?;
    state.governor.update_system_params(caller, &update).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Checkpoints ──────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct TimepointQuery {
    /// Nanoseconds since the epoch; defaults to the current time.
    pub timepoint: Option<u64>,
}

impl TimepointQuery {
    fn resolve(&self, state: &RpcState) -> Timestamp {
        self.timepoint
            .map(Timestamp::from_nanos)
            .unwrap_or_else(|| state.governor.now())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PastVotesResponse {
    pub principal: Principal,
    pub timepoint: Timestamp,
    pub votes: u128,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PastTotalSupplyResponse {
    pub timepoint: Timestamp,
    pub total_supply: u128,
}

pub async fn past_votes(
    State(state): Shared,
    Path(principal): Path<String>,
    Query(query): Query<TimepointQuery>,
) -> Result<Json<PastVotesResponse>, RpcError> {
    let principal: Principal = principal
        .parse()
        .map_err(|e| RpcError::InvalidRequest(format!("principal: {e}")))?;
    let timepoint = query.resolve(&state);
    let votes = state.governor.get_past_votes(&principal, timepoint).await;
    Ok(Json(PastVotesResponse {
        principal,
        timepoint,
        votes,
    }))
}

pub async fn past_total_supply(
    State(state): Shared,
    Query(query): Query<TimepointQuery>,
) -> Json<PastTotalSupplyResponse> {
    let timepoint = query.resolve(&state);
    let total_supply = state.governor.get_past_total_supply(timepoint).await;
    Json(PastTotalSupplyResponse {
        timepoint,
        total_supply,
    })
}

#[derive(Debug, Default, Deserialize)]
pub struct RefreshRequest {
    /// Principal to observe; the caller when omitted.
    #[serde(default)]
    pub principal: Option<Principal>,
}

pub async fn refresh_checkpoints(
    State(state): Shared,
    headers: HeaderMap,
    Json(req): Json<RefreshRequest>,
) -> Result<StatusCode, RpcError> {
    let principal = match req.principal {
        Some(p) => p,
        None => caller(&headers)?,
    };
    if principal.is_anonymous() {
        return Err(RpcError::InvalidRequest(
            "a principal to refresh is required".into(),
        ));
    }
    state.governor.refresh_checkpoints(principal).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Node ─────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub governor_id: Principal,
    pub proposal_count: usize,
    pub now: Timestamp,
}

pub async fn health(State(state): Shared) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".into(),
        governor_id: *state.governor.governor_id(),
        proposal_count: state.governor.proposal_count().await,
        now: state.governor.now(),
    })
}

pub async fn metrics(State(state): Shared) -> Result<impl IntoResponse, RpcError> {
    let registry = state.metrics.as_ref().ok_or(RpcError::MetricsDisabled)?;
    let encoder = TextEncoder::new();
    let mut buf = Vec::new();
    encoder
        .encode(&registry.gather(), &mut buf)
        .map_err(|e| RpcError::Server(e.to_string()))?;
    Ok((
        [(header::CONTENT_TYPE, encoder.format_type().to_string())],
        buf,
    ))
}
