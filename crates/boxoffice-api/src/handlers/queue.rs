//! Admission queue handlers.

use axum::Json;
use axum::extract::{Path, Query, State};

use boxoffice_core::error::AppError;

use crate::dto::request::{ClaimantQuery, ClaimantRequest};
use crate::dto::response::{
    AdmitResponse, ApiResponse, JoinResponse, LeaveResponse, PositionResponse,
};
use crate::extractors::{ValidatedJson, parse_event_id};
use crate::state::AppState;

/// POST /queue/{id}/join
pub async fn join(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<ClaimantRequest>,
) -> Result<Json<ApiResponse<JoinResponse>>, AppError> {
    let group = parse_event_id(&id)?;
    let claimant = req.claimant()?;
    let receipt = state.admissions.join(group, &claimant).await?;
    Ok(Json(ApiResponse::ok(receipt.into())))
}

/// GET /queue/{id}/position?claimantID=
pub async fn position(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ClaimantQuery>,
) -> Result<Json<ApiResponse<PositionResponse>>, AppError> {
    let group = parse_event_id(&id)?;
    let claimant = query.claimant()?;
    let position = state.admissions.position(group, &claimant).await?;
    Ok(Json(ApiResponse::ok(position.into())))
}

/// POST /queue/{id}/admit
///
/// 200 when admitted, 409 `NOT_HEAD` otherwise.
pub async fn admit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<ClaimantRequest>,
) -> Result<Json<ApiResponse<AdmitResponse>>, AppError> {
    let group = parse_event_id(&id)?;
    let claimant = req.claimant()?;
    state.admissions.admit(group, &claimant).await?;
    Ok(Json(ApiResponse::ok(AdmitResponse {
        outcome: "admitted".to_string(),
    })))
}

/// POST /queue/{id}/leave
pub async fn leave(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<ClaimantRequest>,
) -> Result<Json<ApiResponse<LeaveResponse>>, AppError> {
    let group = parse_event_id(&id)?;
    let claimant = req.claimant()?;
    let removed = state.admissions.leave(group, &claimant).await?;
    Ok(Json(ApiResponse::ok(LeaveResponse { removed })))
}
