//! Claim, commit, release, and hold lookup handlers.

use std::time::Duration;

use axum::Json;
use axum::extract::{Path, State};

use boxoffice_core::error::AppError;

use crate::dto::request::{ClaimRequest, ClaimantRequest};
use crate::dto::response::{ApiResponse, HoldResponse};
use crate::extractors::{ValidatedJson, parse_hold_id, parse_resource_id};
use crate::state::AppState;

/// POST /resources/{id}/reserve
pub async fn reserve(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<ClaimRequest>,
) -> Result<Json<ApiResponse<HoldResponse>>, AppError> {
    let resource_id = parse_resource_id(&id)?;
    let claimant = req.claimant()?;
    let ttl = req.ttl_seconds.map(Duration::from_secs);

    let hold = state
        .reservations
        .claim(resource_id, &claimant, ttl)
        .await?;

    Ok(Json(ApiResponse::ok(hold.into())))
}

/// POST /resources/{id}/commit
pub async fn commit(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<ClaimantRequest>,
) -> Result<Json<ApiResponse<HoldResponse>>, AppError> {
    let resource_id = parse_resource_id(&id)?;
    let claimant = req.claimant()?;

    let hold = state.reservations.commit(resource_id, &claimant).await?;

    Ok(Json(ApiResponse::ok(hold.into())))
}

/// POST /resources/{id}/release
pub async fn release(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<ClaimantRequest>,
) -> Result<Json<ApiResponse<HoldResponse>>, AppError> {
    let resource_id = parse_resource_id(&id)?;
    let claimant = req.claimant()?;

    let hold = state.reservations.release(resource_id, &claimant).await?;

    Ok(Json(ApiResponse::ok(hold.into())))
}

/// GET /holds/{id}
pub async fn get_hold(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<HoldResponse>>, AppError> {
    let hold_id = parse_hold_id(&id)?;
    let hold = state.reservations.get_hold(hold_id).await?;
    Ok(Json(ApiResponse::ok(hold.into())))
}
