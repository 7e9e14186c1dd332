//! Resource catalog handlers.

use axum::Json;
use axum::extract::{Path, State};

use boxoffice_core::error::AppError;

use crate::dto::request::RegisterResourcesRequest;
use crate::dto::response::{ApiResponse, ResourceResponse};
use crate::extractors::{ValidatedJson, parse_event_id, parse_resource_id};
use crate::state::AppState;

/// GET /resources/{id}
pub async fn get_resource(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<ResourceResponse>>, AppError> {
    let resource_id = parse_resource_id(&id)?;
    let resource = state.reservations.get_resource(resource_id).await?;
    Ok(Json(ApiResponse::ok(resource.into())))
}

/// GET /events/{id}/resources
pub async fn list_resources(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Vec<ResourceResponse>>>, AppError> {
    let event_id = parse_event_id(&id)?;
    let resources = state.reservations.list_resources(event_id).await?;
    Ok(Json(ApiResponse::ok(
        resources.into_iter().map(ResourceResponse::from).collect(),
    )))
}

/// POST /events/{id}/resources
pub async fn register_resources(
    State(state): State<AppState>,
    Path(id): Path<String>,
    ValidatedJson(req): ValidatedJson<RegisterResourcesRequest>,
) -> Result<Json<ApiResponse<Vec<ResourceResponse>>>, AppError> {
    let event_id = parse_event_id(&id)?;
    let resources = state
        .reservations
        .register_resources(event_id, req.labels)
        .await?;
    Ok(Json(ApiResponse::ok(
        resources.into_iter().map(ResourceResponse::from).collect(),
    )))
}
