//! Health check handler.

use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;

use boxoffice_core::result::AppResult;

use crate::dto::response::{ApiResponse, ComponentHealth, HealthResponse};
use crate::state::AppState;

fn component(backend: &str, check: AppResult<()>) -> ComponentHealth {
    ComponentHealth {
        backend: backend.to_string(),
        healthy: check.is_ok(),
        error: check.err().map(|e| e.message),
    }
}

/// GET /health
///
/// 200 when every backend answers, 503 otherwise.
pub async fn health(
    State(state): State<AppState>,
) -> (StatusCode, Json<ApiResponse<HealthResponse>>) {
    let (store, queue) = tokio::join!(
        state.reservations.health_check(),
        state.admissions.health_check()
    );
    let reservation = component(state.backends.reservation, store);
    let queue = component(state.backends.queue, queue);

    let healthy = reservation.healthy && queue.healthy;
    let status = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (
        status,
        Json(ApiResponse {
            success: healthy,
            data: HealthResponse {
                status: if healthy { "ok" } else { "degraded" }.to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                reservation,
                queue,
                subscribers: state.notifier.total_subscribers(),
                notifier: state.notifier.metrics().snapshot(),
            },
        }),
    )
}
