//! Route definitions for the BoxOffice HTTP API.
//!
//! The router receives `AppState` and passes it to all handlers via Axum's
//! `State` extractor.

use axum::{
    Router,
    routing::{get, post},
};

use crate::handlers;
use crate::state::AppState;

/// Build the Axum router with every route, without middleware.
pub fn build_router(state: AppState) -> Router {
    Router::new()
        .merge(reservation_routes())
        .merge(resource_routes())
        .merge(queue_routes())
        .merge(stream_routes())
        .merge(health_routes())
        .with_state(state)
}

/// Claim, commit, release, hold lookup
fn reservation_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/resources/{id}/reserve",
            post(handlers::reservation::reserve),
        )
        .route("/resources/{id}/commit", post(handlers::reservation::commit))
        .route(
            "/resources/{id}/release",
            post(handlers::reservation::release),
        )
        .route("/holds/{id}", get(handlers::reservation::get_hold))
}

/// Resource catalog
fn resource_routes() -> Router<AppState> {
    Router::new()
        .route("/resources/{id}", get(handlers::resource::get_resource))
        .route(
            "/events/{id}/resources",
            get(handlers::resource::list_resources).post(handlers::resource::register_resources),
        )
}

/// Admission queue
fn queue_routes() -> Router<AppState> {
    Router::new()
        .route("/queue/{id}/join", post(handlers::queue::join))
        .route("/queue/{id}/position", get(handlers::queue::position))
        .route("/queue/{id}/admit", post(handlers::queue::admit))
        .route("/queue/{id}/leave", post(handlers::queue::leave))
}

fn stream_routes() -> Router<AppState> {
    Router::new().route("/groups/{id}/stream", get(handlers::stream::stream_group))
}

fn health_routes() -> Router<AppState> {
    Router::new().route("/health", get(handlers::health::health))
}
