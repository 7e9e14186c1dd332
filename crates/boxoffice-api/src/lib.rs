//! # boxoffice-api
//!
//! HTTP API layer for BoxOffice built on Axum.
//!
//! Exposes the reservation, admission queue, and change stream operations
//! as REST endpoints plus one Server-Sent Events stream per event group.
//! Error mapping lives with [`AppError`](boxoffice_core::AppError) behind
//! the core crate's `axum` feature.

pub mod app;
pub mod dto;
pub mod extractors;
pub mod handlers;
pub mod router;
pub mod state;

pub use app::build_app;
pub use state::{AppState, BackendInfo};
