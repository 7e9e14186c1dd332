//! Application state shared across all handlers.

use std::sync::Arc;

use boxoffice_core::config::AppConfig;
use boxoffice_queue::AdmissionService;
use boxoffice_realtime::ChangeNotifier;
use boxoffice_reservation::ReservationManager;

/// Names of the backends chosen at start-up, reported by `/health`.
#[derive(Debug, Clone, Copy)]
pub struct BackendInfo {
    /// Reservation store backend.
    pub reservation: &'static str,
    /// Admission queue backend.
    pub queue: &'static str,
}

/// Application state containing all shared dependencies.
///
/// Passed to every Axum handler via `State<AppState>`.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration.
    pub config: Arc<AppConfig>,
    /// Claim / commit / release.
    pub reservations: Arc<ReservationManager>,
    /// Admission queue operations.
    pub admissions: Arc<AdmissionService>,
    /// Change fan-out for the event streams.
    pub notifier: Arc<ChangeNotifier>,
    /// Configured backends.
    pub backends: BackendInfo,
}
