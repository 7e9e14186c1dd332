//! Shared test helpers for HTTP integration tests.
//!
//! Every test app runs on the in-memory backends with a manual clock, so
//! expiry can be driven without sleeping.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::Router;
use axum::body::Body;
use http::{Request, StatusCode};
use serde_json::Value;
use tower::ServiceExt;

use boxoffice_api::{AppState, BackendInfo, build_app};
use boxoffice_core::config::AppConfig;
use boxoffice_core::traits::{ChangePublisher, Clock, ManualClock};
use boxoffice_queue::{AdmissionService, MemoryAdmissionQueue};
use boxoffice_realtime::ChangeNotifier;
use boxoffice_reservation::store::MemoryReservationStore;
use boxoffice_reservation::{ReservationManager, ReservationStore};

/// Test application context
pub struct TestApp {
    /// The Axum app for making test requests
    pub router: Router,
    /// Clock shared by the manager and the queue
    pub clock: Arc<ManualClock>,
    /// Reservation manager behind the router
    pub reservations: Arc<ReservationManager>,
    /// Change notifier behind the router
    pub notifier: Arc<ChangeNotifier>,
}

impl TestApp {
    /// Create a new test application with default configuration
    pub fn new() -> Self {
        Self::with_config(AppConfig::default())
    }

    /// Create a new test application
    pub fn with_config(config: AppConfig) -> Self {
        let clock = Arc::new(ManualClock::default());
        let notifier = ChangeNotifier::new(config.realtime.subscriber_buffer_size);

        let reservations = Arc::new(ReservationManager::new(
            Arc::new(MemoryReservationStore::new()) as Arc<dyn ReservationStore>,
            Arc::clone(&notifier) as Arc<dyn ChangePublisher>,
            Arc::clone(&clock) as Arc<dyn Clock>,
            &config.reservation,
        ));
        let admissions = Arc::new(AdmissionService::new(Arc::new(MemoryAdmissionQueue::new(
            Arc::clone(&clock) as Arc<dyn Clock>,
            false,
        ))));

        let state = AppState {
            config: Arc::new(config),
            reservations: Arc::clone(&reservations),
            admissions,
            notifier: Arc::clone(&notifier),
            backends: BackendInfo {
                reservation: "memory",
                queue: "memory",
            },
        };

        Self {
            router: build_app(state),
            clock,
            reservations,
            notifier,
        }
    }

    /// Register resources for `event_id` and return their ids
    pub async fn register(&self, event_id: &str, labels: &[&str]) -> Vec<String> {
        let response = self
            .request(
                "POST",
                &format!("/events/{event_id}/resources"),
                Some(serde_json::json!({ "labels": labels })),
            )
            .await;
        assert_eq!(
            response.status,
            StatusCode::OK,
            "Register failed: {:?}",
            response.body
        );

        response.body["data"]
            .as_array()
            .expect("resource list")
            .iter()
            .map(|r| r["id"].as_str().expect("resource id").to_string())
            .collect()
    }

    /// Move the manual clock forward
    pub fn advance(&self, by: Duration) {
        self.clock.advance(by);
    }

    /// Build a request
    pub fn build_request(method: &str, path: &str, body: Option<Value>) -> Request<Body> {
        let body_str = body
            .map(|b| serde_json::to_string(&b).expect("Failed to serialize body"))
            .unwrap_or_default();

        Request::builder()
            .method(method)
            .uri(path)
            .header("Content-Type", "application/json")
            .body(Body::from(body_str))
            .expect("Failed to build request")
    }

    /// Make an HTTP request to the test app
    pub async fn request(&self, method: &str, path: &str, body: Option<Value>) -> TestResponse {
        let response = self
            .router
            .clone()
            .oneshot(Self::build_request(method, path, body))
            .await
            .expect("Failed to send request");

        let status = response.status();
        let body_bytes = axum::body::to_bytes(response.into_body(), 1024 * 1024)
            .await
            .expect("Failed to read body");

        let body: Value = serde_json::from_slice(&body_bytes).unwrap_or(Value::Null);

        TestResponse { status, body }
    }

    /// Open a streaming request and return the raw response
    pub async fn open_stream(&self, path: &str) -> axum::response::Response {
        self.router
            .clone()
            .oneshot(Self::build_request("GET", path, None))
            .await
            .expect("Failed to open stream")
    }
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    /// HTTP status code
    pub status: StatusCode,
    /// Parsed JSON body
    pub body: Value,
}

impl TestResponse {
    /// The machine-readable error code of an error response
    pub fn error_code(&self) -> &str {
        self.body["error"].as_str().unwrap_or_default()
    }
}
