//! Integration tests for claim, commit, release, and expiry over HTTP.

mod helpers;

use std::sync::Arc;
use std::time::Duration;

use http::StatusCode;
use serde_json::json;
use tower::ServiceExt;

use boxoffice_core::types::EventId;
use boxoffice_worker::ExpiryReclaimer;

fn reserve_body(claimant: &str, ttl: u64) -> serde_json::Value {
    json!({ "claimantID": claimant, "ttlSeconds": ttl })
}

#[tokio::test]
async fn test_concurrent_reserve_has_single_winner() {
    let app = helpers::TestApp::new();
    let event = EventId::new().to_string();
    let resource = app.register(&event, &["A-1"]).await.remove(0);
    let path = format!("/resources/{resource}/reserve");

    let requests = ["x", "y"].map(|claimant| {
        app.router.clone().oneshot(helpers::TestApp::build_request(
            "POST",
            &path,
            Some(reserve_body(claimant, 300)),
        ))
    });
    let responses = futures::future::join_all(requests).await;

    let statuses: Vec<StatusCode> = responses
        .into_iter()
        .map(|r| r.expect("request failed").status())
        .collect();
    assert_eq!(
        statuses.iter().filter(|s| **s == StatusCode::OK).count(),
        1,
        "statuses: {statuses:?}"
    );
    assert_eq!(
        statuses
            .iter()
            .filter(|s| **s == StatusCode::CONFLICT)
            .count(),
        1
    );
}

#[tokio::test]
async fn test_reserve_returns_hold_summary() {
    let app = helpers::TestApp::new();
    let event = EventId::new().to_string();
    let resource = app.register(&event, &["A-1"]).await.remove(0);

    let response = app
        .request(
            "POST",
            &format!("/resources/{resource}/reserve"),
            Some(reserve_body("alice", 300)),
        )
        .await;

    assert_eq!(response.status, StatusCode::OK);
    let hold = &response.body["data"];
    assert_eq!(hold["claimantID"], "alice");
    assert_eq!(hold["status"], "ACTIVE");
    assert_eq!(hold["resourceId"], resource.as_str());

    let hold_id = hold["holdId"].as_str().unwrap();
    let lookup = app.request("GET", &format!("/holds/{hold_id}"), None).await;
    assert_eq!(lookup.status, StatusCode::OK);
    assert_eq!(lookup.body["data"]["status"], "ACTIVE");

    let resource_view = app
        .request("GET", &format!("/resources/{resource}"), None)
        .await;
    assert_eq!(resource_view.body["data"]["status"], "HELD");
}

#[tokio::test]
async fn test_reserve_held_resource_is_conflict() {
    let app = helpers::TestApp::new();
    let event = EventId::new().to_string();
    let resource = app.register(&event, &["A-1"]).await.remove(0);
    let path = format!("/resources/{resource}/reserve");

    app.request("POST", &path, Some(reserve_body("x", 300)))
        .await;
    let response = app
        .request("POST", &path, Some(reserve_body("y", 300)))
        .await;

    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.error_code(), "RESOURCE_UNAVAILABLE");
    assert_eq!(response.body["retryable"], false);
}

#[tokio::test]
async fn test_reserve_unknown_resource_is_not_found() {
    let app = helpers::TestApp::new();
    let missing = boxoffice_core::types::ResourceId::new();

    let response = app
        .request(
            "POST",
            &format!("/resources/{missing}/reserve"),
            Some(reserve_body("x", 300)),
        )
        .await;

    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.error_code(), "NOT_FOUND");
}

#[tokio::test]
async fn test_malformed_input_is_bad_request() {
    let app = helpers::TestApp::new();
    let event = EventId::new().to_string();
    let resource = app.register(&event, &["A-1"]).await.remove(0);

    let bad_id = app
        .request(
            "POST",
            "/resources/not-a-uuid/reserve",
            Some(reserve_body("x", 300)),
        )
        .await;
    assert_eq!(bad_id.status, StatusCode::BAD_REQUEST);

    let zero_ttl = app
        .request(
            "POST",
            &format!("/resources/{resource}/reserve"),
            Some(reserve_body("x", 0)),
        )
        .await;
    assert_eq!(zero_ttl.status, StatusCode::BAD_REQUEST);
    assert_eq!(zero_ttl.error_code(), "VALIDATION");

    let missing_claimant = app
        .request(
            "POST",
            &format!("/resources/{resource}/reserve"),
            Some(json!({ "ttlSeconds": 30 })),
        )
        .await;
    assert_eq!(missing_claimant.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_lapsed_hold_can_be_reclaimed_by_another_claimant() {
    let app = helpers::TestApp::new();
    let event = EventId::new().to_string();
    let resource = app.register(&event, &["A-1"]).await.remove(0);
    let path = format!("/resources/{resource}/reserve");

    let first = app.request("POST", &path, Some(reserve_body("x", 1))).await;
    assert_eq!(first.status, StatusCode::OK);

    app.advance(Duration::from_secs(2));

    let second = app.request("POST", &path, Some(reserve_body("y", 300))).await;
    assert_eq!(second.status, StatusCode::OK);
    assert_eq!(second.body["data"]["claimantID"], "y");

    let old_hold = first.body["data"]["holdId"].as_str().unwrap();
    let lookup = app.request("GET", &format!("/holds/{old_hold}"), None).await;
    assert_eq!(lookup.body["data"]["status"], "EXPIRED");
}

#[tokio::test]
async fn test_double_commit_reports_hold_not_found() {
    let app = helpers::TestApp::new();
    let event = EventId::new().to_string();
    let resource = app.register(&event, &["A-1"]).await.remove(0);

    app.request(
        "POST",
        &format!("/resources/{resource}/reserve"),
        Some(reserve_body("x", 300)),
    )
    .await;

    let commit_path = format!("/resources/{resource}/commit");
    let first = app
        .request("POST", &commit_path, Some(json!({ "claimantID": "x" })))
        .await;
    assert_eq!(first.status, StatusCode::OK);
    assert_eq!(first.body["data"]["status"], "COMPLETED");

    let second = app
        .request("POST", &commit_path, Some(json!({ "claimantID": "x" })))
        .await;
    assert_eq!(second.status, StatusCode::NOT_FOUND);
    assert_eq!(second.error_code(), "HOLD_NOT_FOUND");

    let resource_view = app
        .request("GET", &format!("/resources/{resource}"), None)
        .await;
    assert_eq!(resource_view.body["data"]["status"], "COMMITTED");
}

#[tokio::test]
async fn test_commit_at_expiry_is_rejected_and_frees_resource() {
    let app = helpers::TestApp::new();
    let event = EventId::new().to_string();
    let resource = app.register(&event, &["A-1"]).await.remove(0);

    app.request(
        "POST",
        &format!("/resources/{resource}/reserve"),
        Some(reserve_body("x", 300)),
    )
    .await;
    app.advance(Duration::from_secs(300));

    let response = app
        .request(
            "POST",
            &format!("/resources/{resource}/commit"),
            Some(json!({ "claimantID": "x" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.error_code(), "HOLD_EXPIRED");

    let resource_view = app
        .request("GET", &format!("/resources/{resource}"), None)
        .await;
    assert_eq!(resource_view.body["data"]["status"], "AVAILABLE");
}

#[tokio::test]
async fn test_commit_by_other_claimant_is_owner_mismatch() {
    let app = helpers::TestApp::new();
    let event = EventId::new().to_string();
    let resource = app.register(&event, &["A-1"]).await.remove(0);

    app.request(
        "POST",
        &format!("/resources/{resource}/reserve"),
        Some(reserve_body("x", 300)),
    )
    .await;

    let response = app
        .request(
            "POST",
            &format!("/resources/{resource}/commit"),
            Some(json!({ "claimantID": "mallory" })),
        )
        .await;
    assert_eq!(response.status, StatusCode::CONFLICT);
    assert_eq!(response.error_code(), "OWNER_MISMATCH");
}

#[tokio::test]
async fn test_release_makes_resource_available() {
    let app = helpers::TestApp::new();
    let event = EventId::new().to_string();
    let resource = app.register(&event, &["A-1"]).await.remove(0);

    app.request(
        "POST",
        &format!("/resources/{resource}/reserve"),
        Some(reserve_body("x", 300)),
    )
    .await;

    let release = app
        .request(
            "POST",
            &format!("/resources/{resource}/release"),
            Some(json!({ "claimantID": "x" })),
        )
        .await;
    assert_eq!(release.status, StatusCode::OK);
    assert_eq!(release.body["data"]["status"], "CANCELLED");

    let retry = app
        .request(
            "POST",
            &format!("/resources/{resource}/reserve"),
            Some(reserve_body("y", 300)),
        )
        .await;
    assert_eq!(retry.status, StatusCode::OK);
}

#[tokio::test]
async fn test_sweep_reclaims_expired_holds_once() {
    let app = helpers::TestApp::new();
    let event = EventId::new().to_string();
    let resources = app.register(&event, &["A-1", "A-2"]).await;

    for resource in &resources {
        let response = app
            .request(
                "POST",
                &format!("/resources/{resource}/reserve"),
                Some(reserve_body("x", 60)),
            )
            .await;
        assert_eq!(response.status, StatusCode::OK);
    }
    app.advance(Duration::from_secs(61));

    let reclaimer =
        ExpiryReclaimer::new(Arc::clone(&app.reservations), Duration::from_secs(60), 1);
    let report = reclaimer.sweep().await.unwrap();
    assert_eq!(report.reclaimed, 2);

    let again = reclaimer.sweep().await.unwrap();
    assert_eq!(again.reclaimed, 0);

    let listing = app
        .request("GET", &format!("/events/{event}/resources"), None)
        .await;
    let statuses: Vec<&str> = listing.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["status"].as_str().unwrap())
        .collect();
    assert_eq!(statuses, vec!["AVAILABLE", "AVAILABLE"]);
}
