//! Tests for pipeline failures surfacing through the API.
//!
//! Each failure stage maps to its own error code and HTTP status.

use axum::http::StatusCode;
use axum_test::TestServer;
use integration_tests::{fixtures, setup};
use integration_tests::setup::TestContext;
use funnel_core::{EventParam, PRODUCT_KEY};
use tempfile::TempDir;

/// Test an unreachable source returns 502 NET_001
#[tokio::test]
async fn test_source_failure_returns_bad_gateway() {
    let ctx = TestContext::new();
    ctx.set_source_failure(true);
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server.get("/api/v1/main").await;
    assert_eq!(response.status_code(), StatusCode::BAD_GATEWAY);

    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "NET_001");
    assert!(body["error"].as_str().unwrap().contains("unreachable"));
}

/// Test a non-success HTTP status from the source returns 502
#[tokio::test]
async fn test_http_error_status_returns_bad_gateway() {
    let url = setup::serve_payload(StatusCode::SERVICE_UNAVAILABLE, b"down".to_vec()).await;
    let dir = TempDir::new().unwrap();
    let server =
        TestServer::new(setup::http_router(&dir, &url)).expect("Failed to create test server");

    let response = server.get("/api/v1/main").await;
    assert_eq!(response.status_code(), StatusCode::BAD_GATEWAY);

    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "NET_001");
    assert!(
        !dir.path().join("data/file.parquet").exists(),
        "Error bodies must not be stored as parquet"
    );
}

/// Test a payload that is not parquet returns SCHEMA_001
#[tokio::test]
async fn test_corrupt_payload_returns_schema_error() {
    let ctx = TestContext::new();
    ctx.source.set_payload(b"definitely not parquet".to_vec());
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server.get("/api/v1/main").await;
    assert_eq!(response.status_code(), StatusCode::INTERNAL_SERVER_ERROR);

    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "SCHEMA_001");
}

/// Test a failed run does not poison later runs
#[tokio::test]
async fn test_recovers_after_failure() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    ctx.set_source_failure(true);
    let response = server.get("/api/v1/main").await;
    assert_eq!(response.status_code(), StatusCode::BAD_GATEWAY);

    ctx.set_source_failure(false);
    let response = server.get("/api/v1/main").await;
    response.assert_status_ok();
}

/// Test strict mode rejects sessions with several products
#[tokio::test]
async fn test_strict_conflict_returns_conflict() {
    let week_1 = fixtures::iso_week_ms(2024, 1);
    let mut events = fixtures::funnel_events();
    events.push(fixtures::purchase_event(301, "device-d", week_1, "shoes", 10));
    events.push(
        funnel_core::Event::new(301, "device-d", "purchase", week_1 + 1000)
            .with_param(EventParam::string(PRODUCT_KEY, "hats")),
    );

    let strict = TestContext::build(&events, |config| config.strict_single_values = true);
    let server = TestServer::new(strict.router.clone()).expect("Failed to create test server");

    let response = server.get("/api/v1/main").await;
    assert_eq!(response.status_code(), StatusCode::CONFLICT);
    let body: serde_json::Value = response.json();
    assert_eq!(body["code"], "DATA_001");

    // Lenient mode keeps the first product seen
    let lenient = TestContext::with_events(&events);
    let server = TestServer::new(lenient.router.clone()).expect("Failed to create test server");

    let body: serde_json::Value = server.get("/api/v1/revenue").await.json();
    let week_1_rows: Vec<_> = body
        .as_array()
        .unwrap()
        .iter()
        .filter(|r| r["week"] == 1)
        .collect();
    assert_eq!(week_1_rows.len(), 1);
    assert_eq!(week_1_rows[0]["product"], "shoes");
    assert_eq!(week_1_rows[0]["revenue"], 10);
}

/// Test unknown routes return 404
#[tokio::test]
async fn test_unknown_route_returns_not_found() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server.get("/api/v1/nope").await;
    assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
    assert_eq!(ctx.source.fetch_count(), 0);
}
