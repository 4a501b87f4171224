//! Tests for health check endpoints.
//!
//! Health state is process-global, so these assert on shape and on
//! transitions a run is guaranteed to cause.

use axum::http::StatusCode;
use axum_test::TestServer;
use integration_tests::setup::TestContext;

/// Test /health endpoint returns proper structure
#[tokio::test]
async fn test_health_endpoint_structure() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server.get("/health").await;
    response.assert_status_ok();

    let body: serde_json::Value = response.json();

    for field in [
        "status",
        "warehouse_connected",
        "source_reachable",
        "pipeline_runs",
        "pipeline_failures",
    ] {
        assert!(body.get(field).is_some(), "Response should have '{}' field", field);
    }
}

/// Test /health endpoint reports valid status
#[tokio::test]
async fn test_health_endpoint_status_values() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let body: serde_json::Value = server.get("/health").await.json();

    let status = body["status"].as_str().unwrap_or("");
    assert!(
        status == "healthy" || status == "degraded" || status == "unhealthy",
        "Status should be 'healthy', 'degraded', or 'unhealthy', got '{}'",
        status
    );
}

/// Test a successful run marks both components healthy and counts the run
#[tokio::test]
async fn test_health_after_successful_run() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    server.get("/api/v1/main").await.assert_status_ok();

    let body: serde_json::Value = server.get("/health").await.json();
    assert!(body["pipeline_runs"].as_u64().unwrap() >= 1);

    let response = server.get("/health/ready").await;
    let status = response.status_code();
    assert!(
        status == StatusCode::OK || status == StatusCode::SERVICE_UNAVAILABLE,
        "Ready endpoint should return 200 or 503, got {}",
        status
    );
}

/// Test /health/live endpoint returns 200 while the service runs
#[tokio::test]
async fn test_live_endpoint() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    let response = server.get("/health/live").await;
    response.assert_status_ok();
}

/// Test health endpoints never trigger a pipeline run
#[tokio::test]
async fn test_health_does_not_fetch() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    server.get("/health").await;
    server.get("/health/ready").await;
    server.get("/health/live").await;

    assert_eq!(ctx.source.fetch_count(), 0);
}

/// Test /metrics reflects what a run loaded and built
#[tokio::test]
async fn test_metrics_after_successful_run() {
    let ctx = TestContext::new();
    let server = TestServer::new(ctx.router.clone()).expect("Failed to create test server");

    server.get("/api/v1/main").await.assert_status_ok();

    let response = server.get("/metrics").await;
    response.assert_status_ok();

    // Counters are process-wide, so other tests may have added to them
    let body: serde_json::Value = response.json();
    assert!(body["pipeline_runs"].as_u64().unwrap() >= 1);
    assert!(body["events_loaded"].as_u64().unwrap() >= 5);
    assert!(body["sessions_built"].as_u64().unwrap() >= 3);
    assert!(body["bytes_fetched"].as_u64().unwrap() > 0);
    assert!(body["fetch_latency"]["count"].as_u64().unwrap() >= 1);
    assert!(body["pipeline_latency"]["count"].as_u64().unwrap() >= 1);
}
