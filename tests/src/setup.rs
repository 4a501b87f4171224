//! Common test setup functions.

use api::{router, AppState};
use axum::{http::StatusCode, routing::get, Router};
use bytes::Bytes;
use fetcher::{HttpSource, ParquetSource, SourceConfig};
use funnel_core::Event;
use pipeline::Pipeline;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use warehouse::{DuckDbClient, WarehouseConfig};

use crate::fixtures;
use crate::mocks::MockSource;

/// Test context with a mock source and a real DuckDB file.
///
/// This provides the same production code paths by:
/// - Using the real Axum router with all middleware
/// - Using MockSource which implements the ParquetSource trait
/// - Using a DuckDB database in a temporary directory
pub struct TestContext {
    pub dir: TempDir,
    pub source: Arc<MockSource>,
    pub pipeline: Arc<Pipeline>,
    pub router: Router,
}

impl TestContext {
    /// Context serving the default funnel fixture.
    pub fn new() -> Self {
        Self::with_events(&fixtures::funnel_events())
    }

    /// Context serving a parquet file built from `events`.
    pub fn with_events(events: &[Event]) -> Self {
        Self::build(events, |_| {})
    }

    /// Context with a customized warehouse config.
    pub fn build(events: &[Event], configure: impl FnOnce(&mut WarehouseConfig)) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let payload = fixtures::parquet_bytes(dir.path(), events);
        let source = Arc::new(MockSource::new(payload));

        let mut config = WarehouseConfig::with_path(dir.path().join("data/data.db"));
        configure(&mut config);

        let pipeline = Arc::new(Pipeline::new(
            source.clone() as Arc<dyn ParquetSource>,
            dir.path().join("data/file.parquet"),
            DuckDbClient::new(config).expect("Failed to create warehouse client"),
        ));
        let router = router(AppState::new(pipeline.clone()));

        Self {
            dir,
            source,
            pipeline,
            router,
        }
    }

    /// Path the pipeline downloads the parquet file to.
    pub fn parquet_path(&self) -> PathBuf {
        self.dir.path().join("data/file.parquet")
    }

    /// Set the mock source to fail (for error testing).
    pub fn set_source_failure(&self, should_fail: bool) {
        self.source.set_should_fail(should_fail);
    }
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

/// Serves `body` with `status` on a local port and returns its URL.
pub async fn serve_payload(status: StatusCode, body: Vec<u8>) -> String {
    let body = Bytes::from(body);
    let app = Router::new().route("/", get(move || async move { (status, body) }));

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind test server");
    let addr = listener.local_addr().expect("Failed to read local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.ok();
    });

    format!("http://{}/", addr)
}

/// Router backed by a real `HttpSource` pointed at `url`.
pub fn http_router(dir: &TempDir, url: &str) -> Router {
    let source = HttpSource::new(&SourceConfig {
        url: url.to_string(),
        destination: dir.path().join("data/file.parquet"),
        timeout_secs: 30,
    })
    .expect("Failed to create HTTP source");

    let pipeline = Pipeline::new(
        Arc::new(source),
        dir.path().join("data/file.parquet"),
        DuckDbClient::new(WarehouseConfig::with_path(dir.path().join("data/data.db")))
            .expect("Failed to create warehouse client"),
    );
    router(AppState::new(Arc::new(pipeline)))
}
