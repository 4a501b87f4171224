//! Pipeline runner.

use chrono::Utc;
use duckdb::Connection;
use fetcher::ParquetSource;
use funnel_core::{ConversionRow, Error, FunnelReport, Result};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;
use telemetry::{health, metrics};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;
use warehouse::{conversion_rate_for_step, DuckDbClient, WarehouseConfig};

use crate::stages::{self, RebuildSummary};

/// Runs the full pipeline on demand.
///
/// Runs hold an async mutex for their whole duration, so concurrent callers
/// queue instead of racing on `CREATE OR REPLACE`. The guard moves into the
/// blocking task, so a cancelled caller keeps the lock until the database
/// work it started has finished.
pub struct Pipeline {
    source: Arc<dyn ParquetSource>,
    parquet_path: PathBuf,
    warehouse: DuckDbClient,
    run_lock: Arc<Mutex<()>>,
}

impl Pipeline {
    /// Creates a pipeline downloading from `source` into `parquet_path`.
    pub fn new(
        source: Arc<dyn ParquetSource>,
        parquet_path: impl Into<PathBuf>,
        warehouse: DuckDbClient,
    ) -> Self {
        Self {
            source,
            parquet_path: parquet_path.into(),
            warehouse,
            run_lock: Arc::new(Mutex::new(())),
        }
    }

    /// Returns the warehouse client.
    pub fn warehouse(&self) -> &DuckDbClient {
        &self.warehouse
    }

    /// Fetches, rebuilds, and runs every analytics query.
    pub async fn run(&self) -> Result<FunnelReport> {
        let (run_id, analysis) = self.run_with(stages::analyze).await?;

        Ok(FunnelReport {
            run_id,
            generated_at: Utc::now(),
            revenue: analysis.revenue,
            users: analysis.users,
            conversion: analysis.conversion,
        })
    }

    /// Fetches, rebuilds, and computes the conversion rate of one step.
    pub async fn run_for_step(&self, step: impl Into<String>) -> Result<Vec<ConversionRow>> {
        let step = step.into();
        let (_, rows) = self
            .run_with(move |conn, config| {
                conversion_rate_for_step(conn, &config.session_table, &step)
            })
            .await?;
        Ok(rows)
    }

    /// Fetches and rebuilds, then hands the open connection to `analyze`.
    ///
    /// The connection is opened inside a blocking task and dropped before
    /// the task returns, on success and on error.
    pub async fn run_with<T, F>(&self, analyze: F) -> Result<(Uuid, T)>
    where
        T: Send + 'static,
        F: FnOnce(&Connection, &WarehouseConfig) -> Result<T> + Send + 'static,
    {
        let waiting = WaitingGuard::enter();
        let guard = self.run_lock.clone().lock_owned().await;
        drop(waiting);

        let run_id = Uuid::new_v4();
        let span = info_span!("pipeline_run", %run_id);

        let start = Instant::now();
        let result = self.execute(guard, analyze).instrument(span.clone()).await;
        let latency_ms = start.elapsed().as_millis() as u64;

        metrics().pipeline_runs.inc();
        metrics().pipeline_latency_ms.observe(latency_ms);

        span.in_scope(|| match result {
            Ok(output) => {
                info!(latency_ms = latency_ms, "Pipeline run complete");
                Ok((run_id, output))
            }
            Err(e) => {
                metrics().pipeline_failures.inc();
                error!(code = e.code(), latency_ms = latency_ms, "Pipeline run failed: {}", e);
                Err(e)
            }
        })
    }

    async fn execute<T, F>(&self, guard: OwnedMutexGuard<()>, analyze: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&Connection, &WarehouseConfig) -> Result<T> + Send + 'static,
    {
        self.fetch().await?;

        let client = self.warehouse.clone();
        let parquet = self.parquet_path.clone();
        let span = tracing::Span::current();

        let (summary, output) = tokio::task::spawn_blocking(move || {
            let _guard = guard;
            let _entered = span.enter();
            let conn = client.connect().inspect_err(|e| {
                health().warehouse.set_unhealthy(e.to_string());
            })?;
            health().warehouse.set_healthy();

            let summary = stages::rebuild(&conn, client.config(), &parquet)?;
            let output = analyze(&conn, client.config())?;
            Ok::<_, Error>((summary, output))
        })
        .await
        .map_err(|e| Error::internal(format!("pipeline task failed: {}", e)))??;

        record_rebuild(&summary);
        Ok(output)
    }

    async fn fetch(&self) -> Result<()> {
        let start = Instant::now();
        match self.source.fetch(&self.parquet_path).await {
            Ok(bytes) => {
                metrics().bytes_fetched.inc_by(bytes);
                metrics()
                    .fetch_latency_ms
                    .observe(start.elapsed().as_millis() as u64);
                health().source.set_healthy();
                info!(origin = %self.source.origin(), bytes = bytes, "Fetched source");
                Ok(())
            }
            Err(e) => {
                health().source.set_unhealthy(e.to_string());
                Err(e)
            }
        }
    }
}

/// Counts a caller in `runs_waiting` until dropped, including when the
/// caller is cancelled while queued.
struct WaitingGuard;

impl WaitingGuard {
    fn enter() -> Self {
        metrics().runs_waiting.inc();
        Self
    }
}

impl Drop for WaitingGuard {
    fn drop(&mut self) {
        metrics().runs_waiting.dec();
    }
}

fn record_rebuild(summary: &RebuildSummary) {
    metrics().events_loaded.inc_by(summary.events);
    metrics().sessions_built.inc_by(summary.sessions);
    metrics().value_conflicts.inc_by(summary.conflicts);
    info!(
        events = summary.events,
        sessions = summary.sessions,
        conflicts = summary.conflicts,
        "Relations rebuilt"
    );
}
