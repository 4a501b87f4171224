//! Funnel Analytics
//!
//! Downloads a parquet file of analytics events, rebuilds DuckDB relations
//! from it, and answers funnel questions:
//! - Purchases and revenue per product and week
//! - Sessions per funnel step and week
//! - Conversion rate per step and week

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use tokio::signal;
use tracing::{error, info};

use api::{router, AppState};
use fetcher::{HttpSource, SourceConfig};
use pipeline::Pipeline;
use telemetry::{health, init_tracing_from_env};
use warehouse::{DuckDbClient, WarehouseConfig};

/// Application configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,

    #[serde(default)]
    source: SourceConfig,

    #[serde(default)]
    warehouse: WarehouseConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            source: SourceConfig::default(),
            warehouse: WarehouseConfig::default(),
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "funnel-analytics", version, about = "Funnel analytics over parquet events")]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Serve the HTTP API (default)
    Serve,
    /// Run the pipeline once and print the result as JSON
    Run {
        #[arg(long, value_enum, default_value_t = ReportKind::Conversion)]
        report: ReportKind,
    },
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ReportKind {
    Conversion,
    Revenue,
    Users,
    All,
    /// Session table rows rather than an aggregate
    Sessions,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    let cli = Cli::parse();
    let config = load_config()?;

    let warehouse_client =
        DuckDbClient::new(config.warehouse.clone()).context("Invalid warehouse config")?;
    let source = HttpSource::new(&config.source).context("Invalid source config")?;
    let pipeline = Arc::new(Pipeline::new(
        Arc::new(source),
        config.source.destination.clone(),
        warehouse_client,
    ));

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(&config, pipeline).await,
        Command::Run { report } => run_once(&pipeline, report).await,
    }
}

/// Run the pipeline once and print the requested report on stdout.
async fn run_once(pipeline: &Pipeline, kind: ReportKind) -> Result<()> {
    let json = match kind {
        ReportKind::Sessions => {
            let (_, sessions) = pipeline
                .run_with(|conn, config| warehouse::session_rows(conn, &config.session_table))
                .await
                .context("Pipeline run failed")?;
            serde_json::to_string_pretty(&sessions)?
        }
        _ => {
            let report = pipeline.run().await.context("Pipeline run failed")?;
            match kind {
                ReportKind::Conversion => serde_json::to_string_pretty(&report.conversion)?,
                ReportKind::Revenue => serde_json::to_string_pretty(&report.revenue)?,
                ReportKind::Users => serde_json::to_string_pretty(&report.users)?,
                _ => serde_json::to_string_pretty(&report)?,
            }
        }
    };

    println!("{}", json);
    Ok(())
}

async fn serve(config: &Config, pipeline: Arc<Pipeline>) -> Result<()> {
    info!("Starting Funnel Analytics v{}", env!("CARGO_PKG_VERSION"));
    info!(
        source = %config.source.url,
        database = %config.warehouse.database_path.display(),
        "Loaded config"
    );

    check_health(&pipeline).await;

    let app = router(AppState::new(pipeline));

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutdown complete");
    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("FUNNEL")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // Flat overrides for the settings changed most often
    if let Ok(url) = std::env::var("FUNNEL_SOURCE_URL") {
        config.source.url = url;
    }
    if let Ok(destination) = std::env::var("FUNNEL_SOURCE_DESTINATION") {
        config.source.destination = destination.into();
    }
    if let Ok(path) = std::env::var("FUNNEL_DATABASE_PATH") {
        config.warehouse.database_path = path.into();
    }
    if let Ok(strict) = std::env::var("FUNNEL_STRICT_SINGLE_VALUES") {
        config.warehouse.strict_single_values = strict == "1" || strict.eq_ignore_ascii_case("true");
    }

    Ok(config)
}

/// Check warehouse health on startup.
async fn check_health(pipeline: &Pipeline) {
    let client = pipeline.warehouse().clone();
    let healthy = tokio::task::spawn_blocking(move || warehouse::health::check_connection(&client))
        .await
        .unwrap_or(false);

    if healthy {
        health().warehouse.set_healthy();
        info!("Warehouse connection: healthy");
    } else {
        health().warehouse.set_unhealthy("Connection failed");
        error!("Warehouse connection: unhealthy");
    }
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
