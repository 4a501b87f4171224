//! Parquet sources.

use async_trait::async_trait;
use funnel_core::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::SourceConfig;

/// Something that can produce the parquet payload on local disk.
///
/// The HTTP implementation is used in production; tests substitute
/// implementations that copy fixtures.
#[async_trait]
pub trait ParquetSource: Send + Sync {
    /// Writes the full payload to `destination`, replacing any existing
    /// file. Returns the number of bytes written.
    async fn fetch(&self, destination: &Path) -> Result<u64>;

    /// Human-readable origin, for logs.
    fn origin(&self) -> String;
}

/// Downloads the payload with a streaming GET.
#[derive(Debug, Clone)]
pub struct HttpSource {
    url: Url,
    http_client: reqwest::Client,
}

impl HttpSource {
    /// Creates a new HTTP source from config.
    pub fn new(config: &SourceConfig) -> Result<Self> {
        let url = Url::parse(&config.url)
            .map_err(|e| Error::config(format!("invalid source url {:?}: {}", config.url, e)))?;

        if !matches!(url.scheme(), "http" | "https") {
            return Err(Error::config(format!(
                "unsupported source scheme: {}",
                url.scheme()
            )));
        }

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| Error::internal(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { url, http_client })
    }

    async fn download(&self, partial: &Path) -> Result<u64> {
        let mut response = self
            .http_client
            .get(self.url.clone())
            .send()
            .await
            .map_err(|e| Error::network(format!("request to {} failed: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::network(format!(
                "{} returned {}",
                self.url, status
            )));
        }

        let mut file = tokio::fs::File::create(partial).await?;
        let mut written: u64 = 0;

        while let Some(chunk) = response
            .chunk()
            .await
            .map_err(|e| Error::network(format!("reading body from {} failed: {}", self.url, e)))?
        {
            file.write_all(&chunk).await?;
            written += chunk.len() as u64;
        }

        file.flush().await?;
        file.sync_all().await?;
        Ok(written)
    }
}

#[async_trait]
impl ParquetSource for HttpSource {
    async fn fetch(&self, destination: &Path) -> Result<u64> {
        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        let partial = partial_path(destination);
        debug!(url = %self.url, partial = %partial.display(), "Downloading source");

        match self.download(&partial).await {
            Ok(bytes) => {
                tokio::fs::rename(&partial, destination).await?;
                info!(url = %self.url, bytes = bytes, "Source downloaded");
                Ok(bytes)
            }
            Err(e) => {
                if let Err(cleanup) = tokio::fs::remove_file(&partial).await {
                    if cleanup.kind() != std::io::ErrorKind::NotFound {
                        warn!(error = %cleanup, "Failed to remove partial download");
                    }
                }
                Err(e)
            }
        }
    }

    fn origin(&self) -> String {
        self.url.to_string()
    }
}

/// Sibling path the body streams into before it replaces `destination`.
fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(".part");
    destination.with_file_name(name)
}
