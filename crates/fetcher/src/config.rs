//! Source configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Where the parquet file comes from and where it is kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// HTTP(S) URL serving the parquet payload
    #[serde(default = "default_url")]
    pub url: String,
    /// Local path the payload is written to
    #[serde(default = "default_destination")]
    pub destination: PathBuf,
    /// Whole-request timeout in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_url() -> String {
    "https://sde-test-data-sltezl542q-ew.a.run.app/".to_string()
}

fn default_destination() -> PathBuf {
    PathBuf::from("data/file.parquet")
}

fn default_timeout_secs() -> u64 {
    300
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: default_url(),
            destination: default_destination(),
            timeout_secs: default_timeout_secs(),
        }
    }
}
