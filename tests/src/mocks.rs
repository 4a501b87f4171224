//! Mock implementations for testing.

use async_trait::async_trait;
use fetcher::ParquetSource;
use funnel_core::{Error, Result};
use parking_lot::Mutex;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Mock source that writes an in-memory payload.
///
/// Implements the same `ParquetSource` trait as `HttpSource`, so the
/// pipeline runs its production path minus the network transport.
#[derive(Clone)]
pub struct MockSource {
    payload: Arc<Mutex<Vec<u8>>>,
    should_fail: Arc<Mutex<bool>>,
    fetches: Arc<AtomicUsize>,
}

impl MockSource {
    pub fn new(payload: Vec<u8>) -> Self {
        Self {
            payload: Arc::new(Mutex::new(payload)),
            should_fail: Arc::new(Mutex::new(false)),
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Replace the payload served on the next fetch.
    pub fn set_payload(&self, payload: Vec<u8>) {
        *self.payload.lock() = payload;
    }

    /// Simulate an unreachable source.
    pub fn set_should_fail(&self, fail: bool) {
        *self.should_fail.lock() = fail;
    }

    /// Number of fetches attempted.
    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ParquetSource for MockSource {
    async fn fetch(&self, destination: &Path) -> Result<u64> {
        self.fetches.fetch_add(1, Ordering::SeqCst);

        if *self.should_fail.lock() {
            return Err(Error::network("mock source unreachable"));
        }

        let payload = self.payload.lock().clone();
        if let Some(parent) = destination.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(destination, &payload).await?;
        Ok(payload.len() as u64)
    }

    fn origin(&self) -> String {
        "mock".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_mock_source_writes_payload() {
        let dir = TempDir::new().unwrap();
        let dest = dir.path().join("nested/file.parquet");
        let mock = MockSource::new(b"abc".to_vec());

        assert_eq!(mock.fetch(&dest).await.unwrap(), 3);
        assert_eq!(std::fs::read(&dest).unwrap(), b"abc");
        assert_eq!(mock.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_mock_source_failure_mode() {
        let dir = TempDir::new().unwrap();
        let mock = MockSource::new(Vec::new());
        mock.set_should_fail(true);

        let err = mock.fetch(&dir.path().join("f")).await.unwrap_err();
        assert_eq!(err.code(), "NET_001");
    }
}
