//! Worker pools
//!
//! File I/O runs on the blocking thread pool behind a small semaphore so
//! disk work is bounded; uploads are serialized behind a second semaphore.

use std::sync::Arc;

use beacon_config::PipelineConfig;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::{PipelineError, Result};

/// Shared concurrency limits for file and network work
#[derive(Debug, Clone)]
pub struct WorkerPools {
    file_io: Arc<Semaphore>,
    network_io: Arc<Semaphore>,
}

impl WorkerPools {
    /// Create pools with the given concurrency limits (zero is treated as one)
    pub fn new(file_io: usize, network_io: usize) -> Self {
        Self {
            file_io: Arc::new(Semaphore::new(file_io.max(1))),
            network_io: Arc::new(Semaphore::new(network_io.max(1))),
        }
    }

    /// Create pools from pipeline configuration
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self::new(config.file_io_concurrency, config.network_io_concurrency)
    }

    /// Run blocking file work with a file-I/O permit held
    pub async fn file_io<T, F>(&self, f: F) -> Result<T>
    where
        F: FnOnce() -> T + Send + 'static,
        T: Send + 'static,
    {
        let permit = self
            .file_io
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PipelineError::worker("file-io pool closed"))?;

        tokio::task::spawn_blocking(move || {
            let _permit = permit;
            f()
        })
        .await
        .map_err(|e| PipelineError::worker(format!("file-io task failed: {e}")))
    }

    /// Acquire a network-I/O permit; uploads hold it for a whole cycle
    pub async fn network_io(&self) -> Result<OwnedSemaphorePermit> {
        self.network_io
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| PipelineError::worker("network-io pool closed"))
    }

    /// Free file-I/O permits
    pub fn file_io_available(&self) -> usize {
        self.file_io.available_permits()
    }

    /// Free network-I/O permits
    pub fn network_io_available(&self) -> usize {
        self.network_io.available_permits()
    }
}

impl Default for WorkerPools {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let pools = WorkerPools::default();
        assert_eq!(pools.file_io_available(), 2);
        assert_eq!(pools.network_io_available(), 1);
    }

    #[test]
    fn test_zero_is_one() {
        let pools = WorkerPools::new(0, 0);
        assert_eq!(pools.file_io_available(), 1);
        assert_eq!(pools.network_io_available(), 1);
    }

    #[tokio::test]
    async fn test_file_io_runs_and_releases() {
        let pools = WorkerPools::new(1, 1);
        let value = pools.file_io(|| 21 * 2).await.unwrap();
        assert_eq!(value, 42);
        assert_eq!(pools.file_io_available(), 1);
    }

    #[tokio::test]
    async fn test_network_permit_serializes() {
        let pools = WorkerPools::new(1, 1);
        let permit = pools.network_io().await.unwrap();
        assert_eq!(pools.network_io_available(), 0);
        drop(permit);
        assert_eq!(pools.network_io_available(), 1);
    }
}
