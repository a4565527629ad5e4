use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    /// DNS, connection, body read or timeout failure.
    #[error("transport error: {0}")]
    Transport(String),
    #[error("non 2xx status code: {0}")]
    BadStatus(u16),
}

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("failed to store snapshot {id}: {source}")]
    Io {
        id: u64,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to prepare output location: {0}")]
    Setup(#[from] std::io::Error),
}

/// Something that can `GET` a URL and hand back the raw body.
#[async_trait]
pub trait SnapshotSource: Send + Sync {
    /// Fetches `url`. Implementations classify non-2xx responses as
    /// [`FetchError::BadStatus`] and everything else as [`FetchError::Transport`].
    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError>;
}

/// Destination for fetched snapshot bodies.
///
/// Called concurrently from every worker; `id` is never reused within a run.
#[async_trait]
pub trait SnapshotSink: Send + Sync {
    async fn store(&self, id: u64, content: &[u8]) -> Result<(), StoreError>;
}
