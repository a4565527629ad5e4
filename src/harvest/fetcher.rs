//! Snapshot fetching: the HTTP source, the per-call timeout and the retry loop.

use async_trait::async_trait;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::timeout;
use tracing::warn;

use crate::traits::{FetchError, SnapshotSource};

const USER_AGENT: &str = concat!("archive-harvester/", env!("CARGO_PKG_VERSION"));

/// Default number of attempts per snapshot.
pub const DEFAULT_ATTEMPTS: usize = 2;

/// Default per-call timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(20);

/// Runs `op` up to `attempts` times (at least once), stopping at the first
/// success. No delay between attempts. The closure receives the 1-based
/// attempt number; on exhaustion the last error is returned.
pub async fn with_retry<T, E, F, Fut>(attempts: usize, mut op: F) -> Result<T, E>
where
    F: FnMut(usize) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let attempts = attempts.max(1);
    let mut attempt = 1;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt >= attempts => return Err(e),
            Err(_) => attempt += 1,
        }
    }
}

/// Wraps a [`SnapshotSource`] with a fixed timeout and a retry budget.
#[derive(Clone)]
pub struct SnapshotFetcher {
    source: Arc<dyn SnapshotSource>,
    timeout: Duration,
    attempts: usize,
}

impl SnapshotFetcher {
    /// Creates a fetcher with the default timeout (20s) and 2 attempts per call.
    pub fn new(source: Arc<dyn SnapshotSource>) -> Self {
        Self {
            source,
            timeout: DEFAULT_TIMEOUT,
            attempts: DEFAULT_ATTEMPTS,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the number of attempts per snapshot. Zero is treated as one.
    pub fn with_attempts(mut self, attempts: usize) -> Self {
        self.attempts = attempts.max(1);
        self
    }

    pub fn attempts(&self) -> usize {
        self.attempts
    }

    /// Single attempt, bounded by the configured timeout.
    pub async fn fetch(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        timeout(self.timeout, self.source.get(url))
            .await
            .map_err(|_| FetchError::Transport(format!("timed out after {:?}", self.timeout)))?
    }

    /// Fetches `url`, retrying failed attempts until the budget is spent.
    pub async fn fetch_with_retry(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        with_retry(self.attempts, |attempt| async move {
            let result = self.fetch(url).await;
            if let Err(e) = &result {
                warn!(url, attempt, max_attempts = self.attempts, error = %e, "Fetch attempt failed");
            }
            result
        })
        .await
    }
}

/// [`SnapshotSource`] backed by `reqwest`, optionally routed through a proxy
/// endpoint that takes the target as its `url` query parameter.
#[derive(Clone)]
pub struct HttpSource {
    http: reqwest::Client,
    proxy: Option<String>,
}

impl HttpSource {
    pub fn new(timeout: Duration, proxy: Option<String>) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        Ok(Self { http, proxy })
    }

    fn request(&self, url: &str) -> reqwest::RequestBuilder {
        match &self.proxy {
            Some(proxy) => self.http.get(proxy).query(&[("url", url)]),
            None => self.http.get(url),
        }
    }
}

#[async_trait]
impl SnapshotSource for HttpSource {
    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let response = self
            .request(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::BadStatus(status.as_u16()));
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;
        Ok(body.to_vec())
    }
}
