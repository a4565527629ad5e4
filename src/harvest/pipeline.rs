//! Harvest coordinator.
//!
//! [`HarvestPipeline`] walks the configured organizations one at a time:
//! - fetches each organization's index feed (timeout, no retry)
//! - parses and deduplicates the feed, enqueueing one job per new digest
//! - closes the queue once every organization is done, then joins the workers
//!
//! Workers ([`crate::executor::WorkerPool`]) fetch and store snapshots
//! concurrently while the coordinator is still producing.

use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::config::HarvestConfig;
use crate::executor::{PoolError, WorkerContext, WorkerPool};
use crate::harvest::cdx;
use crate::harvest::dedup::SeenDigests;
use crate::harvest::fetcher::SnapshotFetcher;
use crate::harvest::queue::{self, JobSender, QueueClosed};
use crate::harvest::stats::HarvestStats;
use crate::model::{HarvestReport, OrgSummary};
use crate::traits::{SnapshotSink, SnapshotSource, StoreError};

// ============================================================================
// Pipeline Errors
// ============================================================================

/// Errors that end a harvest early.
#[derive(thiserror::Error, Debug)]
pub enum PipelineError {
    /// Nothing to harvest
    #[error("no organizations to harvest")]
    NoOrganizations,

    /// A fetched snapshot could not be persisted
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),

    /// A worker task died without returning
    #[error("worker panicked: {0}")]
    WorkerPanicked(String),
}

impl From<PoolError> for PipelineError {
    fn from(e: PoolError) -> Self {
        match e {
            PoolError::Storage(e) => PipelineError::Storage(e),
            PoolError::WorkerPanicked(msg) => PipelineError::WorkerPanicked(msg),
        }
    }
}

// ============================================================================
// Pipeline Executor
// ============================================================================

/// Drives a full harvest: organizations → feeds → dedup → queue → workers.
///
/// # Example
///
/// ```ignore
/// let config = HarvestConfig::default().with_orgs(["aaaid.org"]);
/// let source = Arc::new(HttpSource::new(config.timeout, None)?);
/// let store = Arc::new(FileStore::open(&config.output_dir).await?);
///
/// let report = HarvestPipeline::new(config, source, store).execute().await?;
/// println!("{}", report.summary_line());
/// ```
pub struct HarvestPipeline {
    config: HarvestConfig,
    source: Arc<dyn SnapshotSource>,
    sink: Arc<dyn SnapshotSink>,
}

impl HarvestPipeline {
    pub fn new(
        config: HarvestConfig,
        source: Arc<dyn SnapshotSource>,
        sink: Arc<dyn SnapshotSink>,
    ) -> Self {
        Self {
            config,
            source,
            sink,
        }
    }

    /// Runs the harvest to completion and returns the final report.
    ///
    /// Feed failures, malformed lines and abandoned snapshots are logged and
    /// reflected in the report. Only a storage failure aborts the run.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError`] if there are no organizations, a snapshot
    /// cannot be stored, or a worker panics.
    pub async fn execute(&self) -> Result<HarvestReport, PipelineError> {
        if self.config.orgs.is_empty() {
            return Err(PipelineError::NoOrganizations);
        }

        let start = Instant::now();
        let stats = Arc::new(HarvestStats::new());
        let fetcher = SnapshotFetcher::new(Arc::clone(&self.source))
            .with_timeout(self.config.timeout)
            .with_attempts(self.config.attempts);

        let (jobs, pending) = queue::bounded(self.config.queue_capacity());
        let pool = WorkerPool::spawn(
            self.config.workers,
            pending,
            WorkerContext {
                fetcher: fetcher.clone(),
                sink: Arc::clone(&self.sink),
                stats: Arc::clone(&stats),
            },
        );
        let progress = self
            .config
            .progress_interval
            .map(|every| spawn_progress(Arc::clone(&stats), every));

        info!(
            organizations = self.config.orgs.len(),
            workers = pool.len(),
            "Starting harvest"
        );

        let mut seen = SeenDigests::new();
        let mut summaries = Vec::with_capacity(self.config.orgs.len());
        for org in &self.config.orgs {
            if pool.is_halted() {
                warn!(org = %org, "Storage failure reported, skipping remaining organizations");
                break;
            }

            let mut summary = OrgSummary {
                org: org.clone(),
                ..Default::default()
            };
            let outcome = self
                .enqueue_org(&fetcher, &jobs, &mut seen, &mut summary)
                .await;
            seen.reset();

            info!(
                org = %org,
                enqueued = summary.enqueued,
                duplicates = summary.duplicates,
                malformed = summary.malformed,
                "Organization enqueued"
            );
            summaries.push(summary);

            if outcome.is_err() {
                warn!(org = %org, "Job queue closed by workers, stopping early");
                break;
            }
        }

        // Closing the queue is the only done-signal the workers get.
        jobs.close();
        let joined = pool.join().await;

        if let Some(progress) = progress {
            progress.abort();
            eprintln!();
        }
        joined?;

        let report = HarvestReport::new(
            stats.pages_fetched(),
            stats.bytes_fetched(),
            stats.jobs_abandoned(),
            start.elapsed(),
            summaries,
        );

        info!(
            pages = report.pages_fetched,
            bytes = report.bytes_fetched,
            abandoned = report.jobs_abandoned,
            duration_ms = report.elapsed.as_millis() as u64,
            "Harvest completed"
        );

        Ok(report)
    }

    /// Fetches one organization's index feed and enqueues its unique snapshots.
    ///
    /// Returns `Err` only when the queue was closed underneath us.
    async fn enqueue_org(
        &self,
        fetcher: &SnapshotFetcher,
        jobs: &JobSender,
        seen: &mut SeenDigests,
        summary: &mut OrgSummary,
    ) -> Result<(), QueueClosed> {
        let feed_url = self.config.feed_url(&summary.org);
        let feed = match fetcher.fetch(&feed_url).await {
            Ok(feed) => feed,
            Err(e) => {
                error!(org = %summary.org, url = %feed_url, error = %e, "Failed to fetch index feed, skipping organization");
                summary.feed_error = Some(e.to_string());
                return Ok(());
            }
        };

        let text = String::from_utf8_lossy(&feed);
        for (idx, line) in text.lines().enumerate() {
            let descriptor = match cdx::parse_line(line) {
                Ok(descriptor) => descriptor,
                Err(e) => {
                    summary.malformed += 1;
                    warn!(org = %summary.org, line = idx + 1, error = %e, "Skipping malformed index line");
                    continue;
                }
            };

            if !seen.admit(&descriptor.digest) {
                summary.duplicates += 1;
                continue;
            }

            let job = descriptor.resolve(&summary.org, &self.config.archive_url);
            jobs.push(job).await?;
            summary.enqueued += 1;
        }

        Ok(())
    }
}

/// Prints the live page counter every `every` until aborted.
fn spawn_progress(stats: Arc<HarvestStats>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every.max(Duration::from_millis(1)));
        loop {
            ticker.tick().await;
            eprint!("\rDownloaded {} pages", stats.pages_fetched());
        }
    })
}

// ============================================================================
// Tests
// ============================================================================
