use crate::harvest::fetcher::SnapshotFetcher;
use crate::harvest::queue::JobReceiver;
use crate::harvest::stats::HarvestStats;
use crate::traits::{SnapshotSink, StoreError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::task::JoinSet;
use tracing::{debug, error, instrument, warn};

/// Everything a worker needs, shared by all of them.
#[derive(Clone)]
pub struct WorkerContext {
    pub fetcher: SnapshotFetcher,
    pub sink: Arc<dyn SnapshotSink>,
    pub stats: Arc<HarvestStats>,
}

/// Fixed set of workers draining a [`JobReceiver`].
///
/// The pool is done when the queue is closed and every worker has returned;
/// see [`WorkerPool::join`].
pub struct WorkerPool {
    workers: JoinSet<Result<(), StoreError>>,
    halted: Arc<AtomicBool>,
}

impl WorkerPool {
    /// Spawns `count` workers (at least one) on the current runtime.
    pub fn spawn(count: usize, jobs: JobReceiver, ctx: WorkerContext) -> Self {
        let halted = Arc::new(AtomicBool::new(false));
        let mut workers = JoinSet::new();

        for worker_id in 0..count.max(1) {
            workers.spawn(run_worker(
                worker_id,
                jobs.clone(),
                ctx.clone(),
                Arc::clone(&halted),
            ));
        }

        Self { workers, halted }
    }

    pub fn len(&self) -> usize {
        self.workers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.workers.is_empty()
    }

    /// True once a worker hit a storage failure and stopped the pool.
    pub fn is_halted(&self) -> bool {
        self.halted.load(Ordering::Acquire)
    }

    /// Waits for every worker to return. The first storage failure wins.
    pub async fn join(mut self) -> Result<(), PoolError> {
        let mut first_err = None;
        while let Some(joined) = self.workers.join_next().await {
            let outcome = match joined {
                Ok(Ok(())) => continue,
                Ok(Err(e)) => PoolError::Storage(e),
                Err(e) => PoolError::WorkerPanicked(e.to_string()),
            };
            first_err.get_or_insert(outcome);
        }
        first_err.map_or(Ok(()), Err)
    }
}

#[derive(thiserror::Error, Debug)]
pub enum PoolError {
    #[error("storage failure: {0}")]
    Storage(#[from] StoreError),
    #[error("worker panicked: {0}")]
    WorkerPanicked(String),
}

#[instrument(skip(jobs, ctx, halted))]
async fn run_worker(
    worker_id: usize,
    jobs: JobReceiver,
    ctx: WorkerContext,
    halted: Arc<AtomicBool>,
) -> Result<(), StoreError> {
    while let Some(job) = jobs.pop().await {
        if halted.load(Ordering::Acquire) {
            break;
        }

        let body = match ctx.fetcher.fetch_with_retry(&job.url).await {
            Ok(body) => body,
            Err(e) => {
                ctx.stats.record_abandoned();
                error!(
                    org = %job.org,
                    url = %job.url,
                    attempts = ctx.fetcher.attempts(),
                    error = %e,
                    "Giving up on snapshot"
                );
                continue;
            }
        };

        let id = ctx.stats.allocate_id();
        if let Err(e) = ctx.sink.store(id, &body).await {
            error!(
                org = %job.org,
                url = %job.url,
                id,
                error = %e,
                "Failed to store snapshot, halting harvest"
            );
            halted.store(true, Ordering::Release);
            let discarded = jobs.abort().await;
            if discarded > 0 {
                warn!(discarded, "Discarded queued jobs after storage failure");
            }
            return Err(e);
        }

        ctx.stats.record_page(body.len());
        debug!(url = %job.url, id, bytes = body.len(), "Stored snapshot");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::harvest::queue;
    use crate::model::FetchJob;
    use crate::traits::{FetchError, SnapshotSource};
    use async_trait::async_trait;
    use std::collections::HashMap;
    use std::sync::Mutex;

    // Body is the URL itself; URLs containing "fail" always 500.
    struct EchoSource;

    #[async_trait]
    impl SnapshotSource for EchoSource {
        async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
            tokio::task::yield_now().await;
            if url.contains("fail") {
                Err(FetchError::BadStatus(500))
            } else {
                Ok(url.as_bytes().to_vec())
            }
        }
    }

    #[derive(Default)]
    struct MemorySink {
        items: Mutex<HashMap<u64, Vec<u8>>>,
    }

    #[async_trait]
    impl SnapshotSink for MemorySink {
        async fn store(&self, id: u64, content: &[u8]) -> Result<(), StoreError> {
            let previous = self.items.lock().unwrap().insert(id, content.to_vec());
            assert!(previous.is_none(), "id {id} stored twice");
            Ok(())
        }
    }

    struct BrokenSink;

    #[async_trait]
    impl SnapshotSink for BrokenSink {
        async fn store(&self, id: u64, _content: &[u8]) -> Result<(), StoreError> {
            Err(StoreError::Io {
                id,
                source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
            })
        }
    }

    fn jobs() -> Vec<FetchJob> {
        (0..40)
            .map(|n| {
                let kind = if n % 7 == 0 { "fail" } else { "ok" };
                FetchJob {
                    org: format!("{kind}.org"),
                    url: format!("https://web.archive.org/web/{n}/http://{kind}.org/"),
                }
            })
            .collect()
    }

    async fn run_pool(
        workers: usize,
        sink: Arc<dyn SnapshotSink>,
    ) -> (Arc<HarvestStats>, Result<(), PoolError>) {
        let stats = Arc::new(HarvestStats::new());
        let ctx = WorkerContext {
            fetcher: SnapshotFetcher::new(Arc::new(EchoSource)).with_attempts(2),
            sink,
            stats: Arc::clone(&stats),
        };
        let (tx, rx) = queue::bounded(workers * 2);
        let pool = WorkerPool::spawn(workers, rx, ctx);
        assert_eq!(pool.len(), workers);

        for job in jobs() {
            if tx.push(job).await.is_err() {
                break;
            }
        }
        tx.close();
        let result = pool.join().await;
        (stats, result)
    }

    #[tokio::test]
    async fn test_counters_match_successful_jobs() {
        let expected: Vec<FetchJob> = jobs()
            .into_iter()
            .filter(|j| !j.url.contains("fail"))
            .collect();
        let expected_bytes: u64 = expected.iter().map(|j| j.url.len() as u64).sum();

        let sink = Arc::new(MemorySink::default());
        let (stats, result) = run_pool(3, sink.clone()).await;

        result.unwrap();
        assert_eq!(stats.pages_fetched(), expected.len() as u64);
        assert_eq!(stats.bytes_fetched(), expected_bytes);
        assert_eq!(stats.jobs_abandoned(), 6);
        assert_eq!(sink.items.lock().unwrap().len(), expected.len());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_counters_independent_of_worker_count() {
        let (single, r1) = run_pool(1, Arc::new(MemorySink::default())).await;
        let (many, r8) = run_pool(8, Arc::new(MemorySink::default())).await;

        r1.unwrap();
        r8.unwrap();
        assert_eq!(single.pages_fetched(), many.pages_fetched());
        assert_eq!(single.bytes_fetched(), many.bytes_fetched());
        assert_eq!(single.jobs_abandoned(), many.jobs_abandoned());
    }

    #[tokio::test]
    async fn test_storage_failure_halts_pool() {
        let (stats, result) = run_pool(4, Arc::new(BrokenSink)).await;

        assert!(matches!(result, Err(PoolError::Storage(StoreError::Io { .. }))));
        assert_eq!(stats.pages_fetched(), 0);
    }

    #[tokio::test]
    async fn test_pool_reports_halt_before_queue_closes() {
        let ctx = WorkerContext {
            fetcher: SnapshotFetcher::new(Arc::new(EchoSource)),
            sink: Arc::new(BrokenSink),
            stats: Arc::new(HarvestStats::new()),
        };
        let (tx, rx) = queue::bounded(4);
        let pool = WorkerPool::spawn(2, rx, ctx);
        assert!(!pool.is_halted());

        tx.push(FetchJob {
            org: "a.org".to_string(),
            url: "https://web.archive.org/web/1/http://a.org/".to_string(),
        })
        .await
        .unwrap();

        tokio::time::timeout(std::time::Duration::from_secs(2), async {
            while !pool.is_halted() {
                tokio::time::sleep(std::time::Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("pool should halt after the storage failure");

        tx.close();
        assert!(matches!(pool.join().await, Err(PoolError::Storage(_))));
    }

    #[tokio::test]
    async fn test_idle_pool_exits_when_queue_closes() {
        let ctx = WorkerContext {
            fetcher: SnapshotFetcher::new(Arc::new(EchoSource)),
            sink: Arc::new(MemorySink::default()),
            stats: Arc::new(HarvestStats::new()),
        };
        let (tx, rx) = queue::bounded(1);
        let pool = WorkerPool::spawn(0, rx, ctx);
        assert_eq!(pool.len(), 1);

        tx.close();
        pool.join().await.unwrap();
    }
}
