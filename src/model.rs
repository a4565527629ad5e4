use serde::Serialize;
use std::time::Duration;

/// One record of an organization's index feed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SnapshotDescriptor {
    pub timestamp: String, // e.g. "20200101000000"
    pub url: String,       // original (pre-archive) URL
    pub digest: String,    // opaque content fingerprint, dedup key only
}

impl SnapshotDescriptor {
    /// Resolves the archive URL of this snapshot under `archive_base`, tagged
    /// with the organization whose feed listed it.
    pub fn resolve(&self, org: &str, archive_base: &str) -> FetchJob {
        FetchJob {
            org: org.to_string(),
            url: format!(
                "{}/{}/{}",
                archive_base.trim_end_matches('/'),
                self.timestamp,
                self.url
            ),
        }
    }
}

/// A resolved snapshot URL waiting in the job queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchJob {
    pub org: String, // organization the snapshot was discovered for
    pub url: String,
}

/// What happened to a single organization during the harvest.
#[derive(Debug, Clone, Default, Serialize)]
pub struct OrgSummary {
    pub org: String,
    pub enqueued: u64,
    pub duplicates: u64,
    pub malformed: u64,
    /// Set when the index feed itself could not be fetched.
    pub feed_error: Option<String>,
}

/// Final numbers printed at the end of a harvest.
#[derive(Debug, Clone, Serialize)]
pub struct HarvestReport {
    pub pages_fetched: u64,
    pub bytes_fetched: u64,
    pub jobs_abandoned: u64,
    pub organizations: usize,
    #[serde(serialize_with = "as_secs_f64")]
    pub elapsed: Duration,
    /// `None` when nothing was fetched.
    #[serde(serialize_with = "opt_as_secs_f64")]
    pub avg_time_per_page: Option<Duration>,
    /// `None` when the run finished within the clock's resolution.
    pub bytes_per_sec: Option<f64>,
    pub orgs: Vec<OrgSummary>,
}

impl HarvestReport {
    pub fn new(
        pages_fetched: u64,
        bytes_fetched: u64,
        jobs_abandoned: u64,
        elapsed: Duration,
        orgs: Vec<OrgSummary>,
    ) -> Self {
        let avg_time_per_page =
            (pages_fetched > 0).then(|| elapsed.div_f64(pages_fetched as f64));

        let secs = elapsed.as_secs_f64();
        let bytes_per_sec = (secs > 0.0).then(|| bytes_fetched as f64 / secs);

        Self {
            pages_fetched,
            bytes_fetched,
            jobs_abandoned,
            organizations: orgs.len(),
            elapsed,
            avg_time_per_page,
            bytes_per_sec,
            orgs,
        }
    }

    /// Total descriptors enqueued across all organizations.
    pub fn jobs_enqueued(&self) -> u64 {
        self.orgs.iter().map(|o| o.enqueued).sum()
    }

    /// One-line summary in the shape the CLI prints.
    pub fn summary_line(&self) -> String {
        let avg = self
            .avg_time_per_page
            .map(|d| format!("{:?}", d))
            .unwrap_or_else(|| "n/a".to_string());
        let rate = self
            .bytes_per_sec
            .map(|r| format!("{:.0} bytes/s", r))
            .unwrap_or_else(|| "n/a bytes/s".to_string());

        format!(
            "Done. Fetched {} pages for {} organizations. Took {:?} and {} bytes. Average time per page: {} at {}",
            self.pages_fetched, self.organizations, self.elapsed, self.bytes_fetched, avg, rate
        )
    }
}

fn as_secs_f64<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
    s.serialize_f64(d.as_secs_f64())
}

fn opt_as_secs_f64<S: serde::Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
    match d {
        Some(d) => s.serialize_some(&d.as_secs_f64()),
        None => s.serialize_none(),
    }
}
