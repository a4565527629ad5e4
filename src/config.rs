//! Harvest settings and the command line that produces them.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

use crate::harvest::fetcher::{DEFAULT_ATTEMPTS, DEFAULT_TIMEOUT};

pub const DEFAULT_WORKERS: usize = 4;
pub const DEFAULT_OUTPUT_DIR: &str = "scraped";
pub const DEFAULT_CDX_URL: &str = "http://web.archive.org/cdx/search/cdx";
pub const DEFAULT_ARCHIVE_URL: &str = "https://web.archive.org/web";
pub const DEFAULT_PROGRESS_INTERVAL: Duration = Duration::from_millis(200);

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read organization list {path}: {source}")]
    OrgsFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("no organizations given; use --org or --orgs-file")]
    NoOrganizations,
    #[error("invalid value for {option}: {reason}")]
    InvalidValue {
        option: &'static str,
        reason: String,
    },
}

/// Static settings for one harvest run.
#[derive(Debug, Clone, PartialEq)]
pub struct HarvestConfig {
    /// Concurrent snapshot workers.
    pub workers: usize,
    /// Per-request timeout, applied to feeds and snapshots alike.
    pub timeout: Duration,
    /// Attempts per snapshot before it is abandoned.
    pub attempts: usize,
    /// Job queue buffer; `None` means twice the worker count.
    pub queue_capacity: Option<usize>,
    pub output_dir: PathBuf,
    pub orgs: Vec<String>,
    pub proxy_url: Option<String>,
    pub cdx_url: String,
    pub archive_url: String,
    /// `None` disables the live progress line.
    pub progress_interval: Option<Duration>,
    pub report_json: Option<PathBuf>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            timeout: DEFAULT_TIMEOUT,
            attempts: DEFAULT_ATTEMPTS,
            queue_capacity: None,
            output_dir: PathBuf::from(DEFAULT_OUTPUT_DIR),
            orgs: Vec::new(),
            proxy_url: None,
            cdx_url: DEFAULT_CDX_URL.to_string(),
            archive_url: DEFAULT_ARCHIVE_URL.to_string(),
            progress_interval: Some(DEFAULT_PROGRESS_INTERVAL),
            report_json: None,
        }
    }
}

impl HarvestConfig {
    pub fn with_orgs<I, S>(mut self, orgs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.orgs = orgs.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_attempts(mut self, attempts: usize) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = Some(capacity);
        self
    }

    pub fn with_cdx_url(mut self, url: impl Into<String>) -> Self {
        self.cdx_url = url.into();
        self
    }

    pub fn with_archive_url(mut self, url: impl Into<String>) -> Self {
        self.archive_url = url.into();
        self
    }

    pub fn with_progress_interval(mut self, interval: Option<Duration>) -> Self {
        self.progress_interval = interval;
        self
    }

    /// Effective job queue capacity.
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
            .unwrap_or(self.workers.saturating_mul(2))
            .max(1)
    }

    /// Index feed URL for `org`.
    pub fn feed_url(&self, org: &str) -> String {
        format!("{}?url={}", self.cdx_url, org)
    }
}

/// Command line for the `archive-harvester` binary.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "archive-harvester",
    version,
    about = "Download every archived snapshot of a list of organizations' sites"
)]
pub struct Cli {
    /// Organization domain to harvest (repeatable)
    #[arg(long = "org", value_name = "DOMAIN")]
    pub orgs: Vec<String>,

    /// File with one organization per line; blank lines and `#` comments are ignored
    #[arg(long, env = "HARVEST_ORGS_FILE")]
    pub orgs_file: Option<PathBuf>,

    /// Number of concurrent snapshot workers
    #[arg(long, env = "HARVEST_WORKERS", default_value_t = DEFAULT_WORKERS)]
    pub workers: usize,

    /// Per-request timeout in seconds
    #[arg(long, env = "HARVEST_TIMEOUT_SECS", default_value_t = DEFAULT_TIMEOUT.as_secs())]
    pub timeout_secs: u64,

    /// Attempts per snapshot before giving up
    #[arg(long, env = "HARVEST_RETRIES", default_value_t = DEFAULT_ATTEMPTS)]
    pub retries: usize,

    /// Job queue capacity (0 = twice the worker count)
    #[arg(long, env = "HARVEST_QUEUE_CAPACITY", default_value_t = 0)]
    pub queue_capacity: usize,

    /// Folder snapshots are written to
    #[arg(long, short, env = "HARVEST_OUTPUT", default_value = DEFAULT_OUTPUT_DIR)]
    pub output: PathBuf,

    /// Proxy endpoint; targets are passed as its `url` query parameter
    #[arg(long, env = "HARVEST_PROXY_URL")]
    pub proxy_url: Option<String>,

    /// Index feed (CDX) endpoint
    #[arg(long, env = "HARVEST_CDX_URL", default_value = DEFAULT_CDX_URL)]
    pub cdx_url: String,

    /// Base URL snapshots are resolved against
    #[arg(long, env = "HARVEST_ARCHIVE_URL", default_value = DEFAULT_ARCHIVE_URL)]
    pub archive_url: String,

    /// Progress refresh interval in milliseconds (0 = off)
    #[arg(long, env = "HARVEST_PROGRESS_MS", default_value_t = 200)]
    pub progress_ms: u64,

    /// Also write the final report as JSON to this path
    #[arg(long, env = "HARVEST_REPORT_JSON")]
    pub report_json: Option<PathBuf>,
}

impl Cli {
    /// Converts the parsed command line into a [`HarvestConfig`], loading the
    /// organization file if one was given.
    pub fn build_config(&self) -> Result<HarvestConfig, ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::InvalidValue {
                option: "--workers",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                option: "--timeout-secs",
                reason: "must be at least 1".to_string(),
            });
        }

        let mut orgs = self.orgs.clone();
        if let Some(path) = &self.orgs_file {
            let text = std::fs::read_to_string(path).map_err(|source| ConfigError::OrgsFile {
                path: path.clone(),
                source,
            })?;
            orgs.extend(parse_org_list(&text));
        }
        if orgs.is_empty() {
            return Err(ConfigError::NoOrganizations);
        }

        Ok(HarvestConfig {
            workers: self.workers,
            timeout: Duration::from_secs(self.timeout_secs),
            attempts: self.retries.max(1),
            queue_capacity: (self.queue_capacity > 0).then_some(self.queue_capacity),
            output_dir: self.output.clone(),
            orgs,
            proxy_url: self.proxy_url.clone().filter(|p| !p.is_empty()),
            cdx_url: self.cdx_url.clone(),
            archive_url: self.archive_url.clone(),
            progress_interval: (self.progress_ms > 0)
                .then(|| Duration::from_millis(self.progress_ms)),
            report_json: self.report_json.clone(),
        })
    }
}

/// Parses an organization list: one entry per line, trimmed, skipping blank
/// lines and `#` comments.
pub fn parse_org_list(text: &str) -> Vec<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty() && !line.starts_with('#'))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cli(args: &[&str]) -> Cli {
        let mut argv = vec!["archive-harvester"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = cli(&["--org", "aaaid.org"]).build_config().unwrap();

        assert_eq!(config.workers, 4);
        assert_eq!(config.timeout, Duration::from_secs(20));
        assert_eq!(config.attempts, 2);
        assert_eq!(config.queue_capacity(), 8);
        assert_eq!(config.output_dir, PathBuf::from("scraped"));
        assert_eq!(config.orgs, vec!["aaaid.org"]);
        assert_eq!(config.progress_interval, Some(Duration::from_millis(200)));
        assert!(config.proxy_url.is_none());
    }

    #[test]
    fn test_feed_url() {
        let config = HarvestConfig::default();
        assert_eq!(
            config.feed_url("2ie-edu.org"),
            "http://web.archive.org/cdx/search/cdx?url=2ie-edu.org"
        );
    }

    #[test]
    fn test_orgs_file_appends_after_flags() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("orgs.txt");
        std::fs::write(&path, "# intergovernmental\n aaaid.org \n\nadb.org\n#aacb.org\n").unwrap();

        let config = cli(&["--org", "2ie-edu.org", "--orgs-file", path.to_str().unwrap()])
            .build_config()
            .unwrap();
        assert_eq!(config.orgs, vec!["2ie-edu.org", "aaaid.org", "adb.org"]);
    }

    #[test]
    fn test_missing_orgs_file() {
        let err = cli(&["--orgs-file", "/definitely/not/here.txt"])
            .build_config()
            .unwrap_err();
        assert!(matches!(err, ConfigError::OrgsFile { .. }));
    }

    #[test]
    fn test_rejects_empty_org_list_and_zero_workers() {
        assert!(matches!(
            cli(&[]).build_config(),
            Err(ConfigError::NoOrganizations)
        ));
        assert!(matches!(
            cli(&["--org", "a.org", "--workers", "0"]).build_config(),
            Err(ConfigError::InvalidValue { option: "--workers", .. })
        ));
    }

    #[test]
    fn test_overrides() {
        let config = cli(&[
            "--org",
            "a.org",
            "--workers",
            "16",
            "--retries",
            "0",
            "--queue-capacity",
            "3",
            "--progress-ms",
            "0",
            "--proxy-url",
            "https://proxy.example.com/dev",
        ])
        .build_config()
        .unwrap();

        assert_eq!(config.workers, 16);
        assert_eq!(config.attempts, 1);
        assert_eq!(config.queue_capacity(), 3);
        assert!(config.progress_interval.is_none());
        assert_eq!(config.proxy_url.as_deref(), Some("https://proxy.example.com/dev"));
    }

    #[test]
    fn test_builder_setters() {
        let config = HarvestConfig::default()
            .with_orgs(["a.org", "b.org"])
            .with_workers(1)
            .with_queue_capacity(0);

        assert_eq!(config.orgs.len(), 2);
        assert_eq!(config.queue_capacity(), 1);
    }
}
