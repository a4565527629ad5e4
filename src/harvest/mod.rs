//! Harvest module - archived snapshot discovery and retrieval.
//!
//! - **Parsing**: index feed lines via [`cdx::parse_line`]
//! - **Dedup**: per-organization digest tracking via [`SeenDigests`]
//! - **Fetching**: timeout and retry around a source via [`SnapshotFetcher`]
//! - **Queueing**: bounded job channel via [`queue::bounded`]
//! - **Pipeline**: the coordinator, [`pipeline::HarvestPipeline`]

pub mod cdx;
pub mod dedup;
pub mod fetcher;
pub mod pipeline;
pub mod queue;
pub mod stats;
pub mod store;

pub use cdx::{parse_line, ParseError, CDX_FIELD_COUNT};
pub use dedup::{dedup_descriptors, SeenDigests};
pub use fetcher::{with_retry, HttpSource, SnapshotFetcher};
pub use pipeline::{HarvestPipeline, PipelineError};
pub use queue::{JobReceiver, JobSender, QueueClosed};
pub use stats::HarvestStats;
pub use store::FileStore;
