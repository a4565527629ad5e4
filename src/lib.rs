pub mod config;
pub mod executor;
pub mod harvest;
pub mod model;
pub mod traits;

// Re-export common types for convenience
pub use config::{Cli, ConfigError, HarvestConfig};
pub use executor::*;
pub use harvest::{FileStore, HarvestPipeline, HarvestStats, HttpSource, PipelineError};
pub use model::*;
pub use traits::*;
