use archive_harvester::{Cli, FileStore, HarvestPipeline, HttpSource};
use clap::Parser;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("archive_harvester=info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = Cli::parse().build_config()?;
    info!(
        organizations = config.orgs.len(),
        workers = config.workers,
        attempts = config.attempts,
        timeout_secs = config.timeout.as_secs(),
        output = %config.output_dir.display(),
        proxy = config.proxy_url.as_deref().unwrap_or("none"),
        "Configuration loaded"
    );

    let store = FileStore::open(&config.output_dir).await?;
    let source = HttpSource::new(config.timeout, config.proxy_url.clone())?;
    let report_path = config.report_json.clone();

    let report = HarvestPipeline::new(config, Arc::new(source), Arc::new(store))
        .execute()
        .await?;
    println!("{}", report.summary_line());

    if let Some(path) = report_path {
        tokio::fs::write(&path, serde_json::to_vec_pretty(&report)?).await?;
        info!(path = %path.display(), "Wrote JSON report");
    }

    Ok(())
}
