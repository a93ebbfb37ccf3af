use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use listing_extractor::Pipeline;
use listing_extractor::agent::ExtractionAgent;
use listing_extractor::config::{AgentConfig, Cli};
use listing_extractor::error::PipelineError;
use listing_extractor::export::CsvExporter;
use listing_extractor::scraper::{PageFetcher, TextNormalizer};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let cli = Cli::parse();
    info!("Starting listing extractor for {}", cli.url);

    let config = AgentConfig::from_env().context("Failed to load model configuration")?;
    let pipeline = Pipeline::new(
        PageFetcher::new()?,
        TextNormalizer::new(cli.debug_file),
        ExtractionAgent::new(config)?,
        CsvExporter::new(cli.output_dir),
    );

    // Handled failures are logged; the process still exits normally.
    match pipeline.run(&cli.url).await {
        Ok(_) => {}
        Err(PipelineError::Agent(e)) => error!("An error occurred: {}", e),
        Err(e) => error!("Run aborted, no results written: {}", e),
    }

    Ok(())
}
