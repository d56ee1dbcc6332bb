mod config;
mod download;
mod models;
mod pipeline;
mod scrapers;
mod throttle;

use anyhow::{bail, Context, Result};
use clap::Parser;
use config::PipelineConfig;
use models::Listing;
use pipeline::ImagePipeline;
use scrapers::HeadlessChromeBackend;
use std::path::PathBuf;
use std::time::Duration;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Fetch listing photos for kos (boarding houses) into the public image directory
#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    /// JSON file with an array of {"name": ..., "city": ...} listings
    #[arg(short, long, conflicts_with_all = ["name", "city"])]
    listings: Option<PathBuf>,

    /// Name of a single listing to fetch images for
    #[arg(short, long, requires = "city")]
    name: Option<String>,

    /// City of the single listing
    #[arg(short, long, requires = "name")]
    city: Option<String>,

    /// Directory images are written to
    #[arg(long)]
    image_dir: Option<PathBuf>,

    /// URL prefix the image directory is served under
    #[arg(long)]
    public_prefix: Option<String>,

    /// Pause between listings, in milliseconds
    #[arg(long)]
    delay_ms: Option<u64>,

    /// Save rendered search pages here for inspection
    #[arg(long)]
    debug_dir: Option<PathBuf>,

    /// Show the browser window
    #[arg(long)]
    headful: bool,

    /// Where to write the JSON manifest of stored images
    #[arg(short, long, default_value = "kos_images.json")]
    output: PathBuf,
}

impl Args {
    fn apply(&self, mut config: PipelineConfig) -> PipelineConfig {
        if let Some(dir) = &self.image_dir {
            config.image_dir = dir.clone();
        }
        if let Some(prefix) = &self.public_prefix {
            config.public_prefix = prefix.clone();
        }
        if let Some(ms) = self.delay_ms {
            config.batch_delay = Duration::from_millis(ms);
        }
        if self.debug_dir.is_some() {
            config.debug_dir = self.debug_dir.clone();
        }
        if self.headful {
            config.headless = false;
        }
        config
    }

    async fn listings(&self) -> Result<Vec<Listing>> {
        if let Some(path) = &self.listings {
            let raw = tokio::fs::read_to_string(path)
                .await
                .with_context(|| format!("Failed to read {}", path.display()))?;
            return serde_json::from_str(&raw)
                .with_context(|| format!("Invalid listings file {}", path.display()));
        }

        match (&self.name, &self.city) {
            (Some(name), Some(city)) => Ok(vec![Listing::new(name.clone(), city.clone())]),
            _ => bail!("Provide either --listings <file> or --name and --city"),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    info!("🏠 Kos Image Scout");
    info!("==================");

    let config = args.apply(PipelineConfig::from_env()?);
    let listings = args.listings().await?;
    info!(
        "Fetching images for {} listing(s) into {}",
        listings.len(),
        config.image_dir.display()
    );

    let backend = HeadlessChromeBackend::from_config(&config);
    let mut pipeline = ImagePipeline::new(Box::new(backend), config)?;
    let results = pipeline.acquire_for_listings(&listings).await?;

    // Display results
    let total: usize = results.iter().map(|r| r.images.len()).sum();
    info!("\n✅ Stored {} images for {} listings\n", total, results.len());

    for (i, result) in results.iter().enumerate() {
        println!("{}. {} ({})", i + 1, result.name, result.city);
        if result.images.is_empty() {
            println!("   no images");
        }
        for image in &result.images {
            println!("   {}", image);
        }
        println!();
    }

    let json = serde_json::to_string_pretty(&results)?;
    tokio::fs::write(&args.output, json)
        .await
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    info!("💾 Saved image manifest to {}", args.output.display());

    Ok(())
}
