use std::path::PathBuf;

use anyhow::{bail, Context};
use clap::Parser;
use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::{info, warn};

use ticket_scrape_lib::{
    logging,
    render::BrowserlessRenderer,
    sink::JsonFileSink,
    AppConfig, Orchestrator, SiteId,
};

#[derive(Parser)]
#[command(name = "ticket-scrape")]
#[command(about = "Scrape event listings from puntoticket, ticketplus and ticketmaster")]
#[command(version)]
struct Cli {
    /// Path to a TOML config file (default: ./ticket-scrape.toml when present)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Restrict the run to these sites (comma-separated)
    #[arg(long, value_delimiter = ',')]
    sites: Vec<SiteId>,

    /// Abort on the first site failure
    #[arg(long)]
    fail_fast: bool,

    /// Skip the listing phase and enrich the saved listing snapshot
    #[arg(long)]
    resume: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    logging::init_logging();
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("loading configuration")?;
    if !cli.sites.is_empty() {
        config.restrict_to(&cli.sites)?;
    }
    config.fail_fast |= cli.fail_fast;

    let renderer = BrowserlessRenderer::new(&config.browser)?;
    let orchestrator = Orchestrator::new(&config, &renderer, &JsonFileSink);

    let report = if cli.resume {
        orchestrator.resume().await?
    } else {
        let mut rng = StdRng::from_entropy();
        orchestrator.run(&mut rng).await?
    };

    info!(
        listed = report.listing.total(),
        enriched = report.enriched.total(),
        merge_misses = report.merge_misses,
        "scrape finished"
    );
    if !report.is_clean() {
        for failure in &report.failures {
            warn!(site = %failure.site, phase = %failure.phase, error = %failure.error, "site failed");
        }
        bail!("{} site phase(s) failed", report.failures.len());
    }
    Ok(())
}
