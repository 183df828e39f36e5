//! Two-phase run: listing for every site, checkpoint, enrichment for every
//! site, final snapshot. Sites run one after another so at most one render
//! context is active.

use std::collections::HashSet;
use std::fmt;

use rand::RngCore;
use tracing::{error, info, info_span, warn, Instrument};

use crate::collect::{collect_enrichment, collect_listing};
use crate::config::AppConfig;
use crate::error::{Result, ScrapeError};
use crate::models::{SiteCollection, SiteId};
use crate::render::Renderer;
use crate::sink::SnapshotSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunPhase {
    Listing,
    Checkpointed,
    Enriched,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Listing,
    Enrichment,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Phase::Listing => f.write_str("listing"),
            Phase::Enrichment => f.write_str("enrichment"),
        }
    }
}

#[derive(Debug)]
pub struct SiteFailure {
    pub site: SiteId,
    pub phase: Phase,
    pub error: ScrapeError,
}

#[derive(Debug)]
pub struct RunReport {
    pub phase: RunPhase,
    pub listing: SiteCollection,
    pub enriched: SiteCollection,
    pub failures: Vec<SiteFailure>,
    pub merge_misses: usize,
}

impl RunReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct Orchestrator<'a> {
    config: &'a AppConfig,
    renderer: &'a dyn Renderer,
    sink: &'a dyn SnapshotSink,
}

struct Progress {
    phase: RunPhase,
    failures: Vec<SiteFailure>,
}

impl Progress {
    fn new() -> Self {
        Self {
            phase: RunPhase::Listing,
            failures: Vec::new(),
        }
    }

    fn advance(&mut self, next: RunPhase) {
        info!(from = ?self.phase, to = ?next, "run phase");
        self.phase = next;
    }
}

impl<'a> Orchestrator<'a> {
    pub fn new(config: &'a AppConfig, renderer: &'a dyn Renderer, sink: &'a dyn SnapshotSink) -> Self {
        Self {
            config,
            renderer,
            sink,
        }
    }

    /// Full run. The renderer is shut down once both phases are over, also
    /// when a fail-fast error ends the run early.
    pub async fn run(&self, rng: &mut (dyn RngCore + Send)) -> Result<RunReport> {
        let outcome = self.run_phases(rng).await;
        self.shutdown_after(outcome).await
    }

    /// Enrichment only, starting from the persisted listing checkpoint.
    pub async fn resume(&self) -> Result<RunReport> {
        let outcome = self.resume_phases().await;
        self.shutdown_after(outcome).await
    }

    async fn run_phases(&self, rng: &mut (dyn RngCore + Send)) -> Result<RunReport> {
        let output = &self.config.output;
        self.sink.reset(&output.listing_snapshot)?;
        self.sink.reset(&output.final_snapshot)?;

        let mut progress = Progress::new();
        let listing = self.listing_phase(rng, &mut progress).await?;

        info!(path = %output.listing_snapshot.display(), "saving listing snapshot");
        self.sink.write_snapshot(&output.listing_snapshot, &listing)?;
        progress.advance(RunPhase::Checkpointed);

        self.finish(listing, progress).await
    }

    async fn resume_phases(&self) -> Result<RunReport> {
        let path = &self.config.output.listing_snapshot;
        info!(path = %path.display(), "resuming from listing snapshot");
        let stored = self.sink.read_snapshot(path)?;

        let mut listing = SiteCollection::with_sites(self.config.site_ids());
        for site in self.config.site_ids() {
            listing.insert(site, stored.get(site).to_vec());
        }

        let mut progress = Progress::new();
        progress.advance(RunPhase::Checkpointed);
        self.finish(listing, progress).await
    }

    async fn finish(&self, listing: SiteCollection, mut progress: Progress) -> Result<RunReport> {
        let (enriched, merge_misses) = self.enrichment_phase(&listing, &mut progress).await?;

        let path = &self.config.output.final_snapshot;
        info!(path = %path.display(), "saving final snapshot");
        self.sink.write_snapshot(path, &enriched)?;
        progress.advance(RunPhase::Enriched);

        Ok(RunReport {
            phase: progress.phase,
            listing,
            enriched,
            failures: progress.failures,
            merge_misses,
        })
    }

    async fn listing_phase(
        &self,
        rng: &mut (dyn RngCore + Send),
        progress: &mut Progress,
    ) -> Result<SiteCollection> {
        let mut collection = SiteCollection::with_sites(self.config.site_ids());

        for site in &self.config.sites {
            let span = info_span!("listing", site = %site.id);
            match collect_listing(site.id, &site.listing_url, self.renderer, rng)
                .instrument(span)
                .await
            {
                Ok(records) => collection.insert(site.id, records),
                Err(err) => self.record_failure(progress, site.id, Phase::Listing, err)?,
            }
        }

        log_counts("listing", &collection);
        Ok(collection)
    }

    async fn enrichment_phase(
        &self,
        listing: &SiteCollection,
        progress: &mut Progress,
    ) -> Result<(SiteCollection, usize)> {
        let failed: HashSet<SiteId> = progress.failures.iter().map(|f| f.site).collect();
        let mut collection = SiteCollection::with_sites(self.config.site_ids());
        let mut merge_misses = 0;

        for site in self.config.site_ids() {
            let records = listing.get(site);
            if failed.contains(&site) {
                warn!(%site, "skipping enrichment after failed listing");
                collection.insert(site, records.to_vec());
                continue;
            }

            let span = info_span!("enrichment", %site);
            match collect_enrichment(site, records, self.renderer)
                .instrument(span)
                .await
            {
                Ok(enriched) => {
                    merge_misses += enriched.merge_misses;
                    collection.insert(site, enriched.records);
                }
                Err(err) => {
                    self.record_failure(progress, site, Phase::Enrichment, err)?;
                    collection.insert(site, records.to_vec());
                }
            }
        }

        log_counts("enrichment", &collection);
        Ok((collection, merge_misses))
    }

    fn record_failure(
        &self,
        progress: &mut Progress,
        site: SiteId,
        phase: Phase,
        err: ScrapeError,
    ) -> Result<()> {
        if self.config.fail_fast {
            error!(%site, %phase, error = %err, "aborting run");
            return Err(err);
        }
        warn!(%site, %phase, error = %err, "site failed, continuing with remaining sites");
        progress.failures.push(SiteFailure {
            site,
            phase,
            error: err,
        });
        Ok(())
    }

    /// A run error takes precedence over a shutdown error; snapshots are
    /// already on disk either way.
    async fn shutdown_after(&self, outcome: Result<RunReport>) -> Result<RunReport> {
        info!("closing browser");
        match self.renderer.shutdown().await {
            Ok(()) => outcome,
            Err(err) => {
                warn!(error = %err, "browser shutdown failed");
                outcome.and(Err(err))
            }
        }
    }
}

fn log_counts(phase: &str, collection: &SiteCollection) {
    for (site, records) in collection.iter() {
        info!(phase, %site, events = records.len(), "collected");
    }
    info!(phase, total = collection.total(), "phase done");
}
