//! Listing and enrichment collectors. Each invocation owns one render
//! context and closes it exactly once, whatever the extraction outcome.

use std::collections::HashSet;

use rand::RngCore;
use tracing::{debug, info, warn};

use crate::error::Result;
use crate::models::{EnrichmentFragment, EventRecord, SiteId};
use crate::render::{self, RenderContext, Renderer};
use crate::scraping::adapter_for;

/// Records of one site after enrichment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Enriched {
    pub records: Vec<EventRecord>,
    pub merge_misses: usize,
}

pub async fn collect_listing(
    site: SiteId,
    listing_url: &str,
    renderer: &dyn Renderer,
    rng: &mut (dyn RngCore + Send),
) -> Result<Vec<EventRecord>> {
    info!(%site, url = listing_url, "scraping listing");
    let mut context = renderer.new_context().await?;
    let outcome = listing_with(context.as_mut(), site, listing_url, rng).await;
    let closed = context.close().await;

    let records = outcome?;
    closed?;
    info!(%site, events = records.len(), "listing done");
    Ok(records)
}

async fn listing_with(
    context: &mut dyn RenderContext,
    site: SiteId,
    listing_url: &str,
    rng: &mut (dyn RngCore + Send),
) -> Result<Vec<EventRecord>> {
    let html = render::render(context, listing_url).await?;
    adapter_for(site).extract_listing(&html, rng)
}

/// Visits every distinct record url in order and merges each fragment into
/// the records whose url is exactly equal. The input is left untouched.
pub async fn collect_enrichment(
    site: SiteId,
    records: &[EventRecord],
    renderer: &dyn Renderer,
) -> Result<Enriched> {
    info!(%site, events = records.len(), "scraping event pages");
    let mut context = renderer.new_context().await?;
    let mut enriched = records.to_vec();
    let outcome = enrich_with(context.as_mut(), site, &mut enriched).await;
    let closed = context.close().await;

    let merge_misses = outcome?;
    closed?;
    info!(%site, "event pages done");
    Ok(Enriched {
        records: enriched,
        merge_misses,
    })
}

async fn enrich_with(
    context: &mut dyn RenderContext,
    site: SiteId,
    records: &mut [EventRecord],
) -> Result<usize> {
    let adapter = adapter_for(site);
    let urls = distinct_urls(records);
    let mut misses = 0;

    for url in urls {
        debug!(%site, url = %url, "visiting event page");
        let html = render::render(context, &url).await?;
        let fragment = adapter.extract_enrichment(&html)?;
        if merge_fragment(records, &url, &fragment) == 0 {
            warn!(%site, url = %url, "enrichment fragment matched no record");
            misses += 1;
        }
    }

    Ok(misses)
}

fn distinct_urls(records: &[EventRecord]) -> Vec<String> {
    let mut seen = HashSet::new();
    records
        .iter()
        .filter(|record| seen.insert(record.url.as_str()))
        .map(|record| record.url.clone())
        .collect()
}

/// Returns how many records took the fragment.
pub fn merge_fragment(records: &mut [EventRecord], url: &str, fragment: &EnrichmentFragment) -> usize {
    let mut merged = 0;
    for record in records.iter_mut().filter(|record| record.url == url) {
        record.merge(fragment);
        merged += 1;
    }
    merged
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ScrapeError;
    use crate::models::UNAVAILABLE;
    use crate::render::stub::StubRenderer;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    const LISTING_URL: &str = "https://www.puntoticket.com/todos";
    const SHOW_X: &str = "https://www.puntoticket.com/e/x";
    const SHOW_Y: &str = "https://www.puntoticket.com/e/y";

    fn listing_page(hrefs: &[&str]) -> String {
        let articles = hrefs
            .iter()
            .enumerate()
            .map(|(i, href)| {
                format!(
                    r#"<article><a href="{href}"><div class="evento--box"><h3>Show {}</h3></div></a></article>"#,
                    i + 1
                )
            })
            .collect::<String>();
        format!(
            r#"<html><body><div id="listado-eventos-shuffle"><div class="listado--eventos">{articles}</div></div></body></html>"#
        )
    }

    fn description_page(text: &str) -> String {
        format!(r#"<html><body><div class="slider-content"><span>{text}</span></div></body></html>"#)
    }

    fn record(url: &str, name: &str) -> EventRecord {
        EventRecord {
            name: name.to_string(),
            date: UNAVAILABLE.to_string(),
            venue: UNAVAILABLE.to_string(),
            image: UNAVAILABLE.to_string(),
            price: 10_000,
            seat_count: 100,
            url: url.to_string(),
            description: UNAVAILABLE.to_string(),
        }
    }

    #[tokio::test]
    async fn listing_resolves_urls_and_closes_context() {
        let renderer = StubRenderer::new([(LISTING_URL, listing_page(&["/e/x", "/e/y"]))]);
        let mut rng = StdRng::seed_from_u64(9);
        let records = collect_listing(SiteId::Puntoticket, LISTING_URL, &renderer, &mut rng)
            .await
            .expect("listing");

        assert_eq!(
            records.iter().map(|r| r.url.as_str()).collect::<Vec<_>>(),
            vec![SHOW_X, SHOW_Y]
        );
        assert_eq!(renderer.counters.opened(), 1);
        assert_eq!(renderer.counters.closed(), 1);
    }

    #[tokio::test]
    async fn listing_closes_context_when_extraction_fails() {
        let broken = r#"<html><body><div id="listado-eventos-shuffle"><div class="listado--eventos">
            <article><h3>Sin link</h3></article></div></div></body></html>"#;
        let renderer = StubRenderer::new([(LISTING_URL, broken)]);
        let mut rng = StdRng::seed_from_u64(9);
        let err = collect_listing(SiteId::Puntoticket, LISTING_URL, &renderer, &mut rng)
            .await
            .expect_err("extraction failure");

        assert!(matches!(err, ScrapeError::Extraction { .. }));
        assert_eq!(renderer.counters.closed(), 1);
    }

    #[tokio::test]
    async fn listing_closes_context_when_navigation_fails() {
        let renderer = StubRenderer::new(Vec::<(String, String)>::new());
        let mut rng = StdRng::seed_from_u64(9);
        let err = collect_listing(SiteId::Puntoticket, LISTING_URL, &renderer, &mut rng)
            .await
            .expect_err("navigation failure");

        assert!(matches!(err, ScrapeError::Navigation { .. }));
        assert_eq!(renderer.counters.opened(), 1);
        assert_eq!(renderer.counters.closed(), 1);
    }

    #[tokio::test]
    async fn enrichment_updates_only_the_matching_record() {
        let renderer = StubRenderer::new([
            (SHOW_X, description_page("Great show")),
            (SHOW_Y, "<html><body></body></html>".to_string()),
        ]);
        let listing = vec![record(SHOW_X, "Show 1"), record(SHOW_Y, "Show 2")];

        let enriched = collect_enrichment(SiteId::Puntoticket, &listing, &renderer)
            .await
            .expect("enrichment");

        assert_eq!(enriched.records[0].description, "Great show");
        assert_eq!(enriched.records[1].description, UNAVAILABLE);
        assert_eq!(enriched.records[0].name, "Show 1");
        assert_eq!(enriched.merge_misses, 0);
        assert_eq!(listing[0].description, UNAVAILABLE, "listing generation is untouched");
        assert_eq!(renderer.counters.visited(), vec![SHOW_X, SHOW_Y]);
        assert_eq!(renderer.counters.closed(), 1);
    }

    #[tokio::test]
    async fn enrichment_is_idempotent() {
        let renderer = StubRenderer::new([
            (SHOW_X, description_page("Great show")),
            (SHOW_Y, description_page("Otra")),
        ]);
        let listing = vec![record(SHOW_X, "Show 1"), record(SHOW_Y, "Show 2")];

        let first = collect_enrichment(SiteId::Puntoticket, &listing, &renderer)
            .await
            .expect("first pass");
        let second = collect_enrichment(SiteId::Puntoticket, &listing, &renderer)
            .await
            .expect("second pass");
        assert_eq!(first, second);

        let again = collect_enrichment(SiteId::Puntoticket, &first.records, &renderer)
            .await
            .expect("pass over enriched records");
        assert_eq!(again.records, first.records);
    }

    #[tokio::test]
    async fn duplicate_urls_are_visited_once_and_both_merged() {
        let renderer = StubRenderer::new([(SHOW_X, description_page("Great show"))]);
        let listing = vec![record(SHOW_X, "Show 1"), record(SHOW_X, "Show 1 bis")];

        let enriched = collect_enrichment(SiteId::Puntoticket, &listing, &renderer)
            .await
            .expect("enrichment");

        assert_eq!(renderer.counters.visited(), vec![SHOW_X]);
        assert!(enriched.records.iter().all(|r| r.description == "Great show"));
        assert_eq!(enriched.records.len(), 2);
    }

    #[tokio::test]
    async fn enrichment_closes_context_when_a_page_fails() {
        let renderer = StubRenderer::new([(SHOW_X, description_page("Great show"))]);
        let listing = vec![record(SHOW_X, "Show 1"), record(SHOW_Y, "Show 2")];

        let err = collect_enrichment(SiteId::Puntoticket, &listing, &renderer)
            .await
            .expect_err("missing page");
        assert!(matches!(err, ScrapeError::Navigation { .. }));
        assert_eq!(renderer.counters.opened(), 1);
        assert_eq!(renderer.counters.closed(), 1);
    }

    #[test]
    fn unmatched_fragment_leaves_records_unchanged() {
        let mut records = vec![record(SHOW_X, "Show 1"), record(SHOW_Y, "Show 2")];
        let before = records.clone();
        let fragment = EnrichmentFragment {
            description: Some("Great show".to_string()),
            ..Default::default()
        };

        assert_eq!(merge_fragment(&mut records, "https://www.puntoticket.com/e/x/", &fragment), 0);
        assert_eq!(records, before);
        assert_eq!(merge_fragment(&mut records, SHOW_X, &fragment), 1);
        assert_eq!(records[1], before[1]);
    }
}
