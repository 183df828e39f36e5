use once_cell::sync::Lazy;
use rand::RngCore;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::base::{self, ListingFields};
use super::SiteAdapter;
use crate::error::Result;
use crate::models::{EnrichmentFragment, EventRecord, SiteId};

const ORIGIN: &str = "https://www.ticketmaster.cl";

static THUMB_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".home-events .row div .event-thumb").expect("ticketmaster thumb selector")
});
static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a").expect("ticketmaster link selector"));
static NAME_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".thumb-title").expect("ticketmaster name"));
static DATE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".event_description").expect("ticketmaster date"));
static VENUE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".event_venue").expect("ticketmaster venue"));
static IMAGE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("img").expect("ticketmaster image"));
static INFO_PARAGRAPH_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".row.event_info p").expect("ticketmaster info paragraphs"));

pub struct Ticketmaster;

impl SiteAdapter for Ticketmaster {
    fn site_id(&self) -> SiteId {
        SiteId::Ticketmaster
    }

    fn base_origin(&self) -> &'static str {
        ORIGIN
    }

    fn extract_listing(&self, html: &str, rng: &mut dyn RngCore) -> Result<Vec<EventRecord>> {
        let document = Html::parse_document(html);
        let mut events = Vec::new();

        for thumb in document.select(&THUMB_SELECTOR) {
            // Carousels duplicate thumbs into hidden slides.
            let visible = thumb
                .parent()
                .and_then(ElementRef::wrap)
                .map(base::is_visible)
                .unwrap_or(false);
            if !visible {
                debug!("skipping hidden ticketmaster thumb");
                continue;
            }

            let href = base::first_attr(&thumb, &LINK_SELECTOR, "href")
                .map(|h| base::replace_parent_segment(self.base_origin(), &h));
            let url = base::resolve_link(self.site_id(), self.base_origin(), href.as_deref())?;

            let fields = ListingFields {
                url,
                name: base::first_text(&thumb, &NAME_SELECTOR),
                date: base::first_text(&thumb, &DATE_SELECTOR),
                venue: base::first_text(&thumb, &VENUE_SELECTOR),
                image: base::first_attr(&thumb, &IMAGE_SELECTOR, "src"),
            };
            events.push(base::build_record(fields, rng));
        }

        Ok(events)
    }

    fn extract_enrichment(&self, html: &str) -> Result<EnrichmentFragment> {
        let document = Html::parse_document(html);
        let paragraphs = document
            .select(&INFO_PARAGRAPH_SELECTOR)
            .map(base::multiline_text)
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>();

        Ok(EnrichmentFragment {
            description: Some(base::normalize_description(paragraphs.join("\n"))),
            ..Default::default()
        })
    }
}
