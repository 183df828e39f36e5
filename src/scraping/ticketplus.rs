use once_cell::sync::Lazy;
use rand::RngCore;
use scraper::{ElementRef, Html, Selector};

use super::base::{self, ListingFields};
use super::SiteAdapter;
use crate::error::Result;
use crate::models::{EnrichmentFragment, EventRecord, SiteId, UNAVAILABLE};

const ORIGIN: &str = "https://ticketplus.cl";
const VENUE_ICON: &str = "place";

static ENTRY_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".event-home").expect("ticketplus entry selector"));
static NAME_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".title-mi").expect("ticketplus name"));
static DATE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".date-home").expect("ticketplus date"));
static IMAGE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".img-home-count").expect("ticketplus image"));
static HEADER_IMAGE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(".img-header-event-container img").expect("ticketplus header image")
});
static DESCRIPTION_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".description-content").expect("ticketplus description"));
static ICON_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".info-event .material-icons").expect("ticketplus icons"));
static PARAGRAPH_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("p").expect("ticketplus paragraph"));

pub struct Ticketplus;

impl SiteAdapter for Ticketplus {
    fn site_id(&self) -> SiteId {
        SiteId::Ticketplus
    }

    fn base_origin(&self) -> &'static str {
        ORIGIN
    }

    fn extract_listing(&self, html: &str, rng: &mut dyn RngCore) -> Result<Vec<EventRecord>> {
        let document = Html::parse_document(html);
        let mut events = Vec::new();

        for entry in document.select(&ENTRY_SELECTOR) {
            // The card is wrapped by the anchor carrying the event link.
            let href = parent_element(entry).and_then(|parent| parent.value().attr("href"));
            let url = base::resolve_link(self.site_id(), self.base_origin(), href)?;

            let image = base::first_attr(&entry, &IMAGE_SELECTOR, "src")
                .filter(|src| src.starts_with("https://"));

            let fields = ListingFields {
                url,
                name: base::first_text(&entry, &NAME_SELECTOR),
                date: entry
                    .select(&DATE_SELECTOR)
                    .next()
                    .map(date_text)
                    .filter(|date| !date.is_empty()),
                venue: None,
                image,
            };
            events.push(base::build_record(fields, rng));
        }

        Ok(events)
    }

    fn extract_enrichment(&self, html: &str) -> Result<EnrichmentFragment> {
        let document = Html::parse_document(html);
        let root = document.root_element();

        let image = base::or_unavailable(base::first_attr(&root, &HEADER_IMAGE_SELECTOR, "src"));
        let description = root
            .select(&DESCRIPTION_SELECTOR)
            .next()
            .map(|el| base::normalize_description(base::multiline_text(el)))
            .unwrap_or_else(|| UNAVAILABLE.to_string());
        let venue = base::or_unavailable(venue_from_icon(&document));

        Ok(EnrichmentFragment {
            description: Some(description),
            venue: Some(venue),
            image: Some(image),
        })
    }
}

fn parent_element(element: ElementRef<'_>) -> Option<ElementRef<'_>> {
    element.parent().and_then(ElementRef::wrap)
}

/// Dates render across two lines ("12 ABR" / "2025"); joined onto one.
fn date_text(element: ElementRef<'_>) -> String {
    base::multiline_text(element).replace('\n', " ")
}

/// The venue label sits next to a `place` icon: icon -> parent -> grandparent,
/// whose first paragraph holds the value. Any missing step yields `None`.
fn venue_from_icon(document: &Html) -> Option<String> {
    let icon = document
        .select(&ICON_SELECTOR)
        .find(|el| base::inner_text(*el) == VENUE_ICON)?;
    let container = parent_element(icon)?;
    let row = parent_element(container)?;
    base::first_text(&row, &PARAGRAPH_SELECTOR)
}
