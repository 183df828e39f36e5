use once_cell::sync::Lazy;
use rand::RngCore;
use scraper::{Html, Selector};

use super::base::{self, ListingFields};
use super::SiteAdapter;
use crate::error::Result;
use crate::models::{EnrichmentFragment, EventRecord, SiteId, UNAVAILABLE};

const ORIGIN: &str = "https://www.puntoticket.com";

static ARTICLE_SELECTOR: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("#listado-eventos-shuffle .listado--eventos article")
        .expect("puntoticket article selector")
});
static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a").expect("puntoticket link selector"));
static NAME_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".evento--box h3").expect("puntoticket name"));
static DATE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".evento--box .fecha").expect("puntoticket date"));
static VENUE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".evento--box .descripcion strong").expect("puntoticket venue"));
static IMAGE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".img--evento").expect("puntoticket image"));
static DESCRIPTION_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(".slider-content span").expect("puntoticket description"));

pub struct Puntoticket;

impl SiteAdapter for Puntoticket {
    fn site_id(&self) -> SiteId {
        SiteId::Puntoticket
    }

    fn base_origin(&self) -> &'static str {
        ORIGIN
    }

    fn extract_listing(&self, html: &str, rng: &mut dyn RngCore) -> Result<Vec<EventRecord>> {
        let document = Html::parse_document(html);
        let mut events = Vec::new();

        for article in document.select(&ARTICLE_SELECTOR) {
            let href = base::first_attr(&article, &LINK_SELECTOR, "href");
            let url = base::resolve_link(self.site_id(), self.base_origin(), href.as_deref())?;

            let fields = ListingFields {
                url,
                name: base::first_text(&article, &NAME_SELECTOR),
                date: base::first_text(&article, &DATE_SELECTOR),
                venue: base::first_text(&article, &VENUE_SELECTOR),
                image: base::first_attr(&article, &IMAGE_SELECTOR, "src"),
            };
            events.push(base::build_record(fields, rng));
        }

        Ok(events)
    }

    fn extract_enrichment(&self, html: &str) -> Result<EnrichmentFragment> {
        let document = Html::parse_document(html);
        let description = document
            .select(&DESCRIPTION_SELECTOR)
            .next()
            .map(|el| base::normalize_description(base::multiline_text(el)))
            .unwrap_or_else(|| UNAVAILABLE.to_string());

        Ok(EnrichmentFragment {
            description: Some(description),
            ..Default::default()
        })
    }
}
