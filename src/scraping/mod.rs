pub mod base;
pub mod puntoticket;
pub mod ticketmaster;
pub mod ticketplus;

use rand::RngCore;

use crate::error::Result;
use crate::models::{EnrichmentFragment, EventRecord, SiteId};

/// Extraction rules for one ticketing site. Both operations are pure over
/// the rendered HTML.
pub trait SiteAdapter: Send + Sync {
    fn site_id(&self) -> SiteId;
    fn base_origin(&self) -> &'static str;

    /// Zero matching entries yield an empty sequence.
    fn extract_listing(&self, html: &str, rng: &mut dyn RngCore) -> Result<Vec<EventRecord>>;

    fn extract_enrichment(&self, html: &str) -> Result<EnrichmentFragment>;
}

static PUNTOTICKET: puntoticket::Puntoticket = puntoticket::Puntoticket;
static TICKETPLUS: ticketplus::Ticketplus = ticketplus::Ticketplus;
static TICKETMASTER: ticketmaster::Ticketmaster = ticketmaster::Ticketmaster;

pub fn adapter_for(site: SiteId) -> &'static dyn SiteAdapter {
    match site {
        SiteId::Puntoticket => &PUNTOTICKET,
        SiteId::Ticketplus => &TICKETPLUS,
        SiteId::Ticketmaster => &TICKETMASTER,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_returns_the_matching_adapter() {
        for site in SiteId::ALL {
            assert_eq!(adapter_for(site).site_id(), site);
        }
    }

    #[test]
    fn origins_are_bare_https_hosts() {
        for site in SiteId::ALL {
            let origin = adapter_for(site).base_origin();
            let url = reqwest::Url::parse(origin).expect("origin parses");
            assert_eq!(url.scheme(), "https");
            assert_eq!(url.path(), "/");
            assert!(!origin.ends_with('/'));
        }
    }
}
