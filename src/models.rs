use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Placeholder for a field the adapter could not extract.
pub const UNAVAILABLE: &str = "No disponible";
/// Description that was reachable on the event page but blank.
pub const NO_DESCRIPTION: &str = "No se ha proporcionado una descripción para este evento";

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SiteId {
    Puntoticket,
    Ticketplus,
    Ticketmaster,
}

impl SiteId {
    pub const ALL: [SiteId; 3] = [SiteId::Puntoticket, SiteId::Ticketplus, SiteId::Ticketmaster];

    pub fn as_str(&self) -> &'static str {
        match self {
            SiteId::Puntoticket => "puntoticket",
            SiteId::Ticketplus => "ticketplus",
            SiteId::Ticketmaster => "ticketmaster",
        }
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SiteId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SiteId::ALL
            .into_iter()
            .find(|site| site.as_str() == s.trim())
            .ok_or_else(|| format!("unknown site id: {s}"))
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct EventRecord {
    pub name: String,
    pub date: String,
    pub venue: String,
    pub image: String,
    pub price: u32, // synthetic
    pub seat_count: u32, // synthetic
    pub url: String, // join key between phases
    pub description: String,
}

impl EventRecord {
    /// Applies an enrichment fragment. A sentinel in the fragment never
    /// replaces a value the listing page already produced.
    pub fn merge(&mut self, fragment: &EnrichmentFragment) {
        merge_field(&mut self.description, fragment.description.as_deref());
        merge_field(&mut self.venue, fragment.venue.as_deref());
        merge_field(&mut self.image, fragment.image.as_deref());
    }
}

fn merge_field(target: &mut String, incoming: Option<&str>) {
    let Some(value) = incoming else {
        return;
    };
    if value == UNAVAILABLE && target.as_str() != UNAVAILABLE {
        return;
    }
    *target = value.to_string();
}

/// Fields an event page can contribute. `None` means the site's adapter
/// never looks at that field.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EnrichmentFragment {
    pub description: Option<String>,
    pub venue: Option<String>,
    pub image: Option<String>,
}

/// Per-site event sequences, serialized as `{ "<site>": [EventRecord, ..] }`.
#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq, Eq)]
#[serde(transparent)]
pub struct SiteCollection(BTreeMap<SiteId, Vec<EventRecord>>);

impl SiteCollection {
    /// Starts with an empty sequence for every site so each key is present
    /// in the artifact even when a site produced nothing.
    pub fn with_sites<I>(sites: I) -> Self
    where
        I: IntoIterator<Item = SiteId>,
    {
        Self(sites.into_iter().map(|site| (site, Vec::new())).collect())
    }

    pub fn insert(&mut self, site: SiteId, records: Vec<EventRecord>) {
        self.0.insert(site, records);
    }

    pub fn get(&self, site: SiteId) -> &[EventRecord] {
        self.0.get(&site).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn sites(&self) -> impl Iterator<Item = SiteId> + '_ {
        self.0.keys().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = (SiteId, &[EventRecord])> {
        self.0.iter().map(|(site, records)| (*site, records.as_slice()))
    }

    pub fn total(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }
}
