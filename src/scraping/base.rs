use once_cell::sync::Lazy;
use rand::{Rng, RngCore};
use regex::Regex;
use scraper::{ElementRef, Node, Selector};

use crate::error::{Result, ScrapeError};
use crate::models::{EventRecord, SiteId, NO_DESCRIPTION, UNAVAILABLE};

static INLINE_SPACE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[ \t\r\u{a0}]+").expect("valid inline space regex"));

pub const PRICE_STEP: u32 = 5_000;
pub const PRICE_STEPS: u32 = 39;
pub const SEAT_STEP: u32 = 50;
pub const SEAT_STEPS: u32 = 100;

pub fn clean_text(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn inner_text(element: ElementRef<'_>) -> String {
    clean_text(&element.text().collect::<Vec<_>>().join(" "))
}

/// Approximates `innerText`: block elements and `<br>` break lines, spaces
/// are collapsed within each line and blank lines dropped.
pub fn multiline_text(element: ElementRef<'_>) -> String {
    let mut raw = String::new();
    push_rendered_text(element, &mut raw);
    raw.lines()
        .map(|line| INLINE_SPACE_RE.replace_all(line, " ").trim().to_string())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

const BLOCK_ELEMENTS: &[&str] = &[
    "address", "article", "aside", "blockquote", "dd", "div", "dl", "dt", "figcaption",
    "figure", "footer", "h1", "h2", "h3", "h4", "h5", "h6", "header", "hr", "li", "main",
    "nav", "ol", "p", "pre", "section", "table", "tr", "ul",
];

fn push_rendered_text(element: ElementRef<'_>, out: &mut String) {
    for child in element.children() {
        match child.value() {
            Node::Text(text) => out.push_str(text),
            Node::Element(el) => {
                let Some(child) = ElementRef::wrap(child) else {
                    continue;
                };
                if el.name() == "br" {
                    out.push('\n');
                } else if BLOCK_ELEMENTS.contains(&el.name()) {
                    out.push('\n');
                    push_rendered_text(child, out);
                    out.push('\n');
                } else {
                    push_rendered_text(child, out);
                }
            }
            _ => {}
        }
    }
}

pub fn first_text(element: &ElementRef<'_>, selector: &Selector) -> Option<String> {
    element
        .select(selector)
        .next()
        .map(inner_text)
        .filter(|text| !text.is_empty())
}

pub fn first_attr(element: &ElementRef<'_>, selector: &Selector, attr: &str) -> Option<String> {
    element
        .select(selector)
        .next()
        .and_then(|el| el.value().attr(attr))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
}

pub fn or_unavailable(value: Option<String>) -> String {
    value.unwrap_or_else(|| UNAVAILABLE.to_string())
}

/// Present-but-blank text becomes the no-description sentinel.
pub fn normalize_description(text: String) -> String {
    if text.trim().is_empty() {
        NO_DESCRIPTION.to_string()
    } else {
        text
    }
}

/// `../shows/9` -> `<origin>/shows/9`; anything else is returned unchanged.
pub fn replace_parent_segment(origin: &str, href: &str) -> String {
    match href.strip_prefix("..") {
        Some(rest) => format!("{}{rest}", origin.trim_end_matches('/')),
        None => href.to_string(),
    }
}

/// Resolves the entry link against the site origin. The result must be an
/// absolute http(s) URL: it is the key that joins a listing record to its
/// event page.
pub fn resolve_link(site: SiteId, origin: &str, href: Option<&str>) -> Result<String> {
    let href = href
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .ok_or_else(|| ScrapeError::extraction(site, "listing entry has no link"))?;
    let base_url = reqwest::Url::parse(origin)
        .map_err(|err| ScrapeError::extraction(site, format!("invalid origin {origin:?}: {err}")))?;
    let url = base_url
        .join(href)
        .map_err(|err| ScrapeError::extraction(site, format!("unresolvable link {href:?}: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(ScrapeError::extraction(site, format!("link {href:?} is not http(s)")));
    }
    Ok(url.to_string())
}

/// Static approximation of `checkVisibility()`: hidden attribute, inline
/// `display: none` / `visibility: hidden`, or bootstrap's `d-none`, on the
/// element or any ancestor.
pub fn is_visible(element: ElementRef<'_>) -> bool {
    std::iter::once(element)
        .chain(element.ancestors().filter_map(ElementRef::wrap))
        .all(|el| !is_hidden(el))
}

fn is_hidden(element: ElementRef<'_>) -> bool {
    let value = element.value();
    if value.attr("hidden").is_some() {
        return true;
    }
    if value.classes().any(|class| class == "d-none") {
        return true;
    }
    value
        .attr("style")
        .map(|style| {
            let compact: String = style
                .to_ascii_lowercase()
                .chars()
                .filter(|c| !c.is_whitespace())
                .collect();
            compact.contains("display:none") || compact.contains("visibility:hidden")
        })
        .unwrap_or(false)
}

pub fn synthetic_price(rng: &mut dyn RngCore) -> u32 {
    PRICE_STEP + PRICE_STEP * rng.gen_range(0..PRICE_STEPS)
}

pub fn synthetic_seat_count(rng: &mut dyn RngCore) -> u32 {
    SEAT_STEP + SEAT_STEP * rng.gen_range(0..SEAT_STEPS)
}

pub struct ListingFields {
    pub url: String,
    pub name: Option<String>,
    pub date: Option<String>,
    pub venue: Option<String>,
    pub image: Option<String>,
}

/// Fills sentinels for missing fields and draws the synthetic figures.
pub fn build_record(fields: ListingFields, rng: &mut dyn RngCore) -> EventRecord {
    EventRecord {
        name: or_unavailable(fields.name),
        date: or_unavailable(fields.date),
        venue: or_unavailable(fields.venue),
        image: or_unavailable(fields.image),
        price: synthetic_price(rng),
        seat_count: synthetic_seat_count(rng),
        url: fields.url,
        description: UNAVAILABLE.to_string(),
    }
}
