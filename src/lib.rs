pub mod collect;
pub mod config;
pub mod error;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod render;
pub mod scraping;
pub mod sink;

pub use config::AppConfig;
pub use error::{Result, ScrapeError};
pub use models::{EnrichmentFragment, EventRecord, SiteCollection, SiteId};
pub use orchestrator::{Orchestrator, RunReport};
