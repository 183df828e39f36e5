use std::path::PathBuf;

use thiserror::Error;

use crate::models::SiteId;

#[derive(Error, Debug)]
pub enum ScrapeError {
    #[error("navigation to {url} failed: {reason}")]
    Navigation { url: String, reason: String },

    #[error("{site}: extraction failed: {reason}")]
    Extraction { site: SiteId, reason: String },

    #[error("render context error: {0}")]
    Context(String),

    #[error("snapshot {}: {source}", .path.display())]
    Snapshot {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialization failed: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML deserialization failed: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("configuration error: {0}")]
    Config(String),
}

impl ScrapeError {
    pub fn navigation(url: &str, reason: impl ToString) -> Self {
        ScrapeError::Navigation {
            url: url.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn extraction(site: SiteId, reason: impl ToString) -> Self {
        ScrapeError::Extraction {
            site,
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ScrapeError>;
