use std::{
    collections::HashSet,
    fs,
    path::{Path, PathBuf},
};

use serde::{Deserialize, Serialize};

use crate::error::{Result, ScrapeError};
use crate::models::SiteId;

pub const DEFAULT_CONFIG_FILE: &str = "ticket-scrape.toml";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SiteConfig {
    pub id: SiteId,
    pub listing_url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BrowserConfig {
    pub endpoint: String,
    pub token: Option<String>,
    pub timeout_secs: u64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            endpoint: "http://localhost:3000".to_string(),
            token: None,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OutputConfig {
    pub listing_snapshot: PathBuf,
    pub final_snapshot: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            listing_snapshot: PathBuf::from("data/data.json"),
            final_snapshot: PathBuf::from("data/final data.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AppConfig {
    pub sites: Vec<SiteConfig>,
    pub browser: BrowserConfig,
    pub output: OutputConfig,
    pub fail_fast: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            sites: default_sites(),
            browser: BrowserConfig::default(),
            output: OutputConfig::default(),
            fail_fast: false,
        }
    }
}

fn default_sites() -> Vec<SiteConfig> {
    [
        (SiteId::Puntoticket, "https://www.puntoticket.com/todos"),
        (
            SiteId::Ticketplus,
            "https://ticketplus.cl/t/conciertos-y-espectaculos",
        ),
        (SiteId::Ticketmaster, "https://www.ticketmaster.cl"),
    ]
    .into_iter()
    .map(|(id, url)| SiteConfig {
        id,
        listing_url: url.to_string(),
    })
    .collect()
}

impl AppConfig {
    /// An explicit path must exist; otherwise `ticket-scrape.toml` in the
    /// working directory is used when present, then the built-in defaults.
    pub fn load(explicit: Option<&Path>) -> Result<Self> {
        let mut config = match explicit {
            Some(path) => read_config(path)?,
            None => {
                let fallback = Path::new(DEFAULT_CONFIG_FILE);
                if fallback.exists() {
                    read_config(fallback)?
                } else {
                    AppConfig::default()
                }
            }
        };
        config.apply_env(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(endpoint) = lookup("BROWSERLESS_URL").filter(|v| !v.trim().is_empty()) {
            self.browser.endpoint = endpoint.trim().to_string();
        }
        if let Some(token) = lookup("BROWSERLESS_TOKEN").filter(|v| !v.trim().is_empty()) {
            self.browser.token = Some(token.trim().to_string());
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.sites.is_empty() {
            return Err(ScrapeError::Config("no sites configured".into()));
        }
        let mut seen = HashSet::new();
        for site in &self.sites {
            if !seen.insert(site.id) {
                return Err(ScrapeError::Config(format!(
                    "site {} configured more than once",
                    site.id
                )));
            }
            let parsed = reqwest::Url::parse(&site.listing_url).map_err(|err| {
                ScrapeError::Config(format!("{}: invalid listing url: {err}", site.id))
            })?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(ScrapeError::Config(format!(
                    "{}: listing url must be http(s)",
                    site.id
                )));
            }
        }
        if self.browser.timeout_secs == 0 {
            return Err(ScrapeError::Config("browser.timeout_secs must be positive".into()));
        }
        Ok(())
    }

    /// Keeps only the named sites, preserving configured order.
    pub fn restrict_to(&mut self, wanted: &[SiteId]) -> Result<()> {
        if let Some(missing) = wanted
            .iter()
            .find(|id| !self.sites.iter().any(|site| site.id == **id))
        {
            return Err(ScrapeError::Config(format!("site {missing} is not configured")));
        }
        self.sites.retain(|site| wanted.contains(&site.id));
        Ok(())
    }

    pub fn site_ids(&self) -> Vec<SiteId> {
        self.sites.iter().map(|site| site.id).collect()
    }
}

fn read_config(path: &Path) -> Result<AppConfig> {
    let contents = fs::read_to_string(path).map_err(|err| {
        ScrapeError::Config(format!("failed to read config file {}: {err}", path.display()))
    })?;
    Ok(toml::from_str(&contents)?)
}
