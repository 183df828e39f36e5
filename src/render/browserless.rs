use std::time::Duration;

use async_trait::async_trait;
use serde_json::json;
use tracing::debug;

use super::{RenderContext, Renderer};
use crate::config::BrowserConfig;
use crate::error::{Result, ScrapeError};

/// Renders pages through a Browserless service's `/content` endpoint.
pub struct BrowserlessRenderer {
    client: reqwest::Client,
    endpoint: String,
}

impl BrowserlessRenderer {
    pub fn new(config: &BrowserConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent("TicketScrape/0.1")
            .build()
            .map_err(|err| ScrapeError::Context(format!("failed to build http client: {err}")))?;

        Ok(Self {
            client,
            endpoint: content_endpoint(&config.endpoint, config.token.as_deref()),
        })
    }
}

fn content_endpoint(base_url: &str, token: Option<&str>) -> String {
    let mut endpoint = format!("{}/content", base_url.trim_end_matches('/'));
    if let Some(token) = token {
        endpoint.push_str(&format!("?token={token}"));
    }
    endpoint
}

#[async_trait]
impl Renderer for BrowserlessRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        Ok(Box::new(BrowserlessContext {
            client: self.client.clone(),
            endpoint: self.endpoint.clone(),
            current: None,
            closed: false,
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        // The browser process belongs to the service; nothing is held open here.
        Ok(())
    }
}

struct Page {
    url: String,
    html: String,
}

pub struct BrowserlessContext {
    client: reqwest::Client,
    endpoint: String,
    current: Option<Page>,
    closed: bool,
}

impl BrowserlessContext {
    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(ScrapeError::Context("render context already closed".into()))
        } else {
            Ok(())
        }
    }

    fn page(&self) -> Result<&Page> {
        self.current
            .as_ref()
            .ok_or_else(|| ScrapeError::Context("no page loaded".into()))
    }
}

#[async_trait]
impl RenderContext for BrowserlessContext {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.ensure_open()?;
        reqwest::Url::parse(url).map_err(|err| ScrapeError::navigation(url, err))?;
        debug!(url, "navigating");

        let body = json!({
            "url": url,
            "waitForSelector": { "selector": "body" },
        });
        let resp = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|err| ScrapeError::navigation(url, err))?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(ScrapeError::navigation(
                url,
                format!("render service returned {}: {}", status.as_u16(), message.trim()),
            ));
        }

        let html = resp
            .text()
            .await
            .map_err(|err| ScrapeError::navigation(url, err))?;
        self.current = Some(Page {
            url: url.to_string(),
            html,
        });
        Ok(())
    }

    async fn wait_for_ready(&mut self) -> Result<()> {
        self.ensure_open()?;
        let page = self.page()?;
        if has_body(&page.html) {
            Ok(())
        } else {
            Err(ScrapeError::navigation(&page.url, "document has no body"))
        }
    }

    async fn content(&mut self) -> Result<String> {
        self.ensure_open()?;
        Ok(self.page()?.html.clone())
    }

    async fn close(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.closed = true;
        self.current = None;
        Ok(())
    }
}

fn has_body(html: &str) -> bool {
    html.to_ascii_lowercase().contains("<body")
}
