//! Render capability: a provider of isolated browser page contexts that can
//! navigate to a URL and hand back the rendered document.

pub mod browserless;
#[cfg(test)]
pub(crate) mod stub;

use async_trait::async_trait;

use crate::error::Result;

pub use browserless::BrowserlessRenderer;

#[async_trait]
pub trait Renderer: Send + Sync {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>>;

    /// Releases the provider. Called once, after both phases.
    async fn shutdown(&self) -> Result<()>;
}

#[async_trait]
pub trait RenderContext: Send {
    async fn navigate(&mut self, url: &str) -> Result<()>;

    /// Minimal readiness signal: the document has a body.
    async fn wait_for_ready(&mut self) -> Result<()>;

    /// Serialized DOM of the current page, for extraction.
    async fn content(&mut self) -> Result<String>;

    async fn close(&mut self) -> Result<()>;
}

/// Navigates, waits for the body and returns the rendered HTML.
pub async fn render(context: &mut dyn RenderContext, url: &str) -> Result<String> {
    context.navigate(url).await?;
    context.wait_for_ready().await?;
    context.content().await
}
