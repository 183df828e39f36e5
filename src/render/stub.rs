use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::{RenderContext, Renderer};
use crate::error::{Result, ScrapeError};

#[derive(Default)]
pub(crate) struct Counters {
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
    pub shutdowns: AtomicUsize,
    pub visited: Mutex<Vec<String>>,
}

impl Counters {
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }

    pub fn shutdowns(&self) -> usize {
        self.shutdowns.load(Ordering::SeqCst)
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited.lock().expect("visited lock").clone()
    }
}

/// Deterministic renderer serving canned HTML by URL. Unknown URLs fail
/// navigation.
#[derive(Default)]
pub(crate) struct StubRenderer {
    pages: Arc<HashMap<String, String>>,
    pub counters: Arc<Counters>,
    fail_shutdown: bool,
}

impl StubRenderer {
    pub fn new<I, K, V>(pages: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            pages: Arc::new(pages.into_iter().map(|(k, v)| (k.into(), v.into())).collect()),
            counters: Arc::default(),
            fail_shutdown: false,
        }
    }

    pub fn with_failing_shutdown(mut self) -> Self {
        self.fail_shutdown = true;
        self
    }
}

#[async_trait]
impl Renderer for StubRenderer {
    async fn new_context(&self) -> Result<Box<dyn RenderContext>> {
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubContext {
            pages: Arc::clone(&self.pages),
            counters: Arc::clone(&self.counters),
            current: None,
        }))
    }

    async fn shutdown(&self) -> Result<()> {
        self.counters.shutdowns.fetch_add(1, Ordering::SeqCst);
        if self.fail_shutdown {
            return Err(ScrapeError::Context("browser went away".into()));
        }
        Ok(())
    }
}

struct StubContext {
    pages: Arc<HashMap<String, String>>,
    counters: Arc<Counters>,
    current: Option<String>,
}

#[async_trait]
impl RenderContext for StubContext {
    async fn navigate(&mut self, url: &str) -> Result<()> {
        self.counters
            .visited
            .lock()
            .expect("visited lock")
            .push(url.to_string());
        match self.pages.get(url) {
            Some(html) => {
                self.current = Some(html.clone());
                Ok(())
            }
            None => Err(ScrapeError::navigation(url, "no stub page")),
        }
    }

    async fn wait_for_ready(&mut self) -> Result<()> {
        Ok(())
    }

    async fn content(&mut self) -> Result<String> {
        self.current
            .clone()
            .ok_or_else(|| ScrapeError::Context("no page loaded".into()))
    }

    async fn close(&mut self) -> Result<()> {
        self.counters.closed.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
