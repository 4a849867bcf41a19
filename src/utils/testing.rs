//! Scripted collaborators for tests.

use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::Config;
use crate::pipeline::Context;
use crate::storage::LocalStore;
use crate::utils::http::Transport;
use crate::utils::render::{RenderSession, Renderer};

/// Transport answering from a fixed table. Unscripted URLs fail.
#[derive(Default)]
pub struct FakeTransport {
    pages: HashMap<String, Vec<u8>>,
    content_types: HashMap<String, String>,
    requested: Mutex<Vec<String>>,
    probes: AtomicUsize,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.pages.insert(url.to_string(), body.into());
        self
    }

    pub fn with_content_type(mut self, url: &str, content_type: &str) -> Self {
        self.content_types
            .insert(url.to_string(), content_type.to_string());
        self
    }

    /// URLs fetched with GET, in order.
    pub fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }

    pub fn get_count(&self) -> usize {
        self.requested.lock().unwrap().len()
    }

    pub fn probe_count(&self) -> usize {
        self.probes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for FakeTransport {
    async fn get(&self, url: &str) -> Result<Option<Vec<u8>>> {
        self.requested.lock().unwrap().push(url.to_string());
        match self.pages.get(url) {
            Some(body) if body.is_empty() => Ok(None),
            Some(body) => Ok(Some(body.clone())),
            None => Err(AppError::crawl(url, "no scripted response")),
        }
    }

    async fn content_type(&self, url: &str) -> Result<Option<String>> {
        self.probes.fetch_add(1, Ordering::SeqCst);
        self.content_types
            .get(url)
            .cloned()
            .map(Some)
            .ok_or_else(|| AppError::crawl(url, "no scripted content type"))
    }
}

#[derive(Default)]
struct RenderCounters {
    acquired: AtomicUsize,
    released: AtomicUsize,
    rendered: Mutex<Vec<String>>,
}

/// Renderer serving fixed markup. Unscripted URLs fail to render.
#[derive(Default, Clone)]
pub struct FakeRenderer {
    pages: Arc<HashMap<String, String>>,
    counters: Arc<RenderCounters>,
    fail_acquire: bool,
}

impl FakeRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, html: &str) -> Self {
        Arc::make_mut(&mut self.pages).insert(url.to_string(), html.to_string());
        self
    }

    pub fn failing() -> Self {
        Self {
            fail_acquire: true,
            ..Self::default()
        }
    }

    pub fn render_count(&self) -> usize {
        self.counters.rendered.lock().unwrap().len()
    }

    pub fn rendered(&self) -> Vec<String> {
        self.counters.rendered.lock().unwrap().clone()
    }

    pub fn acquired(&self) -> usize {
        self.counters.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.counters.released.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Renderer for FakeRenderer {
    async fn acquire(&self) -> Result<Box<dyn RenderSession>> {
        if self.fail_acquire {
            return Err(AppError::render("browser failed to launch"));
        }
        self.counters.acquired.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession {
            pages: Arc::clone(&self.pages),
            counters: Arc::clone(&self.counters),
        }))
    }
}

struct FakeSession {
    pages: Arc<HashMap<String, String>>,
    counters: Arc<RenderCounters>,
}

#[async_trait]
impl RenderSession for FakeSession {
    async fn render(&mut self, url: &str) -> Result<Option<String>> {
        self.counters.rendered.lock().unwrap().push(url.to_string());
        match self.pages.get(url) {
            Some(html) if html.is_empty() => Ok(None),
            Some(html) => Ok(Some(html.clone())),
            None => Err(AppError::render(format!("navigation to {url} failed"))),
        }
    }

    async fn release(&mut self) -> Result<()> {
        self.counters.released.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

/// Pipeline context over a temporary store and scripted collaborators.
pub fn test_context(
    root: &Path,
    transport: Arc<dyn Transport>,
    renderer: FakeRenderer,
) -> Context {
    test_context_with(Config::default(), root, transport, renderer)
}

pub fn test_context_with(
    config: Config,
    root: &Path,
    transport: Arc<dyn Transport>,
    renderer: FakeRenderer,
) -> Context {
    Context {
        config: Arc::new(config),
        transport,
        renderer: Arc::new(renderer),
        store: Arc::new(LocalStore::new(root)),
    }
}
