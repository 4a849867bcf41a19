//! Headless rendering of JavaScript-driven pages.
//!
//! A [`Renderer`] hands out one [`RenderSession`] per pipeline run. Callers
//! must call [`RenderSession::release`] on every exit path.

use async_trait::async_trait;

use crate::error::Result;

/// Source of rendering sessions.
#[async_trait]
pub trait Renderer: Send + Sync {
    async fn acquire(&self) -> Result<Box<dyn RenderSession>>;
}

/// One live browser page reused for every render of a run.
#[async_trait]
pub trait RenderSession: Send {
    /// Navigate to `url` and return the rendered markup. Empty markup yields `None`.
    async fn render(&mut self, url: &str) -> Result<Option<String>>;

    /// Shut the session down. Further renders fail.
    async fn release(&mut self) -> Result<()>;
}

#[cfg(feature = "render")]
pub use chromium::ChromiumRenderer;

#[cfg(feature = "render")]
mod chromium {
    use async_trait::async_trait;
    use chromiumoxide::Page;
    use chromiumoxide::browser::{Browser, BrowserConfig};
    use futures::StreamExt;
    use tokio::task::JoinHandle;

    use super::{RenderSession, Renderer};
    use crate::error::{AppError, Result};

    /// [`Renderer`] backed by a headless Chromium.
    #[derive(Debug, Clone)]
    pub struct ChromiumRenderer {
        width: u32,
        height: u32,
    }

    impl Default for ChromiumRenderer {
        fn default() -> Self {
            Self {
                width: 1920,
                height: 1080,
            }
        }
    }

    impl ChromiumRenderer {
        pub fn new() -> Self {
            Self::default()
        }
    }

    #[async_trait]
    impl Renderer for ChromiumRenderer {
        async fn acquire(&self) -> Result<Box<dyn RenderSession>> {
            let config = BrowserConfig::builder()
                .no_sandbox()
                .window_size(self.width, self.height)
                .build()
                .map_err(AppError::render)?;

            let (browser, mut handler) = Browser::launch(config).await.map_err(AppError::render)?;
            let events = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });

            let page = browser.new_page("about:blank").await;
            let mut session = ChromiumSession {
                browser: Some(browser),
                page: None,
                events: Some(events),
            };
            match page {
                Ok(page) => session.page = Some(page),
                Err(e) => {
                    if let Err(release) = session.release().await {
                        log::warn!("Failed to shut down browser: {}", release);
                    }
                    return Err(AppError::render(e));
                }
            }
            log::debug!("Browser session started");

            Ok(Box::new(session))
        }
    }

    struct ChromiumSession {
        browser: Option<Browser>,
        page: Option<Page>,
        events: Option<JoinHandle<()>>,
    }

    #[async_trait]
    impl RenderSession for ChromiumSession {
        async fn render(&mut self, url: &str) -> Result<Option<String>> {
            let page = self
                .page
                .as_ref()
                .ok_or_else(|| AppError::render("session already released"))?;

            page.goto(url).await.map_err(AppError::render)?;
            page.wait_for_navigation().await.map_err(AppError::render)?;
            let content = page.content().await.map_err(AppError::render)?;

            Ok((!content.trim().is_empty()).then_some(content))
        }

        async fn release(&mut self) -> Result<()> {
            if let Some(page) = self.page.take() {
                if let Err(e) = page.close().await {
                    log::warn!("Failed to close browser page: {}", e);
                }
            }
            let closed = match self.browser.take() {
                Some(mut browser) => match browser.close().await {
                    Ok(_) => browser.wait().await.map(|_| ()).map_err(AppError::from),
                    Err(e) => Err(AppError::render(e)),
                },
                None => Ok(()),
            };
            // the handler task never outlives the browser
            if let Some(events) = self.events.take() {
                events.abort();
            }
            closed?;
            log::debug!("Browser session released");
            Ok(())
        }
    }

}
