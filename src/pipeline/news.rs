//! News feed pipeline.

use std::fmt;

use crate::error::Result;
use crate::models::NewsItem;
use crate::pipeline::Context;
use crate::services::NewsReader;
use crate::storage::Reconciler;
use crate::utils::render::{RenderSession, Renderer};

#[derive(Debug, Default, PartialEq)]
pub struct NewsSummary {
    pub listed: usize,
    pub saved: usize,
}

impl fmt::Display for NewsSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} of {} listed articles saved", self.saved, self.listed)
    }
}

pub async fn run_news(ctx: &Context) -> Result<NewsSummary> {
    let reader = NewsReader::new(&ctx.config.news, ctx.config.source.name.clone())?;

    let mut session = ctx.renderer.acquire().await?;
    let result = read_articles(&reader, session.as_mut()).await;
    if let Err(e) = session.release().await {
        log::warn!("Failed to release browser session: {}", e);
    }
    let (listed, items) = result?;

    let ids = Reconciler::new(ctx.store.clone()).reconcile(&items).await?;
    Ok(NewsSummary {
        listed,
        saved: ids.len(),
    })
}

async fn read_articles(
    reader: &NewsReader<'_>,
    session: &mut dyn RenderSession,
) -> Result<(usize, Vec<NewsItem>)> {
    let links = reader.list(session).await?;
    log::info!("{} news articles listed", links.len());

    let mut items = Vec::with_capacity(links.len());
    for link in &links {
        log::debug!("Reading content of {}", link);
        if let Some(item) = reader.read(session, link).await {
            items.push(item);
        }
    }
    Ok((links.len(), items))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use tempfile::TempDir;

    use crate::storage::{Query, StoreProvider};
    use crate::utils::testing::{FakeRenderer, FakeTransport, test_context};

    const LIST: &str = "https://www.swiss-orienteering.ch/news/ol.html";

    #[tokio::test]
    async fn test_run_news() {
        let tmp = TempDir::new().unwrap();
        let renderer = FakeRenderer::new()
            .with_page(
                LIST,
                r#"<a href="/news/ol/1.html">A</a><a href="/news/ol/2.html">B</a><a href="/news/ol/3.html">C</a>"#,
            )
            .with_page(
                "https://www.swiss-orienteering.ch/news/ol/1.html",
                r#"<div class="page-header"><h1>Weltcup</h1></div>"#,
            )
            .with_page(
                "https://www.swiss-orienteering.ch/news/ol/2.html",
                "<p>kein Titel</p>",
            );
        let ctx = test_context(tmp.path(), Arc::new(FakeTransport::new()), renderer.clone());

        let summary = run_news(&ctx).await.unwrap();
        assert_eq!(summary, NewsSummary { listed: 3, saved: 1 });
        assert_eq!(renderer.render_count(), 4);
        assert_eq!(renderer.released(), 1);

        let stored = ctx.store.items("News").read_by_query(&Query::default()).await.unwrap();
        assert_eq!(stored[0]["title"], "Weltcup");
        assert_eq!(stored[0]["source"], "solv");

        // same articles again: no duplicates
        run_news(&ctx).await.unwrap();
        let stored = ctx.store.items("News").read_by_query(&Query::default()).await.unwrap();
        assert_eq!(stored.len(), 1);
    }

    #[tokio::test]
    async fn test_listing_failure_releases_session() {
        let tmp = TempDir::new().unwrap();
        let renderer = FakeRenderer::new();
        let ctx = test_context(tmp.path(), Arc::new(FakeTransport::new()), renderer.clone());

        assert!(run_news(&ctx).await.is_err());
        assert_eq!(renderer.acquired(), 1);
        assert_eq!(renderer.released(), 1);
    }
}
