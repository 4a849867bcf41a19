//! Federation news feed reader.

use std::collections::HashSet;

use scraper::{Html, Selector};

use crate::error::Result;
use crate::models::{NewsConfig, NewsItem};
use crate::services::parse_selector;
use crate::utils::complete_link;
use crate::utils::render::RenderSession;

const TITLE_SELECTOR: &str = ".page-header h1";
const LEAD_SELECTOR: &str = ".com-content-article__body strong";

pub struct NewsReader<'a> {
    config: &'a NewsConfig,
    source: String,
    link_sel: Selector,
    title_sel: Selector,
    lead_sel: Selector,
}

impl<'a> NewsReader<'a> {
    pub fn new(config: &'a NewsConfig, source: impl Into<String>) -> Result<Self> {
        let link_selector = format!("a[href*=\"{}\"]", config.link_pattern);
        Ok(Self {
            config,
            source: source.into(),
            link_sel: parse_selector(&link_selector)?,
            title_sel: parse_selector(TITLE_SELECTOR)?,
            lead_sel: parse_selector(LEAD_SELECTOR)?,
        })
    }

    /// Article links of the listing page, deduplicated in page order.
    pub fn parse_listing(&self, html: &str) -> Vec<String> {
        let document = Html::parse_document(html);
        let mut seen = HashSet::new();
        document
            .select(&self.link_sel)
            .filter_map(|anchor| anchor.value().attr("href"))
            .map(|href| complete_link(&self.config.base_url, href.trim()))
            .filter(|link| seen.insert(link.clone()))
            .collect()
    }

    /// Title and lead of one article. Articles without a title yield `None`.
    pub fn parse_article(&self, html: &str, link: &str) -> Option<NewsItem> {
        let document = Html::parse_document(html);
        let title = document
            .select(&self.title_sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|title| !title.is_empty())?;
        let lead = document
            .select(&self.lead_sel)
            .next()
            .map(|el| el.text().collect::<String>().trim().to_string())
            .filter(|lead| !lead.is_empty());

        Some(NewsItem {
            id: None,
            link: link.to_string(),
            title,
            lead,
            source: self.source.clone(),
        })
    }

    /// Render the listing page.
    pub async fn list(&self, session: &mut dyn RenderSession) -> Result<Vec<String>> {
        match session.render(&self.config.list_url).await? {
            Some(html) => Ok(self.parse_listing(&html)),
            None => {
                log::warn!("Website content was empty for {}", self.config.list_url);
                Ok(Vec::new())
            }
        }
    }

    /// Render and read one article. Render failures skip the article.
    pub async fn read(&self, session: &mut dyn RenderSession, link: &str) -> Option<NewsItem> {
        let html = match session.render(link).await {
            Ok(Some(html)) => html,
            Ok(None) => {
                log::warn!("No content found for {}", link);
                return None;
            }
            Err(e) => {
                log::warn!("Could not render {}: {}", link, e);
                return None;
            }
        };
        let item = self.parse_article(&html, link);
        if item.is_none() {
            log::warn!("No title found on {}", link);
        }
        item
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_listing_completes_and_deduplicates() {
        let config = NewsConfig::default();
        let reader = NewsReader::new(&config, "solv").unwrap();
        let html = r#"
            <a href="/news/ol/1201-weltcup.html"><img src="x.jpg"></a>
            <a href="/news/ol/1201-weltcup.html">Weltcup in Bern</a>
            <a href="https://www.swiss-orienteering.ch/news/ol/1199-kader.html">Kader</a>
            <a href="/news/ski-ol/77.html">Ski-OL</a>
        "#;
        assert_eq!(
            reader.parse_listing(html),
            vec![
                "https://www.swiss-orienteering.ch/news/ol/1201-weltcup.html".to_string(),
                "https://www.swiss-orienteering.ch/news/ol/1199-kader.html".to_string(),
            ]
        );
    }

    #[test]
    fn test_parse_article() {
        let config = NewsConfig::default();
        let reader = NewsReader::new(&config, "solv").unwrap();
        let html = r#"
            <div class="page-header"><h1> Weltcup in Bern </h1></div>
            <div class="com-content-article__body">
              <p><strong>Drei Podestplätze zum Auftakt.</strong></p>
              <p><strong>Zweiter Absatz</strong></p>
            </div>
        "#;
        let item = reader.parse_article(html, "https://x.ch/news/ol/1.html").unwrap();
        assert_eq!(item.title, "Weltcup in Bern");
        assert_eq!(item.lead.as_deref(), Some("Drei Podestplätze zum Auftakt."));
        assert_eq!(item.source, "solv");

        assert!(reader.parse_article("<p>404</p>", "https://x.ch/a").is_none());
    }
}
