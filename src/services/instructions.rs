// src/services/instructions.rs

//! Instruction document discovery on event websites.
//!
//! Event websites are run by the organizing clubs, so the document is
//! searched heuristically: follow the first anchor mentioning an
//! instruction keyword until a link resolves to a document or the hop limit
//! is reached.

use scraper::{ElementRef, Html, Selector};
use url::Url;

use crate::error::Result;
use crate::models::InstructionsConfig;
use crate::services::parse_selector;
use crate::utils::http::{MediaType, Transport, probe_media_type};
use crate::utils::render::RenderSession;
use crate::utils::{is_absolute, resolve_url};

/// Result of searching one event website.
#[derive(Debug, Clone, PartialEq)]
pub enum Discovery {
    /// A document link, found `depth` hops away from the website
    Document { link: String, depth: usize },
    /// The page at `url` could not be rendered or was empty
    NoContent { url: String },
    /// No anchor on the page at `url` matched
    NoLink { url: String, depth: usize },
    /// The matched link is not a document and cannot be followed further
    Unresolved { link: String, media: MediaType },
}

impl Discovery {
    pub fn document_link(&self) -> Option<&str> {
        match self {
            Self::Document { link, .. } => Some(link),
            _ => None,
        }
    }
}

/// Bounded-depth search for an instruction document.
pub struct InstructionFinder<'a> {
    transport: &'a dyn Transport,
    keywords: Vec<String>,
    widened: Vec<String>,
    max_depth: usize,
    anchor_sel: Selector,
    base_sel: Selector,
}

impl<'a> InstructionFinder<'a> {
    pub fn new(transport: &'a dyn Transport, config: &InstructionsConfig) -> Result<Self> {
        let keywords: Vec<String> = config.keywords.iter().map(|k| k.to_lowercase()).collect();
        let widened = keywords
            .iter()
            .cloned()
            .chain(config.extra_keywords.iter().map(|k| k.to_lowercase()))
            .collect();

        Ok(Self {
            transport,
            keywords,
            widened,
            max_depth: config.max_depth,
            anchor_sel: parse_selector("a[href]")?,
            base_sel: parse_selector("base[href]")?,
        })
    }

    /// Search the website at `start` using an already acquired session.
    pub async fn find(&self, session: &mut dyn RenderSession, start: &str) -> Discovery {
        let mut url = start.to_string();
        let mut depth = 0;
        let mut keywords = &self.keywords;

        loop {
            let html = match session.render(&url).await {
                Ok(Some(html)) => html,
                Ok(None) => {
                    log::warn!("Website content from {} was empty", url);
                    return Discovery::NoContent { url };
                }
                Err(e) => {
                    log::warn!("Could not render {}: {}", url, e);
                    return Discovery::NoContent { url };
                }
            };

            let Some(link) = self.select_link(&html, &url, keywords) else {
                log::debug!("No instruction link on {} (depth {})", url, depth);
                return Discovery::NoLink { url, depth };
            };

            match probe_media_type(self.transport, &link).await {
                MediaType::Document => return Discovery::Document { link, depth },
                MediaType::Markup if depth < self.max_depth => {
                    log::debug!("Following {} (depth {})", link, depth + 1);
                    url = link;
                    depth += 1;
                    keywords = &self.widened;
                }
                media => return Discovery::Unresolved { link, media },
            }
        }
    }

    /// First anchor mentioning a keyword, resolved to an absolute URL.
    pub fn select_link(&self, html: &str, page_url: &str, keywords: &[String]) -> Option<String> {
        let document = Html::parse_document(html);
        let href = document
            .select(&self.anchor_sel)
            .find(|anchor| mentions_keyword(*anchor, keywords))
            .and_then(|anchor| anchor.value().attr("href"))
            .map(str::trim)
            .filter(|href| !href.is_empty())?;

        if is_absolute(href) {
            return Some(href.to_string());
        }

        let page = Url::parse(page_url).ok()?;
        let base = document
            .select(&self.base_sel)
            .next()
            .and_then(|base| base.value().attr("href"))
            .and_then(|base_href| page.join(base_href.trim()).ok())
            .unwrap_or(page);
        Some(resolve_url(&base, href))
    }
}

fn mentions_keyword(anchor: ElementRef<'_>, keywords: &[String]) -> bool {
    let text = anchor.text().collect::<String>().to_lowercase();
    let attributes = anchor
        .value()
        .attrs()
        .map(|(_, value)| value.to_lowercase())
        .collect::<Vec<_>>()
        .join(" ");
    keywords
        .iter()
        .any(|keyword| text.contains(keyword.as_str()) || attributes.contains(keyword.as_str()))
}
