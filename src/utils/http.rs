// src/utils/http.rs

//! HTTP transport and media type probing.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;

use crate::error::Result;
use crate::models::CrawlerConfig;
use crate::utils::has_pdf_path;

/// Plain HTTP access used by the pipelines.
#[async_trait]
pub trait Transport: Send + Sync {
    /// GET `url`. An empty body yields `None`.
    async fn get(&self, url: &str) -> Result<Option<Vec<u8>>>;

    /// HEAD `url` and return its declared content type.
    async fn content_type(&self, url: &str) -> Result<Option<String>>;
}

/// Create a configured asynchronous HTTP client.
pub fn create_async_client(config: &CrawlerConfig) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// [`Transport`] over a `reqwest` client.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: &CrawlerConfig) -> Result<Self> {
        Ok(Self {
            client: create_async_client(config)?,
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn get(&self, url: &str) -> Result<Option<Vec<u8>>> {
        let bytes = self
            .client
            .get(url)
            .send()
            .await?
            .error_for_status()?
            .bytes()
            .await?;
        Ok((!bytes.is_empty()).then(|| bytes.to_vec()))
    }

    async fn content_type(&self, url: &str) -> Result<Option<String>> {
        let response = self.client.head(url).send().await?.error_for_status()?;
        Ok(response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string))
    }
}

/// Kind of artifact a link points to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaType {
    Document,
    Markup,
    Unknown,
}

impl MediaType {
    /// Classify a `Content-Type` header value, ignoring parameters.
    pub fn from_content_type(value: &str) -> Self {
        let essence = value
            .split(';')
            .next()
            .unwrap_or_default()
            .trim()
            .to_ascii_lowercase();
        match essence.as_str() {
            "application/pdf" => Self::Document,
            "text/html" | "application/xhtml+xml" => Self::Markup,
            _ => Self::Unknown,
        }
    }
}

/// Determine what `url` points to.
///
/// A `.pdf` path is a document without asking the server. A failed probe is
/// reported as [`MediaType::Unknown`].
pub async fn probe_media_type(transport: &dyn Transport, url: &str) -> MediaType {
    if has_pdf_path(url) {
        return MediaType::Document;
    }
    match transport.content_type(url).await {
        Ok(Some(value)) => MediaType::from_content_type(&value),
        Ok(None) => MediaType::Unknown,
        Err(e) => {
            log::warn!("Media type probe failed for {}: {}", url, e);
            MediaType::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::testing::FakeTransport;

    #[test]
    fn test_media_type_from_content_type() {
        assert_eq!(
            MediaType::from_content_type("application/pdf"),
            MediaType::Document
        );
        assert_eq!(
            MediaType::from_content_type("text/html; charset=UTF-8"),
            MediaType::Markup
        );
        assert_eq!(
            MediaType::from_content_type("application/xhtml+xml"),
            MediaType::Markup
        );
        assert_eq!(MediaType::from_content_type("image/png"), MediaType::Unknown);
    }

    #[tokio::test]
    async fn test_pdf_path_needs_no_probe() {
        let transport = FakeTransport::new();
        let kind = probe_media_type(&transport, "https://club.ch/weisungen.pdf").await;
        assert_eq!(kind, MediaType::Document);
        assert_eq!(transport.probe_count(), 0);
    }

    #[tokio::test]
    async fn test_probe_falls_back_to_head() {
        let transport = FakeTransport::new()
            .with_content_type("https://club.ch/download?id=4", "application/pdf");
        let kind = probe_media_type(&transport, "https://club.ch/download?id=4").await;
        assert_eq!(kind, MediaType::Document);
        assert_eq!(transport.probe_count(), 1);
    }

    #[tokio::test]
    async fn test_failed_probe_is_unknown() {
        let transport = FakeTransport::new();
        let kind = probe_media_type(&transport, "https://dead.example/page").await;
        assert_eq!(kind, MediaType::Unknown);
    }
}
