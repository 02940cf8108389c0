// src/services/fetch.rs

//! Page fetching.
//!
//! The watcher only needs the rendered markup of a page and the URL it was
//! finally served from. [`HttpFetcher`] covers server-rendered pages; pages
//! that build their listings in JavaScript need a browser-backed
//! [`PageFetcher`] plugged in instead.

use async_trait::async_trait;
use reqwest::Client;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::SourceConfig;

/// Markup of a fetched page.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    pub html: String,
    /// URL the page was served from, after redirects
    pub base_url: Url,
}

/// Source of rendered page markup.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, source: &SourceConfig) -> Result<FetchedPage>;
}

/// Plain HTTP fetcher.
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    pub fn with_client(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, source: &SourceConfig) -> Result<FetchedPage> {
        let configured = Url::parse(&source.url)?;
        let response = self
            .client
            .get(configured.clone())
            .send()
            .await?
            .error_for_status()
            .map_err(|e| AppError::fetch(&source.name, e))?;

        let mut base_url = response.url().clone();
        // Fragments never reach the server; keep the configured one so
        // page-URL links point at the filtered view.
        if base_url.fragment().is_none() {
            base_url.set_fragment(configured.fragment());
        }

        let html = response.text().await?;
        log::debug!("{}: fetched {} bytes from {}", source.name, html.len(), base_url);
        Ok(FetchedPage { html, base_url })
    }
}
