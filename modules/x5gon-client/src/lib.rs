pub mod error;
pub mod types;

pub use error::{CatalogError, Result};
pub use types::{CatalogPage, ConceptMention, PageLinks, Provider, RawMaterial};

use tracing::debug;

const DEFAULT_BASE_URL: &str = "https://platform.x5gon.org/api/v1";

/// Materials per page when no window is configured.
pub const DEFAULT_PAGE_SIZE: u32 = 20;

/// The `limit`/`offset` window a page URL asks for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub offset: u64,
    pub limit: u64,
}

impl PageWindow {
    /// Parse the window out of a page URL's query string.
    pub fn from_url(page_url: &str) -> Option<Self> {
        let parsed = url::Url::parse(page_url).ok()?;
        let mut offset = None;
        let mut limit = None;
        for (key, value) in parsed.query_pairs() {
            match key.as_ref() {
                "offset" => offset = value.parse().ok(),
                "limit" => limit = value.parse().ok(),
                _ => {}
            }
        }
        Some(Self {
            offset: offset?,
            limit: limit?,
        })
    }

    /// Offset one past the last material of the window. Cursors come from
    /// the server, so this saturates instead of overflowing.
    pub fn end(&self) -> u64 {
        self.offset.saturating_add(self.limit)
    }
}

pub struct X5gonClient {
    client: reqwest::Client,
    base_url: String,
    page_size: u32,
    start_offset: u64,
}

impl X5gonClient {
    pub fn new(client: reqwest::Client, base_url: &str) -> Self {
        Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            page_size: DEFAULT_PAGE_SIZE,
            start_offset: 0,
        }
    }

    /// Client against the public platform with a default HTTP client.
    pub fn public() -> Self {
        Self::new(reqwest::Client::new(), DEFAULT_BASE_URL)
    }

    /// Set the `limit`/`offset` used for the first page.
    pub fn with_window(mut self, page_size: u32, start_offset: u64) -> Self {
        self.page_size = page_size;
        self.start_offset = start_offset;
        self
    }

    /// URL of the first page for the configured window.
    pub fn first_page_url(&self) -> String {
        format!(
            "{}/oer_materials?limit={}&offset={}",
            self.base_url, self.page_size, self.start_offset
        )
    }

    /// Fetch one page of materials. `cursor` is the `links.next` URL of the
    /// previous page; `None` fetches the first page.
    pub async fn fetch_page(&self, cursor: Option<&str>) -> Result<CatalogPage> {
        let url = match cursor {
            Some(next) => next.to_string(),
            None => self.first_page_url(),
        };

        match PageWindow::from_url(&url) {
            Some(window) => debug!(
                from = window.offset,
                to = window.end(),
                "Fetching catalog page"
            ),
            None => debug!(url = url.as_str(), "Fetching catalog page"),
        }

        let body = self.get_text(&url).await?;
        let page: CatalogPage = serde_json::from_str(&body)?;
        Ok(page)
    }

    /// Fetch the extracted content of a single material.
    pub async fn material_content(&self, material_id: &str) -> Result<serde_json::Value> {
        let url = format!("{}/oer_materials/{}/value", self.base_url, material_id);
        let body = self.get_text(&url).await?;
        Ok(serde_json::from_str(&body)?)
    }

    // Bodies are read as text first so that a transport failure surfaces as
    // `Network` and a shape mismatch as `Parse`.
    async fn get_text(&self, url: &str) -> Result<String> {
        let resp = self.client.get(url).send().await?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(CatalogError::Api {
                status: status.as_u16(),
                message: body,
            });
        }

        Ok(resp.text().await?)
    }
}
