// Trait abstractions for the crawler's two external collaborators.
//
// CatalogSource  : paginated material pages (X5GON in production).
// KnowledgeSource: topic → article lookups (Wikipedia in production).
//
// The driver only sees these traits, so tests run it against MockCatalog and
// MockKnowledge with no network.

use async_trait::async_trait;
use wikipedia_client::{Article, WikipediaClient};
use x5gon_client::{CatalogPage, X5gonClient};

#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// URL of the first page, used when no saved cursor is supplied.
    fn first_page_url(&self) -> String;

    /// Fetch the page at `url` (the first page URL or a `links.next` cursor).
    async fn fetch_page(&self, url: &str) -> x5gon_client::Result<CatalogPage>;
}

#[async_trait]
impl CatalogSource for X5gonClient {
    fn first_page_url(&self) -> String {
        X5gonClient::first_page_url(self)
    }

    async fn fetch_page(&self, url: &str) -> x5gon_client::Result<CatalogPage> {
        X5gonClient::fetch_page(self, Some(url)).await
    }
}

#[async_trait]
pub trait KnowledgeSource: Send + Sync {
    /// Resolve a topic name. Unknown topics fail with `WikiError::NotFound`.
    async fn article(&self, topic: &str) -> wikipedia_client::Result<Article>;
}

#[async_trait]
impl KnowledgeSource for WikipediaClient {
    async fn article(&self, topic: &str) -> wikipedia_client::Result<Article> {
        WikipediaClient::article(self, topic).await
    }
}
