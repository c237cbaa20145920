pub mod error;
pub mod types;

pub use error::{Result, WikiError};
pub use types::Article;

use tracing::debug;
use types::{ExtractPage, QueryResponse};

pub struct WikipediaClient {
    client: reqwest::Client,
    endpoint: String,
}

impl WikipediaClient {
    /// `endpoint` is the `api.php` URL, e.g. `https://en.wikipedia.org/w/api.php`.
    pub fn new(client: reqwest::Client, endpoint: &str) -> Self {
        Self {
            client,
            endpoint: endpoint.to_string(),
        }
    }

    /// Resolve a topic name (redirects followed) to its title, lead summary
    /// and full plain text. Two extract queries are issued: the API returns
    /// either the intro or the whole page, never both.
    pub async fn article(&self, topic: &str) -> Result<Article> {
        let full = self.extract(topic, false).await?;
        let title = full.title.clone().unwrap_or_else(|| topic.to_string());
        let text = full.extract.unwrap_or_default();

        // Query the resolved title so the intro comes from the same page.
        let intro = self.extract(&title, true).await?;
        let summary = intro.extract.unwrap_or_default();

        debug!(topic, title = title.as_str(), text_chars = text.chars().count(), "Fetched article");
        Ok(Article {
            title,
            summary,
            text,
        })
    }

    async fn extract(&self, title: &str, intro_only: bool) -> Result<ExtractPage> {
        let mut params = vec![
            ("action", "query"),
            ("format", "json"),
            ("formatversion", "2"),
            ("prop", "extracts"),
            ("explaintext", "1"),
            ("redirects", "1"),
            ("titles", title),
        ];
        if intro_only {
            params.push(("exintro", "1"));
        }

        let resp = self
            .client
            .get(&self.endpoint)
            .query(&params)
            .send()
            .await?;

        let status = resp.status();
        if !status.is_success() {
            let message = resp.text().await.unwrap_or_default();
            return Err(WikiError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body = resp.text().await?;
        let parsed: QueryResponse = serde_json::from_str(&body)?;
        let page = parsed
            .query
            .and_then(|q| q.pages.into_iter().next())
            .ok_or_else(|| WikiError::NotFound(title.to_string()))?;

        if page.missing || page.invalid {
            return Err(WikiError::NotFound(title.to_string()));
        }
        Ok(page)
    }
}
