use std::sync::Arc;

use oergraph_common::normalize_field;
use wikipedia_client::{Article, WikiError};

use crate::retry::{with_retry, RetryPolicy};
use crate::traits::KnowledgeSource;

/// Field separator of the output tables. Enriched text never contains it.
pub const OUTPUT_DELIMITER: char = ',';

/// Knowledge-base fields of a concept, normalized for tabular output.
#[derive(Debug, Clone, PartialEq)]
pub struct EnrichedConcept {
    pub title: String,
    pub summary: String,
    pub text: String,
    /// Character length of the page text as the knowledge base returned it.
    pub text_length: usize,
}

impl EnrichedConcept {
    pub fn from_article(article: Article) -> Self {
        Self {
            text_length: article.text.chars().count(),
            title: normalize_field(&article.title, OUTPUT_DELIMITER),
            summary: normalize_field(&article.summary, OUTPUT_DELIMITER),
            text: normalize_field(&article.text, OUTPUT_DELIMITER),
        }
    }
}

/// Result of enriching one topic. Only `Found` can lead to a concept row.
#[derive(Debug, Clone)]
pub enum EnrichOutcome {
    Found(EnrichedConcept),
    NotFound,
    Failed(String),
    Cancelled,
}

impl From<Result<EnrichedConcept, WikiError>> for EnrichOutcome {
    fn from(result: Result<EnrichedConcept, WikiError>) -> Self {
        match result {
            Ok(concept) => EnrichOutcome::Found(concept),
            Err(WikiError::NotFound(_)) => EnrichOutcome::NotFound,
            Err(e) => EnrichOutcome::Failed(e.to_string()),
        }
    }
}

/// Knowledge source plus the retry policy applied to every lookup.
#[derive(Clone)]
pub struct Enricher {
    source: Arc<dyn KnowledgeSource>,
    retry: RetryPolicy,
}

impl Enricher {
    pub fn new(source: Arc<dyn KnowledgeSource>, retry: RetryPolicy) -> Self {
        Self { source, retry }
    }

    pub async fn enrich(&self, topic: &str) -> Result<EnrichedConcept, WikiError> {
        let article = with_retry(&self.retry, "knowledge", WikiError::is_transient, || {
            self.source.article(topic)
        })
        .await?;
        Ok(EnrichedConcept::from_article(article))
    }
}
