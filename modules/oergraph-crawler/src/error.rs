use std::fmt;

use oergraph_common::OerGraphError;
use thiserror::Error;
use x5gon_client::CatalogError;

/// Errors that end a crawl. Everything below material granularity is
/// absorbed by the driver and never surfaces here.
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Catalog fetch failed: {0}")]
    Catalog(#[from] CatalogError),

    #[error("Output write failed: {0}")]
    Sink(OerGraphError),

    #[error("Dedup store write failed: {0}")]
    Store(OerGraphError),

    #[error("Crawl cancelled")]
    Cancelled,
}

/// A terminal failure together with where the crawl got to.
#[derive(Debug)]
pub struct CrawlFailure {
    pub error: CrawlError,
    pub last_material_tag: Option<u64>,
    pub last_concept_tag: Option<u64>,
    /// Last page URL that was fetched successfully.
    pub last_cursor: Option<String>,
    /// Page URL to pass as `--start-url` to pick up where this run stopped.
    pub resume_cursor: Option<String>,
}

impl fmt::Display for CrawlFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.error)?;
        write!(f, " (last material tag: {}", display_opt(&self.last_material_tag))?;
        write!(f, ", last concept tag: {}", display_opt(&self.last_concept_tag))?;
        write!(f, ", last cursor: {}", display_opt(&self.last_cursor))?;
        write!(f, ", resume from: {})", display_opt(&self.resume_cursor))
    }
}

impl std::error::Error for CrawlFailure {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.error)
    }
}

fn display_opt<T: fmt::Display>(value: &Option<T>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "none".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn failure_report_names_progress() {
        let failure = CrawlFailure {
            error: CrawlError::Catalog(CatalogError::Api {
                status: 503,
                message: "unavailable".into(),
            }),
            last_material_tag: Some(41),
            last_concept_tag: None,
            last_cursor: Some("https://x/oer_materials?limit=20&offset=20".into()),
            resume_cursor: Some("https://x/oer_materials?limit=20&offset=40".into()),
        };
        let text = failure.to_string();
        assert!(text.starts_with("Catalog fetch failed: API error (status 503)"));
        assert!(text.contains("last material tag: 41"));
        assert!(text.contains("last concept tag: none"));
        assert!(text.contains("resume from: https://x/oer_materials?limit=20&offset=40"));
    }
}
