use chrono::{DateTime, Utc};

/// Counters for one crawl run.
#[derive(Debug, Clone)]
pub struct CrawlStats {
    pub started_at: DateTime<Utc>,
    pub pages_fetched: u32,
    pub materials_seen: u32,
    pub materials_malformed: u32,
    pub materials_rejected: u32,
    pub materials_accepted: u32,
    pub mentions_seen: u32,
    pub mentions_without_section: u32,
    pub cache_hits: u32,
    pub untagged_hits: u32,
    pub enrichment_calls: u32,
    pub concepts_not_found: u32,
    pub concepts_failed: u32,
    pub concepts_rejected: u32,
    pub concepts_accepted: u32,
    pub links_written: u32,
    /// Links whose mention carried no `pageRank`; written with target 0.
    pub links_without_relevance: u32,
    /// Set when the run stopped at the page limit: the next page to fetch.
    pub resume_url: Option<String>,
}

impl Default for CrawlStats {
    fn default() -> Self {
        Self {
            started_at: Utc::now(),
            pages_fetched: 0,
            materials_seen: 0,
            materials_malformed: 0,
            materials_rejected: 0,
            materials_accepted: 0,
            mentions_seen: 0,
            mentions_without_section: 0,
            cache_hits: 0,
            untagged_hits: 0,
            enrichment_calls: 0,
            concepts_not_found: 0,
            concepts_failed: 0,
            concepts_rejected: 0,
            concepts_accepted: 0,
            links_written: 0,
            links_without_relevance: 0,
            resume_url: None,
        }
    }
}

impl std::fmt::Display for CrawlStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let elapsed = Utc::now().signed_duration_since(self.started_at);
        writeln!(f, "\n=== Crawl Run Complete ===")?;
        writeln!(f, "Elapsed:            {}s", elapsed.num_seconds())?;
        writeln!(f, "Pages fetched:      {}", self.pages_fetched)?;
        writeln!(f, "\nMaterials:")?;
        writeln!(f, "  Seen:      {}", self.materials_seen)?;
        writeln!(f, "  Accepted:  {}", self.materials_accepted)?;
        writeln!(f, "  Rejected:  {}", self.materials_rejected)?;
        writeln!(f, "  Malformed: {}", self.materials_malformed)?;
        writeln!(f, "\nConcept mentions:")?;
        writeln!(f, "  Seen:            {}", self.mentions_seen)?;
        writeln!(f, "  No section name: {}", self.mentions_without_section)?;
        writeln!(f, "  Cache hits:      {}", self.cache_hits)?;
        if self.untagged_hits > 0 {
            writeln!(f, "  Untagged hits:   {} (no link written)", self.untagged_hits)?;
        }
        writeln!(f, "\nEnrichment:")?;
        writeln!(f, "  Lookups:   {}", self.enrichment_calls)?;
        writeln!(f, "  Accepted:  {}", self.concepts_accepted)?;
        writeln!(f, "  Rejected:  {}", self.concepts_rejected)?;
        writeln!(f, "  Not found: {}", self.concepts_not_found)?;
        writeln!(f, "  Failed:    {}", self.concepts_failed)?;
        let hit_rate = if self.mentions_seen > self.mentions_without_section {
            self.cache_hits as f64 / (self.mentions_seen - self.mentions_without_section) as f64
                * 100.0
        } else {
            0.0
        };
        writeln!(f, "\nLinks written:      {}", self.links_written)?;
        if self.links_without_relevance > 0 {
            writeln!(f, "  No pageRank:      {}", self.links_without_relevance)?;
        }
        write!(f, "Cache hit rate:     {hit_rate:.0}%")?;
        if let Some(url) = &self.resume_url {
            write!(f, "\n\nStopped at page limit. Resume with --start-url {url}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn summary_lists_counters() {
        let stats = CrawlStats {
            pages_fetched: 3,
            materials_accepted: 12,
            mentions_seen: 10,
            cache_hits: 5,
            links_written: 9,
            ..Default::default()
        };
        let text = stats.to_string();
        assert!(text.contains("Pages fetched:      3"));
        assert!(text.contains("Accepted:  12"));
        assert!(text.contains("Links written:      9"));
        assert!(text.contains("Cache hit rate:     50%"));
        assert!(!text.contains("Untagged hits"));
        assert!(!text.contains("Stopped at page limit"));
    }

    #[test]
    fn summary_names_resume_url_after_page_limit() {
        let stats = CrawlStats {
            links_without_relevance: 2,
            resume_url: Some("https://x/oer_materials?limit=20&offset=40".into()),
            ..Default::default()
        };
        let text = stats.to_string();
        assert!(text.contains("No pageRank:      2"));
        assert!(text.ends_with("Resume with --start-url https://x/oer_materials?limit=20&offset=40"));
    }
}
