//! Crawl driver: walks the catalog page by page and turns every accepted
//! material and concept mention into output rows.
//!
//! Pagination is an explicit state machine over the cursor URL:
//!
//! ```text
//! Start → FetchingPage → ProcessingPage → FetchingPage … → Done
//!               ↘ (fatal fetch / sink / store error, cancel) → Failed
//! ```
//!
//! Materials on a page are handled in order. A material's row is written
//! before anything that refers to it. Within a material, cache-missed
//! slugs are enriched concurrently, then applied one by one in mention
//! order; tag allocation, cache insertion and row writes all happen on that
//! single path.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use futures::stream::{self, StreamExt};
use oergraph_common::{collapse_line_breaks, slugify, ConceptRow, Config, LinkRow, MaterialRow};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use x5gon_client::{CatalogError, CatalogPage, ConceptMention, PageWindow, RawMaterial};

use crate::dedup::{DedupCache, Seen};
use crate::enrichment::{EnrichOutcome, EnrichedConcept, Enricher};
use crate::error::{CrawlError, CrawlFailure};
use crate::filter::RecordFilter;
use crate::retry::{with_retry, RetryPolicy};
use crate::sink::RecordSink;
use crate::stats::CrawlStats;
use crate::tags::TagAllocator;
use crate::traits::{CatalogSource, KnowledgeSource};

/// Tunables of a crawl run.
#[derive(Debug, Clone)]
pub struct CrawlSettings {
    pub filter: RecordFilter,
    pub retry: RetryPolicy,
    /// Upper bound on concurrent knowledge lookups for one material.
    pub enrich_concurrency: usize,
    /// Stop after this many pages, even if the catalog has more.
    pub max_pages: Option<u32>,
    /// Saved cursor to resume from instead of the first page.
    pub start_url: Option<String>,
    /// First material tag to issue. Non-zero when resuming into existing
    /// output tables.
    pub first_material_tag: u64,
}

impl Default for CrawlSettings {
    fn default() -> Self {
        Self {
            filter: RecordFilter::default(),
            retry: RetryPolicy::default(),
            enrich_concurrency: 4,
            max_pages: None,
            start_url: None,
            first_material_tag: 0,
        }
    }
}

impl CrawlSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            filter: RecordFilter::from_config(config),
            retry: RetryPolicy {
                max_attempts: config.fetch_max_attempts,
                base_delay: Duration::from_millis(config.retry_base_ms),
                max_jitter: Duration::from_millis(config.retry_base_ms / 2),
            },
            enrich_concurrency: config.enrich_concurrency,
            max_pages: None,
            start_url: None,
            first_material_tag: 0,
        }
    }
}

enum CrawlState {
    Start,
    FetchingPage { url: String },
    ProcessingPage { url: String, page: CatalogPage },
    Done,
}

#[derive(Debug, Default)]
struct Progress {
    last_material_tag: Option<u64>,
    last_concept_tag: Option<u64>,
    last_cursor: Option<String>,
}

/// A concept mention that survived the section-name check.
struct Mention<'a> {
    raw: &'a ConceptMention,
    name: &'a str,
    slug: String,
}

pub struct Crawler {
    catalog: Arc<dyn CatalogSource>,
    enricher: Enricher,
    sink: Box<dyn RecordSink>,
    cache: DedupCache,
    tags: TagAllocator,
    filter: RecordFilter,
    retry: RetryPolicy,
    enrich_concurrency: usize,
    max_pages: Option<u32>,
    start_url: Option<String>,
    cancel: CancellationToken,
    stats: CrawlStats,
    progress: Progress,
}

impl Crawler {
    pub fn new(
        catalog: Arc<dyn CatalogSource>,
        knowledge: Arc<dyn KnowledgeSource>,
        sink: Box<dyn RecordSink>,
        cache: DedupCache,
        settings: CrawlSettings,
        cancel: CancellationToken,
    ) -> Self {
        let tags = TagAllocator::new(settings.first_material_tag, cache.next_free_tag());
        Self {
            catalog,
            enricher: Enricher::new(knowledge, settings.retry.clone()),
            sink,
            cache,
            tags,
            filter: settings.filter,
            retry: settings.retry,
            enrich_concurrency: settings.enrich_concurrency.max(1),
            max_pages: settings.max_pages,
            start_url: settings.start_url,
            cancel,
            stats: CrawlStats::default(),
            progress: Progress::default(),
        }
    }

    /// Crawl until the catalog reports no further page.
    pub async fn run(mut self) -> Result<CrawlStats, CrawlFailure> {
        let mut state = CrawlState::Start;
        loop {
            state = match state {
                CrawlState::Start => {
                    let url = self
                        .start_url
                        .take()
                        .unwrap_or_else(|| self.catalog.first_page_url());
                    info!(
                        url = url.as_str(),
                        known_concepts = self.cache.len(),
                        "Crawl starting"
                    );
                    CrawlState::FetchingPage { url }
                }

                CrawlState::FetchingPage { url } => {
                    if self.cancel.is_cancelled() {
                        return Err(self.failure(CrawlError::Cancelled, Some(url)));
                    }
                    if self
                        .max_pages
                        .is_some_and(|max| self.stats.pages_fetched >= max)
                    {
                        warn!(
                            resume_url = url.as_str(),
                            "Page limit reached before the end of the catalog"
                        );
                        self.stats.resume_url = Some(url);
                        CrawlState::Done
                    } else {
                        match self.fetch_page(&url).await {
                            Ok(page) => {
                                self.stats.pages_fetched += 1;
                                self.progress.last_cursor = Some(url.clone());
                                CrawlState::ProcessingPage { url, page }
                            }
                            Err(e) => return Err(self.failure(e.into(), Some(url))),
                        }
                    }
                }

                CrawlState::ProcessingPage { url, page } => {
                    let next = page.links.next.clone();
                    if let Err(e) = self.process_page(page).await {
                        return Err(self.failure(e, Some(url)));
                    }
                    match next {
                        Some(next) if next == url => {
                            warn!(url = url.as_str(), "Catalog returned the current page as next, stopping");
                            CrawlState::Done
                        }
                        Some(next) => CrawlState::FetchingPage { url: next },
                        None => CrawlState::Done,
                    }
                }

                CrawlState::Done => {
                    info!(
                        pages = self.stats.pages_fetched,
                        materials = self.stats.materials_accepted,
                        concepts = self.stats.concepts_accepted,
                        links = self.stats.links_written,
                        "Crawl done"
                    );
                    return Ok(self.stats);
                }
            };
        }
    }

    async fn fetch_page(&self, url: &str) -> Result<CatalogPage, CatalogError> {
        match PageWindow::from_url(url) {
            Some(window) => info!(
                from = window.offset,
                to = window.end(),
                "Getting materials"
            ),
            None => info!(url, "Getting materials"),
        }
        with_retry(&self.retry, "catalog", CatalogError::is_transient, || {
            self.catalog.fetch_page(url)
        })
        .await
    }

    async fn process_page(&mut self, page: CatalogPage) -> Result<(), CrawlError> {
        let on_page = page.oer_materials.len();
        let accepted_before = self.stats.materials_accepted;

        for value in page.oer_materials {
            self.stats.materials_seen += 1;
            let material = match RawMaterial::from_value(value) {
                Ok(material) => material,
                Err(e) => {
                    warn!(error = %e, "Skipping malformed material");
                    self.stats.materials_malformed += 1;
                    continue;
                }
            };

            if !self.filter.accept_material(&material) {
                debug!(material_id = material.material_id.as_str(), "Material rejected");
                self.stats.materials_rejected += 1;
                continue;
            }

            self.process_material(&material).await?;

            if self.cancel.is_cancelled() {
                return Err(CrawlError::Cancelled);
            }
        }

        info!(
            materials = on_page,
            accepted = self.stats.materials_accepted - accepted_before,
            "Page processed"
        );
        Ok(())
    }

    async fn process_material(&mut self, material: &RawMaterial) -> Result<(), CrawlError> {
        let material_tag = self.tags.next_material_tag();
        self.sink
            .write_material(&material_row(material_tag, material))
            .map_err(CrawlError::Sink)?;
        self.progress.last_material_tag = Some(material_tag);
        self.stats.materials_accepted += 1;

        let mut mentions = Vec::with_capacity(material.wikipedia.len());
        for raw in &material.wikipedia {
            self.stats.mentions_seen += 1;
            let Some(name) = raw.section_name() else {
                self.stats.mentions_without_section += 1;
                continue;
            };
            let slug = slugify(name);
            if slug.is_empty() {
                self.stats.mentions_without_section += 1;
                continue;
            }
            mentions.push(Mention { raw, name, slug });
        }

        let mut outcomes = self.enrich_misses(&mentions).await;

        for mention in &mentions {
            match self.cache.lookup(&mention.slug) {
                Some(Seen::Tagged(concept_tag)) => {
                    self.stats.cache_hits += 1;
                    self.write_link(material_tag, concept_tag, mention, material)?;
                }
                Some(Seen::Untagged) => {
                    self.stats.untagged_hits += 1;
                    debug!(slug = mention.slug.as_str(), "Cached slug has no tag, link skipped");
                }
                None => match outcomes.remove(&mention.slug) {
                    Some(EnrichOutcome::Found(enriched)) => {
                        if self.filter.accept_concept(&enriched) {
                            self.accept_concept(material_tag, mention, material, enriched)?;
                        } else {
                            self.stats.concepts_rejected += 1;
                            debug!(slug = mention.slug.as_str(), "Concept text too short");
                        }
                    }
                    Some(EnrichOutcome::NotFound) => {
                        self.stats.concepts_not_found += 1;
                        debug!(topic = mention.name, "No knowledge page for topic");
                    }
                    Some(EnrichOutcome::Failed(error)) => {
                        self.stats.concepts_failed += 1;
                        warn!(topic = mention.name, error = error.as_str(), "Enrichment failed");
                    }
                    // Cancelled lookups and repeats of an already-discarded
                    // slug produce nothing.
                    Some(EnrichOutcome::Cancelled) | None => {}
                },
            }
        }

        Ok(())
    }

    /// Look up every distinct slug the cache has not seen, at most
    /// `enrich_concurrency` at a time.
    async fn enrich_misses(&mut self, mentions: &[Mention<'_>]) -> HashMap<String, EnrichOutcome> {
        let mut queued = HashSet::new();
        let misses: Vec<(String, String)> = mentions
            .iter()
            .filter(|m| !self.cache.contains(&m.slug) && queued.insert(m.slug.clone()))
            .map(|m| (m.slug.clone(), m.name.to_string()))
            .collect();
        if misses.is_empty() {
            return HashMap::new();
        }
        self.stats.enrichment_calls += misses.len() as u32;

        let enricher = &self.enricher;
        let cancel = &self.cancel;
        stream::iter(misses)
            .map(|(slug, topic)| async move {
                let outcome = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => EnrichOutcome::Cancelled,
                    result = enricher.enrich(&topic) => EnrichOutcome::from(result),
                };
                (slug, outcome)
            })
            .buffer_unordered(self.enrich_concurrency)
            .collect()
            .await
    }

    fn accept_concept(
        &mut self,
        material_tag: u64,
        mention: &Mention<'_>,
        material: &RawMaterial,
        enriched: EnrichedConcept,
    ) -> Result<(), CrawlError> {
        let concept_tag = self.tags.next_concept_tag();
        self.cache
            .add(&mention.slug, concept_tag)
            .map_err(CrawlError::Store)?;
        self.sink
            .write_concept(&concept_row(concept_tag, mention, enriched))
            .map_err(CrawlError::Sink)?;
        self.progress.last_concept_tag = Some(concept_tag);
        self.stats.concepts_accepted += 1;
        debug!(slug = mention.slug.as_str(), concept_tag, "Concept accepted");

        self.write_link(material_tag, concept_tag, mention, material)
    }

    fn write_link(
        &mut self,
        material_tag: u64,
        concept_tag: u64,
        mention: &Mention<'_>,
        material: &RawMaterial,
    ) -> Result<(), CrawlError> {
        let target = match mention.raw.page_rank {
            Some(rank) => rank,
            None => {
                self.stats.links_without_relevance += 1;
                debug!(
                    slug = mention.slug.as_str(),
                    material_id = material.material_id.as_str(),
                    "Mention has no pageRank, link target set to 0"
                );
                0.0
            }
        };
        let row = LinkRow {
            material_tag,
            concept_tag,
            concept_slug: mention.slug.clone(),
            material_id: material.material_id.clone(),
            target,
        };
        self.sink.write_link(&row).map_err(CrawlError::Sink)?;
        self.stats.links_written += 1;
        Ok(())
    }

    fn failure(&self, error: CrawlError, resume_cursor: Option<String>) -> CrawlFailure {
        CrawlFailure {
            error,
            last_material_tag: self.progress.last_material_tag,
            last_concept_tag: self.progress.last_concept_tag,
            last_cursor: self.progress.last_cursor.clone(),
            resume_cursor,
        }
    }
}

fn material_row(tag: u64, material: &RawMaterial) -> MaterialRow {
    let provider = material.provider.as_ref();
    MaterialRow {
        tag,
        material_id: material.material_id.clone(),
        title: material.title.clone(),
        description: material
            .description
            .as_deref()
            .map(collapse_line_breaks)
            .unwrap_or_default(),
        url: material.url.clone(),
        language: material.language.clone().unwrap_or_default(),
        creation_date: material.creation_date.clone(),
        retrieved_date: material.retrieved_date.clone(),
        resource_type: material.resource_type.clone(),
        extension: material.extension.clone(),
        mimetype: material.mimetype.clone(),
        provider_id: provider.and_then(|p| p.provider_id.clone()),
        provider_name: provider.and_then(|p| p.provider_name.clone()),
        provider_domain: provider.and_then(|p| p.provider_domain.clone()),
        license: material.license.clone(),
    }
}

fn concept_row(tag: u64, mention: &Mention<'_>, enriched: EnrichedConcept) -> ConceptRow {
    ConceptRow {
        tag,
        slug: mention.slug.clone(),
        title: enriched.title,
        description: enriched.summary,
        text: enriched.text,
        page_length: enriched.text_length,
        uri: mention.raw.uri.clone(),
        name: mention.raw.name.clone(),
        sec_uri: mention.raw.sec_uri.clone(),
        sec_name: mention.name.to_string(),
        lang: mention.raw.lang.clone(),
        support_len: mention.raw.support_len.clone(),
    }
}
