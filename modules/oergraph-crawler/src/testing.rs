// Test mocks for the crawl pipeline.
//
// One mock per seam:
// - MockCatalog (CatalogSource): URL → scripted page or error
// - MockKnowledge (KnowledgeSource): topic → article, with call counts
// - MemorySink (RecordSink): records rows and their write order
// - MemoryStore (SeenStore): in-memory dedup store
//
// Plus JSON builders for catalog materials, mentions and pages.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use oergraph_common::{ConceptRow, LinkRow, MaterialRow, OerGraphError};
use serde_json::{json, Value};
use wikipedia_client::{Article, WikiError};
use x5gon_client::{CatalogError, CatalogPage};

use crate::dedup::{SeenStore, StoredEntry};
use crate::sink::RecordSink;
use crate::traits::{CatalogSource, KnowledgeSource};

/// First page URL reported by [`MockCatalog`].
pub const FIRST_PAGE: &str = "mock://catalog/oer_materials?limit=20&offset=0";

/// URL of the `n`th mock page (0-based).
pub fn page_url(n: u64) -> String {
    format!("mock://catalog/oer_materials?limit=20&offset={}", n * 20)
}

// ---------------------------------------------------------------------------
// MockCatalog
// ---------------------------------------------------------------------------

enum Scripted {
    Page(Value),
    Status(u16),
}

/// URL-keyed catalog. Each URL holds a queue of scripted responses; the last
/// one repeats once the queue is down to it. Unregistered URLs are 404s.
pub struct MockCatalog {
    responses: Mutex<HashMap<String, VecDeque<Scripted>>>,
    calls: Mutex<Vec<String>>,
}

impl MockCatalog {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Serve `body` for `url`. `body` is the whole JSON envelope.
    pub fn on_page(self, url: &str, body: Value) -> Self {
        self.push(url, Scripted::Page(body));
        self
    }

    /// Answer `url` with `status` `times` times before anything queued after.
    pub fn fail_with(self, url: &str, status: u16, times: usize) -> Self {
        for _ in 0..times {
            self.push(url, Scripted::Status(status));
        }
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn push(&self, url: &str, response: Scripted) {
        self.responses
            .lock()
            .unwrap()
            .entry(url.to_string())
            .or_default()
            .push_back(response);
    }
}

impl Default for MockCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogSource for MockCatalog {
    fn first_page_url(&self) -> String {
        FIRST_PAGE.to_string()
    }

    async fn fetch_page(&self, url: &str) -> x5gon_client::Result<CatalogPage> {
        self.calls.lock().unwrap().push(url.to_string());

        let mut responses = self.responses.lock().unwrap();
        let Some(queue) = responses.get_mut(url) else {
            return Err(CatalogError::Api {
                status: 404,
                message: format!("MockCatalog: nothing registered for {url}"),
            });
        };
        let response = if queue.len() > 1 {
            queue.pop_front()
        } else {
            None
        };
        let response = match response.as_ref().or(queue.front()) {
            Some(Scripted::Page(body)) => Ok(body.clone()),
            Some(Scripted::Status(status)) => Err(*status),
            None => Err(404),
        };

        match response {
            Ok(body) => Ok(serde_json::from_value(body)?),
            Err(status) => Err(CatalogError::Api {
                status,
                message: "MockCatalog: scripted failure".into(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// MockKnowledge
// ---------------------------------------------------------------------------

/// Topic-keyed knowledge base. Unknown topics are `NotFound`.
pub struct MockKnowledge {
    articles: HashMap<String, Article>,
    stalled: HashSet<String>,
    failures: Mutex<HashMap<String, usize>>,
    calls: Mutex<HashMap<String, u32>>,
}

impl MockKnowledge {
    pub fn new() -> Self {
        Self {
            articles: HashMap::new(),
            stalled: HashSet::new(),
            failures: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
        }
    }

    pub fn on_topic(mut self, topic: &str, article: Article) -> Self {
        self.articles.insert(topic.to_string(), article);
        self
    }

    /// Lookups of `topic` never complete, like a hung connection.
    pub fn stall_on(mut self, topic: &str) -> Self {
        self.stalled.insert(topic.to_string());
        self
    }

    /// Fail the first `times` lookups of `topic` with a 503.
    pub fn fail_first(self, topic: &str, times: usize) -> Self {
        self.failures.lock().unwrap().insert(topic.to_string(), times);
        self
    }

    pub fn calls_for(&self, topic: &str) -> u32 {
        self.calls.lock().unwrap().get(topic).copied().unwrap_or(0)
    }

    pub fn total_calls(&self) -> u32 {
        self.calls.lock().unwrap().values().sum()
    }
}

impl Default for MockKnowledge {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KnowledgeSource for MockKnowledge {
    async fn article(&self, topic: &str) -> wikipedia_client::Result<Article> {
        *self.calls.lock().unwrap().entry(topic.to_string()).or_default() += 1;

        if self.stalled.contains(topic) {
            std::future::pending::<()>().await;
        }

        if let Some(remaining) = self.failures.lock().unwrap().get_mut(topic) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(WikiError::Api {
                    status: 503,
                    message: "MockKnowledge: scripted failure".into(),
                });
            }
        }

        self.articles
            .get(topic)
            .cloned()
            .ok_or_else(|| WikiError::NotFound(topic.to_string()))
    }
}

// ---------------------------------------------------------------------------
// MemorySink
// ---------------------------------------------------------------------------

/// Which table a write went to, in write order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Written {
    Material(u64),
    Concept(u64),
    Link { material_tag: u64, concept_tag: u64 },
}

#[derive(Default)]
struct Recorded {
    materials: Vec<MaterialRow>,
    concepts: Vec<ConceptRow>,
    links: Vec<LinkRow>,
    order: Vec<Written>,
    fail_links_after: Option<usize>,
}

/// In-memory sink. Clones share state, so keep one clone to inspect.
#[derive(Clone, Default)]
pub struct MemorySink {
    inner: Arc<Mutex<Recorded>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every link write after the first `n` fail, like a full disk.
    pub fn failing_links_after(self, n: usize) -> Self {
        self.inner.lock().unwrap().fail_links_after = Some(n);
        self
    }

    pub fn materials(&self) -> Vec<MaterialRow> {
        self.inner.lock().unwrap().materials.clone()
    }

    pub fn concepts(&self) -> Vec<ConceptRow> {
        self.inner.lock().unwrap().concepts.clone()
    }

    pub fn links(&self) -> Vec<LinkRow> {
        self.inner.lock().unwrap().links.clone()
    }

    pub fn order(&self) -> Vec<Written> {
        self.inner.lock().unwrap().order.clone()
    }
}

impl RecordSink for MemorySink {
    fn write_material(&mut self, row: &MaterialRow) -> Result<(), OerGraphError> {
        let mut inner = self.inner.lock().unwrap();
        inner.order.push(Written::Material(row.tag));
        inner.materials.push(row.clone());
        Ok(())
    }

    fn write_concept(&mut self, row: &ConceptRow) -> Result<(), OerGraphError> {
        let mut inner = self.inner.lock().unwrap();
        inner.order.push(Written::Concept(row.tag));
        inner.concepts.push(row.clone());
        Ok(())
    }

    fn write_link(&mut self, row: &LinkRow) -> Result<(), OerGraphError> {
        let mut inner = self.inner.lock().unwrap();
        if inner.fail_links_after.is_some_and(|n| inner.links.len() >= n) {
            return Err(OerGraphError::Io(std::io::Error::other("MemorySink: disk full")));
        }
        inner.order.push(Written::Link {
            material_tag: row.material_tag,
            concept_tag: row.concept_tag,
        });
        inner.links.push(row.clone());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// MemoryStore
// ---------------------------------------------------------------------------

#[derive(Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<Vec<StoredEntry>>>,
    persists: Arc<Mutex<usize>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_entries(entries: Vec<StoredEntry>) -> Self {
        let store = Self::default();
        *store.entries.lock().unwrap() = entries;
        store
    }

    /// Store pre-populated with `slugs`, tagged 0, 1, 2, … in order.
    pub fn with_slugs(slugs: &[&str]) -> Self {
        Self::with_entries(
            slugs
                .iter()
                .enumerate()
                .map(|(i, slug)| StoredEntry::Tagged {
                    slug: slug.to_string(),
                    tag: i as u64,
                })
                .collect(),
        )
    }

    pub fn entries(&self) -> Vec<StoredEntry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn persist_count(&self) -> usize {
        *self.persists.lock().unwrap()
    }
}

impl SeenStore for MemoryStore {
    fn load(&self) -> Result<Vec<StoredEntry>, OerGraphError> {
        Ok(self.entries())
    }

    fn persist(&self, entries: &[StoredEntry]) -> Result<(), OerGraphError> {
        *self.entries.lock().unwrap() = entries.to_vec();
        *self.persists.lock().unwrap() += 1;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Builders
// ---------------------------------------------------------------------------

/// Article whose text is `text_chars` characters long.
pub fn article(title: &str, text_chars: usize) -> Article {
    Article {
        title: title.to_string(),
        summary: format!("{title} summary"),
        text: "t".repeat(text_chars),
    }
}

/// A description that passes the default filter.
pub fn long_description() -> String {
    "An introductory lecture on the topic, with worked examples and exercises.".to_string()
}

/// Catalog entry JSON.
pub fn material(id: u64, language: &str, description: Option<&str>, mentions: Vec<Value>) -> Value {
    json!({
        "material_id": id,
        "title": format!("Material {id}"),
        "description": description,
        "url": format!("https://example.org/materials/{id}"),
        "language": language,
        "creation_date": "2019-05-01T00:00:00Z",
        "retrieved_date": "2020-01-01T00:00:00Z",
        "type": "pdf",
        "extension": ".pdf",
        "mimetype": "application/pdf",
        "provider": {
            "provider_id": 3,
            "provider_name": "Example University",
            "provider_domain": "example.org"
        },
        "license": "https://creativecommons.org/licenses/by/4.0/",
        "wikipedia": mentions,
        "content_ids": [id],
        "metadata": {}
    })
}

/// English material with a long description.
pub fn english_material(id: u64, mentions: Vec<Value>) -> Value {
    material(id, "en", Some(&long_description()), mentions)
}

/// Concept mention JSON without a `pageRank`.
pub fn unranked_mention(sec_name: &str) -> Value {
    let mut value = mention(sec_name, 0.0);
    if let Some(fields) = value.as_object_mut() {
        fields.remove("pageRank");
    }
    value
}

/// Concept mention JSON.
pub fn mention(sec_name: &str, page_rank: f64) -> Value {
    json!({
        "secName": sec_name,
        "secUri": format!("http://en.wikipedia.org/wiki/{}", sec_name.replace(' ', "_")),
        "uri": format!("http://en.wikipedia.org/wiki/{}", sec_name.replace(' ', "_")),
        "name": sec_name,
        "lang": "en",
        "supportLen": 2,
        "pageRank": page_rank
    })
}

/// Page envelope JSON.
pub fn page(materials: Vec<Value>, next: Option<&str>) -> Value {
    json!({
        "oer_materials": materials,
        "links": { "next": next }
    })
}
