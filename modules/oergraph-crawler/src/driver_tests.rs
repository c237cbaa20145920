//! Driver boundary tests.
//!
//! Each test follows MOCK → FUNCTION → OUTPUT: script the catalog and the
//! knowledge base, run one crawl, assert on the rows the sink received.

use std::collections::HashSet;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use oergraph_common::{LinkRow, MaterialRow};
use tokio_util::sync::CancellationToken;

use crate::dedup::{DedupCache, JsonFileStore, Seen, StoredEntry};
use crate::driver::{CrawlSettings, Crawler};
use crate::error::CrawlError;
use crate::retry::RetryPolicy;
use crate::sink::{CsvSinks, DEDUP_FILE, LINKS_FILE, MATERIALS_FILE};
use crate::testing::*;
use crate::verify::verify_data_dir;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn settings() -> CrawlSettings {
    CrawlSettings {
        retry: RetryPolicy::immediate(3),
        ..Default::default()
    }
}

fn crawler(
    catalog: &Arc<MockCatalog>,
    knowledge: &Arc<MockKnowledge>,
    sink: &MemorySink,
    store: &MemoryStore,
    settings: CrawlSettings,
) -> Crawler {
    Crawler::new(
        catalog.clone(),
        knowledge.clone(),
        Box::new(sink.clone()),
        DedupCache::load(Box::new(store.clone())).unwrap(),
        settings,
        CancellationToken::new(),
    )
}

fn knowledge_for(topics: &[&str]) -> Arc<MockKnowledge> {
    let mut knowledge = MockKnowledge::new();
    for topic in topics {
        knowledge = knowledge.on_topic(topic, article(topic, 120));
    }
    Arc::new(knowledge)
}

fn read_rows<T: serde::de::DeserializeOwned>(path: &Path) -> Vec<T> {
    let mut reader = csv::Reader::from_path(path).unwrap();
    reader.deserialize().map(|r| r.unwrap()).collect()
}

fn tags_are_dense(tags: impl Iterator<Item = u64>, expected: u64) -> bool {
    let tags: Vec<u64> = tags.collect();
    tags == (0..expected).collect::<Vec<_>>()
}

// ---------------------------------------------------------------------------
// Catalog → Sink: tags and ordering
// ---------------------------------------------------------------------------

#[tokio::test]
async fn accepted_materials_get_dense_tags_across_pages() {
    let catalog = Arc::new(
        MockCatalog::new()
            .on_page(
                FIRST_PAGE,
                page(
                    vec![
                        english_material(1, vec![]),
                        material(2, "fr", Some(&long_description()), vec![]),
                        english_material(3, vec![]),
                    ],
                    Some(&page_url(1)),
                ),
            )
            .on_page(
                &page_url(1),
                page(
                    vec![
                        material(4, "en", Some("too short"), vec![]),
                        english_material(5, vec![]),
                    ],
                    None,
                ),
            ),
    );
    let sink = MemorySink::new();

    let stats = crawler(&catalog, &knowledge_for(&[]), &sink, &MemoryStore::new(), settings())
        .run()
        .await
        .unwrap();

    let materials = sink.materials();
    assert!(tags_are_dense(materials.iter().map(|m| m.tag), 3));
    let ids: Vec<&str> = materials.iter().map(|m| m.material_id.as_str()).collect();
    assert_eq!(ids, vec!["1", "3", "5"]);
    assert_eq!(stats.materials_rejected, 2);
    assert_eq!(stats.pages_fetched, 2);
}

#[tokio::test]
async fn concepts_get_dense_tags_and_distinct_slugs() {
    let catalog = Arc::new(MockCatalog::new().on_page(
        FIRST_PAGE,
        page(
            vec![
                english_material(1, vec![mention("Graph theory", 0.9), mention("Algebra", 0.4)]),
                english_material(2, vec![mention("Algebra", 0.7), mention("Calculus", 0.2)]),
            ],
            None,
        ),
    ));
    let knowledge = knowledge_for(&["Graph theory", "Algebra", "Calculus"]);
    let sink = MemorySink::new();

    crawler(&catalog, &knowledge, &sink, &MemoryStore::new(), settings())
        .run()
        .await
        .unwrap();

    let concepts = sink.concepts();
    assert!(tags_are_dense(concepts.iter().map(|c| c.tag), 3));
    let slugs: HashSet<&str> = concepts.iter().map(|c| c.slug.as_str()).collect();
    assert_eq!(slugs.len(), 3);
    assert_eq!(knowledge.calls_for("Algebra"), 1, "second mention is a cache hit");

    let links = sink.links();
    assert_eq!(links.len(), 4);
    let algebra_tags: HashSet<u64> = links
        .iter()
        .filter(|l| l.concept_slug == "algebra")
        .map(|l| l.concept_tag)
        .collect();
    assert_eq!(algebra_tags.len(), 1, "one tag per slug");
}

#[tokio::test]
async fn material_row_precedes_its_concepts_and_links() {
    let catalog = Arc::new(MockCatalog::new().on_page(
        FIRST_PAGE,
        page(
            vec![
                english_material(1, vec![mention("Physics", 0.5)]),
                english_material(2, vec![mention("Physics", 0.3), mention("Optics", 0.6)]),
            ],
            None,
        ),
    ));
    let sink = MemorySink::new();

    crawler(&catalog, &knowledge_for(&["Physics", "Optics"]), &sink, &MemoryStore::new(), settings())
        .run()
        .await
        .unwrap();

    let mut materials_written = HashSet::new();
    let mut concepts_written = HashSet::new();
    for write in sink.order() {
        match write {
            Written::Material(tag) => {
                materials_written.insert(tag);
            }
            Written::Concept(tag) => {
                concepts_written.insert(tag);
            }
            Written::Link { material_tag, concept_tag } => {
                assert!(materials_written.contains(&material_tag), "link before its material");
                assert!(concepts_written.contains(&concept_tag), "link before its concept");
            }
        }
    }
}

#[tokio::test]
async fn link_carries_catalog_relevance_and_material_id() {
    let catalog = Arc::new(MockCatalog::new().on_page(
        FIRST_PAGE,
        page(vec![english_material(77, vec![mention("Entropy", 0.125)])], None),
    ));
    let sink = MemorySink::new();

    crawler(&catalog, &knowledge_for(&["Entropy"]), &sink, &MemoryStore::new(), settings())
        .run()
        .await
        .unwrap();

    let links = sink.links();
    assert_eq!(links.len(), 1);
    assert_eq!(links[0].material_id, "77");
    assert_eq!(links[0].concept_slug, "entropy");
    assert_eq!(links[0].target, 0.125);

    let concept = &sink.concepts()[0];
    assert_eq!(concept.sec_name, "Entropy");
    assert_eq!(concept.page_length, 120);
    assert_eq!(concept.description, "Entropy summary");
}

// ---------------------------------------------------------------------------
// Dedup cache ↔ Knowledge boundary
// ---------------------------------------------------------------------------

#[tokio::test]
async fn rerun_with_full_cache_makes_no_lookups_but_still_links() {
    let catalog = Arc::new(MockCatalog::new().on_page(
        FIRST_PAGE,
        page(
            vec![
                english_material(1, vec![mention("Graph theory", 0.9), mention("Algebra", 0.4)]),
                english_material(2, vec![mention("Algebra", 0.7)]),
            ],
            None,
        ),
    ));
    let knowledge = knowledge_for(&["Graph theory", "Algebra"]);
    let store = MemoryStore::with_slugs(&["graph-theory", "algebra"]);
    let sink = MemorySink::new();

    let stats = crawler(&catalog, &knowledge, &sink, &store, settings())
        .run()
        .await
        .unwrap();

    assert_eq!(knowledge.total_calls(), 0);
    assert!(sink.concepts().is_empty());
    assert_eq!(sink.links().len(), 3);
    assert_eq!(stats.cache_hits, 3);
    let tags: Vec<(String, u64)> = sink
        .links()
        .into_iter()
        .map(|l| (l.concept_slug, l.concept_tag))
        .collect();
    assert_eq!(
        tags,
        vec![
            ("graph-theory".to_string(), 0),
            ("algebra".to_string(), 1),
            ("algebra".to_string(), 1)
        ],
        "cache hits reuse the stored tags"
    );
}

#[tokio::test]
async fn second_run_continues_concept_tags_and_reuses_old_ones() {
    let store = MemoryStore::new();
    let first = Arc::new(MockCatalog::new().on_page(
        FIRST_PAGE,
        page(vec![english_material(1, vec![mention("Algebra", 0.5)])], None),
    ));
    crawler(&first, &knowledge_for(&["Algebra"]), &MemorySink::new(), &store, settings())
        .run()
        .await
        .unwrap();

    let second = Arc::new(MockCatalog::new().on_page(
        FIRST_PAGE,
        page(
            vec![english_material(9, vec![mention("Algebra", 0.5), mention("Topology", 0.5)])],
            None,
        ),
    ));
    let knowledge = knowledge_for(&["Algebra", "Topology"]);
    let sink = MemorySink::new();
    crawler(&second, &knowledge, &sink, &store, settings())
        .run()
        .await
        .unwrap();

    assert_eq!(knowledge.calls_for("Algebra"), 0);
    let concepts = sink.concepts();
    assert_eq!(concepts.len(), 1);
    assert_eq!((concepts[0].slug.as_str(), concepts[0].tag), ("topology", 1));
    assert_eq!(sink.materials()[0].tag, 0, "material tags restart each run");

    let links: Vec<(String, u64)> = sink
        .links()
        .into_iter()
        .map(|l| (l.concept_slug, l.concept_tag))
        .collect();
    assert_eq!(links, vec![("algebra".to_string(), 0), ("topology".to_string(), 1)]);
}

#[tokio::test]
async fn rejected_concept_is_not_persisted_and_is_retried_next_run() {
    let catalog = Arc::new(MockCatalog::new().on_page(
        FIRST_PAGE,
        page(vec![english_material(1, vec![mention("Stub", 0.5)])], None),
    ));
    let knowledge = Arc::new(MockKnowledge::new().on_topic("Stub", article("Stub", 50)));
    let store = MemoryStore::new();
    let sink = MemorySink::new();

    let stats = crawler(&catalog, &knowledge, &sink, &store, settings())
        .run()
        .await
        .unwrap();

    assert_eq!(stats.concepts_rejected, 1);
    assert!(sink.concepts().is_empty());
    assert!(sink.links().is_empty(), "no link to a concept that was never written");
    assert!(store.entries().is_empty());

    crawler(&catalog, &knowledge, &MemorySink::new(), &store, settings())
        .run()
        .await
        .unwrap();
    assert_eq!(knowledge.calls_for("Stub"), 2);
}

#[tokio::test]
async fn unknown_topic_is_skipped_without_aborting() {
    let catalog = Arc::new(MockCatalog::new().on_page(
        FIRST_PAGE,
        page(
            vec![english_material(1, vec![mention("Qwxzyv", 0.5), mention("Optics", 0.2)])],
            None,
        ),
    ));
    let sink = MemorySink::new();

    let stats = crawler(&catalog, &knowledge_for(&["Optics"]), &sink, &MemoryStore::new(), settings())
        .run()
        .await
        .unwrap();

    assert_eq!(stats.concepts_not_found, 1);
    let slugs: Vec<String> = sink.concepts().into_iter().map(|c| c.slug).collect();
    assert_eq!(slugs, vec!["optics"]);
    assert_eq!(sink.concepts()[0].tag, 0, "failed lookups do not consume tags");
}

#[tokio::test]
async fn persistent_knowledge_failure_only_drops_that_concept() {
    let catalog = Arc::new(MockCatalog::new().on_page(
        FIRST_PAGE,
        page(
            vec![
                english_material(1, vec![mention("Flaky", 0.5)]),
                english_material(2, vec![mention("Optics", 0.5)]),
            ],
            None,
        ),
    ));
    let knowledge = Arc::new(
        MockKnowledge::new()
            .on_topic("Flaky", article("Flaky", 100))
            .fail_first("Flaky", 10)
            .on_topic("Optics", article("Optics", 100)),
    );
    let sink = MemorySink::new();

    let stats = crawler(&catalog, &knowledge, &sink, &MemoryStore::new(), settings())
        .run()
        .await
        .unwrap();

    assert_eq!(stats.concepts_failed, 1);
    assert_eq!(knowledge.calls_for("Flaky"), 3, "retried up to the bound");
    assert_eq!(sink.materials().len(), 2);
    assert_eq!(sink.concepts().len(), 1);
}

#[tokio::test]
async fn mention_without_section_name_is_ignored() {
    let mut blank = mention("", 0.9);
    blank["secName"] = serde_json::Value::Null;
    let catalog = Arc::new(MockCatalog::new().on_page(
        FIRST_PAGE,
        page(vec![english_material(1, vec![mention("", 0.5), blank])], None),
    ));
    let knowledge = knowledge_for(&[]);
    let store = MemoryStore::new();
    let sink = MemorySink::new();

    let stats = crawler(&catalog, &knowledge, &sink, &store, settings())
        .run()
        .await
        .unwrap();

    assert_eq!(stats.mentions_without_section, 2);
    assert_eq!(knowledge.total_calls(), 0);
    assert!(sink.links().is_empty());
    assert_eq!(store.persist_count(), 0);
}

#[tokio::test]
async fn legacy_untagged_hit_makes_no_lookup_and_no_link() {
    let catalog = Arc::new(MockCatalog::new().on_page(
        FIRST_PAGE,
        page(vec![english_material(1, vec![mention("Algebra", 0.5)])], None),
    ));
    let knowledge = knowledge_for(&["Algebra"]);
    let store = MemoryStore::with_entries(vec![StoredEntry::Legacy("algebra".into())]);
    let sink = MemorySink::new();

    let stats = crawler(&catalog, &knowledge, &sink, &store, settings())
        .run()
        .await
        .unwrap();

    assert_eq!(stats.untagged_hits, 1);
    assert_eq!(knowledge.total_calls(), 0);
    assert!(sink.links().is_empty());
}

#[tokio::test]
async fn accepted_slugs_are_persisted_with_their_tags() {
    let catalog = Arc::new(MockCatalog::new().on_page(
        FIRST_PAGE,
        page(vec![english_material(1, vec![mention("Set theory", 0.5)])], None),
    ));
    let store = MemoryStore::new();

    crawler(&catalog, &knowledge_for(&["Set theory"]), &MemorySink::new(), &store, settings())
        .run()
        .await
        .unwrap();

    let cache = DedupCache::load(Box::new(store.clone())).unwrap();
    assert_eq!(cache.lookup("set-theory"), Some(Seen::Tagged(0)));
}

// ---------------------------------------------------------------------------
// Pagination and failure
// ---------------------------------------------------------------------------

#[tokio::test]
async fn null_next_ends_crawl_after_that_page() {
    let catalog = Arc::new(MockCatalog::new().on_page(
        FIRST_PAGE,
        page(vec![english_material(1, vec![])], None),
    ));

    let result = crawler(&catalog, &knowledge_for(&[]), &MemorySink::new(), &MemoryStore::new(), settings())
        .run()
        .await;

    assert!(result.is_ok());
    assert_eq!(catalog.calls(), vec![FIRST_PAGE.to_string()]);
}

#[tokio::test]
async fn empty_last_page_is_done() {
    let catalog = Arc::new(MockCatalog::new().on_page(FIRST_PAGE, page(vec![], None)));

    let stats = crawler(&catalog, &knowledge_for(&[]), &MemorySink::new(), &MemoryStore::new(), settings())
        .run()
        .await
        .unwrap();

    assert_eq!(stats.pages_fetched, 1);
    assert_eq!(stats.materials_seen, 0);
}

#[tokio::test]
async fn transient_fetch_errors_are_retried() {
    let catalog = Arc::new(
        MockCatalog::new()
            .fail_with(FIRST_PAGE, 503, 2)
            .on_page(FIRST_PAGE, page(vec![english_material(1, vec![])], None)),
    );
    let sink = MemorySink::new();

    crawler(&catalog, &knowledge_for(&[]), &sink, &MemoryStore::new(), settings())
        .run()
        .await
        .unwrap();

    assert_eq!(catalog.calls().len(), 3);
    assert_eq!(sink.materials().len(), 1);
}

#[tokio::test]
async fn persistent_transient_error_fails_with_cursor() {
    let catalog = Arc::new(
        MockCatalog::new()
            .on_page(
                FIRST_PAGE,
                page(vec![english_material(1, vec![])], Some(&page_url(1))),
            )
            .fail_with(&page_url(1), 503, 1),
    );

    let failure = crawler(&catalog, &knowledge_for(&[]), &MemorySink::new(), &MemoryStore::new(), settings())
        .run()
        .await
        .unwrap_err();

    assert!(matches!(failure.error, CrawlError::Catalog(ref e) if e.is_transient()));
    assert_eq!(failure.last_cursor.as_deref(), Some(FIRST_PAGE));
    assert_eq!(failure.resume_cursor, Some(page_url(1)));
    assert_eq!(failure.last_material_tag, Some(0));
    assert_eq!(catalog.calls().len(), 1 + 3, "first page plus three attempts");
}

#[tokio::test]
async fn malformed_page_is_fatal_and_not_retried() {
    let catalog = Arc::new(
        MockCatalog::new().on_page(FIRST_PAGE, serde_json::json!({ "oer_materials": [] })),
    );

    let failure = crawler(&catalog, &knowledge_for(&[]), &MemorySink::new(), &MemoryStore::new(), settings())
        .run()
        .await
        .unwrap_err();

    assert!(matches!(
        failure.error,
        CrawlError::Catalog(x5gon_client::CatalogError::Parse(_))
    ));
    assert_eq!(catalog.calls().len(), 1);
}

#[tokio::test]
async fn malformed_material_is_skipped() {
    let catalog = Arc::new(MockCatalog::new().on_page(
        FIRST_PAGE,
        page(
            vec![
                serde_json::json!({ "title": "no id" }),
                english_material(2, vec![]),
            ],
            None,
        ),
    ));
    let sink = MemorySink::new();

    let stats = crawler(&catalog, &knowledge_for(&[]), &sink, &MemoryStore::new(), settings())
        .run()
        .await
        .unwrap();

    assert_eq!(stats.materials_malformed, 1);
    assert_eq!(sink.materials().len(), 1);
    assert_eq!(sink.materials()[0].tag, 0);
}

#[tokio::test]
async fn sink_failure_is_fatal_and_reports_progress() {
    let catalog = Arc::new(MockCatalog::new().on_page(
        FIRST_PAGE,
        page(
            vec![
                english_material(1, vec![mention("Algebra", 0.4)]),
                english_material(2, vec![mention("Optics", 0.4)]),
            ],
            None,
        ),
    ));
    let sink = MemorySink::new().failing_links_after(1);

    let failure = crawler(&catalog, &knowledge_for(&["Algebra", "Optics"]), &sink, &MemoryStore::new(), settings())
        .run()
        .await
        .unwrap_err();

    assert!(matches!(failure.error, CrawlError::Sink(_)));
    assert_eq!(failure.last_material_tag, Some(1));
    assert_eq!(failure.last_concept_tag, Some(1));
    assert_eq!(failure.resume_cursor.as_deref(), Some(FIRST_PAGE));
}

#[tokio::test]
async fn page_limit_stops_early() {
    let catalog = Arc::new(
        MockCatalog::new()
            .on_page(FIRST_PAGE, page(vec![], Some(&page_url(1))))
            .on_page(&page_url(1), page(vec![], None)),
    );

    let stats = crawler(
        &catalog,
        &knowledge_for(&[]),
        &MemorySink::new(),
        &MemoryStore::new(),
        CrawlSettings {
            max_pages: Some(1),
            ..settings()
        },
    )
    .run()
    .await
    .unwrap();

    assert_eq!(stats.pages_fetched, 1);
    assert_eq!(catalog.calls().len(), 1);
    assert_eq!(stats.resume_url, Some(page_url(1)), "unfinished catalog reports where to resume");
}

#[tokio::test]
async fn saved_cursor_resumes_mid_catalog() {
    let catalog = Arc::new(
        MockCatalog::new().on_page(&page_url(5), page(vec![english_material(101, vec![])], None)),
    );
    let sink = MemorySink::new();

    crawler(
        &catalog,
        &knowledge_for(&[]),
        &sink,
        &MemoryStore::new(),
        CrawlSettings {
            start_url: Some(page_url(5)),
            ..settings()
        },
    )
    .run()
    .await
    .unwrap();

    assert_eq!(catalog.calls(), vec![page_url(5)]);
    assert_eq!(sink.materials()[0].material_id, "101");
}

#[tokio::test]
async fn cancellation_stops_at_page_boundary() {
    let catalog = Arc::new(MockCatalog::new().on_page(FIRST_PAGE, page(vec![], None)));
    let cancel = CancellationToken::new();
    cancel.cancel();

    let failure = Crawler::new(
        catalog.clone(),
        knowledge_for(&[]),
        Box::new(MemorySink::new()),
        DedupCache::load(Box::new(MemoryStore::new())).unwrap(),
        settings(),
        cancel,
    )
    .run()
    .await
    .unwrap_err();

    assert!(matches!(failure.error, CrawlError::Cancelled));
    assert_eq!(failure.resume_cursor.as_deref(), Some(FIRST_PAGE));
    assert!(catalog.calls().is_empty());
}

#[tokio::test]
async fn cancel_during_enrichment_drops_the_pending_concept() {
    let catalog = Arc::new(MockCatalog::new().on_page(
        FIRST_PAGE,
        page(
            vec![english_material(1, vec![mention("Optics", 0.5), mention("Stalled", 0.5)])],
            Some(&page_url(1)),
        ),
    ));
    let knowledge = Arc::new(
        MockKnowledge::new()
            .on_topic("Optics", article("Optics", 120))
            .stall_on("Stalled"),
    );
    let store = MemoryStore::new();
    let sink = MemorySink::new();
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(50)).await;
        trigger.cancel();
    });

    let failure = Crawler::new(
        catalog.clone(),
        knowledge.clone(),
        Box::new(sink.clone()),
        DedupCache::load(Box::new(store.clone())).unwrap(),
        settings(),
        cancel,
    )
    .run()
    .await
    .unwrap_err();

    assert!(matches!(failure.error, CrawlError::Cancelled));
    assert_eq!(failure.resume_cursor.as_deref(), Some(FIRST_PAGE));
    assert_eq!(knowledge.calls_for("Stalled"), 1, "lookup was in flight");
    assert_eq!(catalog.calls(), vec![FIRST_PAGE.to_string()]);

    let concepts: Vec<String> = sink.concepts().into_iter().map(|c| c.slug).collect();
    assert_eq!(concepts, vec!["optics"]);
    let links: Vec<String> = sink.links().into_iter().map(|l| l.concept_slug).collect();
    assert_eq!(links, vec!["optics"]);
    let stored: Vec<String> = store.entries().iter().map(|e| e.slug().to_string()).collect();
    assert_eq!(stored, vec!["optics"]);
}

#[tokio::test]
async fn repeated_slug_in_one_material_gets_one_tag_under_concurrency() {
    let catalog = Arc::new(MockCatalog::new().on_page(
        FIRST_PAGE,
        page(
            vec![english_material(
                1,
                vec![mention("Algebra", 0.5), mention("algebra", 0.4), mention("Algebra", 0.3)],
            )],
            None,
        ),
    ));
    let knowledge = knowledge_for(&["Algebra"]);
    let sink = MemorySink::new();

    crawler(
        &catalog,
        &knowledge,
        &sink,
        &MemoryStore::new(),
        CrawlSettings {
            enrich_concurrency: 8,
            ..settings()
        },
    )
    .run()
    .await
    .unwrap();

    assert_eq!(knowledge.total_calls(), 1);
    assert_eq!(sink.concepts().len(), 1);
    let concept_tags: Vec<u64> = sink.links().iter().map(|l| l.concept_tag).collect();
    assert_eq!(concept_tags, vec![0, 0, 0]);
}

#[tokio::test]
async fn mention_without_page_rank_is_counted() {
    let catalog = Arc::new(MockCatalog::new().on_page(
        FIRST_PAGE,
        page(vec![english_material(1, vec![unranked_mention("Optics")])], None),
    ));
    let sink = MemorySink::new();

    let stats = crawler(&catalog, &knowledge_for(&["Optics"]), &sink, &MemoryStore::new(), settings())
        .run()
        .await
        .unwrap();

    assert_eq!(stats.links_without_relevance, 1);
    assert_eq!(sink.links()[0].target, 0.0);
}

#[tokio::test]
async fn resumed_run_appends_to_tables_of_failed_run() {
    let dir = tempfile::tempdir().unwrap();
    let store_path = dir.path().join(DEDUP_FILE);
    let knowledge = knowledge_for(&["Algebra", "Optics"]);

    // page_url(1) is not registered, so the first run fails fetching it.
    let first = Arc::new(MockCatalog::new().on_page(
        FIRST_PAGE,
        page(vec![english_material(1, vec![mention("Algebra", 0.5)])], Some(&page_url(1))),
    ));
    let failure = Crawler::new(
        first,
        knowledge.clone(),
        Box::new(CsvSinks::open(dir.path()).unwrap()),
        DedupCache::load(Box::new(JsonFileStore::new(&store_path))).unwrap(),
        settings(),
        CancellationToken::new(),
    )
    .run()
    .await
    .unwrap_err();
    let resume = failure.resume_cursor.clone().unwrap();
    assert_eq!(resume, page_url(1));

    let second = Arc::new(MockCatalog::new().on_page(
        &page_url(1),
        page(
            vec![english_material(2, vec![mention("Algebra", 0.2), mention("Optics", 0.7)])],
            None,
        ),
    ));
    let sink = CsvSinks::resume(dir.path()).unwrap();
    let resumed = CrawlSettings {
        start_url: Some(resume),
        first_material_tag: sink.next_material_tag(),
        ..settings()
    };
    Crawler::new(
        second,
        knowledge.clone(),
        Box::new(sink),
        DedupCache::load(Box::new(JsonFileStore::new(&store_path))).unwrap(),
        resumed,
        CancellationToken::new(),
    )
    .run()
    .await
    .unwrap();

    let materials: Vec<MaterialRow> = read_rows(&dir.path().join(MATERIALS_FILE));
    let materials: Vec<(u64, String)> = materials.into_iter().map(|m| (m.tag, m.material_id)).collect();
    assert_eq!(materials, vec![(0, "1".to_string()), (1, "2".to_string())]);

    let links: Vec<LinkRow> = read_rows(&dir.path().join(LINKS_FILE));
    let links: Vec<(u64, u64, String)> = links
        .into_iter()
        .map(|l| (l.material_tag, l.concept_tag, l.concept_slug))
        .collect();
    assert_eq!(
        links,
        vec![
            (0, 0, "algebra".to_string()),
            (1, 0, "algebra".to_string()),
            (1, 1, "optics".to_string())
        ]
    );

    assert_eq!(knowledge.calls_for("Algebra"), 1);
    let report = verify_data_dir(dir.path()).unwrap();
    assert!(report.is_clean(), "{report}");
}
