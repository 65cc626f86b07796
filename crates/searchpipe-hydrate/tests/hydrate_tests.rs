use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use searchpipe_core::error::Error;
use searchpipe_core::traits::ResponseProcessor;
use searchpipe_core::types::{DocValue, SearchHit, SearchQuery, SearchResults};
use searchpipe_hydrate::{
    convert_item, AttrItem, AttrValue, DocumentStore, HydrateConfig, HydrateProcessor,
};

/// In-memory store standing in for the external backend. Records the
/// key set of every lookup and rejects oversized batches the way a
/// real store would.
struct MemoryStore {
    items: HashMap<String, AttrItem>,
    batch_limit: usize,
    fail: bool,
    calls: Mutex<Vec<Vec<String>>>,
}

impl MemoryStore {
    fn new(items: HashMap<String, AttrItem>, batch_limit: usize) -> Self {
        Self { items, batch_limit, fail: false, calls: Mutex::new(Vec::new()) }
    }

    fn failing() -> Self {
        Self { items: HashMap::new(), batch_limit: 100, fail: true, calls: Mutex::new(Vec::new()) }
    }

    fn call_count(&self) -> usize {
        self.calls.lock().expect("lock").len()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    fn max_batch_size(&self) -> usize {
        self.batch_limit
    }

    async fn batch_get(
        &self,
        _table: &str,
        _pk_attribute: &str,
        keys: &[String],
    ) -> anyhow::Result<Vec<AttrItem>> {
        self.calls.lock().expect("lock").push(keys.to_vec());
        if self.fail {
            anyhow::bail!("connection reset");
        }
        if keys.len() > self.batch_limit {
            anyhow::bail!("batch of {} keys exceeds limit {}", keys.len(), self.batch_limit);
        }
        Ok(keys.iter().filter_map(|key| self.items.get(key).cloned()).collect())
    }
}

fn item(id: &str, title: &str) -> AttrItem {
    vec![
        ("doc_id".into(), AttrValue::S(id.into())),
        ("title".into(), AttrValue::S(title.into())),
        ("views".into(), AttrValue::N("42".into())),
    ]
}

fn config() -> HydrateConfig {
    HydrateConfig {
        region: "us-east-1".into(),
        table_name: "documents".into(),
        pk_attribute: "doc_id".into(),
        max_in_flight: 4,
    }
}

fn processor(store: Arc<MemoryStore>) -> HydrateProcessor {
    HydrateProcessor::from_config(config(), store).expect("valid config")
}

#[test]
fn empty_result_set_issues_no_lookup() {
    let store = Arc::new(MemoryStore::new(HashMap::new(), 100));
    let stage = processor(store.clone());

    let results = stage
        .process_response(&SearchQuery::new("q"), SearchResults::default())
        .expect("hydrate");

    assert!(results.is_empty());
    assert_eq!(store.call_count(), 0);
}

#[test]
fn hydrates_matches_and_leaves_misses_untouched() {
    let mut items = HashMap::new();
    items.insert("doc-1".to_string(), item("doc-1", "first"));
    let store = Arc::new(MemoryStore::new(items, 100));
    let stage = processor(store);

    let prior = DocValue::str("stale body");
    let results = SearchResults::new(vec![
        SearchHit::new("doc-1"),
        SearchHit::new("doc-2").with_source(prior.clone()),
    ]);
    let results = stage.process_response(&SearchQuery::new("q"), results).expect("hydrate");

    assert_eq!(results.hits[0].source, Some(convert_item(item("doc-1", "first"))));
    // No backing record is not an error; the prior source survives.
    assert_eq!(results.hits[1].source, Some(prior));
}

#[test]
fn hit_order_and_membership_are_preserved() {
    let mut items = HashMap::new();
    for id in ["b", "a", "c"] {
        items.insert(id.to_string(), item(id, "t"));
    }
    let store = Arc::new(MemoryStore::new(items, 2));
    let stage = processor(store);

    let results = SearchResults::new(vec![
        SearchHit::new("b"),
        SearchHit::new("a"),
        SearchHit::new("c"),
    ]);
    let results = stage.process_response(&SearchQuery::new("q"), results).expect("hydrate");

    let ids: Vec<&str> = results.hits.iter().map(SearchHit::id).collect();
    assert_eq!(ids, vec!["b", "a", "c"]);
    assert!(results.hits.iter().all(|hit| hit.source.is_some()));
}

#[test]
fn splits_150_ids_into_two_disjoint_batches_of_at_most_100() {
    let ids: Vec<String> = (0..150).map(|i| format!("doc-{i}")).collect();
    let mut items = HashMap::new();
    for id in &ids {
        items.insert(id.clone(), item(id, "t"));
    }
    let store = Arc::new(MemoryStore::new(items, 100));
    let stage = processor(store.clone());

    let hits: Vec<SearchHit> = ids.iter().map(|id| SearchHit::new(id.clone())).collect();
    let results = stage
        .process_response(&SearchQuery::new("q"), SearchResults::new(hits))
        .expect("hydrate");

    let calls = store.calls.lock().expect("lock").clone();
    assert_eq!(calls.len(), 2, "exactly two batched lookups");
    assert!(calls.iter().all(|batch| batch.len() <= 100));

    let mut seen = HashSet::new();
    for key in calls.iter().flatten() {
        assert!(seen.insert(key.clone()), "key {key} requested twice");
    }
    assert_eq!(seen.len(), 150, "every id requested exactly once");
    assert!(results.hits.iter().all(|hit| hit.source.is_some()));
}

#[test]
fn batching_is_transparent_to_output() {
    let ids: Vec<String> = (0..150).map(|i| format!("doc-{i}")).collect();
    let mut items = HashMap::new();
    for id in &ids {
        items.insert(id.clone(), item(id, "t"));
    }

    let hits = || SearchResults::new(ids.iter().map(|id| SearchHit::new(id.clone())).collect());

    let batched = processor(Arc::new(MemoryStore::new(items.clone(), 100)))
        .process_response(&SearchQuery::new("q"), hits())
        .expect("batched hydrate");
    let single = processor(Arc::new(MemoryStore::new(items, 1000)))
        .process_response(&SearchQuery::new("q"), hits())
        .expect("single-call hydrate");

    assert_eq!(batched, single);
}

#[tokio::test]
async fn async_variant_hydrates_on_the_host_runtime() {
    let mut items = HashMap::new();
    items.insert("doc-1".to_string(), item("doc-1", "first"));
    let store = Arc::new(MemoryStore::new(items, 100));
    let stage = processor(store.clone());

    // Awaited from inside a running runtime, the way an async host
    // drives stages; must fetch without spawning a nested runtime.
    let results = SearchResults::new(vec![SearchHit::new("doc-1"), SearchHit::new("doc-2")]);
    let results = stage
        .process_response_async(&SearchQuery::new("q"), results)
        .await
        .expect("hydrate");

    assert_eq!(results.hits[0].source, Some(convert_item(item("doc-1", "first"))));
    assert_eq!(results.hits[1].source, None);
    assert_eq!(store.call_count(), 1);
}

#[tokio::test]
async fn async_variant_surfaces_store_failure() {
    let stage = processor(Arc::new(MemoryStore::failing()));
    let results = SearchResults::new(vec![SearchHit::new("doc-1")]);
    let err = stage
        .process_response_async(&SearchQuery::new("q"), results)
        .await
        .expect_err("store down");
    assert!(matches!(err, Error::Store(_)));
}

#[test]
fn store_failure_aborts_the_stage() {
    let store = Arc::new(MemoryStore::failing());
    let stage = processor(store);

    let results = SearchResults::new(vec![SearchHit::new("doc-1")]);
    let err = stage.process_response(&SearchQuery::new("q"), results).expect_err("store down");
    assert!(matches!(err, Error::Store(_)));
}

#[test]
fn item_without_string_primary_key_is_skipped() {
    let mut items = HashMap::new();
    items.insert("doc-1".to_string(), vec![("doc_id".into(), AttrValue::N("1".into()))]);
    let store = Arc::new(MemoryStore::new(items, 100));
    let stage = processor(store);

    let results = SearchResults::new(vec![SearchHit::new("doc-1")]);
    let results = stage.process_response(&SearchQuery::new("q"), results).expect("hydrate");
    assert_eq!(results.hits[0].source, None);
}

#[test]
fn config_rejects_missing_required_properties() {
    let store: Arc<dyn DocumentStore> = Arc::new(MemoryStore::new(HashMap::new(), 100));

    let mut missing_table = config();
    missing_table.table_name = String::new();
    let err = HydrateProcessor::from_config(missing_table, store.clone()).expect_err("no table");
    assert!(matches!(err, Error::InvalidConfig(_)));

    let mut no_fan_out = config();
    no_fan_out.max_in_flight = 0;
    let err = HydrateProcessor::from_config(no_fan_out, store.clone()).expect_err("zero cap");
    assert!(matches!(err, Error::InvalidConfig(_)));

    let err = HydrateProcessor::from_value(serde_json::json!({ "region": "us-east-1" }), store)
        .expect_err("missing keys");
    assert!(matches!(err, Error::InvalidConfig(_)));
}
