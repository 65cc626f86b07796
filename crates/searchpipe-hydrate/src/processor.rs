use std::collections::HashMap;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::stream::{self, StreamExt, TryStreamExt};
use serde::Deserialize;
use tracing::{debug, warn};

use searchpipe_core::error::{Error, Result};
use searchpipe_core::traits::ResponseProcessor;
use searchpipe_core::types::{DocValue, SearchQuery, SearchResults};

use crate::attr::{convert_item, AttrItem, AttrValue};
use crate::store::DocumentStore;

fn default_max_in_flight() -> usize {
    4
}

/// Configuration for the hydrate stage.
///
/// `region` identifies the store endpoint and is consumed by whoever
/// constructs the client; the stage itself receives the client
/// already built and never touches process-wide state.
#[derive(Debug, Clone, Deserialize)]
pub struct HydrateConfig {
    pub region: String,
    pub table_name: String,
    pub pk_attribute: String,
    /// Cap on concurrently in-flight batch lookups.
    #[serde(default = "default_max_in_flight")]
    pub max_in_flight: usize,
}

/// Joins hits against the external store by id and installs the
/// converted bodies as `source`.
///
/// Keys are partitioned into chunks of the store's batch limit and
/// fetched with bounded fan-out. Batches cover disjoint key sets and
/// the merge is keyed by id, so completion order never shows in the
/// output. Any store failure aborts the whole stage; the scratch
/// merge map is only applied on full success.
pub struct HydrateProcessor {
    tag: Option<String>,
    description: Option<String>,
    store: Arc<dyn DocumentStore>,
    table_name: String,
    pk_attribute: String,
    max_in_flight: usize,
}

impl std::fmt::Debug for HydrateProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HydrateProcessor")
            .field("tag", &self.tag)
            .field("description", &self.description)
            .field("table_name", &self.table_name)
            .field("pk_attribute", &self.pk_attribute)
            .field("max_in_flight", &self.max_in_flight)
            .finish_non_exhaustive()
    }
}

impl HydrateProcessor {
    pub const TYPE: &'static str = "store_source";

    pub fn from_config(config: HydrateConfig, store: Arc<dyn DocumentStore>) -> Result<Self> {
        Self::with_metadata(None, None, config, store)
    }

    /// Builds the stage from a raw configuration mapping, as handed
    /// over by a host that parses pipeline definitions itself.
    pub fn from_value(value: serde_json::Value, store: Arc<dyn DocumentStore>) -> Result<Self> {
        let config: HydrateConfig = serde_json::from_value(value)
            .map_err(|e| Error::InvalidConfig(format!("{}: {}", Self::TYPE, e)))?;
        Self::from_config(config, store)
    }

    pub fn with_metadata(
        tag: Option<String>,
        description: Option<String>,
        config: HydrateConfig,
        store: Arc<dyn DocumentStore>,
    ) -> Result<Self> {
        for (name, value) in [
            ("region", &config.region),
            ("table_name", &config.table_name),
            ("pk_attribute", &config.pk_attribute),
        ] {
            if value.is_empty() {
                return Err(Error::InvalidConfig(format!(
                    "{}: '{}' must not be empty",
                    Self::TYPE,
                    name
                )));
            }
        }
        if config.max_in_flight == 0 {
            return Err(Error::InvalidConfig(format!(
                "{}: 'max_in_flight' must be at least 1",
                Self::TYPE
            )));
        }
        Ok(Self {
            tag,
            description,
            store,
            table_name: config.table_name,
            pk_attribute: config.pk_attribute,
            max_in_flight: config.max_in_flight,
        })
    }

    /// Fetch and convert the bodies for `ids`, keyed by primary key.
    /// Ids with no backing item are absent from the returned map.
    async fn fetch_sources(&self, ids: &[String]) -> Result<HashMap<String, DocValue>> {
        let limit = self.store.max_batch_size().max(1);
        let batches: Vec<&[String]> = ids.chunks(limit).collect();
        debug!(
            stage = Self::TYPE,
            ids = ids.len(),
            batches = batches.len(),
            "issuing batched lookups"
        );
        let lookups: Vec<_> = batches
            .into_iter()
            .map(|batch| self.store.batch_get(&self.table_name, &self.pk_attribute, batch))
            .collect();
        let responses: Vec<Vec<AttrItem>> = stream::iter(lookups)
            .buffer_unordered(self.max_in_flight)
            .try_collect()
            .await
            .map_err(|e| Error::Store(e.to_string()))?;

        let mut sources = HashMap::new();
        for item in responses.into_iter().flatten() {
            let Some(key) = item_key(&item, &self.pk_attribute) else {
                warn!(
                    stage = Self::TYPE,
                    pk_attribute = self.pk_attribute.as_str(),
                    "returned item has no string primary key, skipping"
                );
                continue;
            };
            sources.insert(key, convert_item(item));
        }
        Ok(sources)
    }

    /// Install the fetched bodies into their hits, by id. Hits whose
    /// id is absent from `sources` keep their prior `source`.
    fn apply_sources(
        &self,
        mut results: SearchResults,
        mut sources: HashMap<String, DocValue>,
    ) -> SearchResults {
        let mut hydrated = 0;
        for hit in &mut results.hits {
            if let Some(source) = sources.remove(hit.id()) {
                hit.source = Some(source);
                hydrated += 1;
            }
        }
        debug!(stage = Self::TYPE, hits = results.len(), hydrated, "hydration pass complete");
        results
    }
}

fn item_key(item: &AttrItem, pk_attribute: &str) -> Option<String> {
    item.iter().find(|(name, _)| name == pk_attribute).and_then(|(_, value)| match value {
        AttrValue::S(key) => Some(key.clone()),
        _ => None,
    })
}

impl ResponseProcessor for HydrateProcessor {
    fn type_name(&self) -> &'static str {
        Self::TYPE
    }

    fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    fn process_response(
        &self,
        _query: &SearchQuery,
        results: SearchResults,
    ) -> Result<SearchResults> {
        if results.is_empty() {
            return Ok(results);
        }
        let ids: Vec<String> = results.hits.iter().map(|hit| hit.id().to_string()).collect();
        // Stand-alone runtime for hosts that drive stages synchronously.
        // Async hosts go through `process_response_async` below instead,
        // which must not be on this path: `block_on` panics inside a
        // running runtime.
        let rt = tokio::runtime::Runtime::new().map_err(|e| Error::Store(e.to_string()))?;
        let sources = rt.block_on(self.fetch_sources(&ids))?;
        Ok(self.apply_sources(results, sources))
    }

    fn process_response_async<'a>(
        &'a self,
        _query: &'a SearchQuery,
        results: SearchResults,
    ) -> BoxFuture<'a, Result<SearchResults>> {
        Box::pin(async move {
            if results.is_empty() {
                return Ok(results);
            }
            let ids: Vec<String> = results.hits.iter().map(|hit| hit.id().to_string()).collect();
            let sources = self.fetch_sources(&ids).await?;
            Ok(self.apply_sources(results, sources))
        })
    }
}
