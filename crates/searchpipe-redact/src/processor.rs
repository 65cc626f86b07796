use serde::Deserialize;
use tracing::debug;

use searchpipe_core::error::{Error, Result};
use searchpipe_core::traits::ResponseProcessor;
use searchpipe_core::types::{DocMap, DocValue, SearchHit, SearchQuery, SearchResults};

use crate::mask::mask_words;

/// Configuration for the redact stage.
#[derive(Debug, Clone, Deserialize)]
pub struct RedactConfig {
    /// Forbidden words, in application order. At least one non-empty
    /// entry is required; duplicates are dropped.
    pub target: Vec<String>,
}

/// Masks forbidden substrings in each hit.
///
/// Two passes per hit: single-valued `fields` entries have their
/// textual form masked and written back as strings; the `source` body
/// is scanned one level deep (top-level keys only) and replaced
/// wholesale, copy-on-write, when any value changes.
pub struct RedactProcessor {
    tag: Option<String>,
    description: Option<String>,
    targets: Vec<String>,
}

impl RedactProcessor {
    pub const TYPE: &'static str = "redact";

    pub fn from_config(config: RedactConfig) -> Result<Self> {
        Self::with_metadata(None, None, config)
    }

    /// Builds the stage from a raw configuration mapping, as handed
    /// over by a host that parses pipeline definitions itself.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let config: RedactConfig = serde_json::from_value(value)
            .map_err(|e| Error::InvalidConfig(format!("{}: {}", Self::TYPE, e)))?;
        Self::from_config(config)
    }

    pub fn with_metadata(
        tag: Option<String>,
        description: Option<String>,
        config: RedactConfig,
    ) -> Result<Self> {
        let mut targets: Vec<String> = Vec::new();
        for word in config.target {
            if !word.is_empty() && !targets.contains(&word) {
                targets.push(word);
            }
        }
        if targets.is_empty() {
            return Err(Error::InvalidConfig(format!(
                "{}: 'target' requires at least one non-empty word",
                Self::TYPE
            )));
        }
        Ok(Self { tag, description, targets })
    }

    pub fn targets(&self) -> &[String] {
        &self.targets
    }

    /// Mask single-valued fields, writing the masked text back as a
    /// string value. Multi-valued fields are out of scope and left
    /// untouched. Keys are snapshotted before mutation.
    fn redact_fields(&self, hit: &mut SearchHit) -> usize {
        let names: Vec<String> = hit.fields.keys().cloned().collect();
        let mut changed = 0;
        for name in names {
            let Some(values) = hit.fields.get(&name) else { continue };
            if values.len() != 1 {
                continue;
            }
            let text = values[0].to_text();
            let masked = mask_words(&text, &self.targets);
            if masked != text {
                hit.fields.insert(name, vec![DocValue::Str(masked)]);
                changed += 1;
            }
        }
        changed
    }

    /// Mask top-level values of the source body. The replacement map
    /// is only materialized once a value actually changes; a clean
    /// body keeps its original allocation.
    fn redact_source(&self, hit: &mut SearchHit) -> Result<()> {
        let Some(source) = hit.source.as_ref() else {
            return Ok(());
        };
        let DocValue::Map(map) = source else {
            return Err(Error::MalformedDocument(format!(
                "hit '{}': source body is not a map",
                hit.id()
            )));
        };
        let mut replacement: Option<DocMap> = None;
        for (key, value) in map.iter() {
            let text = value.to_text();
            let masked = mask_words(&text, &self.targets);
            if masked != text {
                replacement
                    .get_or_insert_with(|| map.clone())
                    .insert(key.to_string(), DocValue::Str(masked));
            }
        }
        if let Some(map) = replacement {
            hit.source = Some(DocValue::Map(map));
        }
        Ok(())
    }
}

impl ResponseProcessor for RedactProcessor {
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
        mut results: SearchResults,
    ) -> Result<SearchResults> {
        let mut masked_fields = 0;
        for hit in &mut results.hits {
            masked_fields += self.redact_fields(hit);
            self.redact_source(hit)?;
        }
        debug!(stage = Self::TYPE, hits = results.len(), masked_fields, "redaction pass complete");
        Ok(results)
    }
}
