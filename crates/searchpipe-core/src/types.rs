//! Domain types shared by all response stages.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

pub type HitId = String;
pub type Fields = HashMap<String, Vec<DocValue>>;

/// A node in the recursive document tree used as the common currency
/// between the store converter, the redaction stage and a hit's body.
///
/// Numbers keep their textual form verbatim so decimals survive a
/// round trip without going through floating point.
#[derive(Debug, Clone, PartialEq)]
pub enum DocValue {
    Str(String),
    Num(String),
    Bool(bool),
    Bytes(Vec<u8>),
    List(Vec<DocValue>),
    Map(DocMap),
}

impl DocValue {
    pub fn str(s: impl Into<String>) -> Self {
        DocValue::Str(s.into())
    }

    pub fn num(n: impl Into<String>) -> Self {
        DocValue::Num(n.into())
    }

    /// Textual form of the value, used when scanning for forbidden
    /// substrings. Lists render as `[a, b]`, maps as `{k=v}`, bytes as
    /// lowercase hex.
    pub fn to_text(&self) -> String {
        match self {
            DocValue::Str(s) => s.clone(),
            DocValue::Num(n) => n.clone(),
            DocValue::Bool(b) => b.to_string(),
            DocValue::Bytes(bytes) => bytes.iter().map(|b| format!("{:02x}", b)).collect(),
            DocValue::List(items) => {
                let rendered: Vec<String> = items.iter().map(DocValue::to_text).collect();
                format!("[{}]", rendered.join(", "))
            }
            DocValue::Map(map) => {
                let rendered: Vec<String> =
                    map.iter().map(|(k, v)| format!("{}={}", k, v.to_text())).collect();
                format!("{{{}}}", rendered.join(", "))
            }
        }
    }
}

/// String-keyed mapping that preserves insertion order, so converted
/// documents re-serialize deterministically. Equality is structural
/// and order-sensitive.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct DocMap {
    entries: Vec<(String, DocValue)>,
}

impl DocMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts `value` under `key`. An existing key keeps its position
    /// and has its value replaced.
    pub fn insert(&mut self, key: impl Into<String>, value: DocValue) {
        let key = key.into();
        if let Some(entry) = self.entries.iter_mut().find(|(k, _)| *k == key) {
            entry.1 = value;
        } else {
            self.entries.push((key, value));
        }
    }

    pub fn get(&self, key: &str) -> Option<&DocValue> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &DocValue)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(k, _)| k.as_str())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<(String, DocValue)> for DocMap {
    fn from_iter<I: IntoIterator<Item = (String, DocValue)>>(iter: I) -> Self {
        let mut map = DocMap::new();
        for (k, v) in iter {
            map.insert(k, v);
        }
        map
    }
}

/// One matched document in a result set.
///
/// - `id`: join key, unique within the result set, fixed at construction
/// - `fields`: projected field values, each field multi-valued
/// - `source`: full document body (`DocValue::Map` at the top level),
///   absent when not requested or not yet hydrated
#[derive(Debug, Clone, PartialEq)]
pub struct SearchHit {
    id: HitId,
    pub fields: Fields,
    pub source: Option<DocValue>,
}

impl SearchHit {
    pub fn new(id: impl Into<HitId>) -> Self {
        Self { id: id.into(), fields: Fields::new(), source: None }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn with_field(mut self, name: impl Into<String>, values: Vec<DocValue>) -> Self {
        self.fields.insert(name.into(), values);
        self
    }

    pub fn with_source(mut self, source: DocValue) -> Self {
        self.source = Some(source);
        self
    }
}

/// The original request, passed through to every stage. Opaque to the
/// stages in this workspace; carried for stages that key off it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    pub query: String,
    #[serde(default)]
    pub params: HashMap<String, String>,
}

impl SearchQuery {
    pub fn new(query: impl Into<String>) -> Self {
        Self { query: query.into(), params: HashMap::new() }
    }
}

/// Ordered result set. Stages preserve hit order and membership; only
/// the hits' own `fields` and `source` may be rewritten.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SearchResults {
    pub hits: Vec<SearchHit>,
}

impl SearchResults {
    pub fn new(hits: Vec<SearchHit>) -> Self {
        Self { hits }
    }

    pub fn len(&self) -> usize {
        self.hits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.hits.is_empty()
    }
}
